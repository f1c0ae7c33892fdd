//! Shared test utilities for `canopy_tree` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities; not every item is used by every test binary"
)]

use std::cell::RefCell;
use std::rc::Rc;

use canopy_tree::prelude::*;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// An ordered record of lifecycle events, shared between a test and the
/// behaviors it builds.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    /// Returns every event recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    /// Returns and clears the recorded events.
    pub fn take(&self) -> Vec<String> {
        core::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BEHAVIORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Props carrying a single string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    pub value: String,
}

impl Value {
    pub fn new(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// A behavior that records `create`, `updated(<value>)` and `destroy`.
pub fn lifecycle(log: &EventLog) -> Behavior<Value> {
    let log = log.clone();
    Behavior::named("Lifecycle", move |on_update: &mut OnUpdate<Value>, _: &TreeOperations| {
        log.push("create");
        let updates = log.clone();
        on_update.register(move |props: &Rc<Value>, _: Option<&Rc<Value>>| {
            updates.push(format!("updated({})", props.value));
        })?;
        let teardown = log.clone();
        Ok::<_, TreeError>(Cleanup::new(move || teardown.push("destroy")))
    })
}

/// A behavior that records `<name> create` / `<name> destroy` and never
/// registers an update callback.
pub fn static_named(name: &'static str, log: &EventLog) -> Behavior<()> {
    let log = log.clone();
    Behavior::named(name, move |_: &mut OnUpdate<()>, _: &TreeOperations| {
        log.push(format!("{name} create"));
        let teardown = log.clone();
        Cleanup::new(move || teardown.push(format!("{name} destroy")))
    })
}

/// Provides `context` with the string in its props on every update.
pub fn provider(context: &Context<String>) -> Behavior<Value> {
    let context = context.clone();
    Behavior::named("Provider", move |on_update: &mut OnUpdate<Value>, ops: &TreeOperations| {
        let ops = ops.clone();
        let context = context.clone();
        on_update.register(move |props: &Rc<Value>, _: Option<&Rc<Value>>| {
            ops.set_context(&context, props.value.clone());
        })
    })
}

/// A wrapper that does nothing but hold children.
pub fn wrapper() -> Behavior<()> {
    Behavior::named("Wrapper", |_: &mut OnUpdate<()>, _: &TreeOperations| ())
}

/// Subscribes to `context` for its whole lifetime and records every value
/// pushed to it.
pub fn subscriber(context: &Context<String>, log: &EventLog) -> Behavior<()> {
    let context = context.clone();
    let log = log.clone();
    Behavior::named("Subscriber", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
        let log = log.clone();
        ops.subscribe_context(&context, move |value| log.push(value))?;
        Ok::<_, TreeError>(())
    })
}

/// Reads `context` once at construction and records what it saw.
pub fn reader(context: &Context<String>, log: &EventLog) -> Behavior<()> {
    let context = context.clone();
    let log = log.clone();
    Behavior::named("Reader", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
        log.push(ops.get_context(&context));
    })
}
