//! Hook calls available to a component's render function.
//!
//! Every call claims the next slot. The order of calls must be the same on
//! every render of one component: the first render creates the slots, later
//! renders find them by position, and a mismatch fails the render with a
//! [`HookError`] naming the slot.

use core::cell::{Cell, RefCell};
use core::marker::PhantomData;
use std::rc::{Rc, Weak};

use canopy_tree::{Cleanup, Context, IntoCleanup, TreeError, TreeOperations};

use crate::error::{HookError, HookKind};
use crate::slot::{HookState, Slot};

/// Slot-ordered access to a component's state, effects, memos and context.
///
/// Created fresh for every render with its cursor at slot zero.
pub struct Hooks<'a> {
    state: &'a Rc<HookState>,
    cursor: usize,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(state: &'a Rc<HookState>) -> Self {
        Self { state, cursor: 0 }
    }

    /// Number of hooks called so far in this render.
    pub(crate) fn called(&self) -> usize {
        self.cursor
    }

    fn next_slot(&mut self, kind: HookKind) -> Result<(usize, bool), HookError> {
        let slot = self.cursor;
        self.cursor += 1;
        let fresh = self.state.claim(slot, kind)?;
        Ok((slot, fresh))
    }

    /// Returns the component's [`TreeOperations`].
    #[must_use]
    pub fn operations(&self) -> &TreeOperations {
        &self.state.operations
    }

    // ─────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the slot's current value and a setter for it, seeding the slot
    /// with `initial` on the first render.
    ///
    /// # Errors
    ///
    /// Fails if this slot was created by a different hook or value type.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        initial: T,
    ) -> Result<(T, StateSetter<T>), TreeError> {
        self.use_state_with(move || initial)
    }

    /// Like [`use_state`](Self::use_state), but computes the initial value
    /// only when the slot is created.
    ///
    /// # Errors
    ///
    /// Fails if this slot was created by a different hook or value type.
    pub fn use_state_with<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, StateSetter<T>), TreeError> {
        let (slot, fresh) = self.next_slot(HookKind::State)?;
        if fresh {
            let value = init();
            self.state.push(Slot::State(Box::new(value)));
        }
        let value = self.state.read_state::<T>(slot)?;
        let setter = StateSetter {
            state: Rc::downgrade(self.state),
            slot,
            _value: PhantomData,
        };
        Ok((value, setter))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Effects
    // ─────────────────────────────────────────────────────────────────────

    /// Runs `effect` on the first render and on every render where `deps`
    /// differs from the previous render's value.
    ///
    /// Before a re-run, the cleanup returned by the previous run is invoked.
    /// Cleanups still registered when the component is destroyed run then.
    /// Dependencies of a different type than last time count as changed.
    ///
    /// # Errors
    ///
    /// Fails on a slot mismatch, or with the error the effect or the previous
    /// cleanup raised.
    pub fn use_effect<D, F, R>(&mut self, effect: F, deps: D) -> Result<(), TreeError>
    where
        D: PartialEq + 'static,
        F: FnOnce() -> R,
        R: IntoCleanup,
    {
        let (slot, fresh) = self.next_slot(HookKind::Effect)?;
        if fresh {
            self.state.push(Slot::Effect {
                deps: None,
                cleanup: None,
            });
        }
        let Some(previous) = self.state.effect_changed(slot, &deps)? else {
            return Ok(());
        };
        tracing::trace!(component = self.state.name, slot, "effect running");
        if let Some(cleanup) = previous {
            cleanup.run()?;
        }
        let cleanup = effect().into_cleanup()?;
        self.state.store_effect(slot, Box::new(deps), cleanup);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Memo
    // ─────────────────────────────────────────────────────────────────────

    /// Computes a value the first time this slot is visited and returns the
    /// same value on every later render.
    ///
    /// There is no dependency list and the value is never recomputed; this is
    /// a lazily-initialized cell that lives as long as the component.
    ///
    /// # Errors
    ///
    /// Fails if this slot was created by a different hook or value type.
    pub fn use_memo<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Result<Rc<T>, TreeError> {
        let (slot, fresh) = self.next_slot(HookKind::Memo)?;
        if fresh {
            let value: Rc<T> = Rc::new(init());
            self.state.push(Slot::Memo(value));
        }
        Ok(self.state.read_memo::<T>(slot)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Context
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the value of `context` visible to this component and
    /// re-renders the component whenever an ancestor changes it.
    ///
    /// Occupies two slots (a memo cell and an effect keyed on the context's
    /// identity). The value delivered while subscribing does not schedule a
    /// re-render.
    ///
    /// # Errors
    ///
    /// Fails on a slot mismatch, or with [`TreeError::AlreadySubscribed`] if
    /// the component already uses `context`.
    pub fn use_context<T: Clone + 'static>(&mut self, context: &Context<T>) -> Result<T, TreeError> {
        let cell = self.use_memo(|| ContextCell {
            value: RefCell::new(context.default_value().clone()),
            syncing: Cell::new(false),
        })?;

        let subscribed = Rc::clone(&cell);
        let state = Rc::downgrade(self.state);
        let operations = self.state.operations.clone();
        let channel = context.clone();
        self.use_effect(
            move || {
                subscribed.syncing.set(true);
                let sink = Rc::clone(&subscribed);
                let result = operations.subscribe_context(&channel, move |value: T| {
                    *sink.value.borrow_mut() = value;
                    if sink.syncing.get() {
                        return;
                    }
                    if let Some(state) = state.upgrade() {
                        state.schedule();
                    }
                });
                subscribed.syncing.set(false);
                let subscription = result?;
                Ok::<_, TreeError>(Cleanup::new(move || subscription.unsubscribe()))
            },
            context.id(),
        )?;

        let value = cell.value.borrow().clone();
        Ok(value)
    }
}

struct ContextCell<T> {
    value: RefCell<T>,
    syncing: Cell<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// StateSetter
// ─────────────────────────────────────────────────────────────────────────────

/// Writes a `use_state` slot and schedules a re-render of its component.
///
/// The value already returned to the current render is not changed. Any
/// number of writes before the scheduler runs produce one re-render. Writes
/// after the component is destroyed are ignored.
pub struct StateSetter<T> {
    state: Weak<HookState>,
    slot: usize,
    _value: PhantomData<fn(T)>,
}

impl<T: Clone + 'static> StateSetter<T> {
    /// Replaces the value.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }

    /// Replaces the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        if state.is_destroyed() {
            tracing::trace!(component = state.name, slot = self.slot, "state set after destroy ignored");
            return;
        }
        let written = state
            .read_state::<T>(self.slot)
            .and_then(|current| state.write_state(self.slot, f(&current)));
        if let Err(error) = written {
            tracing::warn!(component = state.name, %error, "state write failed");
            return;
        }
        state.schedule();
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            state: Weak::clone(&self.state),
            slot: self.slot,
            _value: PhantomData,
        }
    }
}

impl<T> core::fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateSetter")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}
