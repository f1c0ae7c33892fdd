//! Context propagation tests.
//!
//! Covers defaults, shadowing, unset fallback, unsubscription on destroy and
//! propagation through behavior-owned subtrees.

mod test_utils;

use std::cell::RefCell;
use std::rc::Rc;

use canopy_tree::prelude::*;
use pretty_assertions::assert_eq;
use test_utils::{EventLog, Value, provider, reader, subscriber, wrapper};

fn theme() -> Context<String> {
    Context::named("theme", "default".to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn unprovided_context_resolves_to_default() {
    let ctx = theme();
    let log = EventLog::default();
    let handle = Handle::new();

    handle.apply(reader(&ctx, &log).element(())).unwrap();

    assert_eq!(log.entries(), vec!["default"]);
}

#[test]
fn descendants_see_nearest_provider() {
    let ctx = theme();
    let log = EventLog::default();
    let outer = provider(&ctx);
    let inner = provider(&ctx);
    let read = reader(&ctx, &log);
    let handle = Handle::new();

    handle
        .apply(
            outer.element_with(
                Value::new("outer"),
                Elements::new()
                    .keyed("direct", read.element(()))
                    .keyed(
                        "shadowed",
                        inner.element_with(Value::new("inner"), [read.element(())]),
                    ),
            ),
        )
        .unwrap();

    assert_eq!(log.entries(), vec!["outer", "inner"]);
}

#[test]
fn provider_does_not_see_its_own_value() {
    let ctx = theme();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let reader = {
        let ctx = ctx.clone();
        let seen = Rc::clone(&seen);
        Behavior::<()>::named("SelfProvider", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
            ops.set_context(&ctx, "mine".to_string());
            seen.borrow_mut().push(ops.get_context(&ctx));
        })
    };
    let handle = Handle::new();

    handle.apply(reader.element(())).unwrap();

    assert_eq!(*seen.borrow(), vec!["default".to_string()]);
}

#[test]
fn equal_defaults_do_not_make_contexts_equal() {
    let a = theme();
    let b = theme();
    let log = EventLog::default();
    let handle = Handle::new();

    handle
        .apply(provider(&a).element_with(Value::new("a only"), [reader(&b, &log).element(())]))
        .unwrap();

    assert_eq!(log.entries(), vec!["default"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPAGATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn set_context_pushes_to_subscribers() {
    let ctx = theme();
    let log = EventLog::default();
    let provide = provider(&ctx);
    let subscribe = subscriber(&ctx, &log);
    let child = subscribe.element(());
    let handle = Handle::new();

    handle
        .apply(provide.element_with(Value::new("1"), [child.clone()]))
        .unwrap();
    handle
        .apply(provide.element_with(Value::new("2"), [child]))
        .unwrap();

    assert_eq!(log.entries(), vec!["1", "2"]);
}

#[test]
fn intermediate_provider_blocks_outer_pushes() {
    let ctx = theme();
    let log = EventLog::default();
    let outer = provider(&ctx);
    let inner = provider(&ctx);
    let subscribe = subscriber(&ctx, &log);
    let inner_props = Rc::new(Value::new("inner"));
    let leaf = subscribe.element(());
    let handle = Handle::new();

    let tree = |outer_value: &str| {
        outer.element_with(
            Value::new(outer_value),
            [inner.element_with(Rc::clone(&inner_props), [leaf.clone()])],
        )
    };

    handle.apply(tree("outer 1")).unwrap();
    handle.apply(tree("outer 2")).unwrap();
    handle.apply(tree("outer 3")).unwrap();

    assert_eq!(log.entries(), vec!["inner"]);
}

#[test]
fn replacing_a_provider_restores_the_default() {
    let ctx = theme();
    let log = EventLog::default();
    let subscribe = subscriber(&ctx, &log);
    let leaf = subscribe.element(());
    let handle = Handle::new();

    handle
        .apply(provider(&ctx).element_with(Value::new("1"), [leaf.clone()]))
        .unwrap();
    handle
        .apply(wrapper().element_with((), [leaf]))
        .unwrap();

    assert_eq!(log.entries(), vec!["1", "default"]);
}

#[test]
fn unset_falls_back_to_the_next_ancestor() {
    let ctx = theme();
    let log = EventLog::default();
    let subscribe = subscriber(&ctx, &log);
    let outer = provider(&ctx);
    let inner = provider(&ctx);
    let outer_props = Rc::new(Value::new("outer"));
    let leaf = subscribe.element(());
    let handle = Handle::new();

    handle
        .apply(outer.element_with(
            Rc::clone(&outer_props),
            [inner.element_with(Value::new("inner"), [leaf.clone()])],
        ))
        .unwrap();
    handle
        .apply(outer.element_with(
            Rc::clone(&outer_props),
            [wrapper().element_with((), [leaf])],
        ))
        .unwrap();

    assert_eq!(log.entries(), vec!["inner", "outer"]);
}

#[test]
fn unset_of_unprovided_context_is_silent() {
    let ctx = theme();
    let log = EventLog::default();
    let unsetter = {
        let ctx = ctx.clone();
        Behavior::<()>::named("Unsetter", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
            ops.unset_context(&ctx);
        })
    };
    let handle = Handle::new();

    handle
        .apply(unsetter.element_with((), [subscriber(&ctx, &log).element(())]))
        .unwrap();

    assert_eq!(log.entries(), vec!["default"]);
}

#[test]
fn plain_subscriber_handoff_sees_the_unset_push_before_removal() {
    let ctx = theme();
    let log = EventLog::default();
    let provide = provider(&ctx);
    let subscribe = subscriber(&ctx, &log);
    let handle = Handle::new();

    handle.apply(subscribe.element(())).unwrap();
    handle
        .apply(provide.element_with(Value::new("1"), [subscribe.element(())]))
        .unwrap();
    handle.apply(subscribe.element(())).unwrap();
    handle
        .apply(provide.element_with(Value::new("2"), [subscribe.element(())]))
        .unwrap();

    // Replacing the provider pushes the fallback to the subscriber it wrapped,
    // which the replacement adopts and only then drops, so the third apply
    // delivers twice. Hooked readers fold the two into one render.
    assert_eq!(log.entries(), vec!["default", "1", "default", "default", "2"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBSCRIPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn destroyed_subscriber_receives_nothing() {
    let ctx = theme();
    let log = EventLog::default();
    let provide = provider(&ctx);
    let subscribe = subscriber(&ctx, &log);
    let first = Rc::new(Value::new("1"));
    let handle = Handle::new();

    handle
        .apply(provide.element_with(Rc::clone(&first), [subscribe.element(())]))
        .unwrap();
    handle
        .apply(provide.element_with(Rc::clone(&first), Elements::new()))
        .unwrap();
    handle
        .apply(provide.element_with(Value::new("2"), Elements::new()))
        .unwrap();

    assert_eq!(log.entries(), vec!["1"]);
}

#[test]
fn second_subscription_to_same_context_fails() {
    let ctx = theme();
    let twice = {
        let ctx = ctx.clone();
        Behavior::<()>::named("Twice", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
            ops.subscribe_context(&ctx, |_| {})?;
            ops.subscribe_context(&ctx, |_| {})?;
            Ok::<_, TreeError>(())
        })
    };
    let handle = Handle::new();

    let err = handle.apply(twice.element(())).unwrap_err();

    assert!(matches!(err, TreeError::AlreadySubscribed { context: "theme" }));
}

#[test]
fn subscription_reports_its_context() {
    let ctx = theme();
    let seen = Rc::new(RefCell::new(None));
    let reader = {
        let (ctx, seen) = (ctx.clone(), Rc::clone(&seen));
        Behavior::<()>::named("Listener", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
            let subscription = ops.subscribe_context(&ctx, |_| {})?;
            *seen.borrow_mut() = Some(subscription.context());
            Ok::<_, TreeError>(())
        })
    };

    Handle::new().apply(reader.element(())).unwrap();

    assert_eq!(*seen.borrow(), Some(ctx.id()));
}

#[test]
fn unsubscribe_stops_delivery_and_allows_resubscribe() {
    let ctx = theme();
    let log = EventLog::default();
    let provide = provider(&ctx);
    let resubscribing = {
        let ctx = ctx.clone();
        let log = log.clone();
        Behavior::<()>::named("Resubscribing", move |_: &mut OnUpdate<()>, ops: &TreeOperations| {
            let first = log.clone();
            ops.subscribe_context(&ctx, move |v| first.push(format!("first {v}")))?
                .unsubscribe();
            let second = log.clone();
            ops.subscribe_context(&ctx, move |v| second.push(format!("second {v}")))?;
            Ok::<_, TreeError>(())
        })
    };
    let child = resubscribing.element(());
    let handle = Handle::new();

    handle
        .apply(provide.element_with(Value::new("1"), [child.clone()]))
        .unwrap();
    handle
        .apply(provide.element_with(Value::new("2"), [child]))
        .unwrap();

    assert_eq!(
        log.entries(),
        vec!["first 1", "second 1", "second 2"]
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// SUBTREES
// ═══════════════════════════════════════════════════════════════════════════════

/// Renders the children passed in its props into a private subtree.
fn portal() -> Behavior<Elements> {
    Behavior::named("Portal", |on_update: &mut OnUpdate<Elements>, ops: &TreeOperations| {
        let subtree = ops.create_subtree();
        on_update.register(move |children: &Rc<Elements>, _: Option<&Rc<Elements>>| {
            subtree.apply((**children).clone())
        })
    })
}

#[test]
fn context_flows_into_subtrees() {
    let ctx = theme();
    let log = EventLog::default();
    let provide = provider(&ctx);
    let portal = portal();
    let inner = Rc::new(Elements::from(subscriber(&ctx, &log).element(())));
    let handle = Handle::new();

    handle
        .apply(provide.element_with(Value::new("1"), [portal.element(Rc::clone(&inner))]))
        .unwrap();
    handle
        .apply(provide.element_with(Value::new("2"), [portal.element(Rc::clone(&inner))]))
        .unwrap();

    assert_eq!(log.entries(), vec!["1", "2"]);
}

#[test]
fn subtree_resources_are_destroyed_with_their_owner() {
    let log = EventLog::default();
    let portal = portal();
    let leaf = test_utils::static_named("leaf", &log);
    let handle = Handle::new();

    handle
        .apply(portal.element(Elements::from(leaf.element(()))))
        .unwrap();
    handle.apply(Elements::new()).unwrap();

    assert_eq!(log.entries(), vec!["leaf create", "leaf destroy"]);
}

#[test]
fn subtree_reports_its_live_keys() {
    let log = EventLog::default();
    let leaf = test_utils::static_named("leaf", &log);
    let counting = {
        let log = log.clone();
        Behavior::named("Counting", move |on_update: &mut OnUpdate<Elements>, ops: &TreeOperations| {
            let subtree = ops.create_subtree();
            log.push(format!("empty {}", subtree.is_empty()));
            let log = log.clone();
            on_update.register(move |children: &Rc<Elements>, _: Option<&Rc<Elements>>| {
                subtree.apply((**children).clone())?;
                let keys: Vec<String> = subtree.keys().iter().map(ToString::to_string).collect();
                log.push(format!("{} live: {}", subtree.len(), keys.join(",")));
                Ok::<_, TreeError>(())
            })
        })
    };
    let handle = Handle::new();

    let children = Elements::new()
        .keyed("b", leaf.element(()))
        .with(leaf.element(()))
        .keyed("a", leaf.element(()));
    handle.apply(counting.element(children)).unwrap();

    assert_eq!(
        log.entries(),
        vec![
            "empty true",
            "leaf create",
            "leaf create",
            "leaf create",
            "3 live: b,#0,a"
        ]
    );
}
