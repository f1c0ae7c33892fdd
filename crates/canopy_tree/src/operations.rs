//! The capability object a behavior receives at construction.
//!
//! [`TreeOperations`] is closed over exactly one resource. Lookups walk the
//! parent chain, closest provider wins:
//!
//! ```text
//! Handle root
//!    │
//!    └── App        set_context(theme, "dark")
//!           │
//!           ├── Panel   set_context(theme, "light")   ← shadow boundary
//!           │      └── Button   get_context(theme) == "light"
//!           │
//!           └── Footer  get_context(theme) == "dark"
//! ```
//!
//! Pushes follow the same shape: a change on `App` reaches `Footer` but stops
//! at `Panel`, which provides the context itself.

use core::any::Any;
use core::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::context::{Context, ContextId, ProvidedValue};
use crate::element::{Elements, Key};
use crate::error::TreeError;
use crate::reconciler;
use crate::resource::{ResourceNode, ResourceSet, Subscriber, SubscriberToken};

/// Read/write access to context from the point of view of one resource.
///
/// Cheap to clone. Holds only a weak reference; once the resource is gone,
/// reads fall back to defaults and writes do nothing.
#[derive(Clone)]
pub struct TreeOperations {
    node: Weak<ResourceNode>,
}

impl TreeOperations {
    pub(crate) fn new(node: &Rc<ResourceNode>) -> Self {
        Self {
            node: Rc::downgrade(node),
        }
    }

    /// Operations bound to no resource.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self { node: Weak::new() }
    }

    /// Returns the value of `context` visible to this resource: the nearest
    /// ancestor's provided value, or the context's default.
    ///
    /// A value this resource provides itself is not visible to it.
    #[must_use]
    pub fn get_context<T: Clone + 'static>(&self, context: &Context<T>) -> T {
        self.node
            .upgrade()
            .and_then(|node| resolve_from_ancestors(&node, context.id()))
            .and_then(|value| value.downcast_ref::<T>().cloned())
            .unwrap_or_else(|| context.default_value().clone())
    }

    /// Subscribes to pushes of `context`.
    ///
    /// `callback` is invoked once synchronously with the currently visible
    /// value, then again every time an ancestor sets or unsets the context.
    /// The subscription lives until [`Subscription::unsubscribe`] or until the
    /// resource is destroyed; dropping the returned handle does not end it.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::AlreadySubscribed`] if this resource already holds
    /// a subscription to `context`.
    pub fn subscribe_context<T, F>(
        &self,
        context: &Context<T>,
        callback: F,
    ) -> Result<Subscription, TreeError>
    where
        T: Clone + 'static,
        F: FnMut(T) + 'static,
    {
        let id = context.id();
        let node = self.node.upgrade();
        if node.as_ref().is_some_and(|node| node.tree.is_subscribed(id)) {
            return Err(TreeError::AlreadySubscribed {
                context: context.name(),
            });
        }

        let subscriber = typed_subscriber(context, callback);
        let current = self.get_context(context);
        let current: &dyn Any = &current;
        subscriber(current);

        let token = Rc::downgrade(&subscriber);
        if let Some(node) = &node {
            node.tree.subscribe(id, subscriber);
            tracing::trace!(key = %node.key(), context = context.name(), "subscribed");
        }
        Ok(Subscription {
            node: self.node.clone(),
            context: id,
            token,
        })
    }

    /// Provides `value` for `context` to every descendant, shadowing any
    /// ancestor value, and pushes it to subscribed descendants.
    ///
    /// The push does not descend into subtrees rooted at a resource that
    /// provides `context` itself.
    pub fn set_context<T: 'static>(&self, context: &Context<T>, value: T) {
        let Some(node) = self.node.upgrade() else {
            return;
        };
        let value: Rc<dyn Any> = Rc::new(value);
        node.tree.provide(
            context.id(),
            ProvidedValue {
                value: Rc::clone(&value),
                default: context.erased_default(),
                name: context.name(),
            },
        );
        tracing::debug!(key = %node.key(), context = context.name(), "context set");
        propagate(&node, context.id(), value.as_ref());
    }

    /// Stops providing `context` and pushes the value now visible from this
    /// resource (an ancestor's, or the default) to subscribed descendants.
    ///
    /// Does nothing if this resource is not providing `context`.
    pub fn unset_context<T: 'static>(&self, context: &Context<T>) {
        if let Some(node) = self.node.upgrade() {
            unset_provided(&node, context.id());
        }
    }

    /// Creates a child collection owned by this resource.
    ///
    /// Resources applied into the subtree are children of this resource for
    /// context purposes. Anything still in the subtree is destroyed after this
    /// resource's own destroy operation runs.
    #[must_use]
    pub fn create_subtree(&self) -> Subtree {
        let resources = Rc::new(ResourceSet::default());
        if let Some(node) = self.node.upgrade() {
            node.tree.add_subtree(Rc::clone(&resources));
        }
        Subtree {
            parent: self.node.clone(),
            resources,
        }
    }
}

impl core::fmt::Debug for TreeOperations {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let key = self.node.upgrade().map(|node| node.key().clone());
        f.debug_struct("TreeOperations").field("key", &key).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription
// ─────────────────────────────────────────────────────────────────────────────

/// Handle returned by [`TreeOperations::subscribe_context`].
#[derive(Debug)]
pub struct Subscription {
    node: Weak<ResourceNode>,
    context: ContextId,
    token: SubscriberToken,
}

impl Subscription {
    /// Returns the context this subscription listens to.
    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Removes the subscription. A no-op if the resource is gone.
    pub fn unsubscribe(self) {
        if let Some(node) = self.node.upgrade()
            && node.tree.unsubscribe(self.context, &self.token)
        {
            tracing::trace!(key = %node.key(), context = %self.context, "unsubscribed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subtree
// ─────────────────────────────────────────────────────────────────────────────

/// A behavior-owned child collection, reconciled with [`Subtree::apply`].
pub struct Subtree {
    parent: Weak<ResourceNode>,
    resources: Rc<ResourceSet>,
}

impl Subtree {
    /// Reconciles the subtree against `elements`.
    ///
    /// Once the owning resource has been destroyed this is a no-op, so late
    /// callers cannot resurrect resources under a torn-down parent.
    ///
    /// # Errors
    ///
    /// Propagates any error raised while reconciling, including
    /// [`TreeError::ReentrantApply`].
    pub fn apply(&self, elements: impl Into<Elements>) -> Result<(), TreeError> {
        let Some(parent) = self.parent.upgrade() else {
            return Ok(());
        };
        if parent.is_destroyed() {
            tracing::trace!(key = %parent.key(), "subtree apply after destroy skipped");
            return Ok(());
        }
        reconciler::apply(&self.resources, &elements.into(), Some(&parent))
    }

    /// Returns the number of live resources in the subtree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if the subtree holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the keys of the live resources, in target order.
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.resources.keys()
    }
}

impl core::fmt::Debug for Subtree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subtree")
            .field("keys", &self.resources.keys())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Propagation
// ─────────────────────────────────────────────────────────────────────────────

/// Walks up from `node`'s parent and returns the first provided value.
pub(crate) fn resolve_from_ancestors(node: &ResourceNode, context: ContextId) -> Option<Rc<dyn Any>> {
    let mut current = node.tree.parent();
    while let Some(ancestor) = current {
        if let Some(value) = ancestor.tree.provided(context) {
            return Some(value);
        }
        current = ancestor.tree.parent();
    }
    None
}

/// Pushes `value` to every subscribed descendant of `node`, stopping at
/// descendants that provide `context` themselves.
pub(crate) fn propagate(node: &ResourceNode, context: ContextId, value: &dyn Any) {
    for child in node.tree.descendants_snapshot() {
        if child.is_destroyed() {
            continue;
        }
        if let Some(subscriber) = child.tree.subscriber(context) {
            subscriber(value);
        }
        if !child.tree.provides(context) {
            propagate(&child, context, value);
        }
    }
}

/// Withdraws a provided value and pushes the fallback. Returns `false` if
/// `node` was not providing `context`.
pub(crate) fn unset_provided(node: &ResourceNode, context: ContextId) -> bool {
    let Some(provided) = node.tree.withdraw(context) else {
        return false;
    };
    let fallback = resolve_from_ancestors(node, context).unwrap_or(provided.default);
    tracing::debug!(key = %node.key(), context = provided.name, "context unset");
    propagate(node, context, fallback.as_ref());
    true
}

fn typed_subscriber<T, F>(context: &Context<T>, callback: F) -> Subscriber
where
    T: Clone + 'static,
    F: FnMut(T) + 'static,
{
    let channel = context.clone();
    let callback = RefCell::new(callback);
    Rc::new(move |value: &dyn Any| {
        let value = value
            .downcast_ref::<T>()
            .cloned()
            .unwrap_or_else(|| channel.default_value().clone());
        match callback.try_borrow_mut() {
            Ok(mut callback) => (&mut *callback)(value),
            Err(_) => {
                tracing::warn!(
                    context = channel.name(),
                    "context push re-entered its subscriber; dropped"
                );
            }
        }
    })
}
