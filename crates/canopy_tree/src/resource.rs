//! Live resources and their per-resource tree bookkeeping.
//!
//! Ownership runs strictly downward: a [`ResourceSet`] owns its nodes, a node
//! owns its [`TreeContext`] (children, subtrees, context maps) and its
//! operations. The parent link is a [`Weak`] back-reference used only for
//! upward context lookup.

use core::any::Any;
use core::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::behavior::{ErasedBehavior, Props, ResourceOperations};
use crate::context::{ContextId, ProvidedValue};
use crate::element::{Elements, Key};
use crate::error::TreeError;

/// Type-erased subscriber callback stored in a resource's subscription map.
pub(crate) type Subscriber = Rc<dyn Fn(&dyn Any)>;

/// Names one subscription by the identity of its callback allocation.
pub(crate) type SubscriberToken = Weak<dyn Fn(&dyn Any)>;

/// Keyed, ordered children of one parent (or of a handle's root).
pub(crate) type ResourceMap = IndexMap<Key, Rc<ResourceNode>>;

// ─────────────────────────────────────────────────────────────────────────────
// ResourceSet
// ─────────────────────────────────────────────────────────────────────────────

/// A keyed collection of live resources, mutated only by `apply`.
#[derive(Default)]
pub(crate) struct ResourceSet {
    entries: RefCell<ResourceMap>,
    applying: Cell<bool>,
}

impl ResourceSet {
    pub(crate) fn from_map(entries: ResourceMap) -> Self {
        Self {
            entries: RefCell::new(entries),
            applying: Cell::new(false),
        }
    }

    /// Marks the collection as being reconciled until the guard drops.
    pub(crate) fn begin_apply(&self) -> Result<ApplyGuard<'_>, TreeError> {
        if self.applying.replace(true) {
            return Err(TreeError::ReentrantApply);
        }
        Ok(ApplyGuard { set: self })
    }

    pub(crate) fn get(&self, key: &Key) -> Option<Rc<ResourceNode>> {
        self.entries.borrow().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: Key, node: Rc<ResourceNode>) {
        self.entries.borrow_mut().insert(key, node);
    }

    pub(crate) fn remove(&self, key: &Key) -> Option<Rc<ResourceNode>> {
        self.entries.borrow_mut().swap_remove(key)
    }

    pub(crate) fn take_all(&self) -> ResourceMap {
        core::mem::take(&mut *self.entries.borrow_mut())
    }

    pub(crate) fn keys(&self) -> Vec<Key> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of the nodes, safe to iterate while user code runs.
    pub(crate) fn nodes(&self) -> Vec<Rc<ResourceNode>> {
        self.entries.borrow().values().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Rewrites the iteration order to follow `target`.
    ///
    /// Keys missing from `target` keep their relative order at the end.
    pub(crate) fn reorder(&self, target: &Elements) {
        let mut entries = self.entries.borrow_mut();
        let mut remaining = core::mem::take(&mut *entries);
        let mut ordered = IndexMap::with_capacity(remaining.len());
        for key in target.keys() {
            if let Some(node) = remaining.shift_remove(key) {
                ordered.insert(key.clone(), node);
            }
        }
        ordered.extend(remaining);
        *entries = ordered;
    }
}

/// Clears the `applying` flag of a [`ResourceSet`] when dropped.
pub(crate) struct ApplyGuard<'a> {
    set: &'a ResourceSet,
}

impl Drop for ApplyGuard<'_> {
    fn drop(&mut self) {
        self.set.applying.set(false);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TreeContext
// ─────────────────────────────────────────────────────────────────────────────

/// Per-resource bookkeeping: parent link, children, subtrees and the context
/// maps written through [`TreeOperations`](crate::operations::TreeOperations).
pub(crate) struct TreeContext {
    parent: RefCell<Weak<ResourceNode>>,
    pub(crate) children: ResourceSet,
    subtrees: RefCell<Vec<Rc<ResourceSet>>>,
    providing: RefCell<HashMap<ContextId, ProvidedValue>>,
    subscriptions: RefCell<HashMap<ContextId, Subscriber>>,
}

impl TreeContext {
    fn new(parent: Weak<ResourceNode>, children: ResourceMap) -> Self {
        Self {
            parent: RefCell::new(parent),
            children: ResourceSet::from_map(children),
            subtrees: RefCell::new(Vec::new()),
            providing: RefCell::new(HashMap::new()),
            subscriptions: RefCell::new(HashMap::new()),
        }
    }

    pub(crate) fn parent(&self) -> Option<Rc<ResourceNode>> {
        self.parent.borrow().upgrade()
    }

    fn set_parent(&self, parent: Weak<ResourceNode>) {
        *self.parent.borrow_mut() = parent;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Providing
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn provided(&self, context: ContextId) -> Option<Rc<dyn Any>> {
        self.providing
            .borrow()
            .get(&context)
            .map(|provided| Rc::clone(&provided.value))
    }

    pub(crate) fn provides(&self, context: ContextId) -> bool {
        self.providing.borrow().contains_key(&context)
    }

    pub(crate) fn provide(&self, context: ContextId, value: ProvidedValue) {
        self.providing.borrow_mut().insert(context, value);
    }

    pub(crate) fn withdraw(&self, context: ContextId) -> Option<ProvidedValue> {
        self.providing.borrow_mut().remove(&context)
    }

    pub(crate) fn provided_contexts(&self) -> Vec<ContextId> {
        self.providing.borrow().keys().copied().collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn is_subscribed(&self, context: ContextId) -> bool {
        self.subscriptions.borrow().contains_key(&context)
    }

    pub(crate) fn subscribe(&self, context: ContextId, callback: Subscriber) {
        self.subscriptions.borrow_mut().insert(context, callback);
    }

    /// Removes the subscription only if it is still the one `token` names.
    pub(crate) fn unsubscribe(&self, context: ContextId, token: &SubscriberToken) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        if subscriptions
            .get(&context)
            .is_some_and(|callback| Rc::downgrade(callback).ptr_eq(token))
        {
            subscriptions.remove(&context);
            return true;
        }
        false
    }

    pub(crate) fn subscriber(&self, context: ContextId) -> Option<Subscriber> {
        self.subscriptions
            .borrow()
            .get(&context)
            .map(Rc::clone)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Subtrees
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn add_subtree(&self, set: Rc<ResourceSet>) {
        self.subtrees.borrow_mut().push(set);
    }

    fn take_subtrees(&self) -> Vec<Rc<ResourceSet>> {
        core::mem::take(&mut *self.subtrees.borrow_mut())
    }

    /// Every live child reachable for context purposes: element children
    /// first, then subtree members in creation order.
    pub(crate) fn descendants_snapshot(&self) -> Vec<Rc<ResourceNode>> {
        let mut nodes = self.children.nodes();
        for set in self.subtrees.borrow().iter() {
            nodes.extend(set.nodes());
        }
        nodes
    }

    fn clear_context_maps(&self) {
        self.subscriptions.borrow_mut().clear();
        self.providing.borrow_mut().clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceNode
// ─────────────────────────────────────────────────────────────────────────────

/// The live counterpart of an element.
pub(crate) struct ResourceNode {
    key: Key,
    behavior: ErasedBehavior,
    props: RefCell<Props>,
    operations: RefCell<ResourceOperations>,
    pub(crate) tree: TreeContext,
    destroyed: Cell<bool>,
}

impl ResourceNode {
    /// Creates a node under `parent`, adopting `children` (seeded from a
    /// replaced resource) by re-pointing their parent links at the new node.
    pub(crate) fn new(
        key: Key,
        behavior: ErasedBehavior,
        props: Props,
        parent: Option<&Rc<ResourceNode>>,
        children: ResourceMap,
    ) -> Rc<Self> {
        let parent = parent.map_or_else(Weak::new, Rc::downgrade);
        let node = Rc::new(Self {
            key,
            behavior,
            props: RefCell::new(props),
            operations: RefCell::new(ResourceOperations::default()),
            tree: TreeContext::new(parent, children),
            destroyed: Cell::new(false),
        });
        for child in node.tree.children.nodes() {
            child.tree.set_parent(Rc::downgrade(&node));
        }
        node
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    pub(crate) fn behavior(&self) -> &ErasedBehavior {
        &self.behavior
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Returns `true` if `props` is the very value last applied.
    pub(crate) fn has_props(&self, props: &Props) -> bool {
        let current = self.props.borrow();
        Rc::ptr_eq(&*current, props)
    }

    pub(crate) fn set_props(&self, props: Props) {
        *self.props.borrow_mut() = props;
    }

    pub(crate) fn set_operations(&self, operations: ResourceOperations) {
        *self.operations.borrow_mut() = operations;
    }

    /// Runs the update operation, if the behavior registered one.
    ///
    /// The operation is moved out for the duration of the call so that user
    /// code never runs while the node is borrowed.
    pub(crate) fn run_update(&self, props: Props) -> Result<(), TreeError> {
        let update = self.operations.borrow_mut().update.take();
        let Some(mut update) = update else {
            tracing::trace!(key = %self.key, behavior = self.behavior.name(), "no update operation");
            return Ok(());
        };
        let result = update(props);
        let mut operations = self.operations.borrow_mut();
        if operations.update.is_none() {
            operations.update = Some(update);
        }
        result
    }

    /// Runs this node's own destroy operation, sweeps anything left in its
    /// subtrees, then drops its context maps.
    ///
    /// Element children are not touched; callers destroy them first (removal)
    /// or hand them to a replacement (replace).
    pub(crate) fn destroy_own(&self) -> Result<(), TreeError> {
        let destroy = self.operations.borrow_mut().destroy.take();
        let own = destroy.map_or(Ok(()), |destroy| destroy());

        let mut swept = Ok(());
        for set in self.tree.take_subtrees() {
            swept = swept.and(destroy_all(set.take_all()));
        }

        self.tree.clear_context_maps();
        self.destroyed.set(true);
        own.and(swept)
    }

    /// Destroys this node and every descendant, children before parent.
    ///
    /// A failing destructor does not stop the teardown: every descendant and
    /// this node are still destroyed, and the first error is returned.
    pub(crate) fn destroy(&self) -> Result<(), TreeError> {
        let children = destroy_all(self.tree.children.take_all());
        tracing::debug!(key = %self.key, behavior = self.behavior.name(), "destroying resource");
        let own = self.destroy_own();
        children.and(own)
    }
}

/// Destroys every node in `nodes`, returning the first error.
fn destroy_all(nodes: ResourceMap) -> Result<(), TreeError> {
    let mut first = Ok(());
    for node in nodes.into_values() {
        let result = node.destroy();
        if first.is_ok() {
            first = result;
        }
    }
    first
}
