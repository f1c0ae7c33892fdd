//! The keyed reconciler.
//!
//! [`apply`] converges a collection of live resources to a collection of
//! target elements, key by key:
//!
//! | Existing resource | Target element | Action |
//! |---|---|---|
//! | present | absent | destroy (children first), remove key |
//! | same behavior, same props `Rc` | present | nothing |
//! | same behavior, new props | present | store props, run `update` if registered |
//! | different behavior | present | unset provided contexts, destroy, construct with the old children |
//! | absent | present | construct |
//!
//! A resource whose construction fails is removed again, so a later pass
//! constructs it afresh.
//!
//! Each resolved resource is reconciled against its element's children before
//! the next sibling is visited.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::element::{Element, Elements, Key};
use crate::error::TreeError;
use crate::operations::{TreeOperations, unset_provided};
use crate::resource::{ResourceMap, ResourceNode, ResourceSet};

/// Reconciles `existing` in place against `target`.
///
/// Errors from user code abort the pass immediately; work already done in
/// this pass is not rolled back.
pub(crate) fn apply(
    existing: &ResourceSet,
    target: &Elements,
    parent: Option<&Rc<ResourceNode>>,
) -> Result<(), TreeError> {
    let _guard = existing.begin_apply()?;

    for key in existing.keys() {
        if target.contains_key(&key) {
            continue;
        }
        if let Some(node) = existing.remove(&key) {
            node.destroy()?;
        }
    }

    for (key, element) in target.iter() {
        let node = match existing.get(key) {
            Some(node) if node.behavior().same(&element.behavior) => {
                update(&node, element)?;
                node
            }
            Some(node) => replace(existing, &node, element, parent)?,
            None => create(existing, key, element, parent, IndexMap::new())?,
        };
        apply(&node.tree.children, &element.children, Some(&node))?;
    }

    existing.reorder(target);
    Ok(())
}

fn update(node: &ResourceNode, element: &Element) -> Result<(), TreeError> {
    if node.has_props(&element.props) {
        return Ok(());
    }
    tracing::trace!(key = %node.key(), behavior = node.behavior().name(), "updating resource");
    node.set_props(Rc::clone(&element.props));
    node.run_update(Rc::clone(&element.props))
}

fn replace(
    existing: &ResourceSet,
    old: &Rc<ResourceNode>,
    element: &Element,
    parent: Option<&Rc<ResourceNode>>,
) -> Result<Rc<ResourceNode>, TreeError> {
    tracing::debug!(
        key = %old.key(),
        from = old.behavior().name(),
        to = element.behavior.name(),
        "replacing resource"
    );
    for context in old.tree.provided_contexts() {
        unset_provided(old, context);
    }
    old.destroy_own()?;

    let children = old.tree.children.take_all();
    create(existing, old.key(), element, parent, children)
}

fn create(
    existing: &ResourceSet,
    key: &Key,
    element: &Element,
    parent: Option<&Rc<ResourceNode>>,
    children: ResourceMap,
) -> Result<Rc<ResourceNode>, TreeError> {
    tracing::debug!(key = %key, behavior = element.behavior.name(), "creating resource");
    let node = ResourceNode::new(
        key.clone(),
        element.behavior.clone(),
        Rc::clone(&element.props),
        parent,
        children,
    );
    // Registered before construction so the behavior can reach its
    // ancestors and provide context to adopted children.
    existing.insert(key.clone(), Rc::clone(&node));

    let operations = match element
        .behavior
        .construct(Rc::clone(&element.props), &TreeOperations::new(&node))
    {
        Ok(operations) => operations,
        Err(error) => {
            discard(existing, &node);
            return Err(error);
        }
    };
    node.set_operations(operations);
    Ok(node)
}

/// Removes a node whose construction failed, tearing down anything it had
/// already acquired: adopted children and subtree members.
fn discard(existing: &ResourceSet, node: &ResourceNode) {
    existing.remove(node.key());
    if let Err(error) = node.destroy() {
        tracing::warn!(key = %node.key(), %error, "teardown after failed construction failed");
    }
}
