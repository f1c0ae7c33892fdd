//! Elements: immutable descriptions of desired state.
//!
//! An [`Element`] pairs a behavior with props and a keyed collection of child
//! elements. Keys decide identity across renders: the reconciler matches a
//! target element to the existing resource stored under the same [`Key`].

use core::any::Any;
use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::behavior::{ErasedBehavior, Props};

/// Identity of a child within its parent collection.
///
/// Positional children get `Index` keys in insertion order. Children that
/// should keep their identity when siblings move (list items, say) are given
/// a `Named` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Position among the positional children of a collection.
    Index(usize),
    /// Explicit, caller-chosen identifier.
    Named(Rc<str>),
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Self::Named(Rc::from(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Named(Rc::from(name))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "#{index}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// An immutable description `{ behavior, props, children }`.
///
/// Built with [`Behavior::element`](crate::behavior::Behavior::element) or
/// [`Behavior::element_with`](crate::behavior::Behavior::element_with).
#[derive(Clone)]
pub struct Element {
    pub(crate) behavior: ErasedBehavior,
    pub(crate) props: Props,
    pub(crate) children: Elements,
}

impl Element {
    pub(crate) fn new(behavior: ErasedBehavior, props: Props, children: Elements) -> Self {
        Self {
            behavior,
            props,
            children,
        }
    }

    /// Returns the diagnostic name of the element's behavior.
    #[must_use]
    pub fn behavior_name(&self) -> &'static str {
        self.behavior.name()
    }

    /// Returns the props if they are of type `P`.
    #[must_use]
    pub fn props<P: Any>(&self) -> Option<&P> {
        self.props.downcast_ref::<P>()
    }

    /// Returns the child elements.
    #[must_use]
    pub fn children(&self) -> &Elements {
        &self.children
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("behavior", &self.behavior.name())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// An insertion-ordered, keyed collection of elements.
///
/// # Example
///
/// ```
/// use canopy_tree::behavior::Behavior;
/// use canopy_tree::element::{Elements, Key};
///
/// let row = Behavior::<String>::new(|_, _| ());
///
/// let rows = Elements::new()
///     .with(row.element("header".to_string()))
///     .keyed("user-42", row.element("Ada".to_string()))
///     .keyed("user-7", row.element("Grace".to_string()));
///
/// assert_eq!(rows.len(), 3);
/// assert!(rows.get(&Key::Index(0)).is_some());
/// assert!(rows.get(&Key::from("user-7")).is_some());
/// ```
#[derive(Clone, Default)]
pub struct Elements {
    entries: IndexMap<Key, Element>,
    next_index: usize,
}

impl Elements {
    /// Creates an empty collection. Applying it tears down every resource in
    /// the target collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional element and returns its key.
    ///
    /// Indices already taken by an explicit `Key::Index` are skipped, so a
    /// push never replaces an inserted element.
    pub fn push(&mut self, element: Element) -> Key {
        while self.entries.contains_key(&Key::Index(self.next_index)) {
            self.next_index += 1;
        }
        let key = Key::Index(self.next_index);
        self.next_index += 1;
        self.entries.insert(key.clone(), element);
        key
    }

    /// Inserts an element under an explicit key, replacing any element
    /// already stored under it.
    pub fn insert(&mut self, key: impl Into<Key>, element: Element) -> Option<Element> {
        self.entries.insert(key.into(), element)
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, element: Element) -> Self {
        self.push(element);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn keyed(mut self, key: impl Into<Key>, element: Element) -> Self {
        self.insert(key, element);
        self
    }

    /// Returns the element stored under `key`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&Element> {
        self.entries.get(key)
    }

    /// Returns `true` if an element is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterates over keys and elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Element)> {
        self.entries.iter()
    }

    /// Iterates over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Elements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl From<Element> for Elements {
    fn from(element: Element) -> Self {
        Self::new().with(element)
    }
}

impl From<Vec<Element>> for Elements {
    fn from(elements: Vec<Element>) -> Self {
        elements.into_iter().collect()
    }
}

impl<const N: usize> From<[Element; N]> for Elements {
    fn from(elements: [Element; N]) -> Self {
        elements.into_iter().collect()
    }
}

impl FromIterator<Element> for Elements {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        let mut elements = Self::new();
        for element in iter {
            elements.push(element);
        }
        elements
    }
}

impl FromIterator<(Key, Element)> for Elements {
    fn from_iter<I: IntoIterator<Item = (Key, Element)>>(iter: I) -> Self {
        let mut elements = Self::new();
        for (key, element) in iter {
            elements.insert(key, element);
        }
        elements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;

    #[test]
    fn positional_keys_count_only_positional_children() {
        let leaf = Behavior::<u8>::new(|_, _| ());
        let mut elements = Elements::new();

        assert_eq!(elements.push(leaf.element(1_u8)), Key::Index(0));
        elements.insert("named", leaf.element(2_u8));
        assert_eq!(elements.push(leaf.element(3_u8)), Key::Index(1));

        let keys: Vec<_> = elements.keys().cloned().collect();
        assert_eq!(keys, vec![Key::Index(0), Key::from("named"), Key::Index(1)]);
    }

    #[test]
    fn push_skips_indices_taken_by_explicit_keys() {
        let leaf = Behavior::<u8>::new(|_, _| ());
        let mut elements = Elements::new();

        elements.insert(0_usize, leaf.element(1_u8));
        let pushed = elements.push(leaf.element(2_u8));

        assert_eq!(pushed, Key::Index(1));
        assert_eq!(elements.len(), 2);
        assert_eq!(elements.get(&Key::Index(0)).and_then(Element::props::<u8>), Some(&1));
    }

    #[test]
    fn empty_vec_converts_to_empty_collection() {
        let elements = Elements::from(Vec::<Element>::new());

        assert!(elements.is_empty());
    }

    #[test]
    fn element_exposes_typed_props_and_children() {
        let leaf = Behavior::<&'static str>::named("Leaf", |_, _| ());
        let element = leaf.element_with("root", [leaf.element("child")]);

        assert_eq!(element.props::<&'static str>(), Some(&"root"));
        assert_eq!(element.props::<u32>(), None);
        assert_eq!(element.children().len(), 1);
        assert_eq!(element.behavior_name(), "Leaf");
    }

    #[test]
    fn key_display() {
        assert_eq!(Key::Index(3).to_string(), "#3");
        assert_eq!(Key::from("row").to_string(), "row");
    }
}
