//! The externally callable entry point.

use crate::element::{Elements, Key};
use crate::error::TreeError;
use crate::reconciler;
use crate::resource::ResourceSet;

/// Owns one resource forest and reconciles it on [`apply`](Handle::apply).
///
/// # Example
///
/// ```
/// use canopy_tree::behavior::Behavior;
/// use canopy_tree::element::Elements;
/// use canopy_tree::handle::Handle;
///
/// let text = Behavior::<String>::new(|_, _| ());
/// let handle = Handle::new();
///
/// handle.apply([text.element("a".to_string()), text.element("b".to_string())])?;
/// assert_eq!(handle.len(), 2);
///
/// // An empty collection tears the whole tree down.
/// handle.apply(Elements::new())?;
/// assert!(handle.is_empty());
/// # Ok::<(), canopy_tree::TreeError>(())
/// ```
#[derive(Default)]
pub struct Handle {
    root: ResourceSet,
}

impl Handle {
    /// Creates a handle with an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Converges the forest to `elements`.
    ///
    /// Applying identical input (the same props `Rc`s) is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a behavior during the pass, or
    /// [`TreeError::ReentrantApply`] if called from inside another `apply` on
    /// this handle.
    pub fn apply(&self, elements: impl Into<Elements>) -> Result<(), TreeError> {
        let elements = elements.into();
        tracing::trace!(roots = elements.len(), "apply");
        reconciler::apply(&self.root, &elements, None)
    }

    /// Returns the number of root resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Returns `true` if no root resources are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns the keys of the root resources, in the order last applied.
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.root.keys()
    }
}

impl core::fmt::Debug for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handle")
            .field("roots", &self.root.keys())
            .finish()
    }
}
