//! Error types for the hooks runtime.

use core::fmt;

use canopy_tree::TreeError;

/// The kind of hook occupying a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// `use_state` / `use_state_with`.
    State,
    /// `use_effect`.
    Effect,
    /// `use_memo`.
    Memo,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "use_state",
            Self::Effect => "use_effect",
            Self::Memo => "use_memo",
        })
    }
}

/// Violations of the hook call-order rule, and scheduler limits.
///
/// Converts into [`TreeError::Behavior`], so render functions can use `?` on
/// hook calls and the error reaches the `apply` or scheduler caller intact.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// A different hook kind was called at this slot than on the first render.
    #[error("hook slot {slot} was created by {found} but {expected} was called; hooks must run in the same order on every render")]
    SlotKindMismatch {
        /// Index of the violated slot.
        slot: usize,
        /// The hook called on this render.
        expected: HookKind,
        /// The hook that created the slot.
        found: HookKind,
    },

    /// The same hook kind was called at this slot with a different value type.
    #[error("hook slot {slot} does not hold a value of type {expected}")]
    SlotTypeMismatch {
        /// Index of the violated slot.
        slot: usize,
        /// The value type requested on this render.
        expected: &'static str,
    },

    /// A render called a different number of hooks than the first render.
    #[error("render called {found} hooks but the first render called {expected}")]
    HookCountChanged {
        /// Hooks called by the first render.
        expected: usize,
        /// Hooks called by this render (at the point of detection).
        found: usize,
    },

    /// The scheduler ran its task limit in one drain without going idle.
    #[error("scheduler ran {limit} tasks without going idle; a component is re-rendering itself unconditionally")]
    RenderLoop {
        /// The configured `max_tasks_per_drain`.
        limit: usize,
    },
}

impl From<HookError> for TreeError {
    fn from(error: HookError) -> Self {
        TreeError::behavior(error)
    }
}
