//! Stateful components for Canopy (Layer 2).
//!
//! `canopy_hooks` builds a behavior around a render function and gives that
//! function stable per-slot storage:
//!
//! - [`component`] - Component behaviors and their private subtrees
//! - [`hooks`] - `use_state`, `use_effect`, `use_memo`, `use_context`
//! - [`scheduler`] - The coalescing re-render queue
//! - [`error`] - Slot-order violations and scheduler limits
//!
//! # Re-render model
//!
//! State setters and context pushes never render synchronously. The first
//! change marks the component pending and queues one task on its
//! [`Scheduler`]; later changes before that task runs are absorbed into it.
//! The host decides when a tick happens by calling
//! [`Scheduler::run_until_idle`] (or [`Scheduler::tick`]).
//!
//! ```text
//! set(1) ─┐
//! set(2) ─┼─> pending = true, one task queued ──tick──> render(state = 2)
//! set(3) ─┘
//! ```

/// Component behaviors.
pub mod component;

/// Hook errors.
pub mod error;

/// Hook calls available to render functions.
pub mod hooks;

/// Re-render scheduler.
pub mod scheduler;

mod slot;

pub use component::{component, named_component};
pub use error::{HookError, HookKind};
pub use hooks::{Hooks, StateSetter};
pub use scheduler::{Scheduler, SchedulerConfig};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::component::*;
    pub use crate::error::*;
    pub use crate::hooks::*;
    pub use crate::scheduler::*;
}
