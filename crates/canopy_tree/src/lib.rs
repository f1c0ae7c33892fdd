//! Keyed resource trees and the reconciler for Canopy (Layer 1).
//!
//! `canopy_tree` turns immutable element trees into live resource trees and
//! keeps them converged:
//!
//! - [`behavior`] - How a resource is constructed, updated and torn down
//! - [`element`] - Elements, keys and keyed element collections
//! - [`context`] - Identity-keyed context channels
//! - [`operations`] - Context access and subtrees, as seen from one resource
//! - [`handle`] - The root entry point, [`Handle::apply`]
//!
//! # Architecture
//!
//! This crate is Layer 1 of the Canopy architecture:
//!
//! - **Layer 1** (`canopy_tree`): reconciler and context propagation (this crate)
//! - **Layer 2** (`canopy_hooks`): components with state, effects and batched re-render
//! - **Layer 3** (`canopy_diagnostics`): tracing subscriber setup
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use canopy_tree::prelude::*;
//!
//! let theme = Context::new("light");
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let provider = Behavior::<&'static str>::named("Provider", {
//!     let theme = theme.clone();
//!     move |on_update, ops| {
//!         let ops = ops.clone();
//!         let theme = theme.clone();
//!         on_update.register(move |value: &Rc<&'static str>, _: Option<&Rc<&'static str>>| {
//!             ops.set_context(&theme, **value);
//!         })
//!     }
//! });
//!
//! let reader = Behavior::<()>::named("Reader", {
//!     let theme = theme.clone();
//!     let seen = Rc::clone(&seen);
//!     move |_, ops| {
//!         let seen = Rc::clone(&seen);
//!         let _subscription = ops.subscribe_context(&theme, move |value| {
//!             seen.borrow_mut().push(value);
//!         })?;
//!         Ok::<_, TreeError>(())
//!     }
//! });
//!
//! let handle = Handle::new();
//! handle.apply(provider.element_with("dark", [reader.element(())]))?;
//! handle.apply(provider.element_with("dim", [reader.element(())]))?;
//!
//! assert_eq!(*seen.borrow(), vec!["dark", "dim"]);
//! # Ok::<(), TreeError>(())
//! ```

/// Behavior contract and resource operations.
pub mod behavior;

/// Identity-keyed context channels.
pub mod context;

/// Elements and keyed element collections.
pub mod element;

/// Tree errors.
pub mod error;

/// Root handle.
pub mod handle;

/// Per-resource context access and subtrees.
pub mod operations;

mod reconciler;
mod resource;

pub use behavior::{Behavior, Cleanup, IntoCleanup, OnUpdate};
pub use context::{Context, ContextId};
pub use element::{Element, Elements, Key};
pub use error::{BoxError, TreeError};
pub use handle::Handle;
pub use operations::{Subscription, Subtree, TreeOperations};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::behavior::*;
    pub use crate::context::*;
    pub use crate::element::*;
    pub use crate::error::*;
    pub use crate::handle::*;
    pub use crate::operations::*;
}
