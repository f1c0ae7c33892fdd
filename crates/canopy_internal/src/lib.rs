//! # Canopy Internal Library
//!
//! Re-exports the core Canopy crates for convenience.

/// Layer 1: Keyed reconciliation and context propagation.
pub use canopy_tree;

/// Layer 2: Hooked components and the re-render scheduler.
pub use canopy_hooks;

/// Layer 3: Tracing subscriber setup.
pub use canopy_diagnostics;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use canopy_hooks::prelude::*;
    pub use canopy_tree::prelude::*;
}
