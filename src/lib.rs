//! A keyed reconciliation engine with context propagation and hooked
//! components.
//!
//! ```
//! use canopy::prelude::*;
//!
//! let scheduler = Scheduler::new();
//! let greeting = Context::named("greeting", "hello".to_string());
//!
//! let reader = {
//!     let greeting = greeting.clone();
//!     component(&scheduler, move |hooks: &mut Hooks<'_>, _: &()| {
//!         let _text = hooks.use_context(&greeting)?;
//!         Ok(Elements::new())
//!     })
//! };
//!
//! let handle = Handle::new();
//! handle.apply(reader.element(()))?;
//! scheduler.run_until_idle()?;
//! handle.apply(Elements::new())?;
//! # Ok::<(), TreeError>(())
//! ```

pub use canopy_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use canopy_internal::prelude::*;
}
