//! Behaviors: the unit of extensibility.
//!
//! A [`Behavior`] describes how a resource is constructed, updated and torn
//! down. It is a single function `(on_update, operations) -> cleanup` that:
//!
//! - registers at most one update callback through [`OnUpdate::register`],
//! - may read and write context through the [`TreeOperations`] it receives,
//! - returns an optional top-level [`Cleanup`] run when the resource is destroyed.
//!
//! Behaviors are compared by identity: two behaviors built from identical
//! closures are still different behaviors. Clone a `Behavior` to share it.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use canopy_tree::behavior::{Behavior, Cleanup};
//!
//! struct Label {
//!     text: String,
//! }
//!
//! let label = Behavior::<Label>::named("Label", |on_update, _ops| {
//!     on_update.register(|props: &Rc<Label>, previous: Option<&Rc<Label>>| {
//!         if previous.is_none_or(|p| p.text != props.text) {
//!             // push props.text into the host object
//!         }
//!     })?;
//!     Ok::<_, canopy_tree::TreeError>(Cleanup::new(|| {
//!         // release the host object
//!     }))
//! });
//!
//! let element = label.element(Label { text: "hello".into() });
//! assert_eq!(element.behavior_name(), "Label");
//! ```

use core::any::Any;
use core::fmt;
use core::marker::PhantomData;
use std::cell::RefCell;
use std::rc::Rc;

use crate::element::{Element, Elements};
use crate::error::TreeError;
use crate::operations::TreeOperations;

/// Type-erased props as stored on elements and resources.
pub(crate) type Props = Rc<dyn Any>;

type UpdateFn = Box<dyn FnMut(Props) -> Result<(), TreeError>>;
type DestroyFn = Box<dyn FnOnce() -> Result<(), TreeError>>;
type UpdateCallback<P> = Box<dyn FnMut(&Rc<P>, Option<&Rc<P>>) -> Result<Option<Cleanup>, TreeError>>;
type ConstructResult = Result<ResourceOperations, TreeError>;
type ConstructFn = dyn Fn(Props, &TreeOperations) -> ConstructResult;

// ─────────────────────────────────────────────────────────────────────────────
// Cleanup
// ─────────────────────────────────────────────────────────────────────────────

/// A teardown action returned by a behavior or by an update callback.
pub struct Cleanup(DestroyFn);

impl Cleanup {
    /// Creates an infallible cleanup.
    #[must_use]
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self(Box::new(move || {
            cleanup();
            Ok(())
        }))
    }

    /// Creates a cleanup that may fail; the error surfaces from the `apply`
    /// call that triggered it.
    #[must_use]
    pub fn try_new(cleanup: impl FnOnce() -> Result<(), TreeError> + 'static) -> Self {
        Self(Box::new(cleanup))
    }

    /// Runs the cleanup.
    ///
    /// # Errors
    ///
    /// Returns whatever error the cleanup raised.
    pub fn run(self) -> Result<(), TreeError> {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup(..)")
    }
}

/// Conversion from the values a behavior or callback may return into an
/// optional [`Cleanup`].
///
/// Implemented for `()`, [`Cleanup`], `Option<Cleanup>` and any
/// `Result<T, E>` where `T: IntoCleanup` and `E: Into<TreeError>`.
pub trait IntoCleanup {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Propagates the error of a `Result` return value.
    fn into_cleanup(self) -> Result<Option<Cleanup>, TreeError>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Result<Option<Cleanup>, TreeError> {
        Ok(None)
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Result<Option<Cleanup>, TreeError> {
        Ok(Some(self))
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Result<Option<Cleanup>, TreeError> {
        Ok(self)
    }
}

impl<T: IntoCleanup, E: Into<TreeError>> IntoCleanup for Result<T, E> {
    fn into_cleanup(self) -> Result<Option<Cleanup>, TreeError> {
        match self {
            Ok(value) => value.into_cleanup(),
            Err(error) => Err(error.into()),
        }
    }
}

fn run_cleanup(cleanup: Option<Cleanup>) -> Result<(), TreeError> {
    cleanup.map_or(Ok(()), Cleanup::run)
}

// ─────────────────────────────────────────────────────────────────────────────
// OnUpdate
// ─────────────────────────────────────────────────────────────────────────────

/// Registration point for a behavior's update callback.
///
/// The callback receives `(new_props, old_props)`. It is invoked once at
/// construction with `old_props == None`, then on every reconciler update
/// whose props are not reference-equal to the last applied props. A cleanup
/// returned by one invocation runs right before the next invocation, and once
/// more when the resource is destroyed.
pub struct OnUpdate<P> {
    callback: Option<UpdateCallback<P>>,
    violated: bool,
}

impl<P: 'static> OnUpdate<P> {
    fn new() -> Self {
        Self {
            callback: None,
            violated: false,
        }
    }

    /// Registers the update callback.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::UpdateAlreadyRegistered`] if a callback was
    /// already registered. Construction fails with the same error even if the
    /// behavior discards it.
    pub fn register<F, R>(&mut self, mut callback: F) -> Result<(), TreeError>
    where
        F: FnMut(&Rc<P>, Option<&Rc<P>>) -> R + 'static,
        R: IntoCleanup,
    {
        if self.callback.is_some() {
            self.violated = true;
            return Err(TreeError::UpdateAlreadyRegistered);
        }
        self.callback = Some(Box::new(
            move |props: &Rc<P>, previous: Option<&Rc<P>>| callback(props, previous).into_cleanup(),
        ));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceOperations
// ─────────────────────────────────────────────────────────────────────────────

/// The operations object produced by constructing a behavior.
///
/// `update` is present only if the behavior registered an update callback.
/// `destroy` is taken exactly once by the reconciler.
#[derive(Default)]
pub(crate) struct ResourceOperations {
    pub(crate) update: Option<UpdateFn>,
    pub(crate) destroy: Option<DestroyFn>,
}

/// Per-resource state shared by the update and destroy operations.
struct UpdateState<P> {
    callback: Option<UpdateCallback<P>>,
    cleanup: Option<Cleanup>,
    props: Rc<P>,
}

/// Constructs a behavior against its initial props, returning the
/// `update`/`destroy` operations the reconciler drives afterwards.
fn construct_resource_operations<P, S, R>(
    setup: &S,
    name: &'static str,
    props: Rc<P>,
    operations: &TreeOperations,
) -> Result<ResourceOperations, TreeError>
where
    P: 'static,
    S: Fn(&mut OnUpdate<P>, &TreeOperations) -> R,
    R: IntoCleanup,
{
    let mut on_update = OnUpdate::new();
    let top_cleanup = setup(&mut on_update, operations).into_cleanup()?;
    if on_update.violated {
        return Err(abandon(name, top_cleanup, TreeError::UpdateAlreadyRegistered));
    }

    let Some(mut callback) = on_update.callback else {
        return Ok(ResourceOperations {
            update: None,
            destroy: Some(Box::new(move || run_cleanup(top_cleanup))),
        });
    };

    let first_cleanup = match callback(&props, None) {
        Ok(cleanup) => cleanup,
        Err(error) => return Err(abandon(name, top_cleanup, error)),
    };
    let state = Rc::new(RefCell::new(UpdateState {
        callback: Some(callback),
        cleanup: first_cleanup,
        props,
    }));

    let updater = Rc::clone(&state);
    let update: UpdateFn = Box::new(move |next: Props| {
        let next = next
            .downcast::<P>()
            .map_err(|_| TreeError::behavior(PropsMismatch(name)))?;
        invoke_update(&updater, next)
    });

    let destroy: DestroyFn = Box::new(move || {
        let last = state.borrow_mut().cleanup.take();
        let own = run_cleanup(last);
        own.and(run_cleanup(top_cleanup))
    });

    Ok(ResourceOperations {
        update: Some(update),
        destroy: Some(destroy),
    })
}

/// Runs the top-level cleanup of a behavior whose construction failed after
/// `setup` returned, and hands back the construction error.
fn abandon(name: &'static str, top_cleanup: Option<Cleanup>, error: TreeError) -> TreeError {
    if let Err(cleanup_error) = run_cleanup(top_cleanup) {
        tracing::warn!(behavior = name, error = %cleanup_error, "cleanup of failed construction failed");
    }
    error
}

fn invoke_update<P>(state: &RefCell<UpdateState<P>>, next: Rc<P>) -> Result<(), TreeError> {
    let (callback, cleanup, previous) = {
        let mut state = state.borrow_mut();
        (
            state.callback.take(),
            state.cleanup.take(),
            Rc::clone(&state.props),
        )
    };
    // Absent while the callback is running; a nested update is a caller error.
    let Some(mut callback) = callback else {
        tracing::warn!("update re-entered while its callback was running; skipped");
        return Ok(());
    };

    let result = run_cleanup(cleanup).and_then(|()| callback(&next, Some(&previous)));

    let mut state = state.borrow_mut();
    state.callback = Some(callback);
    state.props = next;
    state.cleanup = result?;
    Ok(())
}

/// Props handed to a behavior were not of the behavior's props type.
#[derive(Debug, thiserror::Error)]
#[error("props do not match the props type of behavior '{0}'")]
struct PropsMismatch(&'static str);

// ─────────────────────────────────────────────────────────────────────────────
// Behavior
// ─────────────────────────────────────────────────────────────────────────────

/// Identity-comparable, type-erased behavior.
#[derive(Clone)]
pub(crate) struct ErasedBehavior {
    construct: Rc<ConstructFn>,
    name: &'static str,
}

impl ErasedBehavior {
    /// Returns `true` if both handles refer to the same behavior.
    pub(crate) fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.construct, &other.construct)
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn construct(
        &self,
        props: Props,
        operations: &TreeOperations,
    ) -> Result<ResourceOperations, TreeError> {
        (self.construct)(props, operations)
    }
}

/// A behavior over props of type `P`, and the factory for its elements.
pub struct Behavior<P> {
    erased: ErasedBehavior,
    _props: PhantomData<fn(P)>,
}

impl<P: 'static> Behavior<P> {
    /// Creates a behavior named after its props type.
    #[must_use]
    pub fn new<S, R>(setup: S) -> Self
    where
        S: Fn(&mut OnUpdate<P>, &TreeOperations) -> R + 'static,
        R: IntoCleanup,
    {
        Self::named(core::any::type_name::<P>(), setup)
    }

    /// Creates a behavior with a diagnostic name.
    #[must_use]
    pub fn named<S, R>(name: &'static str, setup: S) -> Self
    where
        S: Fn(&mut OnUpdate<P>, &TreeOperations) -> R + 'static,
        R: IntoCleanup,
    {
        let construct = move |props: Props, operations: &TreeOperations| -> ConstructResult {
            let props = props
                .downcast::<P>()
                .map_err(|_| TreeError::behavior(PropsMismatch(name)))?;
            construct_resource_operations(&setup, name, props, operations)
        };
        Self {
            erased: ErasedBehavior {
                construct: Rc::new(construct),
                name,
            },
            _props: PhantomData,
        }
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.erased.name
    }

    /// Builds an element with no children.
    ///
    /// Passing an `Rc<P>` that was already applied makes the next `apply` a
    /// no-op for that resource (props are compared by reference).
    #[must_use]
    pub fn element(&self, props: impl Into<Rc<P>>) -> Element {
        self.element_with(props, Elements::new())
    }

    /// Builds an element with children.
    #[must_use]
    pub fn element_with(&self, props: impl Into<Rc<P>>, children: impl Into<Elements>) -> Element {
        let props: Rc<P> = props.into();
        Element::new(self.erased.clone(), props, children.into())
    }
}

impl<P> Clone for Behavior<P> {
    fn clone(&self) -> Self {
        Self {
            erased: self.erased.clone(),
            _props: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Behavior<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Behavior").field(&self.erased.name).finish()
    }
}
