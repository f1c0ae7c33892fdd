//! Error types for reconciliation and context operations.

/// Boxed error raised by user code (behaviors, effects, render functions).
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`Handle::apply`](crate::handle::Handle::apply) and the
/// operations a behavior performs while it is being reconciled.
///
/// Protocol violations (`UpdateAlreadyRegistered`, `AlreadySubscribed`,
/// `ReentrantApply`) are programmer errors reported at the violation site.
/// Anything raised by user code is wrapped in [`TreeError::Behavior`] without
/// modification and can be recovered with [`TreeError::behavior_error`].
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A behavior registered its update callback more than once.
    #[error("behavior registered an update callback more than once")]
    UpdateAlreadyRegistered,

    /// A resource subscribed to a context it is already subscribed to.
    #[error("resource is already subscribed to context '{context}'")]
    AlreadySubscribed {
        /// Diagnostic name of the context.
        context: &'static str,
    },

    /// `apply` was entered on a collection that is already being reconciled.
    #[error("apply re-entered on a collection that is already being reconciled")]
    ReentrantApply,

    /// An error raised by a behavior constructor, updater, destructor, or by
    /// a layer built on top of behaviors.
    #[error("{0}")]
    Behavior(#[source] BoxError),
}

impl TreeError {
    /// Wraps an arbitrary user error.
    pub fn behavior(error: impl Into<BoxError>) -> Self {
        Self::Behavior(error.into())
    }

    /// Returns the wrapped user error if it is of type `E`.
    #[must_use]
    pub fn behavior_error<E: core::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Behavior(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("widget exploded")]
    struct WidgetError;

    #[test]
    fn behavior_error_round_trips_through_downcast() {
        let err = TreeError::behavior(WidgetError);

        assert!(err.behavior_error::<WidgetError>().is_some());
        assert_eq!(err.to_string(), "widget exploded");
    }

    #[test]
    fn protocol_errors_have_no_behavior_payload() {
        let err = TreeError::AlreadySubscribed { context: "theme" };

        assert!(err.behavior_error::<WidgetError>().is_none());
        assert_eq!(
            err.to_string(),
            "resource is already subscribed to context 'theme'"
        );
    }
}
