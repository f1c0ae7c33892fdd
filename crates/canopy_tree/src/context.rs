//! Identity-keyed context channels.
//!
//! A [`Context`] is a lookup key carrying a default value. Two contexts are the
//! same channel only if one was cloned from the other; equal defaults do not
//! make contexts equal.

use core::any::Any;
use core::fmt;
use std::rc::Rc;

/// Identity of a context channel: the address of the channel's shared
/// default value.
///
/// Used to key the `providing` and `subscriptions` maps of a resource. Every
/// map entry holds a clone of the default, so an id cannot be reused by a
/// new channel while any resource still refers to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

impl ContextId {
    fn of<T>(default: &Rc<T>) -> Self {
        Self(Rc::as_ptr(default).addr())
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context@{:#x}", self.0)
    }
}

/// A channel for passing a value of type `T` down the resource tree outside
/// the props path.
///
/// Cloning a `Context` yields a handle to the same channel.
///
/// # Example
///
/// ```
/// use canopy_tree::context::Context;
///
/// let theme = Context::new("light".to_string());
/// let same = theme.clone();
/// let other = Context::new("light".to_string());
///
/// assert_eq!(theme.id(), same.id());
/// assert_ne!(theme.id(), other.id());
/// ```
pub struct Context<T> {
    name: &'static str,
    default: Rc<T>,
}

impl<T: 'static> Context<T> {
    /// Creates a new context channel with the given default value.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self {
            name: core::any::type_name::<T>(),
            default: Rc::new(default),
        }
    }

    /// Creates a new context channel with a diagnostic name.
    #[must_use]
    pub fn named(name: &'static str, default: T) -> Self {
        Self {
            name,
            ..Self::new(default)
        }
    }

    /// Returns the identity of this channel.
    #[must_use]
    pub fn id(&self) -> ContextId {
        ContextId::of(&self.default)
    }

    /// Returns the diagnostic name of this channel.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the default value seen by resources with no providing ancestor.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub(crate) fn erased_default(&self) -> Rc<dyn Any> {
        self.default.clone()
    }
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            default: Rc::clone(&self.default),
        }
    }
}

impl<T> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &ContextId::of(&self.default))
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A value a resource is providing for one context, type-erased.
///
/// The context's default travels with the value so that an unset can recompute
/// the fallback without knowing `T`.
#[derive(Clone)]
pub(crate) struct ProvidedValue {
    pub(crate) value: Rc<dyn Any>,
    pub(crate) default: Rc<dyn Any>,
    pub(crate) name: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_defaults_are_distinct_channels() {
        let a = Context::new(1_u32);
        let b = Context::new(1_u32);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.default_value(), b.default_value());
    }

    #[test]
    fn clones_share_identity() {
        let a = Context::named("locale", "en");
        let b = a.clone();

        assert_eq!(a.id(), b.id());
        assert_eq!(b.name(), "locale");
    }

    #[test]
    fn zero_sized_defaults_are_distinct_channels() {
        let a = Context::new(());
        let b = Context::new(());

        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn erased_default_downcasts_to_value_type() {
        let ctx = Context::new(String::from("fallback"));
        let erased = ctx.erased_default();

        assert_eq!(
            erased.downcast_ref::<String>().map(String::as_str),
            Some("fallback")
        );
    }
}
