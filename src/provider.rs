//! Service identities and provider traits
//!
//! These types define what a service is keyed by and how a concrete value
//! is exposed as the service a caller asks for.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A type tag: `TypeId` plus the type name for diagnostics.
///
/// Equality and hashing only look at the `TypeId`.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Tag for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identifies a requested capability.
///
/// The two variants are disjoint namespaces: a registration for the
/// concrete type `Logger` never collides with one for the interface
/// `dyn Loggable`, nor with an interface keyed by `Logger` itself.
///
/// # Examples
///
/// ```rust
/// use minjection::ServiceId;
///
/// struct Logger;
///
/// assert_eq!(ServiceId::of_type::<Logger>(), ServiceId::of_type::<Logger>());
/// assert_ne!(ServiceId::of_type::<Logger>(), ServiceId::Interface(minjection::TypeKey::of::<Logger>()));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    /// A concrete type, resolved to `Arc<T>`.
    Type(TypeKey),
    /// An interface tag, resolved to `Arc<I::Service>`.
    Interface(TypeKey),
}

impl ServiceId {
    /// Service keyed by the concrete type `T`.
    #[inline]
    pub fn of_type<T: Send + Sync + 'static>() -> Self {
        ServiceId::Type(TypeKey::of::<T>())
    }

    /// Service keyed by the interface tag `I`.
    #[inline]
    pub fn of_interface<I: Interface + ?Sized>() -> Self {
        ServiceId::Interface(TypeKey::of::<I>())
    }

    /// The tag regardless of namespace.
    #[inline]
    pub fn key(&self) -> TypeKey {
        match self {
            ServiceId::Type(key) | ServiceId::Interface(key) => *key,
        }
    }

    /// Name of the tagged type.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.key().name()
    }

    /// True for the interface namespace.
    #[inline]
    pub fn is_interface(&self) -> bool {
        matches!(self, ServiceId::Interface(_))
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Type(key) => write!(f, "Type({})", key.name()),
            ServiceId::Interface(key) => write!(f, "Interface({})", key.name()),
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceId::Type(key) => write!(f, "type {}", key.name()),
            ServiceId::Interface(key) => write!(f, "interface {}", key.name()),
        }
    }
}

/// An interface tag.
///
/// A tag is either a trait object (`dyn Greeter`, resolving to itself) or a
/// marker type naming a capability of some value type, e.g. a `Title` tag
/// that resolves to a `String`. Use [`interface!`](crate::interface) to
/// implement it.
pub trait Interface: 'static {
    /// What resolving this interface hands back (as `Arc<Self::Service>`).
    type Service: ?Sized + Send + Sync + 'static;
}

/// Exposes a concrete value as the service view `S`.
///
/// Every `T` provides itself. Implement it (or use
/// [`provides!`](crate::provides)) to let a concrete type stand in for a
/// trait object.
///
/// # Examples
///
/// ```rust
/// use minjection::{Provides, provides};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// provides!(English => dyn Greeter);
///
/// let greeter: Arc<dyn Greeter> = Arc::new(English).provide();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub trait Provides<S: ?Sized>: Send + Sync + 'static {
    /// Upcast to the service view.
    fn provide(self: Arc<Self>) -> Arc<S>;
}

impl<T: Send + Sync + 'static> Provides<T> for T {
    #[inline]
    fn provide(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// How long a created instance is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// A new instance on every request.
    #[default]
    Instance,

    /// One instance per top-level resolve call tree.
    Cycle,

    /// One instance for the whole life of the container.
    ///
    /// First construction of every Static service in a container runs under
    /// one reentrant, container-wide lock, held until the instance and every
    /// Static it pulls in are fully injected. Other threads never observe a
    /// partly injected Static, and mutually dependent Statics cannot deadlock
    /// across threads. The price: unrelated Statics are built one at a time,
    /// and a constructor, factory or hook of a Static must not block on
    /// another thread that resolves a not-yet-built Static of the same
    /// container. Resolving on the same thread is fine.
    Static,
}

impl Lifetime {
    /// Short name used in log fields.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Instance => "instance",
            Lifetime::Cycle => "cycle",
            Lifetime::Static => "static",
        }
    }
}

/// Implement [`Interface`] for a tag.
///
/// `interface!(dyn Greeter)` makes a trait object resolve to itself;
/// `interface!(Title => String)` makes a marker tag resolve to a `String`.
#[macro_export]
macro_rules! interface {
    ($tag:ty => $service:ty) => {
        impl $crate::Interface for $tag {
            type Service = $service;
        }
    };
    ($tag:ty) => {
        impl $crate::Interface for $tag {
            type Service = $tag;
        }
    };
}

/// Implement [`Provides`] from a concrete type to a trait object.
#[macro_export]
macro_rules! provides {
    ($concrete:ty => $($service:ty),+ $(,)?) => {
        $(
            impl $crate::Provides<$service> for $concrete {
                #[inline]
                fn provide(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
                    self
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Loggable: Send + Sync {}
    struct Logger;
    impl Loggable for Logger {}

    crate::interface!(dyn Loggable);
    crate::provides!(Logger => dyn Loggable);

    #[test]
    fn test_type_and_interface_namespaces_are_disjoint() {
        let by_type = ServiceId::of_type::<Logger>();
        let by_interface = ServiceId::of_interface::<dyn Loggable>();
        let same_tag_as_interface = ServiceId::Interface(TypeKey::of::<Logger>());

        assert_ne!(by_type, by_interface);
        assert_ne!(by_type, same_tag_as_interface);

        let set: HashSet<_> = [by_type, by_interface, same_tag_as_interface].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_service_id_display() {
        let id = ServiceId::of_interface::<dyn Loggable>();
        assert!(id.to_string().starts_with("interface "));
        assert!(id.is_interface());
        assert!(ServiceId::of_type::<Logger>().to_string().ends_with("Logger"));
    }

    #[test]
    fn test_provides_upcast_keeps_identity() {
        let logger = Arc::new(Logger);
        let as_loggable: Arc<dyn Loggable> = Arc::clone(&logger).provide();
        assert!(std::ptr::addr_eq(Arc::as_ptr(&logger), Arc::as_ptr(&as_loggable)));
    }

    #[test]
    fn test_default_lifetime_is_instance() {
        assert_eq!(Lifetime::default(), Lifetime::Instance);
        assert_eq!(Lifetime::Static.as_str(), "static");
    }
}
