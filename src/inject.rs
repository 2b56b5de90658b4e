//! Auto-injection of unset fields
//!
//! There is no runtime reflection: an injectable type implements [`Inject`]
//! and lists, in a fixed order, the fields it wants filled together with the
//! service each one stands for. Each field is an [`Injected`] slot, which is
//! write-once: a value the caller already put there is never replaced.
//!
//! With the `derive` feature, `#[derive(Inject)]` writes the impl from the
//! struct's `Injected<_>` fields in declaration order.

use crate::factory::downcast;
use crate::{Container, Interface, ResolutionContext, Result, ServiceId};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// A field that the container may fill.
///
/// Empty until either the caller or the container sets it; after that it
/// never changes. Safe to fill through a shared reference, so instances can
/// be injected after they were handed out as `Arc`s (which is what lets two
/// Cycle services point at each other).
///
/// # Examples
///
/// ```rust
/// use minjection::Injected;
/// use std::sync::Arc;
///
/// let field: Injected<String> = Injected::new();
/// assert!(!field.is_set());
///
/// assert!(field.set(Arc::new("manual".to_string())));
/// // Already set: later writes are refused
/// assert!(!field.set(Arc::new("other".to_string())));
/// assert_eq!(field.get().unwrap().as_str(), "manual");
/// ```
pub struct Injected<T: ?Sized> {
    cell: OnceCell<Arc<T>>,
}

impl<T: ?Sized> Injected<T> {
    /// An unset field.
    #[inline]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// A field preset by the caller; injection will leave it alone.
    #[inline]
    pub fn with(value: Arc<T>) -> Self {
        Self {
            cell: OnceCell::with_value(value),
        }
    }

    /// The current value, if any.
    #[inline]
    pub fn get(&self) -> Option<&Arc<T>> {
        self.cell.get()
    }

    /// Whether the field holds a value.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Set the field if it is still empty. Returns `false` if it was already set.
    #[inline]
    pub fn set(&self, value: Arc<T>) -> bool {
        self.cell.set(value).is_ok()
    }

    /// Take the value out, leaving the field unset.
    #[inline]
    pub fn take(&mut self) -> Option<Arc<T>> {
        self.cell.take()
    }
}

impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Injected<T> {
    fn clone(&self) -> Self {
        match self.get() {
            Some(value) => Self::with(Arc::clone(value)),
            None => Self::new(),
        }
    }
}

impl<T: ?Sized> From<Arc<T>> for Injected<T> {
    fn from(value: Arc<T>) -> Self {
        Self::with(value)
    }
}

impl<T: ?Sized> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "set" } else { "unset" };
        f.debug_tuple("Injected")
            .field(&format_args!("{}", state))
            .finish()
    }
}

/// A type whose fields can be auto-injected.
///
/// `inject` must visit the same fields in the same order every time so that
/// side-effecting factories run reproducibly for a given type.
///
/// # Examples
///
/// ```rust
/// use minjection::{Container, Inject, Injected, Injector, Result};
///
/// struct Database;
///
/// #[derive(Default)]
/// struct UserService {
///     db: Injected<Database>,
/// }
///
/// impl Inject for UserService {
///     fn inject(&self, injector: &mut Injector<'_>) -> Result<()> {
///         injector.field("db", &self.db)
///     }
/// }
///
/// let container = Container::new();
/// container.register_instance(Database);
///
/// let service = UserService::default();
/// container.inject_properties(&service).unwrap();
/// assert!(service.db.is_set());
/// ```
pub trait Inject: Send + Sync {
    /// Offer each injectable field to the injector.
    fn inject(&self, injector: &mut Injector<'_>) -> Result<()>;
}

impl<T: Inject + ?Sized> Inject for Arc<T> {
    #[inline]
    fn inject(&self, injector: &mut Injector<'_>) -> Result<()> {
        (**self).inject(injector)
    }
}

/// Fills fields of one target within a resolution context.
pub struct Injector<'a> {
    container: &'a Container,
    context: &'a mut ResolutionContext,
    filled: usize,
}

impl<'a> Injector<'a> {
    #[inline]
    pub(crate) fn new(container: &'a Container, context: &'a mut ResolutionContext) -> Self {
        Self {
            container,
            context,
            filled: 0,
        }
    }

    /// Fill `slot` with the service registered for the concrete type `T`.
    ///
    /// Skipped when the slot is already set or nothing is registered for `T`.
    #[inline]
    pub fn field<T: Send + Sync + 'static>(&mut self, name: &'static str, slot: &Injected<T>) -> Result<()> {
        self.fill(name, ServiceId::of_type::<T>(), slot)
    }

    /// Fill `slot` with the service registered for the interface `I`.
    ///
    /// Skipped when the slot is already set or nothing is registered for `I`.
    #[inline]
    pub fn interface<I: Interface + ?Sized>(
        &mut self,
        name: &'static str,
        slot: &Injected<I::Service>,
    ) -> Result<()> {
        self.fill(name, ServiceId::of_interface::<I>(), slot)
    }

    fn fill<S: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: &'static str,
        id: ServiceId,
        slot: &Injected<S>,
    ) -> Result<()> {
        if slot.is_set() {
            #[cfg(feature = "logging")]
            trace!(
                target: "minjection",
                field = name,
                service = %id,
                "Field already set, leaving it alone"
            );
            return Ok(());
        }

        if !self.container.can_resolve(&id) {
            #[cfg(feature = "logging")]
            trace!(
                target: "minjection",
                field = name,
                service = %id,
                "No registration for field, skipping"
            );
            return Ok(());
        }

        let instance = self.container.resolve_in(&id, self.context)?;
        let value = downcast::<S>(&instance, id)?;

        // A nested resolution may have filled this slot already
        if slot.set(value) {
            self.filled += 1;

            #[cfg(feature = "logging")]
            trace!(
                target: "minjection",
                field = name,
                service = %id,
                context = self.context.id().id(),
                "Field injected"
            );
        }

        #[cfg(not(feature = "logging"))]
        let _ = name;

        Ok(())
    }

    /// The container injecting.
    #[inline]
    pub fn container(&self) -> &Container {
        self.container
    }

    /// Number of fields this injector has filled so far.
    #[inline]
    pub fn filled(&self) -> usize {
        self.filled
    }
}
