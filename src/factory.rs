//! Provisioning strategies and the values they produce
//!
//! A registration is stored type-erased. Every produced value is an
//! [`Instance`]: an `Arc<dyn Any>` wrapping the `Arc<S>` of the service view,
//! so identity survives erasure and unsized views (`dyn Trait`) work.

use crate::{Container, DiError, Interface, Result, ServiceId};
use std::any::Any;
use std::sync::Arc;

/// Type-erased handle to a produced service.
///
/// Holds an `Arc<S>` where `S` is the service view of the registration.
/// Two handles refer to the same service instance iff `Arc::ptr_eq` holds.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Erase a service view.
#[inline]
pub(crate) fn erase<S: ?Sized + Send + Sync + 'static>(service: Arc<S>) -> Instance {
    Arc::new(service)
}

/// Recover the service view from an erased handle.
#[inline]
pub(crate) fn downcast<S: ?Sized + Send + Sync + 'static>(
    instance: &Instance,
    id: ServiceId,
) -> Result<Arc<S>> {
    instance.downcast_ref::<Arc<S>>().map(Arc::clone).ok_or_else(|| {
        DiError::construction_failed(
            id,
            format!("instance is not an Arc<{}>", std::any::type_name::<S>()),
        )
    })
}

/// Designated initializer, erased.
pub(crate) type ConstructFn = Arc<dyn Fn() -> Instance + Send + Sync>;

/// Factory with resolved dependencies, erased.
pub(crate) type FactoryFn = Arc<dyn Fn(&Container, &Dependencies) -> Result<Instance> + Send + Sync>;

/// How a registration produces its instance.
///
/// Exactly one strategy per registration; the registration builder rejects
/// anything else.
pub(crate) enum Strategy {
    /// A pre-existing value, returned as-is on every request
    Instance(Instance),
    /// A type's designated initializer
    Constructor(ConstructFn),
    /// A closure receiving the container and its declared dependencies
    Factory {
        factory: FactoryFn,
        dependencies: Vec<ServiceId>,
    },
}

impl Strategy {
    /// Short name used in log fields.
    #[inline]
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Strategy::Instance(_) => "instance",
            Strategy::Constructor(_) => "constructor",
            Strategy::Factory { .. } => "factory",
        }
    }
}

/// Resolved factory dependencies, in declaration order.
///
/// # Examples
///
/// ```rust
/// use minjection::{Container, Registration, ServiceId};
///
/// struct Config { url: String }
/// struct Database { url: String }
///
/// let container = Container::new();
/// container.register_instance(Config { url: "postgres://localhost".into() });
/// container
///     .register(
///         Registration::for_type::<Database>()
///             .factory(|_, deps| {
///                 let config = deps.get::<Config>()?;
///                 Ok(Database { url: config.url.clone() })
///             })
///             .dependencies([ServiceId::of_type::<Config>()]),
///     )
///     .unwrap();
///
/// assert_eq!(container.resolve_type::<Database>().unwrap().url, "postgres://localhost");
/// ```
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: Vec<(ServiceId, Instance)>,
}

impl Dependencies {
    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, id: ServiceId, instance: Instance) {
        self.entries.push((id, instance));
    }

    /// Erased instance for `id`, if it was declared.
    #[inline]
    pub fn instance(&self, id: &ServiceId) -> Option<&Instance> {
        self.entries
            .iter()
            .find(|(declared, _)| declared == id)
            .map(|(_, instance)| instance)
    }

    /// Dependency declared as the concrete type `T`.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.typed::<T>(ServiceId::of_type::<T>())
    }

    /// Dependency declared as the interface `I`.
    pub fn interface<I: Interface + ?Sized>(&self) -> Result<Arc<I::Service>> {
        self.typed::<I::Service>(ServiceId::of_interface::<I>())
    }

    fn typed<S: ?Sized + Send + Sync + 'static>(&self, id: ServiceId) -> Result<Arc<S>> {
        let instance = self
            .instance(&id)
            .ok_or_else(|| DiError::factory_failed(format!("{id} was not declared as a dependency")))?;
        downcast::<S>(instance, id)
    }

    /// Declared ids with their instances, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ServiceId, &Instance)> {
        self.entries.iter().map(|(id, instance)| (id, instance))
    }

    /// Number of dependencies.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the factory declared none.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestService {
        id: u32,
    }

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }
    struct Fixed;
    impl Named for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
    }
    crate::interface!(dyn Named);

    #[test]
    fn test_erase_roundtrip_keeps_identity() {
        let service = Arc::new(TestService { id: 42 });
        let instance = erase(Arc::clone(&service));

        let back = downcast::<TestService>(&instance, ServiceId::of_type::<TestService>()).unwrap();
        assert_eq!(back.id, 42);
        assert!(Arc::ptr_eq(&service, &back));
    }

    #[test]
    fn test_downcast_wrong_type_fails() {
        let instance = erase(Arc::new(TestService { id: 1 }));
        let result = downcast::<String>(&instance, ServiceId::of_type::<String>());
        assert!(matches!(result, Err(DiError::ConstructionFailed { .. })));
    }

    #[test]
    fn test_dependencies_lookup_by_namespace() {
        let mut deps = Dependencies::with_capacity(2);
        deps.push(ServiceId::of_type::<TestService>(), erase(Arc::new(TestService { id: 7 })));
        deps.push(
            ServiceId::of_interface::<dyn Named>(),
            erase(Arc::new(Fixed) as Arc<dyn Named>),
        );

        assert_eq!(deps.len(), 2);
        assert_eq!(deps.get::<TestService>().unwrap().id, 7);
        assert_eq!(deps.interface::<dyn Named>().unwrap().name(), "fixed");

        let order: Vec<_> = deps.iter().map(|(id, _)| *id).collect();
        assert_eq!(order[0], ServiceId::of_type::<TestService>());
    }

    #[test]
    fn test_undeclared_dependency_is_construction_failure() {
        let deps = Dependencies::default();
        assert!(deps.is_empty());
        assert!(matches!(
            deps.get::<TestService>(),
            Err(DiError::ConstructionFailed { service: None, .. })
        ));
    }

    #[test]
    fn test_strategy_kind() {
        let strategy = Strategy::Instance(erase(Arc::new(TestService { id: 0 })));
        assert_eq!(strategy.kind(), "instance");
    }
}
