//! Composite service registration
//!
//! [`Registration`] collects every option for one service: which strategy
//! produces it, how long instances live, whether fields are auto-injected
//! and what runs afterwards. It is validated when handed to
//! [`Container::register`](crate::Container::register).

use crate::factory::{downcast, erase, ConstructFn, Dependencies, FactoryFn, Instance, Strategy};
use crate::{Container, DiError, Inject, Injector, Interface, InvalidRegistration, Lifetime, Provides, Result, ServiceId};
use std::marker::PhantomData;
use std::sync::Arc;

/// Auto-injection of a freshly created instance, erased.
pub(crate) type InjectFn = Arc<dyn Fn(&Instance, &mut Injector<'_>) -> Result<()> + Send + Sync>;

/// Post-injection hook, erased.
pub(crate) type HookFn = Arc<dyn Fn(&Instance, &Container) -> Result<()> + Send + Sync>;

#[inline]
fn inject_fn<F>(f: F) -> InjectFn
where
    F: Fn(&Instance, &mut Injector<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[inline]
fn hook_fn<F>(f: F) -> HookFn
where
    F: Fn(&Instance, &Container) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[inline]
fn factory_fn<F>(f: F) -> FactoryFn
where
    F: Fn(&Container, &Dependencies) -> Result<Instance> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn instance_strategy<S, C>(value: C) -> Strategy
where
    S: ?Sized + Send + Sync + 'static,
    C: Provides<S>,
{
    Strategy::Instance(erase::<S>(<C as Provides<S>>::provide(Arc::new(value))))
}

pub(crate) fn constructor_strategy<S, C, F>(init: F) -> Strategy
where
    S: ?Sized + Send + Sync + 'static,
    C: Provides<S>,
    F: Fn() -> C + Send + Sync + 'static,
{
    let construct: ConstructFn =
        Arc::new(move || erase::<S>(<C as Provides<S>>::provide(Arc::new(init()))));
    Strategy::Constructor(construct)
}

pub(crate) fn factory_strategy<S, C, F>(factory: F, dependencies: Vec<ServiceId>) -> Strategy
where
    S: ?Sized + Send + Sync + 'static,
    C: Provides<S>,
    F: Fn(&Container, &Dependencies) -> Result<C> + Send + Sync + 'static,
{
    Strategy::Factory {
        factory: factory_fn(move |container, deps| {
            let value = factory(container, deps)?;
            Ok(erase::<S>(<C as Provides<S>>::provide(Arc::new(value))))
        }),
        dependencies,
    }
}

/// A validated registration as stored in the registry.
pub(crate) struct Entry {
    pub(crate) service_id: ServiceId,
    pub(crate) strategy: Strategy,
    pub(crate) lifetime: Lifetime,
    pub(crate) injector: Option<InjectFn>,
    pub(crate) post_injection: Option<HookFn>,
}

impl Entry {
    /// A plain entry: default lifetime, no injection, no hook.
    #[inline]
    pub(crate) fn new(service_id: ServiceId, strategy: Strategy) -> Self {
        Self {
            service_id,
            strategy,
            lifetime: Lifetime::default(),
            injector: None,
            post_injection: None,
        }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("service_id", &self.service_id)
            .field("strategy", &self.strategy.kind())
            .field("lifetime", &self.lifetime)
            .field("inject_properties", &self.injector.is_some())
            .field("post_injection", &self.post_injection.is_some())
            .finish()
    }
}

/// Everything the container needs to provide one service.
///
/// `S` is the service view handed back on resolution: the type itself for
/// [`Registration::for_type`], `I::Service` for [`Registration::for_interface`].
/// Exactly one of [`instance`](Self::instance),
/// [`constructor`](Self::constructor) or [`factory`](Self::factory) must be
/// set; a stored instance accepts no lifetime, injection or hook.
///
/// # Examples
///
/// ```rust
/// use minjection::{Container, Inject, Injected, Injector, Lifetime, Registration, Result};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// #[derive(Default)]
/// struct Scheduler {
///     clock: Injected<Clock>,
/// }
///
/// impl Inject for Scheduler {
///     fn inject(&self, injector: &mut Injector<'_>) -> Result<()> {
///         injector.field("clock", &self.clock)
///     }
/// }
///
/// let container = Container::new();
/// container.register_instance(Clock);
/// container
///     .register(
///         Registration::for_type::<Scheduler>()
///             .constructor(Scheduler::default)
///             .lifetime(Lifetime::Static)
///             .inject_properties(),
///     )
///     .unwrap();
///
/// let scheduler = container.resolve_type::<Scheduler>().unwrap();
/// assert!(scheduler.clock.is_set());
/// ```
#[must_use = "a registration does nothing until passed to Container::register"]
pub struct Registration<S: ?Sized> {
    service_id: ServiceId,
    instance: Option<Strategy>,
    constructor: Option<Strategy>,
    factory: Option<FactoryFn>,
    dependencies: Option<Vec<ServiceId>>,
    lifetime: Option<Lifetime>,
    injector: Option<InjectFn>,
    post_injection: Option<HookFn>,
    _service: PhantomData<fn() -> Arc<S>>,
}

impl Registration<()> {
    /// Start a registration keyed by the concrete type `T`.
    #[inline]
    pub fn for_type<T: Send + Sync + 'static>() -> Registration<T> {
        Registration::with_id(ServiceId::of_type::<T>())
    }

    /// Start a registration keyed by the interface tag `I`.
    #[inline]
    pub fn for_interface<I: Interface + ?Sized>() -> Registration<I::Service> {
        Registration::with_id(ServiceId::of_interface::<I>())
    }
}

impl<S: ?Sized + Send + Sync + 'static> Registration<S> {
    fn with_id(service_id: ServiceId) -> Self {
        Self {
            service_id,
            instance: None,
            constructor: None,
            factory: None,
            dependencies: None,
            lifetime: None,
            injector: None,
            post_injection: None,
            _service: PhantomData,
        }
    }

    /// The service this registration provides.
    #[inline]
    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    /// Provide this value on every request.
    ///
    /// Calling it again replaces the earlier value.
    pub fn instance<C: Provides<S>>(mut self, value: C) -> Self {
        self.instance = Some(instance_strategy::<S, C>(value));
        self
    }

    /// Provide an already shared value on every request.
    ///
    /// Replaces any value set earlier with [`instance`](Self::instance).
    pub fn shared_instance(mut self, value: Arc<S>) -> Self {
        self.instance = Some(Strategy::Instance(erase::<S>(value)));
        self
    }

    /// Create instances with a designated initializer.
    ///
    /// Calling it again replaces the earlier initializer.
    pub fn constructor<C, F>(mut self, init: F) -> Self
    where
        C: Provides<S>,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.constructor = Some(constructor_strategy::<S, C, F>(init));
        self
    }

    /// Create instances with a factory closure.
    ///
    /// The factory receives the container and the services named in
    /// [`dependencies`](Self::dependencies), resolved in the same call tree.
    /// Calling it again replaces the earlier factory; dependencies are kept.
    pub fn factory<C, F>(mut self, factory: F) -> Self
    where
        C: Provides<S>,
        F: Fn(&Container, &Dependencies) -> Result<C> + Send + Sync + 'static,
    {
        self.factory = Some(factory_fn(move |container, deps| {
            let value = factory(container, deps)?;
            Ok(erase::<S>(<C as Provides<S>>::provide(Arc::new(value))))
        }));
        self
    }

    /// Services to resolve and pass to the factory, in order.
    pub fn dependencies(mut self, ids: impl IntoIterator<Item = ServiceId>) -> Self {
        self.dependencies
            .get_or_insert_with(Vec::new)
            .extend(ids);
        self
    }

    /// How long created instances are reused. Defaults to [`Lifetime::Instance`].
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// Auto-inject unset fields of every newly created instance.
    pub fn inject_properties(mut self) -> Self
    where
        S: Inject,
    {
        let id = self.service_id;
        self.injector = Some(inject_fn(move |instance, injector| {
            let service = downcast::<S>(instance, id)?;
            S::inject(&service, injector)
        }));
        self
    }

    /// Run `hook` on every newly created instance, after injection.
    pub fn after_inject<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Arc<S>, &Container) + Send + Sync + 'static,
    {
        let id = self.service_id;
        self.post_injection = Some(hook_fn(move |instance, container| {
            let service = downcast::<S>(instance, id)?;
            hook(&service, container);
            Ok(())
        }));
        self
    }

    /// Call a no-argument method on every newly created instance, after injection.
    pub fn after_inject_method(self, method: fn(&S)) -> Self {
        self.after_inject(move |service, _| method(&**service))
    }

    /// Check the options and erase the service type.
    pub(crate) fn into_entry(self) -> Result<Entry> {
        let id = self.service_id;
        let strategies = usize::from(self.instance.is_some())
            + usize::from(self.constructor.is_some())
            + usize::from(self.factory.is_some());

        match strategies {
            0 => return Err(DiError::invalid(id, InvalidRegistration::MissingStrategy)),
            1 => {}
            n => return Err(DiError::invalid(id, InvalidRegistration::ConflictingStrategies(n))),
        }

        if self.dependencies.is_some() && self.factory.is_none() {
            return Err(DiError::invalid(id, InvalidRegistration::DependenciesWithoutFactory));
        }

        let strategy = if let Some(instance) = self.instance {
            if self.injector.is_some() {
                return Err(DiError::invalid(id, InvalidRegistration::InjectOnInstance));
            }
            if self.lifetime.is_some() {
                return Err(DiError::invalid(id, InvalidRegistration::LifetimeOnInstance));
            }
            if self.post_injection.is_some() {
                return Err(DiError::invalid(id, InvalidRegistration::HookOnInstance));
            }
            instance
        } else if let Some(factory) = self.factory {
            Strategy::Factory {
                factory,
                dependencies: self.dependencies.unwrap_or_default(),
            }
        } else if let Some(constructor) = self.constructor {
            constructor
        } else {
            return Err(DiError::invalid(id, InvalidRegistration::MissingStrategy));
        };

        Ok(Entry {
            service_id: id,
            strategy,
            lifetime: self.lifetime.unwrap_or_default(),
            injector: self.injector,
            post_injection: self.post_injection,
        })
    }
}

impl<S: ?Sized> std::fmt::Debug for Registration<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("service_id", &self.service_id)
            .field("instance", &self.instance.is_some())
            .field("constructor", &self.constructor.is_some())
            .field("factory", &self.factory.is_some())
            .field("dependencies", &self.dependencies)
            .field("lifetime", &self.lifetime)
            .field("inject_properties", &self.injector.is_some())
            .field("post_injection", &self.post_injection.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Injected;

    struct Plain;

    #[derive(Default)]
    struct Wired {
        plain: Injected<Plain>,
    }

    impl Inject for Wired {
        fn inject(&self, injector: &mut Injector<'_>) -> Result<()> {
            injector.field("plain", &self.plain)
        }
    }

    fn reason<S: ?Sized + Send + Sync + 'static>(registration: Registration<S>) -> InvalidRegistration {
        match registration.into_entry() {
            Err(DiError::InvalidRegistration { reason, .. }) => reason,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(entry) => panic!("registration accepted: {entry:?}"),
        }
    }

    #[test]
    fn test_missing_strategy() {
        assert_eq!(
            reason(Registration::for_type::<Plain>()),
            InvalidRegistration::MissingStrategy
        );
    }

    #[test]
    fn test_conflicting_strategies() {
        let registration = Registration::for_type::<Plain>()
            .instance(Plain)
            .constructor(|| Plain)
            .factory(|_, _| Ok(Plain));
        assert_eq!(reason(registration), InvalidRegistration::ConflictingStrategies(3));
    }

    #[test]
    fn test_instance_rejects_behaviour_options() {
        assert_eq!(
            reason(Registration::for_type::<Wired>().instance(Wired::default()).inject_properties()),
            InvalidRegistration::InjectOnInstance
        );
        assert_eq!(
            reason(Registration::for_type::<Plain>().instance(Plain).lifetime(Lifetime::Static)),
            InvalidRegistration::LifetimeOnInstance
        );
        assert_eq!(
            reason(Registration::for_type::<Plain>().instance(Plain).after_inject(|_, _| {})),
            InvalidRegistration::HookOnInstance
        );
    }

    #[test]
    fn test_repeated_strategy_replaces_earlier_value() {
        let entry = Registration::for_type::<String>()
            .instance("first".to_string())
            .instance("second".to_string())
            .into_entry()
            .unwrap();

        match entry.strategy {
            Strategy::Instance(instance) => {
                let value = downcast::<String>(&instance, ServiceId::of_type::<String>()).unwrap();
                assert_eq!(*value, "second");
            }
            _ => panic!("expected stored instance"),
        }
    }

    #[test]
    fn test_dependencies_need_factory() {
        let registration = Registration::for_type::<Plain>()
            .constructor(|| Plain)
            .dependencies([ServiceId::of_type::<Wired>()]);
        assert_eq!(reason(registration), InvalidRegistration::DependenciesWithoutFactory);
    }

    #[test]
    fn test_valid_entry_defaults() {
        let entry = Registration::for_type::<Wired>()
            .constructor(Wired::default)
            .inject_properties()
            .into_entry()
            .unwrap();

        assert_eq!(entry.service_id, ServiceId::of_type::<Wired>());
        assert_eq!(entry.lifetime, Lifetime::Instance);
        assert_eq!(entry.strategy.kind(), "constructor");
        assert!(entry.injector.is_some());
        assert!(entry.post_injection.is_none());
    }

    #[test]
    fn test_factory_keeps_dependency_order() {
        let entry = Registration::for_type::<Plain>()
            .factory(|_, _| Ok(Plain))
            .dependencies([ServiceId::of_type::<Wired>()])
            .dependencies([ServiceId::of_type::<String>()])
            .into_entry()
            .unwrap();

        match entry.strategy {
            Strategy::Factory { dependencies, .. } => assert_eq!(
                dependencies,
                vec![ServiceId::of_type::<Wired>(), ServiceId::of_type::<String>()]
            ),
            _ => panic!("expected factory strategy"),
        }
    }
}
