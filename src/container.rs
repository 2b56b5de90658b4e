//! The service container
//!
//! The `Container` owns the registry and the Static cache. It registers
//! services, answers capability queries, resolves services according to
//! their lifetime and auto-injects targets.

use crate::factory::{downcast, Dependencies, Instance, Strategy};
use crate::registration::{constructor_strategy, factory_strategy, instance_strategy, Entry};
use crate::storage::{ServiceStorage, StaticSection};
use crate::{DiError, Inject, Injector, Interface, Lifetime, Provides, Registration, ResolutionContext, Result, ServiceId};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Service locator with lifetimes and auto-injection.
///
/// Cloning is cheap and shares the registry and Static cache.
///
/// # Examples
///
/// ```rust
/// use minjection::{Container, Lifetime, Registration, interface};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// struct Greeter;
/// interface!(Greeter => String);
///
/// static COUNTER: AtomicU32 = AtomicU32::new(0);
///
/// let container = Container::new();
/// container
///     .register(
///         Registration::for_interface::<Greeter>()
///             .factory(|_, _| Ok(format!("hi-{}", COUNTER.fetch_add(1, Ordering::SeqCst))))
///             .lifetime(Lifetime::Instance),
///     )
///     .unwrap();
///
/// assert_eq!(*container.resolve_interface::<Greeter>().unwrap(), "hi-0");
/// assert_eq!(*container.resolve_interface::<Greeter>().unwrap(), "hi-1");
/// assert_eq!(*container.resolve_interface::<Greeter>().unwrap(), "hi-2");
/// ```
#[derive(Clone)]
pub struct Container {
    storage: Arc<ServiceStorage>,
}

impl Container {
    /// Create an empty container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "minjection", "Creating new container");

        Self {
            storage: Arc::new(ServiceStorage::new()),
        }
    }

    /// Create a container with pre-allocated capacity.
    ///
    /// Use this when you know approximately how many services will be registered.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "minjection", capacity, "Creating new container with capacity");

        Self {
            storage: Arc::new(ServiceStorage::with_capacity(capacity)),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a service from a composite [`Registration`].
    ///
    /// Replaces any earlier registration for the same [`ServiceId`]. Instances
    /// already cached from the earlier registration are kept; only future
    /// creations use the new one.
    ///
    /// # Errors
    ///
    /// [`DiError::InvalidRegistration`] if the options are inconsistent; the
    /// registry is left unchanged.
    pub fn register<S: ?Sized + Send + Sync + 'static>(&self, registration: Registration<S>) -> Result<()> {
        let entry = match registration.into_entry() {
            Ok(entry) => entry,
            Err(err) => {
                #[cfg(feature = "logging")]
                debug!(target: "minjection", error = %err, "Rejected registration");
                return Err(err);
            }
        };
        self.insert(entry);
        Ok(())
    }

    fn insert(&self, entry: Entry) {
        #[cfg(feature = "logging")]
        let (service, strategy, lifetime) =
            (entry.service_id, entry.strategy.kind(), entry.lifetime.as_str());

        let replaced = self.storage.insert(entry);

        #[cfg(feature = "logging")]
        debug!(
            target: "minjection",
            service = %service,
            strategy,
            lifetime,
            replaced,
            service_count = self.storage.len(),
            "Registered service"
        );

        #[cfg(not(feature = "logging"))]
        let _ = replaced;
    }

    /// Register a value returned on every request for `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use minjection::Container;
    ///
    /// struct Database { url: String }
    ///
    /// let container = Container::new();
    /// container.register_instance(Database { url: "postgres://localhost".into() });
    ///
    /// let a = container.resolve_type::<Database>().unwrap();
    /// let b = container.resolve_type::<Database>().unwrap();
    /// assert!(std::sync::Arc::ptr_eq(&a, &b));
    /// ```
    #[inline]
    pub fn register_instance<T: Send + Sync + 'static>(&self, instance: T) {
        self.insert(Entry::new(ServiceId::of_type::<T>(), instance_strategy::<T, T>(instance)));
    }

    /// Register a designated initializer for `T`; a new instance per request.
    #[inline]
    pub fn register_constructor<T, F>(&self, init: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(Entry::new(
            ServiceId::of_type::<T>(),
            constructor_strategy::<T, T, F>(init),
        ));
    }

    /// Register `T::default` as the initializer for `T`.
    #[inline]
    pub fn register_default<T: Default + Send + Sync + 'static>(&self) {
        self.register_constructor(T::default);
    }

    /// Register a factory for `T`; run on every request.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use minjection::Container;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// static COUNTER: AtomicU64 = AtomicU64::new(0);
    ///
    /// struct RequestId(u64);
    ///
    /// let container = Container::new();
    /// container.register_factory(|_| Ok(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst))));
    ///
    /// let id1 = container.resolve_type::<RequestId>().unwrap();
    /// let id2 = container.resolve_type::<RequestId>().unwrap();
    /// assert_ne!(id1.0, id2.0);
    /// ```
    #[inline]
    pub fn register_factory<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.insert(Entry::new(
            ServiceId::of_type::<T>(),
            factory_strategy::<T, T, _>(move |container, _| factory(container), Vec::new()),
        ));
    }

    /// Register a factory for `T` that receives `dependencies`, resolved in
    /// the same call tree and in the given order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use minjection::{Container, ServiceId};
    ///
    /// struct Config { url: String }
    /// struct Database { url: String }
    ///
    /// let container = Container::new();
    /// container.register_instance(Config { url: "postgres://localhost".into() });
    /// container.register_factory_with([ServiceId::of_type::<Config>()], |_, deps| {
    ///     Ok(Database { url: deps.get::<Config>()?.url.clone() })
    /// });
    ///
    /// assert_eq!(container.resolve_type::<Database>().unwrap().url, "postgres://localhost");
    /// ```
    #[inline]
    pub fn register_factory_with<T, F>(&self, dependencies: impl IntoIterator<Item = ServiceId>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, &Dependencies) -> Result<T> + Send + Sync + 'static,
    {
        self.insert(Entry::new(
            ServiceId::of_type::<T>(),
            factory_strategy::<T, T, F>(factory, dependencies.into_iter().collect()),
        ));
    }

    /// Register a value returned on every request for the interface `I`.
    #[inline]
    pub fn register_interface_instance<I, C>(&self, instance: C)
    where
        I: Interface + ?Sized,
        C: Provides<I::Service>,
    {
        self.insert(Entry::new(
            ServiceId::of_interface::<I>(),
            instance_strategy::<I::Service, C>(instance),
        ));
    }

    /// Register a designated initializer of `C` for the interface `I`.
    #[inline]
    pub fn register_interface_constructor<I, C, F>(&self, init: F)
    where
        I: Interface + ?Sized,
        C: Provides<I::Service>,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.insert(Entry::new(
            ServiceId::of_interface::<I>(),
            constructor_strategy::<I::Service, C, F>(init),
        ));
    }

    /// Register a factory for the interface `I`; run on every request.
    #[inline]
    pub fn register_interface_factory<I, C, F>(&self, factory: F)
    where
        I: Interface + ?Sized,
        C: Provides<I::Service>,
        F: Fn(&Container) -> Result<C> + Send + Sync + 'static,
    {
        self.insert(Entry::new(
            ServiceId::of_interface::<I>(),
            factory_strategy::<I::Service, C, _>(move |container, _| factory(container), Vec::new()),
        ));
    }

    /// Register a factory for the interface `I` that receives `dependencies`.
    #[inline]
    pub fn register_interface_factory_with<I, C, F>(
        &self,
        dependencies: impl IntoIterator<Item = ServiceId>,
        factory: F,
    ) where
        I: Interface + ?Sized,
        C: Provides<I::Service>,
        F: Fn(&Container, &Dependencies) -> Result<C> + Send + Sync + 'static,
    {
        self.insert(Entry::new(
            ServiceId::of_interface::<I>(),
            factory_strategy::<I::Service, C, F>(factory, dependencies.into_iter().collect()),
        ));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Whether a registration exists for `id`. Never creates anything.
    #[inline]
    pub fn can_resolve(&self, id: &ServiceId) -> bool {
        self.storage.contains(id)
    }

    /// Whether the concrete type `T` is registered.
    #[inline]
    pub fn can_resolve_type<T: Send + Sync + 'static>(&self) -> bool {
        self.can_resolve(&ServiceId::of_type::<T>())
    }

    /// Whether the interface `I` is registered.
    #[inline]
    pub fn can_resolve_interface<I: Interface + ?Sized>(&self) -> bool {
        self.can_resolve(&ServiceId::of_interface::<I>())
    }

    /// Number of registered services.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// All registered ids, in no particular order.
    pub fn registered_services(&self) -> Vec<ServiceId> {
        self.storage.service_ids()
    }

    /// Number of Static instances created so far.
    #[inline]
    pub fn cached_statics(&self) -> usize {
        self.storage.cached_len()
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve `id` in a fresh [`ResolutionContext`].
    ///
    /// # Errors
    ///
    /// [`DiError::UnregisteredService`] if `id` (or anything it needs) is not
    /// registered; [`DiError::ConstructionFailed`] if a factory fails.
    pub fn resolve(&self, id: &ServiceId) -> Result<Instance> {
        let mut context = ResolutionContext::new();

        #[cfg(feature = "logging")]
        trace!(
            target: "minjection",
            service = %id,
            context = context.id().id(),
            "Top-level resolve"
        );

        self.resolve_in(id, &mut context)
    }

    /// Resolve `id` inside an existing call tree.
    pub fn resolve_in(&self, id: &ServiceId, context: &mut ResolutionContext) -> Result<Instance> {
        let Some(entry) = self.storage.entry(id) else {
            #[cfg(feature = "logging")]
            debug!(target: "minjection", service = %id, "Service not registered");
            return Err(DiError::unregistered(*id));
        };

        if let Strategy::Instance(instance) = &entry.strategy {
            #[cfg(feature = "logging")]
            trace!(target: "minjection", service = %id, location = "stored", "Service resolved");
            return Ok(Arc::clone(instance));
        }

        match entry.lifetime {
            Lifetime::Static => {
                if let Some(instance) = self.storage.cached(id) {
                    #[cfg(feature = "logging")]
                    trace!(target: "minjection", service = %id, location = "static", "Service resolved");
                    return Ok(instance);
                }

                let section = self.storage.enter_statics();
                // Finished by another thread while we waited, or staged earlier in this build
                if let Some(instance) = section.lookup(id) {
                    return Ok(instance);
                }
                let instance = self.create(&entry, context, Some(&section))?;
                section.commit();
                Ok(instance)
            }
            Lifetime::Cycle => {
                if let Some(instance) = context.get(id) {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "minjection",
                        service = %id,
                        context = context.id().id(),
                        location = "cycle",
                        "Service resolved"
                    );
                    return Ok(instance);
                }
                self.create(&entry, context, None)
            }
            Lifetime::Instance => self.create(&entry, context, None),
        }
    }

    /// Build a new instance, cache it per lifetime, then inject and run the hook.
    ///
    /// Static instances are staged in `section` and only published by the
    /// caller once the outermost Static build succeeds.
    fn create(
        &self,
        entry: &Entry,
        context: &mut ResolutionContext,
        section: Option<&StaticSection<'_>>,
    ) -> Result<Instance> {
        let id = entry.service_id;

        #[cfg(feature = "logging")]
        debug!(
            target: "minjection",
            service = %id,
            strategy = entry.strategy.kind(),
            lifetime = entry.lifetime.as_str(),
            context = context.id().id(),
            "Creating instance"
        );

        let instance = match &entry.strategy {
            Strategy::Instance(instance) => return Ok(Arc::clone(instance)),
            Strategy::Constructor(init) => init(),
            Strategy::Factory {
                factory,
                dependencies,
            } => {
                let mut deps = Dependencies::with_capacity(dependencies.len());
                for dependency in dependencies {
                    deps.push(*dependency, self.resolve_in(dependency, context)?);
                }
                factory(self, &deps).map_err(|err| err.for_service(id))?
            }
        };

        // Cache before injecting: a cyclic peer asking for us must find this instance
        match (entry.lifetime, section) {
            (Lifetime::Static, Some(section)) => section.stage(id, Arc::clone(&instance)),
            (Lifetime::Cycle, _) => context.insert(id, Arc::clone(&instance)),
            _ => {}
        }

        if let Err(err) = self.finish(entry, &instance, context) {
            match (entry.lifetime, section) {
                (Lifetime::Static, Some(section)) => section.unstage(&id),
                (Lifetime::Cycle, _) => context.remove(&id),
                _ => {}
            }

            #[cfg(feature = "logging")]
            debug!(target: "minjection", service = %id, error = %err, "Instance setup failed");
            return Err(err);
        }

        Ok(instance)
    }

    fn finish(&self, entry: &Entry, instance: &Instance, context: &mut ResolutionContext) -> Result<()> {
        if let Some(inject) = &entry.injector {
            let mut injector = Injector::new(self, context);
            inject(instance, &mut injector)?;

            #[cfg(feature = "logging")]
            trace!(
                target: "minjection",
                service = %entry.service_id,
                fields = injector.filled(),
                "Properties injected"
            );
        }

        if let Some(hook) = &entry.post_injection {
            hook(instance, self)?;
        }

        Ok(())
    }

    /// Resolve the concrete type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use minjection::Container;
    ///
    /// struct MyService;
    ///
    /// let container = Container::new();
    /// container.register_instance(MyService);
    ///
    /// let service = container.resolve_type::<MyService>().unwrap();
    /// ```
    #[inline]
    pub fn resolve_type<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let id = ServiceId::of_type::<T>();
        downcast::<T>(&self.resolve(&id)?, id)
    }

    /// Resolve the concrete type `T` inside an existing call tree.
    #[inline]
    pub fn resolve_type_in<T: Send + Sync + 'static>(&self, context: &mut ResolutionContext) -> Result<Arc<T>> {
        let id = ServiceId::of_type::<T>();
        downcast::<T>(&self.resolve_in(&id, context)?, id)
    }

    /// Resolve the interface `I`.
    #[inline]
    pub fn resolve_interface<I: Interface + ?Sized>(&self) -> Result<Arc<I::Service>> {
        let id = ServiceId::of_interface::<I>();
        downcast::<I::Service>(&self.resolve(&id)?, id)
    }

    /// Resolve the interface `I` inside an existing call tree.
    #[inline]
    pub fn resolve_interface_in<I: Interface + ?Sized>(
        &self,
        context: &mut ResolutionContext,
    ) -> Result<Arc<I::Service>> {
        let id = ServiceId::of_interface::<I>();
        downcast::<I::Service>(&self.resolve_in(&id, context)?, id)
    }

    /// Try to resolve `T`, returning None on any error.
    #[inline]
    pub fn try_resolve_type<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve_type::<T>().ok()
    }

    /// Try to resolve `I`, returning None on any error.
    #[inline]
    pub fn try_resolve_interface<I: Interface + ?Sized>(&self) -> Option<Arc<I::Service>> {
        self.resolve_interface::<I>().ok()
    }

    // =========================================================================
    // Injection Methods
    // =========================================================================

    /// Fill every unset, resolvable field of `target` in a fresh context.
    ///
    /// Fields that are already set or whose service is unknown are left alone.
    ///
    /// # Errors
    ///
    /// Whatever resolving an eligible field returns.
    pub fn inject_properties<T: Inject + ?Sized>(&self, target: &T) -> Result<()> {
        let mut context = ResolutionContext::new();
        self.inject_properties_in(target, &mut context)
    }

    /// Fill every unset, resolvable field of `target` inside an existing call tree.
    pub fn inject_properties_in<T: Inject + ?Sized>(
        &self,
        target: &T,
        context: &mut ResolutionContext,
    ) -> Result<()> {
        let mut injector = Injector::new(self, context);
        target.inject(&mut injector)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "minjection",
            target_type = std::any::type_name::<T>(),
            fields = injector.filled(),
            "Injected properties"
        );

        Ok(())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("service_count", &self.len())
            .field("cached_statics", &self.cached_statics())
            .finish()
    }
}
