//! Per-call resolution state
//!
//! A [`ResolutionContext`] lives for exactly one top-level `resolve` or
//! `inject_properties` call and backs the [`Lifetime::Cycle`](crate::Lifetime::Cycle)
//! cache for that call tree.

use crate::factory::Instance;
use crate::ServiceId;
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique context identifier, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    #[inline]
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Cycle-lifetime instances created during one top-level call.
///
/// The container creates one of these whenever a public entry point is
/// called without a context, and threads it by `&mut` through every nested
/// resolution and injection. Callers that want several resolutions to share
/// Cycle instances can create one themselves and use
/// [`Container::resolve_in`](crate::Container::resolve_in).
///
/// # Examples
///
/// ```rust
/// use minjection::{Container, Lifetime, Registration, ResolutionContext};
///
/// struct Session;
///
/// let container = Container::new();
/// container
///     .register(
///         Registration::for_type::<Session>()
///             .constructor(|| Session)
///             .lifetime(Lifetime::Cycle),
///     )
///     .unwrap();
///
/// let mut context = ResolutionContext::new();
/// let a = container.resolve_type_in::<Session>(&mut context).unwrap();
/// let b = container.resolve_type_in::<Session>(&mut context).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
pub struct ResolutionContext {
    id: ContextId,
    instances: HashMap<ServiceId, Instance, RandomState>,
}

impl ResolutionContext {
    /// Create an empty context.
    #[inline]
    pub fn new() -> Self {
        Self {
            id: ContextId::next(),
            instances: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// This context's identifier.
    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Instance already created for `id` in this call tree.
    #[inline]
    pub fn get(&self, id: &ServiceId) -> Option<Instance> {
        self.instances.get(id).map(Arc::clone)
    }

    #[inline]
    pub(crate) fn insert(&mut self, id: ServiceId, instance: Instance) {
        self.instances.insert(id, instance);
    }

    #[inline]
    pub(crate) fn remove(&mut self, id: &ServiceId) {
        self.instances.remove(id);
    }

    /// Whether `id` has an instance in this context.
    #[inline]
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.instances.contains_key(id)
    }

    /// Number of Cycle instances held.
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True if nothing has been cached yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("id", &self.id)
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Session;

    #[test]
    fn test_context_ids_unique() {
        let c1 = ResolutionContext::new();
        let c2 = ResolutionContext::new();

        assert_ne!(c1.id(), c2.id());
        assert!(c1.id().to_string().starts_with("ctx-"));
    }

    #[test]
    fn test_insert_and_get_share_instance() {
        let mut context = ResolutionContext::new();
        let id = ServiceId::of_type::<Session>();
        let instance: Instance = Arc::new(Arc::new(Session));

        assert!(context.get(&id).is_none());
        context.insert(id, Arc::clone(&instance));

        let cached = context.get(&id).unwrap();
        assert!(Arc::ptr_eq(&cached, &instance));
        assert!(context.contains(&id));
        assert_eq!(context.len(), 1);
    }
}
