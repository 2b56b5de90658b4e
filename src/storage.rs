//! Registry and static-lifetime cache
//!
//! Both maps are `DashMap`s hashed with `ahash`. Entries are handed out as
//! `Arc` clones so no shard guard is ever held while user code runs; a
//! nested resolution may insert into the same map.
//!
//! Static instances that are still being injected are staged behind the
//! static lock and only become visible in the shared cache once the whole
//! outermost build has succeeded.

use crate::factory::Instance;
use crate::registration::Entry;
use crate::ServiceId;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// Static builds in progress on the thread holding the static lock.
#[derive(Default)]
struct Staging {
    /// Nesting depth of open [`StaticSection`]s
    depth: usize,
    /// Created but not yet fully injected
    pending: HashMap<ServiceId, Instance, RandomState>,
}

/// Pick a shard count for the expected number of services.
///
/// Default DashMap uses num_cpus * 4 shards which is overkill for
/// typical containers with <50 services.
#[inline]
fn shard_amount(capacity: usize) -> usize {
    if capacity <= 16 {
        8
    } else if capacity <= 64 {
        16
    } else {
        32
    }
}

/// Thread-safe storage for registrations and Static instances.
pub(crate) struct ServiceStorage {
    /// ServiceId -> registration; last write wins
    entries: DashMap<ServiceId, Arc<Entry>, RandomState>,
    /// ServiceId -> fully built Static instance, never invalidated
    statics: DashMap<ServiceId, Instance, RandomState>,
    /// Serializes first construction of Static services and guards staging
    static_lock: ReentrantMutex<RefCell<Staging>>,
}

impl ServiceStorage {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let shards = shard_amount(capacity);
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shards,
            ),
            statics: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), shards),
            static_lock: ReentrantMutex::new(RefCell::new(Staging::default())),
        }
    }

    /// Insert or replace a registration. Returns true if one was replaced.
    #[inline]
    pub(crate) fn insert(&self, entry: Entry) -> bool {
        self.entries.insert(entry.service_id, Arc::new(entry)).is_some()
    }

    #[inline]
    pub(crate) fn contains(&self, id: &ServiceId) -> bool {
        self.entries.contains_key(id)
    }

    /// The registration for `id`, detached from the map.
    #[inline]
    pub(crate) fn entry(&self, id: &ServiceId) -> Option<Arc<Entry>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub(crate) fn cached(&self, id: &ServiceId) -> Option<Instance> {
        self.statics.get(id).map(|instance| Arc::clone(instance.value()))
    }

    #[inline]
    fn cache(&self, id: ServiceId, instance: Instance) {
        self.statics.insert(id, instance);
    }

    /// Enter a Static build, blocking while another thread is in one.
    ///
    /// Reentrant, so a Static service whose injection reaches itself (or
    /// another Static) on the same thread does not block.
    #[inline]
    pub(crate) fn enter_statics(&self) -> StaticSection<'_> {
        let guard = self.static_lock.lock();
        guard.borrow_mut().depth += 1;
        StaticSection {
            storage: self,
            guard,
            committed: false,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub(crate) fn cached_len(&self) -> usize {
        self.statics.len()
    }

    pub(crate) fn service_ids(&self) -> Vec<ServiceId> {
        self.entries.iter().map(|r| *r.key()).collect()
    }
}

/// One (possibly nested) Static build on the current thread.
///
/// Instances staged inside the outermost section move into the shared cache
/// when it is dropped after [`commit`](Self::commit); otherwise every one of
/// them is discarded, so a failed build never leaves a half-wired peer behind.
pub(crate) struct StaticSection<'a> {
    storage: &'a ServiceStorage,
    guard: ReentrantMutexGuard<'a, RefCell<Staging>>,
    committed: bool,
}

impl StaticSection<'_> {
    /// A fully built instance, or one staged earlier in this build.
    pub(crate) fn lookup(&self, id: &ServiceId) -> Option<Instance> {
        if let Some(instance) = self.storage.cached(id) {
            return Some(instance);
        }
        self.guard.borrow().pending.get(id).map(Arc::clone)
    }

    pub(crate) fn stage(&self, id: ServiceId, instance: Instance) {
        self.guard.borrow_mut().pending.insert(id, instance);
    }

    pub(crate) fn unstage(&self, id: &ServiceId) {
        self.guard.borrow_mut().pending.remove(id);
    }

    /// Mark this section's build as successful.
    pub(crate) fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StaticSection<'_> {
    fn drop(&mut self) {
        let staged = {
            let mut staging = self.guard.borrow_mut();
            staging.depth -= 1;
            if staging.depth > 0 {
                return;
            }
            std::mem::take(&mut staging.pending)
        };

        if self.committed {
            for (id, instance) in staged {
                self.storage.cache(id, instance);
            }
        }
    }
}

impl Default for ServiceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStorage")
            .field("count", &self.len())
            .field("statics", &self.cached_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{erase, Strategy};

    struct TestService {
        value: i32,
    }

    fn stored(value: i32) -> Entry {
        Entry::new(
            ServiceId::of_type::<TestService>(),
            Strategy::Instance(erase(Arc::new(TestService { value }))),
        )
    }

    #[test]
    fn test_storage_insert_and_replace() {
        let storage = ServiceStorage::new();
        let id = ServiceId::of_type::<TestService>();

        assert!(!storage.contains(&id));
        assert!(!storage.insert(stored(1)));
        assert!(storage.insert(stored(2)));
        assert_eq!(storage.len(), 1);

        let entry = storage.entry(&id).unwrap();
        match &entry.strategy {
            Strategy::Instance(instance) => {
                let service = instance.downcast_ref::<Arc<TestService>>().unwrap();
                assert_eq!(service.value, 2);
            }
            _ => panic!("expected stored instance"),
        }
    }

    #[test]
    fn test_committed_section_publishes_staged() {
        let storage = ServiceStorage::with_capacity(100);
        let id = ServiceId::of_type::<TestService>();
        let instance = erase(Arc::new(TestService { value: 0 }));

        let section = storage.enter_statics();
        assert!(section.lookup(&id).is_none());
        section.stage(id, Arc::clone(&instance));

        // Visible to the build, not to the shared cache
        assert!(Arc::ptr_eq(&section.lookup(&id).unwrap(), &instance));
        assert!(storage.cached(&id).is_none());

        section.commit();
        assert!(Arc::ptr_eq(&storage.cached(&id).unwrap(), &instance));
        assert_eq!(storage.cached_len(), 1);
    }

    #[test]
    fn test_dropped_section_discards_staged() {
        let storage = ServiceStorage::new();
        let id = ServiceId::of_type::<TestService>();

        let section = storage.enter_statics();
        section.stage(id, erase(Arc::new(TestService { value: 0 })));
        drop(section);

        assert_eq!(storage.cached_len(), 0);
        assert!(storage.enter_statics().lookup(&id).is_none());
    }

    #[test]
    fn test_nested_sections_publish_with_outermost() {
        let storage = ServiceStorage::new();
        let id = ServiceId::of_type::<TestService>();

        let outer = storage.enter_statics();
        let inner = storage.enter_statics();
        inner.stage(id, erase(Arc::new(TestService { value: 1 })));
        inner.commit();

        // Inner success alone publishes nothing
        assert!(storage.cached(&id).is_none());
        assert!(outer.lookup(&id).is_some());

        drop(outer);
        assert!(storage.cached(&id).is_none());
    }

    #[test]
    fn test_shard_amount() {
        assert_eq!(shard_amount(0), 8);
        assert_eq!(shard_amount(50), 16);
        assert_eq!(shard_amount(500), 32);
    }
}
