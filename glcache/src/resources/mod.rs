//! Named-resource cache with polling hot reload.
//!
//! The [`ResourceCache`] hands out one shared instance per origin and refreshes
//! resources in place when their sources change. It is safe to share between
//! threads: a loader thread may `manage` while the render thread calls `find`.
//! A single lock guards the map and is only held for bookkeeping, never while
//! querying sources, reloading, or dropping evicted resources.

use std::{
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::{
    options::ResourceCacheOptions,
    util::typedefs::{FastHashMap, SsoString},
};

mod resource;
mod source;

pub use resource::*;
pub use source::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct OriginStamp {
    origin: SsoString,
    stamp: Option<ModificationStamp>,
}

type OriginStamps = SmallVec<[OriginStamp; 2]>;

struct CacheEntry {
    resource: Arc<dyn Resource>,
    /// The primary origin first, then the distributed origins.
    stamps: OriginStamps,
}

fn same_resource(a: &Arc<dyn Resource>, b: *const ()) -> bool {
    Arc::as_ptr(a) as *const () == b
}

pub struct ResourceCache {
    entries: Mutex<FastHashMap<SsoString, CacheEntry>>,
    source: Box<dyn ModificationSource>,
    options: ResourceCacheOptions,
    monitoring: AtomicBool,
    accumulator: Mutex<Duration>,
}

impl ResourceCache {
    pub fn new(source: impl ModificationSource + 'static, options: ResourceCacheOptions) -> Self {
        let monitoring = AtomicBool::new(options.monitor_on_start);
        Self {
            entries: Mutex::new(FastHashMap::default()),
            source: Box::new(source),
            options,
            monitoring,
            accumulator: Mutex::new(Duration::ZERO),
        }
    }

    pub fn options(&self) -> &ResourceCacheOptions {
        &self.options
    }

    fn query_stamps(&self, resource: &dyn Resource) -> OriginStamps {
        let mut stamps = OriginStamps::new();
        stamps.push(OriginStamp {
            origin: SsoString::from(resource.origin()),
            stamp: self.source.modification_stamp(resource.origin()),
        });
        for origin in resource.distributed_origins() {
            let stamp = self.source.modification_stamp(&origin);
            stamps.push(OriginStamp { origin, stamp });
        }
        stamps
    }

    /// Registers `resource` under its origin, replacing whatever was there.
    ///
    /// # Panics
    ///
    /// If the resource is not valid.
    pub fn manage(&self, resource: Arc<dyn Resource>) {
        assert!(
            resource.is_valid(),
            "Tried to cache invalid resource {:?}",
            resource.origin()
        );

        let stamps = self.query_stamps(&*resource);
        let key = SsoString::from(resource.origin());

        let replaced = self.entries.lock().insert(key, CacheEntry { resource, stamps });
        if let Some(replaced) = replaced {
            log::trace!("Replaced cached resource {:?}", replaced.resource.origin());
        }
    }

    pub fn find(&self, key: &str) -> Option<Arc<dyn Resource>> {
        self.entries
            .lock()
            .get(key)
            .map(|entry| Arc::clone(&entry.resource))
    }

    /// [`find`](Self::find), downcast to the concrete resource type.
    pub fn find_as<R: Resource>(&self, key: &str) -> Option<Arc<R>> {
        self.find(key)?.as_any_arc().downcast::<R>().ok()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Removes the entry for `resource`. Does nothing if its origin now maps to a
    /// different resource.
    pub fn discard(&self, resource: &dyn Resource) -> bool {
        let ptr = resource as *const dyn Resource as *const ();
        let removed = {
            let mut entries = self.entries.lock();
            let same = entries
                .get(resource.origin())
                .map_or(false, |entry| same_resource(&entry.resource, ptr));
            if same {
                entries.remove(resource.origin())
            } else {
                None
            }
        };
        removed.is_some()
    }

    /// Removes whatever is cached under `key`.
    pub fn discard_key(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key);
        removed.is_some()
    }

    pub fn clear(&self) {
        let removed = mem::take(&mut *self.entries.lock());
        log::debug!("Cleared {} cached resources", removed.len());
    }

    /// Evicts every entry nobody outside the cache references any more. Returns the
    /// number of evicted entries.
    pub fn flush(&self) -> usize {
        let mut evicted = Vec::new();
        {
            let mut entries = self.entries.lock();
            entries.retain(|_, entry| {
                if Arc::strong_count(&entry.resource) == 1 {
                    evicted.push(Arc::clone(&entry.resource));
                    false
                } else {
                    true
                }
            });
        }
        for resource in &evicted {
            log::trace!("Evicted unused resource {:?}", resource.origin());
        }
        evicted.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn origins(&self) -> Vec<SsoString> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn start_monitoring(&self) {
        if !self.monitoring.swap(true, Ordering::AcqRel) {
            log::debug!("Monitoring cached resources every {:?}", self.options.poll_interval);
        }
    }

    pub fn stop_monitoring(&self) {
        if self.monitoring.swap(false, Ordering::AcqRel) {
            log::debug!("Stopped monitoring cached resources");
        }
        *self.accumulator.lock() = Duration::ZERO;
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::Acquire)
    }

    /// Advances the poll timer. Once a full poll interval has accumulated, polls
    /// every reloadable resource. Returns the number of resources reloaded.
    pub fn update(&self, elapsed: Duration) -> usize {
        if !self.is_monitoring() {
            return 0;
        }

        let due = {
            let mut accumulator = self.accumulator.lock();
            *accumulator += elapsed;
            if *accumulator >= self.options.poll_interval {
                *accumulator = Duration::ZERO;
                true
            } else {
                false
            }
        };

        if due {
            self.perform_update()
        } else {
            0
        }
    }

    /// Polls every reloadable resource now and reloads the ones whose sources
    /// changed. Returns the number of resources reloaded.
    ///
    /// A failed reload is logged and its stamps are left alone, so the next poll
    /// tries again.
    pub fn perform_update(&self) -> usize {
        profiling::scope!("ResourceCache::perform_update");

        let candidates: Vec<(SsoString, Arc<dyn Resource>, OriginStamps)> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.resource.can_be_reloaded())
            .map(|(key, entry)| (key.clone(), Arc::clone(&entry.resource), entry.stamps.clone()))
            .collect();

        let mut reloaded = 0;
        for (key, resource, stored) in candidates {
            let changed = stored.iter().find(|stored| {
                let fresh = self.source.modification_stamp(&stored.origin);
                fresh.is_some() && fresh != stored.stamp
            });
            let Some(changed) = changed else {
                continue;
            };

            log::debug!("{:?} changed, reloading {:?}", changed.origin, key);
            match resource.reload(&changed.origin, self) {
                Ok(()) => {
                    // Sources may have moved during the reload, watch the current set.
                    let stamps = self.query_stamps(&*resource);
                    let mut entries = self.entries.lock();
                    if let Some(entry) = entries.get_mut(&key) {
                        if same_resource(&entry.resource, Arc::as_ptr(&resource) as *const ()) {
                            entry.stamps = stamps;
                        }
                    }
                    reloaded += 1;
                }
                Err(err) => {
                    log::warn!("Failed to reload {:?} after {:?} changed: {}", key, changed.origin, err);
                }
            }
        }
        reloaded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::error::ReloadError;

    struct Counted {
        origin: &'static str,
        reloads: AtomicUsize,
    }

    impl Counted {
        fn new(origin: &'static str) -> Arc<Self> {
            Arc::new(Self {
                origin,
                reloads: AtomicUsize::new(0),
            })
        }
    }

    impl Resource for Counted {
        fn origin(&self) -> &str {
            self.origin
        }

        fn is_valid(&self) -> bool {
            true
        }

        fn can_be_reloaded(&self) -> bool {
            true
        }

        fn reload(&self, _origin: &str, _cache: &ResourceCache) -> Result<(), ReloadError> {
            self.reloads.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn cache() -> (Arc<MemorySource>, ResourceCache) {
        let source = Arc::new(MemorySource::new());
        let cache = ResourceCache::new(Arc::clone(&source), ResourceCacheOptions::default());
        (source, cache)
    }

    #[test]
    fn find_misses_are_none() {
        let (_, cache) = cache();
        assert!(cache.find("missing").is_none());
        assert!(cache.find_as::<Counted>("missing").is_none());
    }

    #[test]
    fn find_as_downcasts() {
        let (_, cache) = cache();
        let a = Counted::new("a");
        cache.manage(a.clone());

        let found = cache.find_as::<Counted>("a").unwrap();
        assert!(Arc::ptr_eq(&found, &a));
    }

    #[test]
    fn discard_ignores_replaced_resource() {
        let (_, cache) = cache();
        let first = Counted::new("a");
        let second = Counted::new("a");
        cache.manage(first.clone());
        cache.manage(second.clone());

        assert!(!cache.discard(&*first));
        assert!(cache.contains("a"));
        assert!(cache.discard(&*second));
        assert!(cache.is_empty());
    }

    #[test]
    fn update_only_polls_while_monitoring() {
        let (source, cache) = cache();
        source.set_stamp("a", 1);
        let a = Counted::new("a");
        cache.manage(a.clone());
        source.set_stamp("a", 2);

        assert_eq!(cache.update(Duration::from_secs(5)), 0);
        cache.start_monitoring();
        assert_eq!(cache.update(Duration::from_millis(400)), 0);
        assert_eq!(cache.update(Duration::from_millis(600)), 1);
        assert_eq!(a.reloads.load(Ordering::Relaxed), 1);
    }

    #[test]
    #[should_panic(expected = "invalid resource")]
    fn managing_invalid_resource_panics() {
        struct Empty;
        impl Resource for Empty {
            fn origin(&self) -> &str {
                "empty"
            }

            fn is_valid(&self) -> bool {
                false
            }
        }

        let (_, cache) = cache();
        cache.manage(Arc::new(Empty));
    }
}
