use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Per-device cache of derived contexts, keyed by device identity.
///
/// Entries only hold a [`Weak`] reference to the device, so caching never
/// extends a device's lifetime. Entries whose device has been dropped are
/// purged on every insertion, or explicitly via [`DeviceCache::purge`]. If
/// the derived context itself holds a strong reference to the device, the
/// entry lives until [`DeviceCache::evict`].
pub struct DeviceCache<D, C> {
    entries: Mutex<HashMap<usize, CacheEntry<D, C>>>,
}

struct CacheEntry<D, C> {
    device: Weak<D>,
    context: Arc<C>,
}

impl<D, C> DeviceCache<D, C> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the context cached for `device`, building it on a miss.
    ///
    /// `build` runs with the cache locked and must not call back into the
    /// same cache.
    pub fn get_or_create_for_device<F>(&self, device: &Arc<D>, build: F) -> Arc<C>
    where
        F: FnOnce(&Arc<D>) -> C,
    {
        let key = identity(device);
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(&key) {
            // A dead entry means the device was dropped; rebuild below.
            if entry
                .device
                .upgrade()
                .is_some_and(|cached| Arc::ptr_eq(&cached, device))
            {
                return Arc::clone(&entry.context);
            }
        }

        entries.retain(|_, entry| entry.device.strong_count() > 0);
        let context = Arc::new(build(device));
        entries.insert(
            key,
            CacheEntry {
                device: Arc::downgrade(device),
                context: Arc::clone(&context),
            },
        );
        tracing::debug!(entries = entries.len(), "cached derived context for device");
        context
    }

    pub fn get(&self, device: &Arc<D>) -> Option<Arc<C>> {
        let entries = self.entries.lock();
        let entry = entries.get(&identity(device))?;
        let cached = entry.device.upgrade()?;
        Arc::ptr_eq(&cached, device).then(|| Arc::clone(&entry.context))
    }

    pub fn evict(&self, device: &Arc<D>) -> Option<Arc<C>> {
        self.entries
            .lock()
            .remove(&identity(device))
            .map(|entry| entry.context)
    }

    /// Drops entries whose device no longer exists. Returns how many went.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.device.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<D, C> Default for DeviceCache<D, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D, C> fmt::Debug for DeviceCache<D, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCache")
            .field("entries", &self.len())
            .finish()
    }
}

fn identity<D>(device: &Arc<D>) -> usize {
    Arc::as_ptr(device) as *const () as usize
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Device;

    struct Root {
        serial: usize,
    }

    fn builder(counter: &AtomicUsize) -> impl FnOnce(&Arc<Device>) -> Root + '_ {
        move |_device: &Arc<Device>| Root {
            serial: counter.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    #[test]
    fn same_device_returns_same_context() {
        let cache = DeviceCache::new();
        let built = AtomicUsize::new(0);
        let device = Arc::new(Device);

        let first = cache.get_or_create_for_device(&device, builder(&built));
        let second = cache.get_or_create_for_device(&device, builder(&built));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(first.serial, 1);
    }

    #[test]
    fn distinct_devices_get_distinct_contexts() {
        let cache = DeviceCache::new();
        let built = AtomicUsize::new(0);
        let a = Arc::new(Device);
        let b = Arc::new(Device);

        let root_a = cache.get_or_create_for_device(&a, builder(&built));
        let root_b = cache.get_or_create_for_device(&b, builder(&built));

        assert!(!Arc::ptr_eq(&root_a, &root_b));
        assert_eq!(cache.len(), 2);
        assert!(Arc::ptr_eq(&cache.get(&a).expect("cached"), &root_a));
    }

    #[test]
    fn entries_do_not_keep_devices_alive() {
        let cache = DeviceCache::new();
        let built = AtomicUsize::new(0);
        let device = Arc::new(Device);
        let weak = Arc::downgrade(&device);

        let _root = cache.get_or_create_for_device(&device, builder(&built));
        drop(device);

        assert!(weak.upgrade().is_none());
        assert_eq!(cache.purge(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn evict_forces_a_rebuild() {
        let cache = DeviceCache::new();
        let built = AtomicUsize::new(0);
        let device = Arc::new(Device);

        let first = cache.get_or_create_for_device(&device, builder(&built));
        assert!(cache.evict(&device).is_some());
        let second = cache.get_or_create_for_device(&device, builder(&built));

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.serial, 2);
    }
}
