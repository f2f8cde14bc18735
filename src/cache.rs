//! Bounded, lock-guarded get-or-compute cache for per-run results.
//!
//! Owned by the calling layer (results are expensive: decode + elevation
//! raster sampling). Capacity-limited with oldest-insertion eviction and
//! explicit invalidation for when a run's inputs are edited.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};

pub struct BoundedCache<K, V> {
    capacity: usize,
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        BoundedCache {
            capacity,
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Every mutation re-establishes the map/order invariants before the
    /// guard drops, so a poisoned lock is recoverable.
    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value for `key`, computing and storing it on a miss.
    ///
    /// `compute` runs outside the lock, so two threads missing the same
    /// key concurrently may both compute; the later insert wins. That
    /// trades duplicate work for never blocking readers on a slow compute.
    pub fn get_or_compute<F>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.lock().map.get(&key) {
            return value.clone();
        }

        let value = compute();

        let mut inner = self.lock();
        if inner.map.insert(key.clone(), value.clone()).is_none() {
            inner.order.push_back(key);
        }
        while inner.map.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.map.remove(&oldest);
                }
                None => break,
            }
        }
        value
    }

    /// Drop the cached value for `key`, if any. Call when the run's
    /// events or files change.
    pub fn invalidate(&self, key: &K) {
        let mut inner = self.lock();
        inner.map.remove(key);
        inner.order.retain(|k| k != key);
    }
}
