//! Bounded concurrent cache with get-or-create semantics.
//!
//! Every cache in this crate (algorithm instances, codec instances, unwrapped
//! keys, signature-verification results) is a [`BoundedCache`] owned by the
//! value that uses it, never a process-wide static.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;

/// Concurrent map with a maximum entry count.
///
/// Cloning is cheap and yields a handle to the same underlying map.
///
/// Values are computed outside any shard lock, so two threads racing on the
/// same missing key may both compute it; the later insert wins. Cached values
/// must therefore be interchangeable.
#[derive(Debug)]
pub struct BoundedCache<K, V>
where
    K: Eq + Hash,
{
    inner: Arc<DashMap<K, V>>,
    capacity: usize,
}

impl<K, V> Clone for BoundedCache<K, V>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capacity: self.capacity,
        }
    }
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    /// Insert `value`, evicting an arbitrary entry first when full.
    pub fn insert(&self, key: K, value: V) {
        if !self.inner.contains_key(&key) && self.inner.len() >= self.capacity {
            self.evict_one();
        }
        self.inner.insert(key, value);
    }

    /// Return the cached value for `key`, or compute, insert, and return it.
    ///
    /// Errors from `create` are returned as-is and nothing is cached.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, create: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let value = create()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.remove(key).map(|(_, v)| v)
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    fn evict_one(&self) {
        // The iterator guard must be dropped before removing, or the shard
        // read lock would deadlock against the write.
        let victim = self.inner.iter().next().map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.inner.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn initially_empty() {
        let cache: BoundedCache<String, u32> = BoundedCache::new(4);
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn get_or_insert_computes_once() {
        let cache = BoundedCache::new(4);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v: Result<u32, ()> = cache.get_or_try_insert_with("k", || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            });
            assert_eq!(v, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_creation_is_not_cached() {
        let cache: BoundedCache<&str, u32> = BoundedCache::new(4);
        let r: Result<u32, &str> = cache.get_or_try_insert_with("k", || Err("boom"));
        assert_eq!(r, Err("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let cache = BoundedCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(3, "c");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&3), Some("c"));
    }

    #[test]
    fn overwriting_existing_key_does_not_evict() {
        let cache = BoundedCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        cache.insert(2, "b2");
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), Some("a"));
        assert_eq!(cache.get(&2), Some("b2"));
    }

    #[test]
    fn clones_share_entries() {
        let cache = BoundedCache::new(8);
        let other = cache.clone();
        cache.insert("x", 1);
        assert_eq!(other.get(&"x"), Some(1));
        other.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(1, 1);
        cache.insert(2, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_get_or_insert() {
        let cache: BoundedCache<u32, u32> = BoundedCache::new(64);
        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = cache.clone();
                s.spawn(move || {
                    for k in 0..32 {
                        let v: Result<u32, ()> = cache.get_or_try_insert_with(k, || Ok(k * 2));
                        assert_eq!(v, Ok(k * 2), "thread {t}");
                    }
                });
            }
        });
        assert_eq!(cache.len(), 32);
    }
}
