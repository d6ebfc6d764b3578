//! Bounded LRU cache for path-query results.
//!
//! The key carries the segment-tree version, so an entry can never be served
//! across a mutation even before the wholesale purge lands; the purge exists
//! to release memory, not for correctness alone.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use crate::features::segment_tree::AggFunc;

/// Full cache key: endpoints, aggregation, decomposition identity, version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub u: String,
    pub v: String,
    pub agg: AggFunc,
    pub index_key: String,
    pub version: u64,
}

/// Bounded, lock-protected LRU of query results
pub struct QueryCache {
    inner: Mutex<LruCache<CacheKey, i64>>,
    capacity: NonZeroUsize,
}

impl QueryCache {
    /// Returns `None` when `capacity` is zero (caching disabled).
    pub fn with_capacity(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
        })
    }

    pub(crate) fn get(&self, key: &CacheKey) -> Option<i64> {
        self.inner.lock().get(key).copied()
    }

    pub(crate) fn put(&self, key: CacheKey, value: i64) {
        self.inner.lock().put(key, value);
    }

    /// Wholesale invalidation after any mutation
    pub fn purge(&self) {
        let mut inner = self.inner.lock();
        *inner = LruCache::new(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(u: &str, version: u64) -> CacheKey {
        CacheKey {
            u: u.to_string(),
            v: "v".to_string(),
            agg: AggFunc::Sum,
            index_key: "idx".to_string(),
            version,
        }
    }

    #[test]
    fn test_zero_capacity_disables() {
        assert!(QueryCache::with_capacity(0).is_none());
    }

    #[test]
    fn test_put_get_purge() {
        let cache = QueryCache::with_capacity(4).unwrap();
        cache.put(key("a", 0), 7);
        assert_eq!(cache.get(&key("a", 0)), Some(7));
        assert_eq!(cache.get(&key("a", 1)), None, "version is part of the key");

        cache.purge();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key("a", 0)), None);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = QueryCache::with_capacity(2).unwrap();
        cache.put(key("a", 0), 1);
        cache.put(key("b", 0), 2);
        cache.get(&key("a", 0)); // refresh a
        cache.put(key("c", 0), 3); // evicts b
        assert_eq!(cache.get(&key("a", 0)), Some(1));
        assert_eq!(cache.get(&key("b", 0)), None);
        assert_eq!(cache.get(&key("c", 0)), Some(3));
    }
}
