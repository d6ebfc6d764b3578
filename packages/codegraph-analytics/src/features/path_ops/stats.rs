//! Engine statistics, updated with relaxed atomics on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct AtomicStats {
    pub query_count: AtomicU64,
    pub update_count: AtomicU64,
    pub total_latency_nanos: AtomicU64,
    pub segments_updated: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl AtomicStats {
    pub fn snapshot(&self) -> PathEngineStats {
        PathEngineStats {
            query_count: self.query_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            total_latency_nanos: self.total_latency_nanos.load(Ordering::Relaxed),
            segments_updated: self.segments_updated.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    pub fn record_query(&self, nanos: u64) {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn record_update(&self, nanos: u64, segments: u64) {
        self.update_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.segments_updated.fetch_add(segments, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEngineStats {
    pub query_count: u64,
    pub update_count: u64,
    pub total_latency_nanos: u64,
    pub segments_updated: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
