//! Path query engine: O(log² V) aggregates over tree paths.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use super::cache::{CacheKey, QueryCache};
use super::index::TreeIndex;
use super::stats::{AtomicStats, PathEngineStats};
use crate::config::PathEngineConfig;
use crate::features::crs::{self, CrsRecorder, StepRecord, ToolParams};
use crate::features::hld::PathSegment;
use crate::features::segment_tree::{AggFunc, SegmentTree};
use crate::shared::cancel::CancelToken;
use crate::shared::metrics::{noop_metrics, MetricsHandle};
use crate::shared::models::{GraphError, Result};

/// Tunables for one engine instance
#[derive(Debug, Clone)]
pub struct PathQueryOptions {
    /// Queries slower than this log a warning; nothing is aborted
    pub slow_query_threshold: Duration,
    /// LRU capacity of the result cache; 0 disables caching
    pub query_cache_size: usize,
}

impl Default for PathQueryOptions {
    fn default() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(50),
            query_cache_size: 1024,
        }
    }
}

impl From<&PathEngineConfig> for PathQueryOptions {
    fn from(cfg: &PathEngineConfig) -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(cfg.slow_query_threshold_ms),
            query_cache_size: cfg.query_cache_size,
        }
    }
}

/// Read side of the path-decomposition composite.
///
/// Holds the decomposition (or forest), the shared segment tree, and an
/// optional bounded result cache. Not safe for concurrent use against
/// updates without external synchronization: the segment tree mutates even
/// on queries (lazy push).
pub struct PathQueryEngine {
    index: TreeIndex,
    seg: Arc<Mutex<SegmentTree>>,
    agg: AggFunc,
    options: PathQueryOptions,
    cache: Option<QueryCache>,
    stats: AtomicStats,
    recorder: Option<Arc<CrsRecorder>>,
    metrics: MetricsHandle,
}

impl PathQueryEngine {
    /// The segment tree's size must equal the index's position count.
    pub fn new(
        index: TreeIndex,
        seg: Arc<Mutex<SegmentTree>>,
        options: PathQueryOptions,
    ) -> Result<Self> {
        let (size, agg) = {
            let tree = seg.lock();
            (tree.size(), tree.agg())
        };
        if size != index.total_positions() {
            return Err(GraphError::ValidationFailed(format!(
                "segment tree covers {size} positions but the index has {}",
                index.total_positions()
            )));
        }
        let cache = QueryCache::with_capacity(options.query_cache_size);
        Ok(Self {
            index,
            seg,
            agg,
            options,
            cache,
            stats: AtomicStats::default(),
            recorder: None,
            metrics: noop_metrics(),
        })
    }

    /// Wrap a freshly built segment tree. Use `segment_tree()` afterwards to
    /// share the same tree with sibling engines.
    pub fn from_parts(index: TreeIndex, seg: SegmentTree, options: PathQueryOptions) -> Result<Self> {
        Self::new(index, Arc::new(Mutex::new(seg)), options)
    }

    pub fn with_recorder(mut self, recorder: Arc<CrsRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    #[inline]
    pub fn agg(&self) -> AggFunc {
        self.agg
    }

    #[inline]
    pub fn index(&self) -> &TreeIndex {
        &self.index
    }

    /// Shared handle for sibling engines built over the same value array
    pub fn segment_tree(&self) -> Arc<Mutex<SegmentTree>> {
        Arc::clone(&self.seg)
    }

    pub(crate) fn recorder(&self) -> Option<&CrsRecorder> {
        self.recorder.as_deref()
    }

    pub fn stats(&self) -> PathEngineStats {
        self.stats.snapshot()
    }

    pub(crate) fn record_update_stats(&self, nanos: u64, segments: u64) {
        self.stats.record_update(nanos, segments);
    }

    /// Drop every cached query result
    pub fn purge_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.purge();
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Aggregate over the u–v path with the configured aggregation.
    pub fn path_query(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<i64> {
        let started = Instant::now();
        ctx.check()?;
        require_ids(u, v)?;

        let segments = self.index.decompose_path(u, v)?;

        let mut tree = self.seg.lock();
        let key = self.cache.as_ref().map(|_| CacheKey {
            u: u.to_string(),
            v: v.to_string(),
            agg: self.agg,
            index_key: self.index.cache_key(),
            version: tree.version(),
        });
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(hit) = cache.get(key) {
                self.stats.cache_hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.stats.record_query(started.elapsed().as_nanos() as u64);
                return Ok(hit);
            }
            self.stats.cache_misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }

        let mut acc = self.agg.identity();
        for segment in &segments {
            ctx.check()?;
            let (lo, hi) = segment.normalized();
            acc = self.agg.combine(acc, tree.query(lo, hi)?);
        }
        drop(tree);

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.put(key, acc);
        }

        let elapsed = started.elapsed();
        self.stats.record_query(elapsed.as_nanos() as u64);
        self.metrics.observe_ms("path_query", elapsed.as_secs_f64() * 1000.0);
        if elapsed > self.options.slow_query_threshold {
            warn!(
                u,
                v,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow path query"
            );
        }
        Ok(acc)
    }

    /// Convenience wrappers; each relies on the engine's configured
    /// aggregation rather than switching it per call.
    pub fn path_sum(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<i64> {
        self.path_query(ctx, u, v)
    }

    pub fn path_min(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<i64> {
        self.path_query(ctx, u, v)
    }

    pub fn path_max(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<i64> {
        self.path_query(ctx, u, v)
    }

    pub fn path_gcd(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<i64> {
        self.path_query(ctx, u, v)
    }

    // ── Topology ─────────────────────────────────────────────────────────

    pub fn lca(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<String> {
        ctx.check()?;
        require_ids(u, v)?;
        self.index.lca(u, v)
    }

    pub fn distance(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<usize> {
        ctx.check()?;
        require_ids(u, v)?;
        self.index.distance(u, v)
    }

    pub fn decompose_path(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<Vec<PathSegment>> {
        ctx.check()?;
        require_ids(u, v)?;
        self.index.decompose_path(u, v)
    }

    pub fn path_nodes(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<Vec<String>> {
        ctx.check()?;
        require_ids(u, v)?;
        self.index.path_nodes(u, v)
    }

    /// LCA over many pairs, fanned out across the rayon pool.
    pub fn batch_lca(&self, ctx: &CancelToken, pairs: &[(String, String)]) -> Result<Vec<String>> {
        ctx.check()?;
        pairs
            .par_iter()
            .map(|(u, v)| {
                ctx.check()?;
                self.index.lca(u, v)
            })
            .collect()
    }

    /// Distances over many pairs
    pub fn batch_distance(
        &self,
        ctx: &CancelToken,
        pairs: &[(String, String)],
    ) -> Result<Vec<usize>> {
        ctx.check()?;
        pairs
            .par_iter()
            .map(|(u, v)| {
                ctx.check()?;
                self.index.distance(u, v)
            })
            .collect()
    }

    // ── CRS companions ───────────────────────────────────────────────────

    pub fn path_query_with_crs(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
    ) -> (Result<i64>, StepRecord) {
        let started = Instant::now();
        let result = self.path_query(ctx, u, v);
        let step = crs::emit_step(
            self.recorder(),
            "PathQuery",
            ToolParams {
                target: u.to_string(),
                query: format!("{u}->{v} {}", self.agg.as_str()),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|value| format!("aggregate={value}"))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn lca_with_crs(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
    ) -> (Result<String>, StepRecord) {
        let started = Instant::now();
        let result = self.lca(ctx, u, v);
        let step = crs::emit_step(
            self.recorder(),
            "LCA",
            ToolParams {
                target: u.to_string(),
                query: format!("{u}|{v}"),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result.as_deref().map(str::to_string).unwrap_or_default(),
        );
        (result, step)
    }

    pub fn distance_with_crs(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
    ) -> (Result<usize>, StepRecord) {
        let started = Instant::now();
        let result = self.distance(ctx, u, v);
        let formatted = result.as_ref().map(|d| d.to_string()).unwrap_or_default();
        let step = crs::emit_step(
            self.recorder(),
            "Distance",
            ToolParams {
                target: u.to_string(),
                query: format!("{u}|{v}"),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            formatted,
        );
        (result, step)
    }

    pub fn decompose_path_with_crs(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
    ) -> (Result<Vec<PathSegment>>, StepRecord) {
        let started = Instant::now();
        let result = self.decompose_path(ctx, u, v);
        let step = crs::emit_step(
            self.recorder(),
            "DecomposePath",
            ToolParams {
                target: u.to_string(),
                query: format!("{u}->{v}"),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|segs| format!("{} segments", segs.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }

    /// One parent step describes the whole batch; per-pair work does not
    /// produce its own top-level steps.
    pub fn batch_lca_with_crs(
        &self,
        ctx: &CancelToken,
        pairs: &[(String, String)],
    ) -> (Result<Vec<String>>, StepRecord) {
        let started = Instant::now();
        let result = self.batch_lca(ctx, pairs);
        let step = crs::emit_step(
            self.recorder(),
            "BatchLCA",
            ToolParams {
                target: String::new(),
                query: format!("{} pairs", pairs.len()),
                limit: pairs.len() as u64,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|r| format!("{} results", r.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn batch_distance_with_crs(
        &self,
        ctx: &CancelToken,
        pairs: &[(String, String)],
    ) -> (Result<Vec<usize>>, StepRecord) {
        let started = Instant::now();
        let result = self.batch_distance(ctx, pairs);
        let step = crs::emit_step(
            self.recorder(),
            "BatchDistance",
            ToolParams {
                target: String::new(),
                query: format!("{} pairs", pairs.len()),
                limit: pairs.len() as u64,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|r| format!("{} results", r.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }
}

pub(crate) fn require_ids(u: &str, v: &str) -> Result<()> {
    if u.is_empty() {
        return Err(GraphError::NodeNotFound("<empty id>".to_string()));
    }
    if v.is_empty() {
        return Err(GraphError::NodeNotFound("<empty id>".to_string()));
    }
    Ok(())
}
