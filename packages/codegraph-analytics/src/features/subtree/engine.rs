//! Subtree operations over contiguous position ranges.
//!
//! The decomposition visits the heavy child first, so every subtree occupies
//! one contiguous range `[pos[v], pos[v] + sub_size[v])`; subtree aggregates
//! and range-adds are a single segment-tree call each.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

use crate::features::crs::{self, CrsRecorder, StepRecord, ToolParams};
use crate::features::path_ops::stats::AtomicStats;
use crate::features::path_ops::{PathEngineStats, TreeIndex};
use crate::features::segment_tree::{AggFunc, SegmentTree};
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::metrics::{noop_metrics, MetricsHandle};
use crate::shared::models::{GraphError, Result};

/// O(log V) subtree aggregates and updates.
///
/// Same concurrency contract as the path engines: the shared segment tree
/// mutates even on queries, so external synchronization is required between
/// updates and anything else.
pub struct SubtreeEngine {
    index: TreeIndex,
    seg: Arc<Mutex<SegmentTree>>,
    agg: AggFunc,
    /// node id → global half-open range; immutable while the graph is frozen
    range_cache: DashMap<String, (usize, usize)>,
    stats: AtomicStats,
    recorder: Option<Arc<CrsRecorder>>,
    metrics: MetricsHandle,
}

impl SubtreeEngine {
    pub fn new(index: TreeIndex, seg: Arc<Mutex<SegmentTree>>) -> Result<Self> {
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
        Ok(Self {
            index,
            seg,
            agg,
            range_cache: DashMap::new(),
            stats: AtomicStats::default(),
            recorder: None,
            metrics: noop_metrics(),
        })
    }

    /// Wrap a freshly built segment tree owned by this engine alone.
    pub fn from_parts(index: TreeIndex, seg: SegmentTree) -> Result<Self> {
        Self::new(index, Arc::new(Mutex::new(seg)))
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

    pub fn stats(&self) -> PathEngineStats {
        self.stats.snapshot()
    }

    /// Release the memoized ranges (memory pressure relief; they are
    /// recomputed on demand and never change while frozen)
    pub fn clear_cache(&self) {
        self.range_cache.clear();
    }

    /// Global half-open position range `[start, end)` of the subtree
    pub fn subtree_range(&self, id: &str) -> Result<(usize, usize)> {
        if let Some(range) = self.range_cache.get(id) {
            return Ok(*range);
        }
        let range = self.index.subtree_range(id)?;
        let size = self.seg.lock().size();
        if range.1 > size {
            return Err(GraphError::ValidationFailed(format!(
                "subtree range [{}, {}) of {id} escapes the value array of {size}",
                range.0, range.1
            )));
        }
        self.range_cache.insert(id.to_string(), range);
        Ok(range)
    }

    /// Node IDs inside the subtree, in position order
    pub fn subtree_nodes(&self, id: &str) -> Result<Vec<String>> {
        self.index.subtree_nodes(id)
    }

    /// Aggregate over the whole subtree: one range query.
    pub fn subtree_query(&self, ctx: &CancelToken, id: &str) -> Result<i64> {
        let started = Instant::now();
        ctx.check()?;
        let (start, end) = self.subtree_range(id)?;
        let result = self.seg.lock().query(start, end - 1)?;
        let elapsed = started.elapsed();
        self.stats.record_query(elapsed.as_nanos() as u64);
        self.metrics
            .observe_ms("subtree_query", elapsed.as_secs_f64() * 1000.0);
        Ok(result)
    }

    /// Add `delta` to every node in the subtree: one range update. SUM only.
    pub fn subtree_update(&self, ctx: &CancelToken, id: &str, delta: i64) -> Result<()> {
        let started = Instant::now();
        ctx.check()?;
        let (start, end) = self.subtree_range(id)?;
        self.seg.lock().range_update(start, end - 1, delta)?;
        self.stats
            .record_update(started.elapsed().as_nanos() as u64, 1);
        Ok(())
    }

    /// Set every node in the subtree to `value`. Point updates per position:
    /// current values differ across the subtree, so no single delta applies.
    pub fn subtree_set(&self, ctx: &CancelToken, id: &str, value: i64) -> Result<usize> {
        let started = Instant::now();
        ctx.check()?;
        let (start, end) = self.subtree_range(id)?;

        let mut applied = 0usize;
        {
            let mut tree = self.seg.lock();
            for (i, pos) in (start..end).enumerate() {
                if i % CANCEL_POLL_INTERVAL == 0 {
                    ctx.check()?;
                }
                tree.update(pos, value)?;
                applied += 1;
            }
        }
        self.stats
            .record_update(started.elapsed().as_nanos() as u64, applied as u64);
        Ok(applied)
    }

    /// Exhaustive consistency check: every node's range must sit inside
    /// `[0, size)` and cover exactly `sub_size` slots. O(V log V); intended
    /// for post-build assertions, not the hot path.
    pub fn validate(&self, ctx: &CancelToken) -> Result<()> {
        let size = self.seg.lock().size();
        if size != self.index.total_positions() {
            return Err(GraphError::ValidationFailed(format!(
                "segment tree covers {size} positions but the index has {}",
                self.index.total_positions()
            )));
        }
        match &self.index {
            TreeIndex::Tree(hld) => self.validate_tree(ctx, hld, 0, size)?,
            TreeIndex::Forest(forest) => {
                for (i, tree) in forest.trees().iter().enumerate() {
                    self.validate_tree(ctx, tree, forest.tree_offset(i), size)?;
                }
            }
        }
        Ok(())
    }

    fn validate_tree(
        &self,
        ctx: &CancelToken,
        tree: &crate::features::hld::HLDecomposition,
        offset: usize,
        size: usize,
    ) -> Result<()> {
        for v in 0..tree.node_count() {
            if v % CANCEL_POLL_INTERVAL == 0 {
                ctx.check()?;
            }
            let (start, end) = tree.subtree_range(v);
            if offset + end > size {
                return Err(GraphError::ValidationFailed(format!(
                    "subtree of {} escapes the value array",
                    tree.id_of(v)
                )));
            }
            if end - start != tree.sub_size_of(v) {
                return Err(GraphError::ValidationFailed(format!(
                    "subtree range of {} disagrees with its size",
                    tree.id_of(v)
                )));
            }
        }
        Ok(())
    }

    // ── CRS companions ───────────────────────────────────────────────────

    pub fn subtree_query_with_crs(
        &self,
        ctx: &CancelToken,
        id: &str,
    ) -> (Result<i64>, StepRecord) {
        let started = Instant::now();
        let result = self.subtree_query(ctx, id);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "SubtreeQuery",
            ToolParams {
                target: id.to_string(),
                query: self.agg.as_str().to_string(),
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

    pub fn subtree_update_with_crs(
        &self,
        ctx: &CancelToken,
        id: &str,
        delta: i64,
    ) -> (Result<()>, StepRecord) {
        let started = Instant::now();
        let result = self.subtree_update(ctx, id, delta);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "SubtreeUpdate",
            ToolParams {
                target: id.to_string(),
                query: format!("+= {delta}"),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            String::new(),
        );
        (result, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::graph_store::CodeGraph;
    use crate::features::hld::build_hld;
    use crate::shared::models::{EdgeKind, Location, Symbol, SymbolKind};

    fn engine(values: &[(&str, i64)], agg: AggFunc) -> SubtreeEngine {
        // r ── a ── c, and r ── b
        let mut g = CodeGraph::new("/proj");
        for id in ["r", "a", "b", "c"] {
            g.add_node(Symbol::new(id, id, SymbolKind::Function)).unwrap();
        }
        g.add_edge("r", "a", EdgeKind::Calls, Location::default())
            .unwrap();
        g.add_edge("r", "b", EdgeKind::Calls, Location::default())
            .unwrap();
        g.add_edge("a", "c", EdgeKind::Calls, Location::default())
            .unwrap();
        g.freeze();

        let hld = build_hld(&CancelToken::new(), &g, "r").unwrap();
        let index = TreeIndex::Tree(Arc::new(hld));
        let array = index.build_values(|id| {
            values
                .iter()
                .find(|(name, _)| *name == id)
                .map(|(_, v)| *v)
                .unwrap_or(0)
        });
        let seg = SegmentTree::build(&array, agg).unwrap();
        SubtreeEngine::from_parts(index, seg).unwrap()
    }

    #[test]
    fn test_query_update_set() {
        let ctx = CancelToken::new();
        let engine = engine(&[("r", 1), ("a", 2), ("b", 3), ("c", 4)], AggFunc::Sum);

        assert_eq!(engine.subtree_query(&ctx, "r").unwrap(), 10);
        assert_eq!(engine.subtree_query(&ctx, "a").unwrap(), 6);
        assert_eq!(engine.subtree_query(&ctx, "b").unwrap(), 3);

        engine.subtree_update(&ctx, "a", 10).unwrap();
        assert_eq!(engine.subtree_query(&ctx, "a").unwrap(), 26);
        assert_eq!(engine.subtree_query(&ctx, "b").unwrap(), 3);

        assert_eq!(engine.subtree_set(&ctx, "r", 0).unwrap(), 4);
        assert_eq!(engine.subtree_query(&ctx, "r").unwrap(), 0);
    }

    #[test]
    fn test_range_cache_and_validate() {
        let ctx = CancelToken::new();
        let engine = engine(&[], AggFunc::Sum);

        let first = engine.subtree_range("a").unwrap();
        let second = engine.subtree_range("a").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.1 - first.0, 2);

        assert!(engine.validate(&ctx).is_ok());
        engine.clear_cache();
        assert_eq!(engine.subtree_range("a").unwrap(), first);
    }

    #[test]
    fn test_unknown_node() {
        let ctx = CancelToken::new();
        let engine = engine(&[], AggFunc::Sum);
        assert!(matches!(
            engine.subtree_query(&ctx, "ghost"),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_stats_accumulate() {
        let ctx = CancelToken::new();
        let engine = engine(&[], AggFunc::Sum);
        engine.subtree_query(&ctx, "r").unwrap();
        engine.subtree_update(&ctx, "r", 1).unwrap();

        let stats = engine.stats();
        assert_eq!(stats.query_count, 1);
        assert_eq!(stats.update_count, 1);
        assert!(stats.total_latency_nanos > 0);
    }
}
