//! Path update engine: range-add along tree paths.
//!
//! Built on top of a query engine so both sides share one segment tree and
//! one result cache. Because `decompose_path` emits every node position
//! exactly once, the LCA receives the delta exactly once per update; this is
//! the property the whole composite leans on.

use std::sync::Arc;
use std::time::Instant;

use super::query_engine::{require_ids, PathQueryEngine};
use crate::features::crs::{self, StepRecord, ToolParams};
use crate::features::segment_tree::AggFunc;
use crate::shared::cancel::CancelToken;
use crate::shared::models::{GraphError, Result};

/// Write side of the path-decomposition composite. SUM only.
///
/// Not safe for concurrent updates, nor concurrent update+query; wrap the
/// pair of engines in an external reader-writer discipline.
pub struct PathUpdateEngine {
    query: Arc<PathQueryEngine>,
}

impl PathUpdateEngine {
    /// Rejects construction unless the underlying aggregation is SUM.
    pub fn new(query: Arc<PathQueryEngine>) -> Result<Self> {
        if query.agg() != AggFunc::Sum {
            return Err(GraphError::RangeUpdateNotSupported(query.agg().as_str()));
        }
        Ok(Self { query })
    }

    pub fn query_engine(&self) -> &Arc<PathQueryEngine> {
        &self.query
    }

    /// Add `delta` to every node on the u–v path. Returns the number of
    /// segment-tree ranges touched.
    ///
    /// Cancellation mid-path leaves already-applied segments in place; the
    /// caller owns any all-or-nothing discipline.
    pub fn path_update(&self, ctx: &CancelToken, u: &str, v: &str, delta: i64) -> Result<usize> {
        self.path_update_impl(ctx, u, v, delta, false)
    }

    fn path_update_impl(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
        delta: i64,
        trace_segments: bool,
    ) -> Result<usize> {
        let started = Instant::now();
        ctx.check()?;
        require_ids(u, v)?;

        // Fast path: a zero delta still counts as an update for stats.
        if delta == 0 {
            self.query
                .record_update_stats(started.elapsed().as_nanos() as u64, 0);
            return Ok(0);
        }

        // Fast path: single node, single slot.
        if u == v {
            let pos = self.query.index().position(u)?;
            let seg_handle = self.query.segment_tree();
            seg_handle.lock().range_update(pos, pos, delta)?;
            self.query.purge_cache();
            self.query
                .record_update_stats(started.elapsed().as_nanos() as u64, 1);
            return Ok(1);
        }

        // Cross-tree pairs are rejected before any slot changes.
        let segments = self.query.index().decompose_path(u, v)?;

        let seg_handle = self.query.segment_tree();
        let mut applied = 0usize;
        let mut failure: Option<GraphError> = None;
        {
            let mut tree = seg_handle.lock();
            for segment in &segments {
                if let Err(e) = ctx.check() {
                    failure = Some(e);
                    break;
                }
                let (lo, hi) = segment.normalized();
                if let Err(e) = tree.range_update(lo, hi, delta) {
                    failure = Some(e);
                    break;
                }
                applied += 1;
                if trace_segments {
                    let seg_started = Instant::now();
                    crs::emit_step(
                        self.query.recorder(),
                        "PathUpdate.SegmentUpdate",
                        ToolParams {
                            target: u.to_string(),
                            query: format!("[{lo},{hi}] += {delta}"),
                            limit: 0,
                        },
                        None,
                        seg_started,
                        format!("segment {applied}/{}", segments.len()),
                    );
                }
            }
        }

        // Any applied segment invalidates cached results, even on a partial
        // (cancelled) update.
        if applied > 0 {
            self.query.purge_cache();
        }
        self.query
            .record_update_stats(started.elapsed().as_nanos() as u64, applied as u64);

        match failure {
            Some(e) => Err(e),
            None => Ok(applied),
        }
    }

    /// Absolute assignment along the path: every node's slot is set to
    /// `value` by point updates. Slower than `path_update` and semantically
    /// distinct. The cross-tree check runs before any slot changes.
    pub fn path_set(&self, ctx: &CancelToken, u: &str, v: &str, value: i64) -> Result<usize> {
        let started = Instant::now();
        ctx.check()?;
        require_ids(u, v)?;

        let segments = self.query.index().decompose_path(u, v)?;

        let seg_handle = self.query.segment_tree();
        let mut applied = 0usize;
        let mut failure: Option<GraphError> = None;
        {
            let mut tree = seg_handle.lock();
            'outer: for segment in &segments {
                let (lo, hi) = segment.normalized();
                for pos in lo..=hi {
                    if let Err(e) = ctx.check() {
                        failure = Some(e);
                        break 'outer;
                    }
                    if let Err(e) = tree.update(pos, value) {
                        failure = Some(e);
                        break 'outer;
                    }
                    applied += 1;
                }
            }
        }

        if applied > 0 {
            self.query.purge_cache();
        }
        self.query
            .record_update_stats(started.elapsed().as_nanos() as u64, applied as u64);

        match failure {
            Some(e) => Err(e),
            None => Ok(applied),
        }
    }

    /// `path_update` with a delta of +1
    pub fn path_increment(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<usize> {
        self.path_update(ctx, u, v, 1)
    }

    /// `path_update` with a delta of -1
    pub fn path_decrement(&self, ctx: &CancelToken, u: &str, v: &str) -> Result<usize> {
        self.path_update(ctx, u, v, -1)
    }

    // ── CRS companions ───────────────────────────────────────────────────

    pub fn path_update_with_crs(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
        delta: i64,
    ) -> (Result<usize>, StepRecord) {
        let started = Instant::now();
        let result = self.path_update_impl(ctx, u, v, delta, true);
        let step = crs::emit_step(
            self.query.recorder(),
            "PathUpdate",
            ToolParams {
                target: u.to_string(),
                query: format!("{u}->{v} += {delta}"),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|segments| format!("{segments} segments"))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn path_set_with_crs(
        &self,
        ctx: &CancelToken,
        u: &str,
        v: &str,
        value: i64,
    ) -> (Result<usize>, StepRecord) {
        let started = Instant::now();
        let result = self.path_set(ctx, u, v, value);
        let step = crs::emit_step(
            self.query.recorder(),
            "PathSet",
            ToolParams {
                target: u.to_string(),
                query: format!("{u}->{v} := {value}"),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|count| format!("{count} positions"))
                .unwrap_or_default(),
        );
        (result, step)
    }
}
