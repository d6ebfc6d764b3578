//! Top-level wiring: one frozen graph, one configuration, every engine.
//!
//! The facade owns the decomposition lifecycle so callers do not juggle
//! index/segment-tree/engine plumbing: build it once over a frozen graph,
//! attach a value array, and the path, subtree, and analytic surfaces hang
//! off it sharing one segment tree and one recorder.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::features::analytics::{Analytics, PageRank, PageRankResult};
use crate::features::crs::{CrsConfig, CrsRecorder, Recorder};
use crate::features::graph_store::CodeGraph;
use crate::features::hld::build_hld_forest;
use crate::features::path_ops::{PathQueryEngine, PathQueryOptions, PathUpdateEngine, TreeIndex};
use crate::features::segment_tree::{AggFunc, SegmentTree};
use crate::features::subtree::SubtreeEngine;
use crate::shared::cancel::CancelToken;
use crate::shared::models::{GraphError, Result};

struct Engines {
    index: TreeIndex,
    query: Arc<PathQueryEngine>,
    update: Option<PathUpdateEngine>,
    subtree: SubtreeEngine,
}

/// One-stop composite over a frozen graph.
///
/// Decomposition-backed surfaces are unavailable until `attach_values` has
/// run; graph-level analytics work immediately.
pub struct GraphAnalytics {
    graph: Arc<CodeGraph>,
    config: EngineConfig,
    crs: Option<Arc<CrsRecorder>>,
    analytics: Analytics,
    engines: Option<Engines>,
}

impl GraphAnalytics {
    pub fn new(graph: Arc<CodeGraph>, config: EngineConfig) -> Result<Self> {
        if !graph.is_frozen() {
            return Err(GraphError::GraphNotFrozen);
        }
        let analytics = Analytics::new(Arc::clone(&graph));
        Ok(Self {
            graph,
            config,
            crs: None,
            analytics,
            engines: None,
        })
    }

    /// Plug a step sink in; the session manager is configured from the
    /// `crs` section of the engine configuration. Call before
    /// `attach_values` so the engines pick the recorder up.
    pub fn with_recorder(mut self, sink: Arc<dyn Recorder>) -> Self {
        let crs = Arc::new(CrsRecorder::new(sink, CrsConfig::from(&self.config.crs)));
        self.analytics = Analytics::new(Arc::clone(&self.graph)).with_recorder(Arc::clone(&crs));
        self.crs = Some(crs);
        self
    }

    /// Decompose the graph (forest mode, so disconnected inputs work) and
    /// build the shared segment tree from the supplied per-node values.
    pub fn attach_values<F>(&mut self, ctx: &CancelToken, agg: AggFunc, value: F) -> Result<()>
    where
        F: Fn(&str) -> i64,
    {
        let forest = build_hld_forest(ctx, &self.graph)?;
        let index = TreeIndex::Forest(Arc::new(forest));
        let values = index.build_values(&value);
        let seg = SegmentTree::build(&values, agg)?;

        let options = PathQueryOptions::from(&self.config.path_engine);
        let mut query = PathQueryEngine::from_parts(index.clone(), seg, options)?;
        if let Some(crs) = &self.crs {
            query = query.with_recorder(Arc::clone(crs));
        }
        let query = Arc::new(query);

        let update = if agg == AggFunc::Sum {
            Some(PathUpdateEngine::new(Arc::clone(&query))?)
        } else {
            None
        };

        let mut subtree = SubtreeEngine::new(index.clone(), query.segment_tree())?;
        if let Some(crs) = &self.crs {
            subtree = subtree.with_recorder(Arc::clone(crs));
        }

        self.engines = Some(Engines {
            index,
            query,
            update,
            subtree,
        });
        Ok(())
    }

    fn engines(&self) -> Result<&Engines> {
        self.engines.as_ref().ok_or(GraphError::HldNotInitialized)
    }

    // ── Surfaces ─────────────────────────────────────────────────────────

    pub fn graph(&self) -> &Arc<CodeGraph> {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn crs(&self) -> Option<&Arc<CrsRecorder>> {
        self.crs.as_ref()
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    /// The decomposition index, once attached
    pub fn index(&self) -> Result<&TreeIndex> {
        Ok(&self.engines()?.index)
    }

    /// Read side of the path composite
    pub fn path_query(&self) -> Result<&Arc<PathQueryEngine>> {
        Ok(&self.engines()?.query)
    }

    /// Write side; fails for non-SUM aggregations
    pub fn path_update(&self) -> Result<&PathUpdateEngine> {
        let engines = self.engines()?;
        engines
            .update
            .as_ref()
            .ok_or_else(|| GraphError::RangeUpdateNotSupported(engines.query.agg().as_str()))
    }

    pub fn subtree(&self) -> Result<&SubtreeEngine> {
        Ok(&self.engines()?.subtree)
    }

    /// PageRank with the configured settings
    pub fn pagerank(&self, ctx: &CancelToken) -> Result<PageRankResult> {
        PageRank::new(self.config.pagerank.clone()).compute(ctx, &self.graph)
    }
}
