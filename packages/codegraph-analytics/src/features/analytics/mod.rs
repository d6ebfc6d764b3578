//! Graph-level analytics over the frozen graph.
//!
//! Everything here is read-only; engines borrow the frozen graph and never
//! outlive it. The `Analytics` wrapper adds CRS decoration on top of the
//! plain functions.

mod coupling;
mod cycles;
mod dead_code;
mod hotspots;
mod pagerank;
mod sese;

pub use coupling::{all_package_coupling, package_coupling, CouplingMetrics};
pub use cycles::{cyclic_dependencies, has_cycle_from, Cycle};
pub use dead_code::dead_code;
pub use hotspots::{hotspots, Hotspot};
pub use pagerank::{PageRank, PageRankConfig, PageRankResult};
pub use sese::{sese_regions, DominatorTree, SeseAnalysis, SeseRegion};

use std::sync::Arc;
use std::time::Instant;

use crate::features::crs::{self, CrsRecorder, StepRecord, ToolParams};
use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::models::Result;

/// CRS-decorated facade over the analytic functions.
pub struct Analytics {
    graph: Arc<CodeGraph>,
    recorder: Option<Arc<CrsRecorder>>,
}

impl Analytics {
    pub fn new(graph: Arc<CodeGraph>) -> Self {
        Self {
            graph,
            recorder: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Arc<CrsRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn graph(&self) -> &Arc<CodeGraph> {
        &self.graph
    }

    pub fn pagerank_with_crs(
        &self,
        ctx: &CancelToken,
        config: &PageRankConfig,
    ) -> (Result<PageRankResult>, StepRecord) {
        let started = Instant::now();
        let result = PageRank::new(config.clone()).compute(ctx, &self.graph);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "analytics_pagerank",
            ToolParams {
                target: String::new(),
                query: format!("damping={} max_iter={}", config.damping, config.max_iterations),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|r| format!("{} iterations, converged={}", r.iterations, r.converged))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn hotspots_with_crs(
        &self,
        ctx: &CancelToken,
        k: usize,
    ) -> (Result<Vec<Hotspot>>, StepRecord) {
        let started = Instant::now();
        let result = hotspots(ctx, &self.graph, k);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "analytics_hotspots",
            ToolParams {
                target: String::new(),
                query: format!("top {k}"),
                limit: k as u64,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|r| format!("{} hotspots", r.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn dead_code_with_crs(&self, ctx: &CancelToken) -> (Result<Vec<String>>, StepRecord) {
        let started = Instant::now();
        let result = dead_code(ctx, &self.graph);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "analytics_dead_code",
            ToolParams::default(),
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|r| format!("{} dead symbols", r.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn cyclic_dependencies_with_crs(
        &self,
        ctx: &CancelToken,
    ) -> (Result<Vec<Cycle>>, StepRecord) {
        let started = Instant::now();
        let result = cyclic_dependencies(ctx, &self.graph);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "analytics_cycles",
            ToolParams::default(),
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|r| format!("{} cycles", r.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn sese_regions_with_crs(
        &self,
        ctx: &CancelToken,
        dom: &DominatorTree,
        pdom: &DominatorTree,
    ) -> (Result<SeseAnalysis>, StepRecord) {
        let started = Instant::now();
        let result = sese_regions(ctx, &self.graph, dom, pdom);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "analytics_sese",
            ToolParams {
                target: dom.root().to_string(),
                query: format!("dom={} pdom={}", dom.root(), pdom.root()),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|a| format!("{} regions", a.regions.len()))
                .unwrap_or_default(),
        );
        (result, step)
    }

    pub fn package_coupling_with_crs(
        &self,
        ctx: &CancelToken,
        package: &str,
    ) -> (Result<CouplingMetrics>, StepRecord) {
        let started = Instant::now();
        let result = package_coupling(ctx, &self.graph, package);
        let step = crs::emit_step(
            self.recorder.as_deref(),
            "analytics_coupling",
            ToolParams {
                target: package.to_string(),
                query: String::new(),
                limit: 0,
            },
            result.as_ref().err(),
            started,
            result
                .as_ref()
                .map(|m| format!("instability={:.3}", m.instability))
                .unwrap_or_default(),
        );
        (result, step)
    }
}
