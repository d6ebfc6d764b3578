/*
 * Codegraph Analytics - Frozen Graph + Path Decomposition Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Common models (Symbol, Edge, errors, cancellation)
 * - features/    : Vertical slices (graph_store → hld → segment_tree →
 *                  path_ops / subtree → analytics → crs)
 * - config/      : Engine configuration (YAML-loadable)
 *
 * The graph is built once, frozen, and then served to any number of
 * concurrent readers. All analytic engines borrow the frozen graph; none
 * mutate it. The CRS layer decorates every observable analytic with
 * session-scoped step records.
 */

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::new_without_default)]
#![allow(clippy::upper_case_acronyms)]

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Top-level engine wiring
pub mod engine;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::EngineConfig;
pub use engine::GraphAnalytics;
pub use shared::cancel::CancelToken;
pub use shared::metrics::{InMemoryMetrics, MetricsSink, NoopMetrics};
pub use shared::models::{
    CallSite, Edge, EdgeKind, GraphError, Location, MethodSig, Result, Symbol, SymbolKind,
    SymbolMetadata,
};

pub use features::graph_store::{
    BuildReport, CodeGraph, DirtyTracker, GraphBuilder, GraphQueryAdapter, GraphStats, Node,
    NodeFilter, ParseResult,
};
pub use features::hld::{
    build_hld, build_hld_forest, build_hld_iterative, is_tree, HLDecomposition, HldForest,
    PathSegment,
};
pub use features::segment_tree::{AggFunc, SegmentTree};

pub use features::path_ops::{
    PathEngineStats, PathQueryEngine, PathQueryOptions, PathUpdateEngine, TreeIndex,
};
pub use features::subtree::SubtreeEngine;

pub use features::analytics::{
    all_package_coupling, cyclic_dependencies, dead_code, has_cycle_from, hotspots,
    package_coupling, sese_regions, Analytics, CouplingMetrics, Cycle, DominatorTree, Hotspot,
    PageRank, PageRankConfig, PageRankResult, SeseAnalysis, SeseRegion,
};

pub use features::crs::{
    classify_error, CrsConfig, CrsRecorder, ErrorCategory, InMemoryRecorder, Outcome, Recorder,
    SessionGuard, StepRecord, ToolParams,
};
