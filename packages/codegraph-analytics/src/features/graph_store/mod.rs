//! Frozen graph store.
//!
//! The graph is assembled from parse results, frozen exactly once, and then
//! served read-only. Nodes and edges live in two contiguous arenas; incidence
//! lists carry edge *indices*, which dissolves Node↔Edge ownership cycles and
//! makes freeze a zero-copy publication.

mod builder;
mod dirty;
mod graph;
mod query;

pub use builder::{BuildReport, GraphBuilder, ParseResult};
pub use dirty::DirtyTracker;
pub use graph::{CodeGraph, GraphStats, Node};
pub use query::{GraphQueryAdapter, NodeFilter, QueryResult};
