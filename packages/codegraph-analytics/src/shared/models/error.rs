//! Unified error type for the analytics engine.
//!
//! One crate-wide enum keeps classification (for step records) and recovery
//! policy in a single place. Transient/cancellation errors bubble immediately;
//! invariant violations are fatal to the calling engine; builder errors are
//! aggregated into the build report instead of surfacing here.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum GraphError {
    /// Mutation attempted after freeze
    #[error("graph is frozen; rebuild instead of mutating")]
    GraphFrozen,

    /// Duplicate node add
    #[error("node already exists: {0}")]
    NodeExists(String),

    /// Unknown node lookup
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Cycle / disconnection / wrong edge count in a candidate tree
    #[error("not a tree: {0}")]
    InvalidTree(String),

    /// HLD build precondition: root is not in the graph
    #[error("root not found: {0}")]
    RootNotFound(String),

    /// HLD build precondition: graph has no nodes
    #[error("graph is empty")]
    EmptyGraph,

    /// HLD build precondition: graph must be frozen first
    #[error("graph is not frozen")]
    GraphNotFrozen,

    /// Post-build invariant violation
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// Segment-tree index error
    #[error("invalid range [{l}, {r}] for size {size}")]
    InvalidRange { l: usize, r: usize, size: usize },

    /// Segment-tree build over an empty value array
    #[error("cannot build segment tree over an empty array")]
    EmptyArray,

    /// Segment-tree build over an oversized value array
    #[error("array too large: {0} positions")]
    ArrayTooLarge(usize),

    /// Unknown aggregation function name
    #[error("invalid aggregation function: {0}")]
    InvalidAggFunc(String),

    /// Range update on a non-SUM tree
    #[error("range update is only supported for SUM aggregation (got {0})")]
    RangeUpdateNotSupported(&'static str),

    /// Forest mode: operation spans two trees
    #[error("nodes {u} and {v} are in different trees")]
    CrossTree { u: String, v: String },

    /// Path engine used before a decomposition was attached
    #[error("heavy-light decomposition not initialized")]
    HldNotInitialized,

    /// Forest-aware LCA over nodes without a common root
    #[error("nodes {u} and {v} have no common tree")]
    NodesInDifferentTrees { u: String, v: String },

    /// Query adapter used after close
    #[error("graph query interface is closed")]
    GraphQueryClosed,

    /// Cooperative cancellation observed
    #[error("operation cancelled")]
    Cancelled,

    /// Deadline attached to the cancellation token elapsed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl GraphError {
    /// Cancellation-family errors bubble without wrapping
    #[inline]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, GraphError::Cancelled | GraphError::DeadlineExceeded)
    }

    /// Stable short name, used in logs and step records
    pub fn kind_str(&self) -> &'static str {
        match self {
            GraphError::GraphFrozen => "graph_frozen",
            GraphError::NodeExists(_) => "node_exists",
            GraphError::NodeNotFound(_) => "node_not_found",
            GraphError::InvalidTree(_) => "invalid_tree",
            GraphError::RootNotFound(_) => "root_not_found",
            GraphError::EmptyGraph => "empty_graph",
            GraphError::GraphNotFrozen => "graph_not_frozen",
            GraphError::ValidationFailed(_) => "validation_failed",
            GraphError::InvalidRange { .. } => "invalid_range",
            GraphError::EmptyArray => "empty_array",
            GraphError::ArrayTooLarge(_) => "array_too_large",
            GraphError::InvalidAggFunc(_) => "invalid_agg_func",
            GraphError::RangeUpdateNotSupported(_) => "range_update_not_supported",
            GraphError::CrossTree { .. } => "cross_tree",
            GraphError::HldNotInitialized => "hld_not_initialized",
            GraphError::NodesInDifferentTrees { .. } => "nodes_in_different_trees",
            GraphError::GraphQueryClosed => "graph_query_closed",
            GraphError::Cancelled => "cancelled",
            GraphError::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, GraphError>;
