//! Heavy-light decomposition over a spanning tree of the frozen graph.
//!
//! The decomposition linearizes a rooted tree so that any u–v path is covered
//! by O(log V) contiguous position ranges and any subtree by exactly one.
//! Two builders (recursive and iterative) produce bit-identical arrays; the
//! forest builder handles disconnected inputs one component at a time.

mod adjacency;
mod common;
mod decomposition;
mod forest;
mod is_tree;
mod iterative;
mod recursive;

pub use decomposition::{HLDecomposition, PathSegment};
pub use forest::{build_hld_forest, HldForest};
pub use is_tree::is_tree;
pub use iterative::build_hld_iterative;
pub use recursive::build_hld;
