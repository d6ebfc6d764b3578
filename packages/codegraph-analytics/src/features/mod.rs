//! Feature modules, leaves first:
//! graph_store → hld → segment_tree → path_ops / subtree → analytics → crs

pub mod analytics;
pub mod crs;
pub mod graph_store;
pub mod hld;
pub mod path_ops;
pub mod segment_tree;
pub mod subtree;
