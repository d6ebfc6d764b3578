//! Pieces shared by the recursive and iterative builders.
//!
//! Both builders must produce bit-identical arrays for the same frozen graph
//! and root, so everything order-sensitive that is *not* part of the DFS
//! strategy itself (precondition checks, heavy-child selection) lives here.

use rustc_hash::FxHashMap;

use crate::features::graph_store::CodeGraph;
use crate::shared::models::{GraphError, Result};

/// Output of Phases A and B: rooted-tree arrays in preorder discovery order.
pub(crate) struct TreeSkeleton {
    pub idx_to_node: Vec<String>,
    pub node_to_idx: FxHashMap<String, usize>,
    pub parent: Vec<i64>,
    pub depth: Vec<usize>,
    pub sub_size: Vec<usize>,
    /// Children in adjacency discovery order
    pub children: Vec<Vec<usize>>,
}

impl TreeSkeleton {
    pub(crate) fn with_capacity(n: usize) -> Self {
        Self {
            idx_to_node: Vec::with_capacity(n),
            node_to_idx: FxHashMap::default(),
            parent: Vec::with_capacity(n),
            depth: Vec::with_capacity(n),
            sub_size: Vec::with_capacity(n),
            children: Vec::with_capacity(n),
        }
    }

    /// Register a node at discovery time; returns its internal index.
    pub(crate) fn discover(&mut self, id: &str, parent: i64, depth: usize) -> usize {
        let v = self.idx_to_node.len();
        self.idx_to_node.push(id.to_string());
        self.node_to_idx.insert(id.to_string(), v);
        self.parent.push(parent);
        self.depth.push(depth);
        self.sub_size.push(1);
        self.children.push(Vec::new());
        v
    }

    pub(crate) fn len(&self) -> usize {
        self.idx_to_node.len()
    }
}

/// Heavy child per node: the child with the largest subtree, ties broken by
/// the lexicographically smallest node ID.
pub(crate) fn select_heavy(sk: &TreeSkeleton) -> Vec<i64> {
    let n = sk.len();
    let mut heavy = vec![-1i64; n];
    for v in 0..n {
        let mut best: Option<usize> = None;
        for &c in &sk.children[v] {
            best = Some(match best {
                None => c,
                Some(b) => {
                    if sk.sub_size[c] > sk.sub_size[b]
                        || (sk.sub_size[c] == sk.sub_size[b]
                            && sk.idx_to_node[c] < sk.idx_to_node[b])
                    {
                        c
                    } else {
                        b
                    }
                }
            });
        }
        if let Some(b) = best {
            heavy[v] = b as i64;
        }
    }
    heavy
}

/// Shared build preconditions; returns the root's arena index.
pub(crate) fn check_preconditions(graph: &CodeGraph, root: &str) -> Result<usize> {
    if !graph.is_frozen() {
        return Err(GraphError::GraphNotFrozen);
    }
    if graph.node_count() == 0 {
        return Err(GraphError::EmptyGraph);
    }
    graph
        .node_idx(root)
        .ok_or_else(|| GraphError::RootNotFound(root.to_string()))
}
