//! Candidate-tree validation.

use super::adjacency::undirected_adjacency;
use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{GraphError, Result};

/// Verify that the underlying undirected multigraph is a tree rooted at
/// `root`: connected from the root, exactly `N - 1` edges, no cycle.
///
/// Iterative DFS tracking the parent *edge* (not node), so parallel edges
/// between the same pair register as a cycle. Returns the first violation
/// encountered.
pub fn is_tree(ctx: &CancelToken, graph: &CodeGraph, root: &str) -> Result<()> {
    if !graph.is_frozen() {
        return Err(GraphError::GraphNotFrozen);
    }
    let n = graph.node_count();
    if n == 0 {
        return Err(GraphError::EmptyGraph);
    }
    let root_idx = graph
        .node_idx(root)
        .ok_or_else(|| GraphError::RootNotFound(root.to_string()))?;

    let adj = undirected_adjacency(graph);
    let mut visited = vec![false; n];
    let mut stack: Vec<(usize, i64)> = vec![(root_idx, -1)];
    visited[root_idx] = true;
    let mut reached = 1usize;
    let mut frames = 0usize;

    while let Some((v, parent_edge)) = stack.pop() {
        frames += 1;
        if frames % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        for &(nbr, edge_idx) in &adj[v] {
            if edge_idx as i64 == parent_edge {
                continue;
            }
            if visited[nbr] {
                return Err(GraphError::InvalidTree(format!(
                    "cycle through edge {} -> {}",
                    graph.node_by_idx(v).id(),
                    graph.node_by_idx(nbr).id()
                )));
            }
            visited[nbr] = true;
            reached += 1;
            stack.push((nbr, edge_idx as i64));
        }
    }

    if reached != n {
        return Err(GraphError::InvalidTree(format!(
            "disconnected: {reached} of {n} nodes reachable from {root}"
        )));
    }
    if graph.edge_count() != n - 1 {
        return Err(GraphError::InvalidTree(format!(
            "expected {} edges for {} nodes, found {}",
            n - 1,
            n,
            graph.edge_count()
        )));
    }
    Ok(())
}
