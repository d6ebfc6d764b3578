//! Undirected adjacency over the frozen graph's arena.

use crate::features::graph_store::CodeGraph;

/// Per-node neighbor lists treating every edge as undirected.
///
/// Entry `(neighbor_arena_idx, edge_idx)`; neighbors appear in edge insertion
/// order, outgoing before incoming, which fixes the child visit order of the
/// decomposition DFS. Self-loops contribute one entry from each incidence
/// list; tree validation rejects them by edge identity.
pub(crate) fn undirected_adjacency(graph: &CodeGraph) -> Vec<Vec<(usize, usize)>> {
    let n = graph.node_count();
    let mut adj: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];

    for arena in 0..n {
        let node = graph.node_by_idx(arena);
        for &edge_idx in node.outgoing() {
            let edge = graph.edge(edge_idx);
            if let Some(to) = graph.node_idx(&edge.to_id) {
                adj[arena].push((to, edge_idx));
            }
        }
        for &edge_idx in node.incoming() {
            let edge = graph.edge(edge_idx);
            if let Some(from) = graph.node_idx(&edge.from_id) {
                adj[arena].push((from, edge_idx));
            }
        }
    }
    adj
}
