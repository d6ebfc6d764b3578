//! Cycle detection: reachable back edges and strongly connected components.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{GraphError, Result};

/// One non-trivial cycle: its members and length
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub length: usize,
}

/// Is any directed cycle reachable from `root`?
///
/// Iterative white/grey/black DFS over outgoing edges; a grey-to-grey edge
/// is a back edge. Self-loops count as cycles of length 1.
pub fn has_cycle_from(ctx: &CancelToken, graph: &CodeGraph, root: &str) -> Result<bool> {
    let root_idx = graph
        .node_idx(root)
        .ok_or_else(|| GraphError::NodeNotFound(root.to_string()))?;

    const WHITE: u8 = 0;
    const GREY: u8 = 1;
    const BLACK: u8 = 2;

    let mut color = vec![WHITE; graph.node_count()];
    let mut stack: Vec<(usize, usize)> = vec![(root_idx, 0)];
    color[root_idx] = GREY;
    let mut steps = 0usize;

    while let Some(top) = stack.last_mut() {
        steps += 1;
        if steps % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let (v, next) = (top.0, top.1);
        let node = graph.node_by_idx(v);
        if next < node.outgoing().len() {
            top.1 += 1;
            let edge = graph.edge(node.outgoing()[next]);
            let Some(w) = graph.node_idx(&edge.to_id) else {
                continue;
            };
            match color[w] {
                GREY => return Ok(true),
                WHITE => {
                    color[w] = GREY;
                    stack.push((w, 0));
                }
                _ => {}
            }
        } else {
            color[v] = BLACK;
            stack.pop();
        }
    }
    Ok(false)
}

/// All strongly connected components that form real cycles: SCCs with more
/// than one member, plus single nodes with a self-loop. Members and the
/// cycle list itself are sorted for deterministic output.
pub fn cyclic_dependencies(ctx: &CancelToken, graph: &CodeGraph) -> Result<Vec<Cycle>> {
    ctx.check()?;

    let mut pg: DiGraph<String, ()> = DiGraph::new();
    let mut indices: FxHashMap<&str, NodeIndex> = FxHashMap::default();
    for node in graph.nodes() {
        let idx = pg.add_node(node.id().to_string());
        indices.insert(node.id(), idx);
    }
    let mut self_loops: FxHashMap<&str, bool> = FxHashMap::default();
    for (i, edge) in graph.edges().iter().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        if edge.is_self_loop() {
            self_loops.insert(edge.from_id.as_str(), true);
        }
        if let (Some(&from), Some(&to)) = (
            indices.get(edge.from_id.as_str()),
            indices.get(edge.to_id.as_str()),
        ) {
            pg.add_edge(from, to, ());
        }
    }

    let mut cycles: Vec<Cycle> = tarjan_scc(&pg)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1
                || (scc.len() == 1 && *self_loops.get(pg[scc[0]].as_str()).unwrap_or(&false))
        })
        .map(|scc| {
            let mut nodes: Vec<String> = scc.into_iter().map(|idx| pg[idx].clone()).collect();
            nodes.sort_unstable();
            let length = nodes.len();
            Cycle { nodes, length }
        })
        .collect();
    cycles.sort_by(|a, b| a.nodes.cmp(&b.nodes));
    Ok(cycles)
}
