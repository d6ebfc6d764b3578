//! Call-graph hotspots: heavily-called, heavily-calling symbols.

use serde::Serialize;

use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{EdgeKind, Result};

/// One ranked hotspot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hotspot {
    pub node_id: String,
    pub in_degree: usize,
    pub out_degree: usize,
    /// `2 * incoming CALLS + outgoing CALLS`
    pub score: u64,
    /// 1-based; equal scores share a rank
    pub rank: usize,
}

/// Top-k nodes by hotspot score, descending; ties break by node ID.
pub fn hotspots(ctx: &CancelToken, graph: &CodeGraph, k: usize) -> Result<Vec<Hotspot>> {
    let mut scored: Vec<Hotspot> = Vec::with_capacity(graph.node_count());
    for (i, node) in graph.nodes().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let in_degree = graph.incoming_count(node, EdgeKind::Calls);
        let out_degree = graph.outgoing_count(node, EdgeKind::Calls);
        scored.push(Hotspot {
            node_id: node.id().to_string(),
            in_degree,
            out_degree,
            score: (2 * in_degree + out_degree) as u64,
            rank: 0,
        });
    }

    scored.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.node_id.cmp(&b.node_id)));
    scored.truncate(k);

    let mut prev_score = None;
    let mut rank = 0usize;
    for (i, spot) in scored.iter_mut().enumerate() {
        if prev_score != Some(spot.score) {
            rank = i + 1;
            prev_score = Some(spot.score);
        }
        spot.rank = rank;
    }
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Location, Symbol, SymbolKind};

    /// Hub with three callers plus an isolated node
    fn hotspot_graph() -> CodeGraph {
        let mut g = CodeGraph::new("/proj");
        for id in ["Hub", "C1", "C2", "C3", "Iso"] {
            g.add_node(Symbol::new(id, id, SymbolKind::Function)).unwrap();
        }
        for caller in ["C1", "C2", "C3"] {
            g.add_edge(caller, "Hub", EdgeKind::Calls, Location::default())
                .unwrap();
        }
        g.freeze();
        g
    }

    #[test]
    fn test_hub_ranks_first() {
        let g = hotspot_graph();
        let top = hotspots(&CancelToken::new(), &g, 2).unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].node_id, "Hub");
        assert_eq!(top[0].in_degree, 3);
        assert_eq!(top[0].score, 6);
        assert_eq!(top[0].rank, 1);

        // callers tie at score 1; lexicographically first surfaces
        assert_eq!(top[1].node_id, "C1");
        assert_eq!(top[1].score, 1);
        assert_eq!(top[1].rank, 2);
    }

    #[test]
    fn test_equal_scores_share_rank() {
        let g = hotspot_graph();
        let top = hotspots(&CancelToken::new(), &g, 4).unwrap();
        assert_eq!(top[1].rank, 2);
        assert_eq!(top[2].rank, 2);
        assert_eq!(top[3].rank, 2);
        assert_eq!(top[1].node_id, "C1");
        assert_eq!(top[2].node_id, "C2");
    }

    #[test]
    fn test_only_calls_edges_count() {
        let mut g = CodeGraph::new("/proj");
        for id in ["a", "b"] {
            g.add_node(Symbol::new(id, id, SymbolKind::Function)).unwrap();
        }
        g.add_edge("a", "b", EdgeKind::References, Location::default())
            .unwrap();
        g.freeze();

        let top = hotspots(&CancelToken::new(), &g, 10).unwrap();
        assert!(top.iter().all(|h| h.score == 0));
    }

    #[test]
    fn test_k_larger_than_graph() {
        let g = hotspot_graph();
        let top = hotspots(&CancelToken::new(), &g, 100).unwrap();
        assert_eq!(top.len(), 5);
    }
}
