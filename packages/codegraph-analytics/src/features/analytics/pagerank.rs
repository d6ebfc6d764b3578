//! PageRank over the frozen call graph.
//!
//! Power iteration with sink-mass redistribution:
//!
//! ```text
//! PR(v) = (1-d)/N + d * sinkMass/N + d * Σ PR(u) / outdegree(u)
//!                                        u→v
//! ```
//!
//! Sink nodes (no outgoing edges) would leak rank mass; their mass is spread
//! evenly instead, which keeps the score vector summing to 1 even on graphs
//! full of leaf functions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::models::{GraphError, Result};

/// PageRank configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub damping: f64,

    /// Maximum iterations
    pub max_iterations: usize,

    /// Convergence threshold on the max per-node delta
    pub convergence: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            convergence: 1e-6,
        }
    }
}

/// Scores plus convergence report
#[derive(Debug, Clone)]
pub struct PageRankResult {
    pub scores: HashMap<String, f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Max per-node delta of the final iteration
    pub max_diff: f64,
}

impl PageRankResult {
    /// Top-k by score, ties broken by node ID for determinism.
    pub fn top_k(&self, k: usize) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self
            .scores
            .iter()
            .map(|(id, &score)| (id.clone(), score))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(k);
        entries
    }
}

/// PageRank engine
pub struct PageRank {
    config: PageRankConfig,
}

impl PageRank {
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    /// Run power iteration to convergence or the iteration bound.
    ///
    /// Exactly two V-sized score vectors are allocated for the whole run and
    /// swapped between iterations. Cancellation is polled each iteration.
    pub fn compute(&self, ctx: &CancelToken, graph: &CodeGraph) -> Result<PageRankResult> {
        if !graph.is_frozen() {
            return Err(GraphError::GraphNotFrozen);
        }
        let n = graph.node_count();
        if n == 0 {
            return Ok(PageRankResult {
                scores: HashMap::new(),
                iterations: 0,
                converged: true,
                max_diff: 0.0,
            });
        }

        // Incoming adjacency over arena indices; parallel edges contribute
        // once per edge, matching the outdegree they are counted in.
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut outdeg: Vec<usize> = vec![0; n];
        for arena in 0..n {
            let node = graph.node_by_idx(arena);
            outdeg[arena] = node.outgoing().len();
            for edge in graph.incoming_edges(node) {
                if let Some(from) = graph.node_idx(&edge.from_id) {
                    incoming[arena].push(from);
                }
            }
        }

        let d = self.config.damping;
        let base = (1.0 - d) / n as f64;
        let mut scores = vec![1.0 / n as f64; n];
        let mut next = vec![0.0f64; n];

        let mut iterations = 0usize;
        let mut converged = false;
        let mut max_diff = f64::INFINITY;

        while iterations < self.config.max_iterations {
            ctx.check()?;
            iterations += 1;

            let sink_mass: f64 = (0..n)
                .filter(|&v| outdeg[v] == 0)
                .map(|v| scores[v])
                .sum();
            let sink_share = d * sink_mass / n as f64;

            max_diff = 0.0;
            for v in 0..n {
                let incoming_sum: f64 = incoming[v]
                    .iter()
                    .map(|&u| scores[u] / outdeg[u] as f64)
                    .sum();
                let score = base + sink_share + d * incoming_sum;
                max_diff = max_diff.max((score - scores[v]).abs());
                next[v] = score;
            }
            std::mem::swap(&mut scores, &mut next);

            if max_diff < self.config.convergence {
                converged = true;
                debug!(iterations, max_diff, "pagerank converged");
                break;
            }
        }

        let scores = (0..n)
            .map(|v| (graph.node_by_idx(v).id().to_string(), scores[v]))
            .collect();
        Ok(PageRankResult {
            scores,
            iterations,
            converged,
            max_diff,
        })
    }
}
