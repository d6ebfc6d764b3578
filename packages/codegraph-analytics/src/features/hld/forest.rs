//! Forest variant for disconnected graphs.
//!
//! Components are discovered by undirected flood fill in arena order; each
//! gets its own decomposition and a contiguous block of global positions.
//! Tree i occupies `[Σ_{j<i} Nj, Σ_{j≤i} Nj)` in segment-tree space.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::adjacency::undirected_adjacency;
use super::decomposition::HLDecomposition;
use super::iterative::build_tree_iterative;
use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{GraphError, Result};

/// Ordered collection of per-component decompositions.
#[derive(Debug, Clone)]
pub struct HldForest {
    trees: Vec<HLDecomposition>,
    node_to_tree: FxHashMap<String, usize>,
    /// Prefix sums of tree sizes; `offsets[i]` is tree i's first global slot
    offsets: Vec<usize>,
    total: usize,
    graph_hash: String,
}

impl HldForest {
    pub fn trees(&self) -> &[HLDecomposition] {
        &self.trees
    }

    #[inline]
    pub fn tree(&self, i: usize) -> &HLDecomposition {
        &self.trees[i]
    }

    #[inline]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn total_nodes(&self) -> usize {
        self.total
    }

    #[inline]
    pub fn graph_hash(&self) -> &str {
        &self.graph_hash
    }

    /// First global position of tree `i`
    #[inline]
    pub fn tree_offset(&self, i: usize) -> usize {
        self.offsets[i]
    }

    /// Index of the tree containing `id`
    #[inline]
    pub fn tree_of(&self, id: &str) -> Option<usize> {
        self.node_to_tree.get(id).copied()
    }

    /// Global-position offset of the tree containing `id`
    pub fn offset_of(&self, id: &str) -> Option<usize> {
        self.tree_of(id).map(|t| self.offsets[t])
    }

    /// Global position of a node across the whole forest
    pub fn global_pos(&self, id: &str) -> Option<usize> {
        let t = self.tree_of(id)?;
        let tree = &self.trees[t];
        let v = tree.idx_of(id)?;
        Some(self.offsets[t] + tree.pos_of(v))
    }

    /// Distinguishes forests of the same graph (root choice is part of each
    /// tree's key)
    pub fn cache_key(&self) -> String {
        let roots: Vec<&str> = self.trees.iter().map(|t| t.root()).collect();
        format!("{}@[{}]", self.graph_hash, roots.join(","))
    }

    /// Validate every tree plus the forest-level bookkeeping
    pub fn validate(&self) -> Result<()> {
        let mut expected_offset = 0usize;
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate()?;
            if self.offsets[i] != expected_offset {
                return Err(GraphError::ValidationFailed(format!(
                    "tree {i} offset {} is not the prefix sum {expected_offset}",
                    self.offsets[i]
                )));
            }
            expected_offset += tree.node_count();
        }
        if expected_offset != self.total {
            return Err(GraphError::ValidationFailed(
                "forest total disagrees with tree sizes".into(),
            ));
        }
        if self.node_to_tree.len() != self.total {
            return Err(GraphError::ValidationFailed(
                "node_to_tree does not cover every node exactly once".into(),
            ));
        }
        Ok(())
    }
}

/// Decompose every component of the frozen graph.
///
/// Component roots are the node with the fewest incoming edges from within
/// the component, ties broken lexicographically by ID. Per-component tree
/// checks (cycles) still apply; only the global connectivity check is waived.
pub fn build_hld_forest(ctx: &CancelToken, graph: &CodeGraph) -> Result<HldForest> {
    if !graph.is_frozen() {
        return Err(GraphError::GraphNotFrozen);
    }
    let n = graph.node_count();
    if n == 0 {
        return Err(GraphError::EmptyGraph);
    }

    let adj = undirected_adjacency(graph);
    let mut visited = vec![false; n];
    let mut trees = Vec::new();
    let mut node_to_tree = FxHashMap::default();
    let mut offsets = Vec::new();
    let mut total = 0usize;
    let mut steps = 0usize;

    for start in 0..n {
        if visited[start] {
            continue;
        }

        // Undirected flood fill collects the component.
        let mut component = Vec::new();
        let mut stack = vec![start];
        visited[start] = true;
        while let Some(v) = stack.pop() {
            steps += 1;
            if steps % CANCEL_POLL_INTERVAL == 0 {
                ctx.check()?;
            }
            component.push(v);
            for &(nbr, _) in &adj[v] {
                if !visited[nbr] {
                    visited[nbr] = true;
                    stack.push(nbr);
                }
            }
        }

        let root_arena = choose_component_root(graph, &component);
        let tree = build_tree_iterative(ctx, graph, root_arena, &adj)?;
        if tree.node_count() != component.len() {
            return Err(GraphError::InvalidTree(format!(
                "component of {} collected {} nodes but decomposed {}",
                graph.node_by_idx(root_arena).id(),
                component.len(),
                tree.node_count()
            )));
        }

        let tree_idx = trees.len();
        for id in &tree.idx_to_node {
            node_to_tree.insert(id.clone(), tree_idx);
        }
        offsets.push(total);
        total += tree.node_count();
        trees.push(tree);
    }

    debug!(trees = trees.len(), nodes = total, "forest decomposition built");
    Ok(HldForest {
        trees,
        node_to_tree,
        offsets,
        total,
        graph_hash: graph.hash().to_string(),
    })
}

/// Fewest in-component incoming edges wins; ties go to the smaller ID.
fn choose_component_root(graph: &CodeGraph, component: &[usize]) -> usize {
    let members: FxHashSet<usize> = component.iter().copied().collect();
    let mut best: Option<(usize, usize)> = None; // (incoming, arena)
    for &arena in component {
        let node = graph.node_by_idx(arena);
        let incoming = graph
            .incoming_edges(node)
            .filter(|e| graph.node_idx(&e.from_id).is_some_and(|i| members.contains(&i)))
            .count();
        best = Some(match best {
            None => (incoming, arena),
            Some((bi, ba)) => {
                let better = incoming < bi
                    || (incoming == bi && graph.node_by_idx(arena).id() < graph.node_by_idx(ba).id());
                if better {
                    (incoming, arena)
                } else {
                    (bi, ba)
                }
            }
        });
    }
    best.expect("component is never empty").1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{EdgeKind, Location, Symbol, SymbolKind};

    fn graph_with(ids: &[&str], edges: &[(&str, &str)]) -> CodeGraph {
        let mut g = CodeGraph::new("/proj");
        for id in ids {
            g.add_node(Symbol::new(*id, *id, SymbolKind::Function))
                .unwrap();
        }
        for (from, to) in edges {
            g.add_edge(from, to, EdgeKind::Calls, Location::default())
                .unwrap();
        }
        g.freeze();
        g
    }

    /// Three components sized 3, 2, 1
    fn three_tree_graph() -> CodeGraph {
        graph_with(
            &["a1", "a2", "a3", "b1", "b2", "c1"],
            &[("a1", "a2"), ("a1", "a3"), ("b1", "b2")],
        )
    }

    #[test]
    fn test_forest_sizes_and_offsets() {
        let g = three_tree_graph();
        let forest = build_hld_forest(&CancelToken::new(), &g).unwrap();

        assert_eq!(forest.tree_count(), 3);
        assert_eq!(forest.total_nodes(), 6);
        assert_eq!(forest.tree_offset(0), 0);
        assert_eq!(forest.tree_offset(1), 3);
        assert_eq!(forest.tree_offset(2), 5);
        assert!(forest.validate().is_ok());
    }

    #[test]
    fn test_node_to_tree_mapping() {
        let g = three_tree_graph();
        let forest = build_hld_forest(&CancelToken::new(), &g).unwrap();

        assert_eq!(forest.tree_of("a3"), Some(0));
        assert_eq!(forest.tree_of("b2"), Some(1));
        assert_eq!(forest.tree_of("c1"), Some(2));
        assert_eq!(forest.tree_of("ghost"), None);
        assert_eq!(forest.offset_of("b1"), Some(3));
    }

    #[test]
    fn test_component_root_has_fewest_internal_incoming() {
        // b2 has one incoming edge, b1 has none: b1 is the root
        let g = three_tree_graph();
        let forest = build_hld_forest(&CancelToken::new(), &g).unwrap();
        assert_eq!(forest.tree(1).root(), "b1");
    }

    #[test]
    fn test_component_root_tie_breaks_lexicographically() {
        // x -> y <- z : both x and z have zero incoming, x wins
        let g = graph_with(&["z", "x", "y"], &[("x", "y"), ("z", "y")]);
        let forest = build_hld_forest(&CancelToken::new(), &g).unwrap();
        assert_eq!(forest.tree_count(), 1);
        assert_eq!(forest.tree(0).root(), "x");
    }

    #[test]
    fn test_global_positions_are_disjoint_blocks() {
        let g = three_tree_graph();
        let forest = build_hld_forest(&CancelToken::new(), &g).unwrap();

        let mut positions: Vec<usize> = ["a1", "a2", "a3", "b1", "b2", "c1"]
            .iter()
            .map(|id| forest.global_pos(id).unwrap())
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cyclic_component_rejected() {
        let g = graph_with(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(matches!(
            build_hld_forest(&CancelToken::new(), &g),
            Err(GraphError::InvalidTree(_))
        ));
    }

    #[test]
    fn test_empty_graph_rejected() {
        let mut g = CodeGraph::new("/proj");
        g.freeze();
        assert!(matches!(
            build_hld_forest(&CancelToken::new(), &g),
            Err(GraphError::EmptyGraph)
        ));
    }

    #[test]
    fn test_unfrozen_rejected() {
        let g = CodeGraph::new("/proj");
        assert!(matches!(
            build_hld_forest(&CancelToken::new(), &g),
            Err(GraphError::GraphNotFrozen)
        ));
    }
}
