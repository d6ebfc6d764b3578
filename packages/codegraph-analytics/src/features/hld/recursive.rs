//! Recursive decomposition builder.
//!
//! Reference implementation: plain recursion for the discovery DFS (Phase A,
//! with subtree sizes accumulated on unwind — Phase B) and for the
//! position-assignment DFS (Phase C). The iterative builder must reproduce
//! these arrays bit for bit; prefer it for very deep trees.

use super::adjacency::undirected_adjacency;
use super::common::{check_preconditions, select_heavy, TreeSkeleton};
use super::decomposition::HLDecomposition;
use super::is_tree::is_tree;
use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{GraphError, Result};

/// Build the decomposition for the tree rooted at `root`, recursively.
pub fn build_hld(ctx: &CancelToken, graph: &CodeGraph, root: &str) -> Result<HLDecomposition> {
    is_tree(ctx, graph, root)?;
    let root_arena = check_preconditions(graph, root)?;
    let adj = undirected_adjacency(graph);
    build_tree_recursive(ctx, graph, root_arena, &adj)
}

/// Internal builder without the `is_tree` prologue (the forest builder runs
/// its own per-component collection). Cycles still surface as `InvalidTree`.
pub(crate) fn build_tree_recursive(
    ctx: &CancelToken,
    graph: &CodeGraph,
    root_arena: usize,
    adj: &[Vec<(usize, usize)>],
) -> Result<HLDecomposition> {
    let mut state = RecursiveBuild {
        ctx,
        graph,
        adj,
        skeleton: TreeSkeleton::with_capacity(graph.node_count()),
        assigned: vec![-1i64; graph.node_count()],
        frames: 0,
    };
    state.discover(root_arena, -1, -1, 0)?;

    let skeleton = state.skeleton;
    let heavy = select_heavy(&skeleton);

    let n = skeleton.len();
    let mut layout = PositionLayout {
        head: vec![0usize; n],
        pos: vec![0usize; n],
        node_at_pos: vec![0usize; n],
        counter: 0,
    };
    layout.assign(&skeleton, &heavy, 0, 0);

    let hld = HLDecomposition {
        root: skeleton.idx_to_node[0].clone(),
        graph_hash: graph.hash().to_string(),
        parent: skeleton.parent,
        depth: skeleton.depth,
        sub_size: skeleton.sub_size,
        heavy,
        head: layout.head,
        pos: layout.pos,
        node_at_pos: layout.node_at_pos,
        node_to_idx: skeleton.node_to_idx,
        idx_to_node: skeleton.idx_to_node,
    };
    hld.validate()?;
    Ok(hld)
}

struct RecursiveBuild<'a> {
    ctx: &'a CancelToken,
    graph: &'a CodeGraph,
    adj: &'a [Vec<(usize, usize)>],
    skeleton: TreeSkeleton,
    /// arena index → internal index, -1 while undiscovered
    assigned: Vec<i64>,
    frames: usize,
}

impl RecursiveBuild<'_> {
    /// Phase A (preorder discovery) with Phase B folded into the unwind.
    fn discover(
        &mut self,
        arena: usize,
        parent_internal: i64,
        parent_edge: i64,
        depth: usize,
    ) -> Result<usize> {
        self.frames += 1;
        if self.frames % CANCEL_POLL_INTERVAL == 0 {
            self.ctx.check()?;
        }

        let v = self
            .skeleton
            .discover(self.graph.node_by_idx(arena).id(), parent_internal, depth);
        self.assigned[arena] = v as i64;

        for i in 0..self.adj[arena].len() {
            let (nbr, edge_idx) = self.adj[arena][i];
            if edge_idx as i64 == parent_edge {
                continue;
            }
            if self.assigned[nbr] >= 0 {
                return Err(GraphError::InvalidTree(format!(
                    "cycle through edge {} -> {}",
                    self.graph.node_by_idx(arena).id(),
                    self.graph.node_by_idx(nbr).id()
                )));
            }
            let child = self.discover(nbr, v as i64, edge_idx as i64, depth + 1)?;
            self.skeleton.children[v].push(child);
            let child_size = self.skeleton.sub_size[child];
            self.skeleton.sub_size[v] += child_size;
        }
        Ok(v)
    }
}

struct PositionLayout {
    head: Vec<usize>,
    pos: Vec<usize>,
    node_at_pos: Vec<usize>,
    counter: usize,
}

impl PositionLayout {
    /// Phase C: heavy child first (extending the current path), then light
    /// children in adjacency order, each starting its own path.
    fn assign(&mut self, sk: &TreeSkeleton, heavy: &[i64], v: usize, h: usize) {
        self.head[v] = h;
        self.pos[v] = self.counter;
        self.node_at_pos[self.counter] = v;
        self.counter += 1;

        if heavy[v] >= 0 {
            self.assign(sk, heavy, heavy[v] as usize, h);
        }
        for &c in &sk.children[v] {
            if c as i64 != heavy[v] {
                self.assign(sk, heavy, c, c);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{EdgeKind, Location, Symbol, SymbolKind};

    pub(crate) fn tree_graph(ids: &[&str], edges: &[(&str, &str)]) -> CodeGraph {
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

    /// 9-node hierarchy used across the path-op test suites.
    ///
    /// Heavy path runs 1-2-5-9-8; "6" hangs off "2", "4" and "7" off "3".
    pub(crate) fn nine_node_tree() -> CodeGraph {
        tree_graph(
            &["1", "2", "3", "4", "5", "6", "7", "8", "9"],
            &[
                ("1", "2"),
                ("1", "3"),
                ("2", "5"),
                ("2", "6"),
                ("5", "9"),
                ("9", "8"),
                ("3", "4"),
                ("3", "7"),
            ],
        )
    }

    #[test]
    fn test_single_node() {
        let g = tree_graph(&["r"], &[]);
        let hld = build_hld(&CancelToken::new(), &g, "r").unwrap();
        assert_eq!(hld.node_count(), 1);
        assert_eq!(hld.pos_of(0), 0);
        assert_eq!(hld.heavy_path_count(), 1);
        assert_eq!(hld.light_edge_count(), 0);
    }

    #[test]
    fn test_linear_chain_single_heavy_path() {
        let ids: Vec<String> = (0..100).map(|i| format!("n{i:02}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = id_refs.windows(2).map(|w| (w[0], w[1])).collect();
        let g = tree_graph(&id_refs, &edges);

        let hld = build_hld(&CancelToken::new(), &g, "n00").unwrap();
        assert_eq!(hld.node_count(), 100);
        for v in 0..100 {
            assert_eq!(hld.depth_of(v), v);
            assert_eq!(hld.head_of(v), 0);
        }
        assert_eq!(hld.heavy_path_count(), 1);
        assert_eq!(hld.light_edge_count(), 0);
    }

    #[test]
    fn test_star_heavy_child_is_lex_smallest() {
        let mut ids = vec!["center"];
        let leaves: Vec<String> = (0..10).map(|i| format!("leaf{i}")).collect();
        ids.extend(leaves.iter().map(String::as_str));
        let edges: Vec<(&str, &str)> = leaves.iter().map(|l| ("center", l.as_str())).collect();
        let g = tree_graph(&ids, &edges);

        let hld = build_hld(&CancelToken::new(), &g, "center").unwrap();
        let center = hld.idx_of("center").unwrap();
        let heavy = hld.heavy_of(center).unwrap();
        assert_eq!(hld.id_of(heavy), "leaf0");
        assert_eq!(hld.light_edge_count(), 9);
    }

    #[test]
    fn test_nine_node_lca_and_distance() {
        let g = nine_node_tree();
        let hld = build_hld(&CancelToken::new(), &g, "1").unwrap();

        assert_eq!(hld.lca("8", "6").unwrap(), "2");
        assert_eq!(hld.distance("8", "6").unwrap(), 4);
        assert_eq!(hld.lca("8", "9").unwrap(), "9");
        assert_eq!(hld.lca("4", "7").unwrap(), "3");
        assert_eq!(hld.lca("9", "7").unwrap(), "1");
        assert_eq!(hld.distance("8", "8").unwrap(), 0);
        assert_eq!(hld.distance("9", "7").unwrap(), 5);
    }

    #[test]
    fn test_heavy_path_runs_root_to_deepest() {
        let g = nine_node_tree();
        let hld = build_hld(&CancelToken::new(), &g, "1").unwrap();

        // heavy chain 1-2-5-9-8 shares one head
        let root = hld.idx_of("1").unwrap();
        for id in ["2", "5", "9", "8"] {
            assert_eq!(hld.head_of(hld.idx_of(id).unwrap()), root, "head of {id}");
        }

        // one segment from "9" straight up to the root
        let segments = hld.decompose_path("9", "1").unwrap();
        assert_eq!(segments.len(), 1);
        let (lo, hi) = segments[0].normalized();
        assert_eq!(lo, hld.pos_of(root));
        assert_eq!(hi, hld.pos_of(hld.idx_of("9").unwrap()));
    }

    #[test]
    fn test_decompose_covers_each_position_once() {
        let g = nine_node_tree();
        let hld = build_hld(&CancelToken::new(), &g, "1").unwrap();

        for u in ["1", "4", "6", "8", "9"] {
            for v in ["2", "3", "5", "7", "8"] {
                let segments = hld.decompose_path(u, v).unwrap();
                let mut covered = Vec::new();
                for seg in &segments {
                    let (lo, hi) = seg.normalized();
                    covered.extend(lo..=hi);
                }
                covered.sort_unstable();
                let before = covered.len();
                covered.dedup();
                assert_eq!(before, covered.len(), "duplicate position on {u}->{v}");
                assert_eq!(before, hld.distance(u, v).unwrap() + 1);
            }
        }
    }

    #[test]
    fn test_path_nodes_walk_order() {
        let g = nine_node_tree();
        let hld = build_hld(&CancelToken::new(), &g, "1").unwrap();

        assert_eq!(
            hld.path_nodes("8", "6").unwrap(),
            vec!["8", "9", "5", "2", "6"]
        );
        assert_eq!(
            hld.path_nodes("6", "8").unwrap(),
            vec!["6", "2", "5", "9", "8"]
        );
        assert_eq!(hld.path_nodes("2", "2").unwrap(), vec!["2"]);
        // endpoint is an ancestor of the other
        assert_eq!(hld.path_nodes("1", "9").unwrap(), vec!["1", "2", "5", "9"]);
    }

    #[test]
    fn test_cycle_rejected() {
        let g = tree_graph(&["r", "a", "b"], &[("r", "a"), ("a", "b"), ("b", "r")]);
        assert!(matches!(
            build_hld(&CancelToken::new(), &g, "r"),
            Err(GraphError::InvalidTree(_))
        ));
    }

    #[test]
    fn test_validate_accepts_built_decomposition() {
        let g = nine_node_tree();
        let hld = build_hld(&CancelToken::new(), &g, "1").unwrap();
        assert!(hld.validate().is_ok());
    }
}
