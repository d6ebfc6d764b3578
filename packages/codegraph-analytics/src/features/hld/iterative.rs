//! Iterative decomposition builder.
//!
//! Produces arrays bit-identical to the recursive builder without growing the
//! call stack: Phase A runs on explicit `(node, parent, depth)` frames, Phase
//! B post-processes the captured preorder, and Phase C drives two-phase child
//! expansion with a "heavy visited" flag. Cancellation is polled every 100
//! frames.

use super::adjacency::undirected_adjacency;
use super::common::{check_preconditions, select_heavy, TreeSkeleton};
use super::decomposition::HLDecomposition;
use super::is_tree::is_tree;
use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{GraphError, Result};

/// Build the decomposition for the tree rooted at `root`, iteratively.
pub fn build_hld_iterative(
    ctx: &CancelToken,
    graph: &CodeGraph,
    root: &str,
) -> Result<HLDecomposition> {
    is_tree(ctx, graph, root)?;
    let root_arena = check_preconditions(graph, root)?;
    let adj = undirected_adjacency(graph);
    build_tree_iterative(ctx, graph, root_arena, &adj)
}

/// Internal builder without the `is_tree` prologue; the forest builder calls
/// this per component. Cycles still surface as `InvalidTree`.
pub(crate) fn build_tree_iterative(
    ctx: &CancelToken,
    graph: &CodeGraph,
    root_arena: usize,
    adj: &[Vec<(usize, usize)>],
) -> Result<HLDecomposition> {
    let mut skeleton = TreeSkeleton::with_capacity(graph.node_count());
    let mut assigned = vec![-1i64; graph.node_count()];
    let mut frames = 0usize;

    // Phase A: preorder discovery. Children are pushed in reverse adjacency
    // order so the stack pops them in adjacency order, matching recursion.
    let mut stack: Vec<DiscoverFrame> = vec![DiscoverFrame {
        arena: root_arena,
        parent_internal: -1,
        parent_edge: -1,
        depth: 0,
    }];
    while let Some(frame) = stack.pop() {
        frames += 1;
        if frames % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        if assigned[frame.arena] >= 0 {
            return Err(GraphError::InvalidTree(format!(
                "cycle reaches {} twice",
                graph.node_by_idx(frame.arena).id()
            )));
        }
        let v = skeleton.discover(
            graph.node_by_idx(frame.arena).id(),
            frame.parent_internal,
            frame.depth,
        );
        assigned[frame.arena] = v as i64;
        if frame.parent_internal >= 0 {
            skeleton.children[frame.parent_internal as usize].push(v);
        }

        for &(nbr, edge_idx) in adj[frame.arena].iter().rev() {
            if edge_idx as i64 == frame.parent_edge {
                continue;
            }
            if assigned[nbr] >= 0 {
                return Err(GraphError::InvalidTree(format!(
                    "cycle through edge {} -> {}",
                    graph.node_by_idx(frame.arena).id(),
                    graph.node_by_idx(nbr).id()
                )));
            }
            stack.push(DiscoverFrame {
                arena: nbr,
                parent_internal: v as i64,
                parent_edge: edge_idx as i64,
                depth: frame.depth + 1,
            });
        }
    }

    // Phase B: subtree sizes over the captured preorder, children first.
    let n = skeleton.len();
    for v in (1..n).rev() {
        let p = skeleton.parent[v] as usize;
        let child_size = skeleton.sub_size[v];
        skeleton.sub_size[p] += child_size;
    }

    let heavy = select_heavy(&skeleton);

    // Phase C: position assignment. Each node is expanded twice: once to take
    // its position and enter the heavy child, once (heavy_done) to start the
    // light children on paths of their own.
    let mut head = vec![0usize; n];
    let mut pos = vec![0usize; n];
    let mut node_at_pos = vec![0usize; n];
    let mut counter = 0usize;

    let mut layout: Vec<LayoutFrame> = vec![LayoutFrame {
        v: 0,
        head: 0,
        heavy_done: false,
    }];
    while let Some(frame) = layout.pop() {
        frames += 1;
        if frames % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        if !frame.heavy_done {
            head[frame.v] = frame.head;
            pos[frame.v] = counter;
            node_at_pos[counter] = frame.v;
            counter += 1;

            layout.push(LayoutFrame {
                v: frame.v,
                head: frame.head,
                heavy_done: true,
            });
            if heavy[frame.v] >= 0 {
                layout.push(LayoutFrame {
                    v: heavy[frame.v] as usize,
                    head: frame.head,
                    heavy_done: false,
                });
            }
        } else {
            for &c in skeleton.children[frame.v].iter().rev() {
                if c as i64 != heavy[frame.v] {
                    layout.push(LayoutFrame {
                        v: c,
                        head: c,
                        heavy_done: false,
                    });
                }
            }
        }
    }

    let hld = HLDecomposition {
        root: skeleton.idx_to_node[0].clone(),
        graph_hash: graph.hash().to_string(),
        parent: skeleton.parent,
        depth: skeleton.depth,
        sub_size: skeleton.sub_size,
        heavy,
        head,
        pos,
        node_at_pos,
        node_to_idx: skeleton.node_to_idx,
        idx_to_node: skeleton.idx_to_node,
    };
    hld.validate()?;
    Ok(hld)
}

struct DiscoverFrame {
    arena: usize,
    parent_internal: i64,
    parent_edge: i64,
    depth: usize,
}

struct LayoutFrame {
    v: usize,
    head: usize,
    heavy_done: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hld::recursive::build_hld;
    use crate::shared::models::{EdgeKind, Location, Symbol, SymbolKind};

    fn tree_graph(ids: &[&str], edges: &[(&str, &str)]) -> CodeGraph {
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

    fn assert_identical(g: &CodeGraph, root: &str) {
        let rec = build_hld(&CancelToken::new(), g, root).unwrap();
        let iter = build_hld_iterative(&CancelToken::new(), g, root).unwrap();

        assert_eq!(rec.idx_to_node, iter.idx_to_node);
        assert_eq!(rec.parent, iter.parent);
        assert_eq!(rec.depth, iter.depth);
        assert_eq!(rec.sub_size, iter.sub_size);
        assert_eq!(rec.heavy, iter.heavy);
        assert_eq!(rec.head, iter.head);
        assert_eq!(rec.pos, iter.pos);
        assert_eq!(rec.node_at_pos, iter.node_at_pos);
        assert_eq!(rec.graph_hash, iter.graph_hash);
    }

    #[test]
    fn test_identical_to_recursive_on_hierarchy() {
        let g = tree_graph(
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
        );
        assert_identical(&g, "1");
    }

    #[test]
    fn test_identical_to_recursive_on_chain_and_star() {
        let ids: Vec<String> = (0..64).map(|i| format!("c{i:02}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = id_refs.windows(2).map(|w| (w[0], w[1])).collect();
        assert_identical(&tree_graph(&id_refs, &edges), "c00");

        let mut star_ids = vec!["hub"];
        let leaves: Vec<String> = (0..12).map(|i| format!("leaf{i:02}")).collect();
        star_ids.extend(leaves.iter().map(String::as_str));
        let star_edges: Vec<(&str, &str)> =
            leaves.iter().map(|l| ("hub", l.as_str())).collect();
        assert_identical(&tree_graph(&star_ids, &star_edges), "hub");
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let ids: Vec<String> = (0..20_000).map(|i| format!("n{i:05}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = id_refs.windows(2).map(|w| (w[0], w[1])).collect();
        let g = tree_graph(&id_refs, &edges);

        let hld = build_hld_iterative(&CancelToken::new(), &g, "n00000").unwrap();
        assert_eq!(hld.node_count(), 20_000);
        assert_eq!(hld.depth_of(hld.idx_of("n19999").unwrap()), 19_999);
    }

    #[test]
    fn test_cancellation_mid_build() {
        let ids: Vec<String> = (0..1000).map(|i| format!("n{i:04}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let edges: Vec<(&str, &str)> = id_refs.windows(2).map(|w| (w[0], w[1])).collect();
        let g = tree_graph(&id_refs, &edges);

        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(
            build_hld_iterative(&token, &g, "n0000"),
            Err(GraphError::Cancelled)
        ));
    }

    #[test]
    fn test_root_choice_changes_arrays() {
        let g = tree_graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let from_a = build_hld_iterative(&CancelToken::new(), &g, "a").unwrap();
        let from_c = build_hld_iterative(&CancelToken::new(), &g, "c").unwrap();
        assert_eq!(from_a.root(), "a");
        assert_eq!(from_c.root(), "c");
        assert_ne!(from_a.cache_key(), from_c.cache_key());
        assert_eq!(from_a.depth_of(from_a.idx_of("c").unwrap()), 2);
        assert_eq!(from_c.depth_of(from_c.idx_of("a").unwrap()), 2);
    }
}
