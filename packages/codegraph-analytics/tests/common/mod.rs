//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::sync::Arc;

use codegraph_analytics::{
    build_hld, AggFunc, CancelToken, CodeGraph, CrsRecorder, EdgeKind, Location, PathQueryEngine,
    PathQueryOptions, SegmentTree, Symbol, SymbolKind, TreeIndex,
};

pub fn tree_graph(ids: &[&str], edges: &[(&str, &str)]) -> CodeGraph {
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

/// Nine-node hierarchy rooted at "1"; heavy path runs 1-2-5-9-8.
pub fn nine_node_tree() -> CodeGraph {
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

/// Linear chain `n00 -> n01 -> ... `
pub fn chain_graph(n: usize) -> (CodeGraph, Vec<String>) {
    let ids: Vec<String> = (0..n).map(|i| format!("n{i:03}")).collect();
    let mut g = CodeGraph::new("/proj");
    for id in &ids {
        g.add_node(Symbol::new(id, id, SymbolKind::Function)).unwrap();
    }
    for w in ids.windows(2) {
        g.add_edge(&w[0], &w[1], EdgeKind::Calls, Location::default())
            .unwrap();
    }
    g.freeze();
    (g, ids)
}

/// Three components sized 3 ({a1,a2,a3}), 2 ({b1,b2}), 1 ({c1})
pub fn three_tree_graph() -> CodeGraph {
    tree_graph(
        &["a1", "a2", "a3", "b1", "b2", "c1"],
        &[("a1", "a2"), ("a1", "a3"), ("b1", "b2")],
    )
}

/// SUM engine over one tree, values supplied per node ID
pub fn sum_engine(
    graph: &CodeGraph,
    root: &str,
    value: impl Fn(&str) -> i64,
) -> (TreeIndex, Arc<PathQueryEngine>) {
    engine_with_agg(graph, root, AggFunc::Sum, value)
}

pub fn engine_with_agg(
    graph: &CodeGraph,
    root: &str,
    agg: AggFunc,
    value: impl Fn(&str) -> i64,
) -> (TreeIndex, Arc<PathQueryEngine>) {
    let hld = build_hld(&CancelToken::new(), graph, root).unwrap();
    let index = TreeIndex::Tree(Arc::new(hld));
    let values = index.build_values(&value);
    let seg = SegmentTree::build(&values, agg).unwrap();
    let engine = PathQueryEngine::from_parts(index.clone(), seg, PathQueryOptions::default())
        .unwrap();
    (index, Arc::new(engine))
}

/// SUM engine with a CRS recorder attached
pub fn recorded_sum_engine(
    graph: &CodeGraph,
    root: &str,
    value: impl Fn(&str) -> i64,
    crs: Arc<CrsRecorder>,
) -> (TreeIndex, Arc<PathQueryEngine>) {
    let hld = build_hld(&CancelToken::new(), graph, root).unwrap();
    let index = TreeIndex::Tree(Arc::new(hld));
    let values = index.build_values(&value);
    let seg = SegmentTree::build(&values, AggFunc::Sum).unwrap();
    let engine = PathQueryEngine::from_parts(index.clone(), seg, PathQueryOptions::default())
        .unwrap()
        .with_recorder(crs);
    (index, Arc::new(engine))
}

/// Node value convention for the nine-node tree: the digit itself
pub fn digit(id: &str) -> i64 {
    id.parse().unwrap()
}
