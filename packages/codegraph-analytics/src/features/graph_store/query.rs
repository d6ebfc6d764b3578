//! Bounded traversal queries over a frozen graph.
//!
//! This is the adapter agent tooling talks to: filtered node lookups and
//! depth/limit-bounded walks. Results carry a `truncated` flag instead of
//! failing when a bound cuts the result set short.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::CodeGraph;
use crate::shared::models::{EdgeKind, GraphError, Result, SymbolKind};

/// Node filter for `query_nodes`
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub kind: Option<SymbolKind>,
    pub name: Option<String>,
    pub name_prefix: Option<String>,
    pub package: Option<String>,
    pub file_path: Option<String>,
}

/// Query result: IDs plus a truncation marker
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub node_ids: Vec<String>,
    pub truncated: bool,
}

/// Read-only query adapter over a frozen graph.
///
/// Build once, share freely (all methods take `&self`). `close()` detaches
/// the adapter; every call afterwards fails with `GraphQueryClosed`.
pub struct GraphQueryAdapter {
    graph: Arc<CodeGraph>,
    closed: AtomicBool,
}

impl GraphQueryAdapter {
    pub fn new(graph: Arc<CodeGraph>) -> Result<Self> {
        if !graph.is_frozen() {
            return Err(GraphError::GraphNotFrozen);
        }
        Ok(Self {
            graph,
            closed: AtomicBool::new(false),
        })
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[inline]
    fn guard(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GraphError::GraphQueryClosed);
        }
        Ok(())
    }

    /// Filtered node scan, bounded by `limit`.
    pub fn query_nodes(&self, filter: &NodeFilter, limit: usize) -> Result<QueryResult> {
        self.guard()?;
        let mut node_ids = Vec::new();
        let mut truncated = false;
        for node in self.graph.nodes() {
            let sym = node.symbol();
            if let Some(kind) = filter.kind {
                if sym.kind != kind {
                    continue;
                }
            }
            if let Some(name) = &filter.name {
                if &sym.name != name {
                    continue;
                }
            }
            if let Some(prefix) = &filter.name_prefix {
                if !sym.name.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(package) = &filter.package {
                if &sym.package != package {
                    continue;
                }
            }
            if let Some(file) = &filter.file_path {
                if &sym.file_path != file {
                    continue;
                }
            }
            if node_ids.len() == limit {
                truncated = true;
                break;
            }
            node_ids.push(sym.id.clone());
        }
        Ok(QueryResult {
            node_ids,
            truncated,
        })
    }

    /// Direct neighbors over one edge kind, bounded by `limit`.
    pub fn neighbors(
        &self,
        id: &str,
        kind: EdgeKind,
        outgoing: bool,
        limit: usize,
    ) -> Result<QueryResult> {
        self.guard()?;
        let node = self
            .graph
            .get_node(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut node_ids = Vec::new();
        let mut truncated = false;
        let edges: Box<dyn Iterator<Item = &crate::shared::models::Edge> + '_> = if outgoing {
            Box::new(self.graph.outgoing_edges(node))
        } else {
            Box::new(self.graph.incoming_edges(node))
        };
        for edge in edges.filter(|e| e.kind == kind) {
            if node_ids.len() == limit {
                truncated = true;
                break;
            }
            let other = if outgoing { &edge.to_id } else { &edge.from_id };
            node_ids.push(other.clone());
        }
        Ok(QueryResult {
            node_ids,
            truncated,
        })
    }

    /// Direct callers of a symbol
    pub fn callers(&self, id: &str, limit: usize) -> Result<QueryResult> {
        self.neighbors(id, EdgeKind::Calls, false, limit)
    }

    /// Direct callees of a symbol
    pub fn callees(&self, id: &str, limit: usize) -> Result<QueryResult> {
        self.neighbors(id, EdgeKind::Calls, true, limit)
    }

    /// Everything that (transitively) calls `id`, bounded by depth and
    /// limit. BFS over incoming CALLS edges; the start node is excluded.
    pub fn transitive_callers(
        &self,
        id: &str,
        max_depth: usize,
        limit: usize,
    ) -> Result<QueryResult> {
        self.guard()?;
        let start = self
            .graph
            .node_idx(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut node_ids = Vec::new();
        let mut truncated = false;
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        visited.insert(start);
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((start, 0));

        'bfs: while let Some((idx, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            let node = self.graph.node_by_idx(idx);
            for edge in self.graph.incoming_edges(node) {
                if edge.kind != EdgeKind::Calls {
                    continue;
                }
                let Some(next) = self.graph.node_idx(&edge.from_id) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                if node_ids.len() == limit {
                    truncated = true;
                    break 'bfs;
                }
                node_ids.push(edge.from_id.clone());
                queue.push_back((next, depth + 1));
            }
        }
        Ok(QueryResult {
            node_ids,
            truncated,
        })
    }

    /// Shortest directed path between two symbols over edges of any kind,
    /// or `None` when no path exists within `max_depth` hops. Both endpoints
    /// are included in the result.
    pub fn find_path(&self, from: &str, to: &str, max_depth: usize) -> Result<Option<Vec<String>>> {
        self.guard()?;
        let start = self
            .graph
            .node_idx(from)
            .ok_or_else(|| GraphError::NodeNotFound(from.to_string()))?;
        let target = self
            .graph
            .node_idx(to)
            .ok_or_else(|| GraphError::NodeNotFound(to.to_string()))?;
        if start == target {
            return Ok(Some(vec![from.to_string()]));
        }

        let mut prev: FxHashMap<usize, usize> = FxHashMap::default();
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        visited.insert(start);
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((start, 0));

        while let Some((idx, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            let node = self.graph.node_by_idx(idx);
            for edge in self.graph.outgoing_edges(node) {
                let Some(next) = self.graph.node_idx(&edge.to_id) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                prev.insert(next, idx);
                if next == target {
                    let mut path = vec![target];
                    let mut cur = target;
                    while let Some(&p) = prev.get(&cur) {
                        path.push(p);
                        cur = p;
                    }
                    path.reverse();
                    return Ok(Some(
                        path.into_iter()
                            .map(|i| self.graph.node_by_idx(i).id().to_string())
                            .collect(),
                    ));
                }
                queue.push_back((next, depth + 1));
            }
        }
        Ok(None)
    }

    /// Breadth-first walk over outgoing edges of any kind, bounded by both
    /// `max_depth` and `limit`. The start node is not part of the result.
    pub fn walk(&self, id: &str, max_depth: usize, limit: usize) -> Result<QueryResult> {
        self.guard()?;
        let start = self
            .graph
            .node_idx(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        let mut node_ids = Vec::new();
        let mut truncated = false;
        let mut visited: FxHashSet<usize> = FxHashSet::default();
        visited.insert(start);
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
        queue.push_back((start, 0));

        'bfs: while let Some((idx, depth)) = queue.pop_front() {
            if depth == max_depth {
                continue;
            }
            let node = self.graph.node_by_idx(idx);
            for edge in self.graph.outgoing_edges(node) {
                let Some(next) = self.graph.node_idx(&edge.to_id) else {
                    continue;
                };
                if !visited.insert(next) {
                    continue;
                }
                if node_ids.len() == limit {
                    truncated = true;
                    break 'bfs;
                }
                node_ids.push(edge.to_id.clone());
                queue.push_back((next, depth + 1));
            }
        }
        Ok(QueryResult {
            node_ids,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Location, Symbol};

    fn chain_graph() -> Arc<CodeGraph> {
        let mut g = CodeGraph::new("/proj");
        for id in ["a", "b", "c", "d"] {
            g.add_node(Symbol::new(id, id, SymbolKind::Function)).unwrap();
        }
        g.add_edge("a", "b", EdgeKind::Calls, Location::default())
            .unwrap();
        g.add_edge("b", "c", EdgeKind::Calls, Location::default())
            .unwrap();
        g.add_edge("c", "d", EdgeKind::Calls, Location::default())
            .unwrap();
        g.freeze();
        Arc::new(g)
    }

    #[test]
    fn test_requires_frozen_graph() {
        let g = Arc::new(CodeGraph::new("/proj"));
        assert!(matches!(
            GraphQueryAdapter::new(g),
            Err(GraphError::GraphNotFrozen)
        ));
    }

    #[test]
    fn test_walk_bounded_by_depth() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        let result = adapter.walk("a", 2, 100).unwrap();
        assert_eq!(result.node_ids, vec!["b", "c"]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_walk_truncates_at_limit() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        let result = adapter.walk("a", 10, 1).unwrap();
        assert_eq!(result.node_ids, vec!["b"]);
        assert!(result.truncated);
    }

    #[test]
    fn test_neighbors_direction() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        let out = adapter.neighbors("b", EdgeKind::Calls, true, 10).unwrap();
        assert_eq!(out.node_ids, vec!["c"]);
        let inc = adapter.neighbors("b", EdgeKind::Calls, false, 10).unwrap();
        assert_eq!(inc.node_ids, vec!["a"]);
    }

    #[test]
    fn test_closed_adapter_errors() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        adapter.close();
        assert!(matches!(
            adapter.walk("a", 1, 1),
            Err(GraphError::GraphQueryClosed)
        ));
        assert!(matches!(
            adapter.query_nodes(&NodeFilter::default(), 10),
            Err(GraphError::GraphQueryClosed)
        ));
    }

    #[test]
    fn test_query_nodes_filtering() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        let result = adapter
            .query_nodes(
                &NodeFilter {
                    name_prefix: Some("b".to_string()),
                    ..Default::default()
                },
                10,
            )
            .unwrap();
        assert_eq!(result.node_ids, vec!["b"]);
    }

    #[test]
    fn test_callers_and_callees() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        assert_eq!(adapter.callers("c", 10).unwrap().node_ids, vec!["b"]);
        assert_eq!(adapter.callees("c", 10).unwrap().node_ids, vec!["d"]);
    }

    #[test]
    fn test_transitive_callers() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        let result = adapter.transitive_callers("d", 10, 10).unwrap();
        assert_eq!(result.node_ids, vec!["c", "b", "a"]);

        let bounded = adapter.transitive_callers("d", 1, 10).unwrap();
        assert_eq!(bounded.node_ids, vec!["c"]);
    }

    #[test]
    fn test_find_path() {
        let adapter = GraphQueryAdapter::new(chain_graph()).unwrap();
        assert_eq!(
            adapter.find_path("a", "d", 10).unwrap().unwrap(),
            vec!["a", "b", "c", "d"]
        );
        // directed: no way back
        assert!(adapter.find_path("d", "a", 10).unwrap().is_none());
        // depth bound cuts the search off
        assert!(adapter.find_path("a", "d", 2).unwrap().is_none());
        // trivial path
        assert_eq!(adapter.find_path("b", "b", 0).unwrap().unwrap(), vec!["b"]);
    }
}
