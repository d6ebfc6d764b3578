//! Arena-backed code graph with one-way freeze.

use rustc_hash::FxHashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::shared::models::{Edge, EdgeKind, GraphError, Location, Result, Symbol, SymbolKind};

/// Count summary of a graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_kind: HashMap<SymbolKind, usize>,
    pub edges_by_kind: HashMap<EdgeKind, usize>,
}

/// Graph node: a symbol plus insertion-ordered incidence lists.
///
/// Incidence lists store indices into the graph's edge arena, not edges
/// themselves; the arena owns every edge exactly once.
#[derive(Debug, Clone)]
pub struct Node {
    symbol: Symbol,
    outgoing: Vec<usize>,
    incoming: Vec<usize>,
}

impl Node {
    fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    #[inline]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.symbol.id
    }

    /// Outgoing edge indices, in insertion order
    #[inline]
    pub fn outgoing(&self) -> &[usize] {
        &self.outgoing
    }

    /// Incoming edge indices, in insertion order
    #[inline]
    pub fn incoming(&self) -> &[usize] {
        &self.incoming
    }
}

/// In-memory directed multigraph of source symbols.
///
/// Mutable while building, immutable after `freeze()`. Once frozen the graph
/// is safe for any number of concurrent readers without locks; all mutators
/// fail with `GraphFrozen`.
pub struct CodeGraph {
    project: String,
    nodes: Vec<Node>,
    node_index: FxHashMap<String, usize>,
    edges: Vec<Edge>,
    frozen: AtomicBool,
    hash: String,
}

impl CodeGraph {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            nodes: Vec::new(),
            node_index: FxHashMap::default(),
            edges: Vec::new(),
            frozen: AtomicBool::new(false),
            hash: String::new(),
        }
    }

    #[inline]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Content hash computed at freeze time; empty before freeze.
    ///
    /// Stable under node/edge insertion order: IDs and edge tuples are sorted
    /// before hashing. Downstream caches key on this value.
    #[inline]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Add a node. Duplicate IDs are rejected with `NodeExists`.
    pub fn add_node(&mut self, symbol: Symbol) -> Result<()> {
        if self.is_frozen() {
            return Err(GraphError::GraphFrozen);
        }
        if self.node_index.contains_key(&symbol.id) {
            return Err(GraphError::NodeExists(symbol.id));
        }
        let idx = self.nodes.len();
        self.node_index.insert(symbol.id.clone(), idx);
        self.nodes.push(Node::new(symbol));
        Ok(())
    }

    /// Add a typed edge. Both endpoints must already exist; self-loops are
    /// permitted (self-loop cycle detection depends on them).
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        kind: EdgeKind,
        location: Location,
    ) -> Result<()> {
        if self.is_frozen() {
            return Err(GraphError::GraphFrozen);
        }
        let from_idx = *self
            .node_index
            .get(from)
            .ok_or_else(|| GraphError::NodeNotFound(from.to_string()))?;
        let to_idx = *self
            .node_index
            .get(to)
            .ok_or_else(|| GraphError::NodeNotFound(to.to_string()))?;

        let edge_idx = self.edges.len();
        self.edges.push(Edge::new(from, to, kind, location));
        self.nodes[from_idx].outgoing.push(edge_idx);
        self.nodes[to_idx].incoming.push(edge_idx);
        Ok(())
    }

    /// Freeze the graph: compact incidence lists, compute the content hash,
    /// and flip the one-way `frozen` flag with release ordering so readers on
    /// other threads observe a fully published graph. Repeated freeze is a
    /// no-op.
    pub fn freeze(&mut self) -> &str {
        if self.is_frozen() {
            return &self.hash;
        }

        for node in &mut self.nodes {
            node.outgoing.shrink_to_fit();
            node.incoming.shrink_to_fit();
        }
        self.nodes.shrink_to_fit();
        self.edges.shrink_to_fit();

        self.hash = self.compute_hash();
        self.frozen.store(true, Ordering::Release);
        tracing::debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            hash = %self.hash,
            "graph frozen"
        );
        &self.hash
    }

    fn compute_hash(&self) -> String {
        let mut ids: Vec<&str> = self.nodes.iter().map(|n| n.id()).collect();
        ids.sort_unstable();

        let mut edge_tuples: Vec<(&str, &str, &'static str)> = self
            .edges
            .iter()
            .map(|e| (e.from_id.as_str(), e.to_id.as_str(), e.kind.as_str()))
            .collect();
        edge_tuples.sort_unstable();

        let mut hasher = blake3::Hasher::new();
        for id in ids {
            hasher.update(id.as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(b"--edges--\n");
        for (from, to, kind) in edge_tuples {
            hasher.update(from.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(to.as_bytes());
            hasher.update(b"\x1f");
            hasher.update(kind.as_bytes());
            hasher.update(b"\n");
        }
        hasher.finalize().to_hex().to_string()
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    #[inline]
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    #[inline]
    pub fn node_idx(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    #[inline]
    pub fn node_by_idx(&self, idx: usize) -> &Node {
        &self.nodes[idx]
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[inline]
    pub fn edge(&self, idx: usize) -> &Edge {
        &self.edges[idx]
    }

    /// Outgoing edges of a node, in insertion order
    pub fn outgoing_edges<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Edge> {
        node.outgoing.iter().map(move |&i| &self.edges[i])
    }

    /// Incoming edges of a node, in insertion order
    pub fn incoming_edges<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Edge> {
        node.incoming.iter().map(move |&i| &self.edges[i])
    }

    /// Count incoming edges of a given kind
    pub fn incoming_count(&self, node: &Node, kind: EdgeKind) -> usize {
        self.incoming_edges(node).filter(|e| e.kind == kind).count()
    }

    /// Count outgoing edges of a given kind
    pub fn outgoing_count(&self, node: &Node, kind: EdgeKind) -> usize {
        self.outgoing_edges(node).filter(|e| e.kind == kind).count()
    }

    /// Nodes of one kind (O(N) scan, use sparingly)
    pub fn nodes_by_kind(&self, kind: SymbolKind) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.symbol().kind == kind)
            .collect()
    }

    /// Count summary by node and edge kind
    pub fn stats(&self) -> GraphStats {
        let mut nodes_by_kind = HashMap::new();
        for node in &self.nodes {
            *nodes_by_kind.entry(node.symbol().kind).or_insert(0) += 1;
        }
        let mut edges_by_kind = HashMap::new();
        for edge in &self.edges {
            *edges_by_kind.entry(edge.kind).or_insert(0) += 1;
        }
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            nodes_by_kind,
            edges_by_kind,
        }
    }

    // ── Validation ───────────────────────────────────────────────────────

    /// Re-check structural invariants: the ID index is a bijection onto the
    /// node arena, every edge endpoint resolves, and incidence lists agree
    /// with the edge arena.
    pub fn validate(&self) -> Result<()> {
        if self.node_index.len() != self.nodes.len() {
            return Err(GraphError::ValidationFailed(format!(
                "id index has {} entries for {} nodes",
                self.node_index.len(),
                self.nodes.len()
            )));
        }
        for (id, &idx) in &self.node_index {
            if idx >= self.nodes.len() || self.nodes[idx].id() != id {
                return Err(GraphError::ValidationFailed(format!(
                    "id index entry {id} does not match arena slot {idx}"
                )));
            }
        }
        for (i, edge) in self.edges.iter().enumerate() {
            let from = self
                .node_index
                .get(&edge.from_id)
                .ok_or_else(|| {
                    GraphError::ValidationFailed(format!(
                        "edge {i} references missing source {}",
                        edge.from_id
                    ))
                })
                .copied()?;
            let to = self
                .node_index
                .get(&edge.to_id)
                .ok_or_else(|| {
                    GraphError::ValidationFailed(format!(
                        "edge {i} references missing target {}",
                        edge.to_id
                    ))
                })
                .copied()?;
            if !self.nodes[from].outgoing.contains(&i) {
                return Err(GraphError::ValidationFailed(format!(
                    "edge {i} missing from outgoing list of {}",
                    edge.from_id
                )));
            }
            if !self.nodes[to].incoming.contains(&i) {
                return Err(GraphError::ValidationFailed(format!(
                    "edge {i} missing from incoming list of {}",
                    edge.to_id
                )));
            }
        }
        Ok(())
    }
}
