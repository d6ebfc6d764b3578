//! Decomposition arrays, invariant validation, and path operations.
//!
//! # Layout
//!
//! ```text
//! pos:   0   1   2   3   4 | 5 | 6   7 | 8        heavy-child-first preorder
//!        r ─ h1 ─ h2 ─ h3 ─ h4  l1  l2 ─ l3  l4   one heavy path per run
//! ```
//!
//! Every heavy path is a contiguous run with its head at the minimum
//! position, and every subtree is a contiguous range. Those two facts are
//! what let a segment tree answer path and subtree questions:
//!
//! - any u–v path crosses O(log V) heavy paths, so `decompose_path` emits
//!   O(log V) inclusive ranges;
//! - `[pos[v], pos[v] + sub_size[v])` covers exactly v's descendants.
//!
//! # Complexity
//!
//! | operation | cost |
//! |---|---|
//! | `lca` / `distance` | O(log V) head hops |
//! | `decompose_path` | O(log V) segments |
//! | `path_nodes` | O(path length) |
//! | `validate` | O(V log V) worst case |

use rustc_hash::FxHashMap;

use crate::shared::models::{GraphError, Result};

/// Inclusive range in position space.
///
/// Segments come out of `decompose_path` in climb order and may run in either
/// direction (`start > end`); normalize before using one as a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment {
    pub start: usize,
    pub end: usize,
}

impl PathSegment {
    /// `(min, max)` bounds of the segment
    #[inline]
    pub fn normalized(&self) -> (usize, usize) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }

    /// Number of positions covered
    #[inline]
    pub fn len(&self) -> usize {
        let (lo, hi) = self.normalized();
        hi - lo + 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Heavy-light decomposition of one rooted tree.
///
/// All arrays are indexed by internal node index (preorder discovery order,
/// root = 0). Construction is the builders' job; this type is read-only after
/// build.
#[derive(Debug, Clone)]
pub struct HLDecomposition {
    pub(crate) root: String,
    pub(crate) graph_hash: String,
    /// Parent internal index, -1 at the root
    pub(crate) parent: Vec<i64>,
    /// Distance from the root
    pub(crate) depth: Vec<usize>,
    /// Subtree size including the node itself
    pub(crate) sub_size: Vec<usize>,
    /// Heavy child internal index, -1 when leaf
    pub(crate) heavy: Vec<i64>,
    /// Head (topmost node) of the heavy path containing the node
    pub(crate) head: Vec<usize>,
    /// Position in the linear order (heavy-child-first preorder)
    pub(crate) pos: Vec<usize>,
    /// Inverse of `pos`
    pub(crate) node_at_pos: Vec<usize>,
    pub(crate) node_to_idx: FxHashMap<String, usize>,
    pub(crate) idx_to_node: Vec<String>,
}

impl HLDecomposition {
    #[inline]
    pub fn node_count(&self) -> usize {
        self.idx_to_node.len()
    }

    #[inline]
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Hash of the source graph at build time; downstream caches key on it
    #[inline]
    pub fn graph_hash(&self) -> &str {
        &self.graph_hash
    }

    /// Cache key distinguishing decompositions of the same graph by root
    pub fn cache_key(&self) -> String {
        format!("{}@{}", self.graph_hash, self.root)
    }

    #[inline]
    pub fn idx_of(&self, id: &str) -> Option<usize> {
        self.node_to_idx.get(id).copied()
    }

    #[inline]
    pub fn id_of(&self, idx: usize) -> &str {
        &self.idx_to_node[idx]
    }

    #[inline]
    pub fn parent_of(&self, v: usize) -> Option<usize> {
        (self.parent[v] >= 0).then(|| self.parent[v] as usize)
    }

    #[inline]
    pub fn depth_of(&self, v: usize) -> usize {
        self.depth[v]
    }

    #[inline]
    pub fn sub_size_of(&self, v: usize) -> usize {
        self.sub_size[v]
    }

    #[inline]
    pub fn heavy_of(&self, v: usize) -> Option<usize> {
        (self.heavy[v] >= 0).then(|| self.heavy[v] as usize)
    }

    #[inline]
    pub fn head_of(&self, v: usize) -> usize {
        self.head[v]
    }

    #[inline]
    pub fn pos_of(&self, v: usize) -> usize {
        self.pos[v]
    }

    #[inline]
    pub fn node_at(&self, p: usize) -> usize {
        self.node_at_pos[p]
    }

    /// Positions `[start, end)` occupied by the subtree rooted at `v`
    #[inline]
    pub fn subtree_range(&self, v: usize) -> (usize, usize) {
        (self.pos[v], self.pos[v] + self.sub_size[v])
    }

    /// Edges to a light child (the complement of the heavy edges)
    pub fn light_edge_count(&self) -> usize {
        let heavy_edges = self.heavy.iter().filter(|&&h| h >= 0).count();
        self.node_count() - 1 - heavy_edges
    }

    /// Number of heavy paths (every node whose head is itself starts one)
    pub fn heavy_path_count(&self) -> usize {
        (0..self.node_count()).filter(|&v| self.head[v] == v).count()
    }

    fn idx_or_err(&self, id: &str) -> Result<usize> {
        self.idx_of(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    // ── Path operations ──────────────────────────────────────────────────

    /// Lowest common ancestor by climbing the deeper head. O(log V) hops.
    pub fn lca_idx(&self, mut u: usize, mut v: usize) -> usize {
        while self.head[u] != self.head[v] {
            if self.depth[self.head[u]] < self.depth[self.head[v]] {
                std::mem::swap(&mut u, &mut v);
            }
            u = self.parent[self.head[u]] as usize;
        }
        if self.depth[u] <= self.depth[v] {
            u
        } else {
            v
        }
    }

    /// LCA by node ID
    pub fn lca(&self, u: &str, v: &str) -> Result<String> {
        let ui = self.idx_or_err(u)?;
        let vi = self.idx_or_err(v)?;
        Ok(self.idx_to_node[self.lca_idx(ui, vi)].clone())
    }

    /// Path length in edges
    pub fn distance(&self, u: &str, v: &str) -> Result<usize> {
        let ui = self.idx_or_err(u)?;
        let vi = self.idx_or_err(v)?;
        let l = self.lca_idx(ui, vi);
        Ok(self.depth[ui] + self.depth[vi] - 2 * self.depth[l])
    }

    /// Minimal ordered segment cover of the u–v path.
    ///
    /// The union of the segments is exactly the set of positions of nodes on
    /// the path, each appearing exactly once (the LCA included once).
    pub fn decompose_path_idx(&self, mut u: usize, mut v: usize) -> Vec<PathSegment> {
        let mut segments = Vec::new();
        while self.head[u] != self.head[v] {
            if self.depth[self.head[u]] < self.depth[self.head[v]] {
                std::mem::swap(&mut u, &mut v);
            }
            // u is on the deeper head: emit its heavy-path run, then hop
            segments.push(PathSegment {
                start: self.pos[self.head[u]],
                end: self.pos[u],
            });
            u = self.parent[self.head[u]] as usize;
        }
        // Same heavy path now; the final run carries endpoint direction
        segments.push(PathSegment {
            start: self.pos[u],
            end: self.pos[v],
        });
        segments
    }

    /// Segment cover by node IDs
    pub fn decompose_path(&self, u: &str, v: &str) -> Result<Vec<PathSegment>> {
        let ui = self.idx_or_err(u)?;
        let vi = self.idx_or_err(v)?;
        Ok(self.decompose_path_idx(ui, vi))
    }

    /// Materialized node IDs along the path, in u → v walking order (the
    /// LCA appears exactly once). O(path length), which any materialization
    /// pays anyway; use `decompose_path` when ranges suffice.
    pub fn path_nodes(&self, u: &str, v: &str) -> Result<Vec<String>> {
        let ui = self.idx_or_err(u)?;
        let vi = self.idx_or_err(v)?;
        let l = self.lca_idx(ui, vi);

        let mut ids = Vec::new();
        let mut x = ui;
        while x != l {
            ids.push(self.idx_to_node[x].clone());
            x = self.parent[x] as usize;
        }
        ids.push(self.idx_to_node[l].clone());

        let mut down = Vec::new();
        x = vi;
        while x != l {
            down.push(self.idx_to_node[x].clone());
            x = self.parent[x] as usize;
        }
        ids.extend(down.into_iter().rev());
        Ok(ids)
    }

    // ── Validation ───────────────────────────────────────────────────────

    /// Check the decomposition invariants:
    /// (i) `pos` is a permutation of `[0, N)`;
    /// (ii) every subtree occupies `[pos[v], pos[v]+sub_size[v])`;
    /// (iii) every heavy path is a contiguous run with its head at minimum;
    /// (iv) the heavy child maximizes subtree size (ties lex by node ID);
    /// (v) light edges + heavy edges = N − 1.
    pub fn validate(&self) -> Result<()> {
        let n = self.node_count();
        if n == 0 {
            return Err(GraphError::ValidationFailed("empty decomposition".into()));
        }

        // (i) permutation
        let mut seen = vec![false; n];
        for &p in &self.pos {
            if p >= n || seen[p] {
                return Err(GraphError::ValidationFailed(format!(
                    "pos is not a permutation: position {p}"
                )));
            }
            seen[p] = true;
        }
        for v in 0..n {
            if self.node_at_pos[self.pos[v]] != v {
                return Err(GraphError::ValidationFailed(format!(
                    "node_at_pos does not invert pos at node {v}"
                )));
            }
        }

        // (ii) subtree contiguity: children nest inside the parent range and
        // each node's descendants are exactly its declared range.
        for v in 0..n {
            if let Some(p) = self.parent_of(v) {
                let (ps, pe) = self.subtree_range(p);
                let (vs, ve) = self.subtree_range(v);
                if vs < ps || ve > pe {
                    return Err(GraphError::ValidationFailed(format!(
                        "subtree of {v} escapes its parent range"
                    )));
                }
            }
        }
        let mut size_sum_at: Vec<usize> = vec![1; n];
        for v in (1..n).rev() {
            let p = self.parent[v] as usize;
            let child_size = size_sum_at[v];
            size_sum_at[p] += child_size;
        }
        for v in 0..n {
            if size_sum_at[v] != self.sub_size[v] {
                return Err(GraphError::ValidationFailed(format!(
                    "sub_size[{v}] disagrees with recomputed subtree size"
                )));
            }
        }

        // (iii) heavy paths contiguous, head at minimum
        for v in 0..n {
            let h = self.head[v];
            if self.pos[h] > self.pos[v] {
                return Err(GraphError::ValidationFailed(format!(
                    "head of {v} sits after it in position space"
                )));
            }
            if let Some(hc) = self.heavy_of(v) {
                if self.pos[hc] != self.pos[v] + 1 {
                    return Err(GraphError::ValidationFailed(format!(
                        "heavy child of {v} is not adjacent in position space"
                    )));
                }
                if self.head[hc] != h {
                    return Err(GraphError::ValidationFailed(format!(
                        "heavy child of {v} starts a new head"
                    )));
                }
            }
        }

        // (iv) heavy-child choice: maximal subtree, ties lex by node ID
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for v in 1..n {
            children[self.parent[v] as usize].push(v);
        }
        for v in 0..n {
            if children[v].is_empty() {
                if self.heavy[v] != -1 {
                    return Err(GraphError::ValidationFailed(format!(
                        "leaf {v} claims a heavy child"
                    )));
                }
                continue;
            }
            let best = children[v]
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    self.sub_size[a]
                        .cmp(&self.sub_size[b])
                        .then_with(|| self.idx_to_node[b].cmp(&self.idx_to_node[a]))
                })
                .unwrap();
            if self.heavy[v] != best as i64 {
                return Err(GraphError::ValidationFailed(format!(
                    "heavy child of {v} violates the selection rule"
                )));
            }
        }

        // (v) edge accounting
        let heavy_edges = self.heavy.iter().filter(|&&h| h >= 0).count();
        if self.light_edge_count() + heavy_edges != n - 1 {
            return Err(GraphError::ValidationFailed(
                "light + heavy edge count does not equal N - 1".into(),
            ));
        }

        Ok(())
    }
}
