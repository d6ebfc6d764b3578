//! Engine-facing view over a single decomposition or a forest.

use std::sync::Arc;

use crate::features::hld::{HLDecomposition, HldForest, PathSegment};
use crate::shared::models::{GraphError, Result};

/// Exactly one of a single tree or a forest backs every engine.
#[derive(Clone)]
pub enum TreeIndex {
    Tree(Arc<HLDecomposition>),
    Forest(Arc<HldForest>),
}

impl TreeIndex {
    /// Total number of segment-tree positions this index addresses
    pub fn total_positions(&self) -> usize {
        match self {
            TreeIndex::Tree(hld) => hld.node_count(),
            TreeIndex::Forest(forest) => forest.total_nodes(),
        }
    }

    pub fn graph_hash(&self) -> &str {
        match self {
            TreeIndex::Tree(hld) => hld.graph_hash(),
            TreeIndex::Forest(forest) => forest.graph_hash(),
        }
    }

    /// Cache-key component identifying the decomposition itself
    pub fn cache_key(&self) -> String {
        match self {
            TreeIndex::Tree(hld) => hld.cache_key(),
            TreeIndex::Forest(forest) => forest.cache_key(),
        }
    }

    /// Locate one node: its tree, the tree's global offset, and its internal
    /// index within that tree.
    pub fn locate(&self, id: &str) -> Result<(&HLDecomposition, usize, usize)> {
        match self {
            TreeIndex::Tree(hld) => {
                let idx = hld
                    .idx_of(id)
                    .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
                Ok((hld.as_ref(), 0, idx))
            }
            TreeIndex::Forest(forest) => {
                let t = forest
                    .tree_of(id)
                    .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
                let tree = forest.tree(t);
                let idx = tree
                    .idx_of(id)
                    .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;
                Ok((tree, forest.tree_offset(t), idx))
            }
        }
    }

    /// Global segment-tree position of a node
    pub fn position(&self, id: &str) -> Result<usize> {
        let (tree, offset, idx) = self.locate(id)?;
        Ok(offset + tree.pos_of(idx))
    }

    /// Locate a pair that must share a tree; forest mode rejects cross-tree
    /// pairs with `CrossTree`.
    pub fn locate_pair(&self, u: &str, v: &str) -> Result<(&HLDecomposition, usize, usize, usize)> {
        match self {
            TreeIndex::Tree(hld) => {
                let ui = hld
                    .idx_of(u)
                    .ok_or_else(|| GraphError::NodeNotFound(u.to_string()))?;
                let vi = hld
                    .idx_of(v)
                    .ok_or_else(|| GraphError::NodeNotFound(v.to_string()))?;
                Ok((hld.as_ref(), 0, ui, vi))
            }
            TreeIndex::Forest(forest) => {
                let tu = forest
                    .tree_of(u)
                    .ok_or_else(|| GraphError::NodeNotFound(u.to_string()))?;
                let tv = forest
                    .tree_of(v)
                    .ok_or_else(|| GraphError::NodeNotFound(v.to_string()))?;
                if tu != tv {
                    return Err(GraphError::CrossTree {
                        u: u.to_string(),
                        v: v.to_string(),
                    });
                }
                let tree = forest.tree(tu);
                let ui = tree
                    .idx_of(u)
                    .ok_or_else(|| GraphError::NodeNotFound(u.to_string()))?;
                let vi = tree
                    .idx_of(v)
                    .ok_or_else(|| GraphError::NodeNotFound(v.to_string()))?;
                Ok((tree, forest.tree_offset(tu), ui, vi))
            }
        }
    }

    /// LCA across the index; forest mode distinguishes "no common tree"
    pub fn lca(&self, u: &str, v: &str) -> Result<String> {
        match self.locate_pair(u, v) {
            Ok((tree, _, ui, vi)) => Ok(tree.id_of(tree.lca_idx(ui, vi)).to_string()),
            Err(GraphError::CrossTree { u, v }) => {
                Err(GraphError::NodesInDifferentTrees { u, v })
            }
            Err(e) => Err(e),
        }
    }

    /// Path length in edges; errors like `lca`
    pub fn distance(&self, u: &str, v: &str) -> Result<usize> {
        match self.locate_pair(u, v) {
            Ok((tree, _, ui, vi)) => {
                let l = tree.lca_idx(ui, vi);
                Ok(tree.depth_of(ui) + tree.depth_of(vi) - 2 * tree.depth_of(l))
            }
            Err(GraphError::CrossTree { u, v }) => {
                Err(GraphError::NodesInDifferentTrees { u, v })
            }
            Err(e) => Err(e),
        }
    }

    /// Segment cover of the u–v path in *global* position space (offsets
    /// already applied), segments still direction-bearing.
    pub fn decompose_path(&self, u: &str, v: &str) -> Result<Vec<PathSegment>> {
        let (tree, offset, ui, vi) = self.locate_pair(u, v)?;
        let mut segments = tree.decompose_path_idx(ui, vi);
        if offset != 0 {
            for seg in &mut segments {
                seg.start += offset;
                seg.end += offset;
            }
        }
        Ok(segments)
    }

    /// Node IDs on the u–v path
    pub fn path_nodes(&self, u: &str, v: &str) -> Result<Vec<String>> {
        let (tree, _, ui, vi) = self.locate_pair(u, v)?;
        tree.path_nodes(tree.id_of(ui), tree.id_of(vi))
    }

    /// Build the position-aligned value array the segment tree is fed with:
    /// `arr[p] = value(node at global position p)`, trees concatenated in
    /// tree-index order for forests.
    pub fn build_values<F>(&self, value: F) -> Vec<i64>
    where
        F: Fn(&str) -> i64,
    {
        match self {
            TreeIndex::Tree(hld) => (0..hld.node_count())
                .map(|p| value(hld.id_of(hld.node_at(p))))
                .collect(),
            TreeIndex::Forest(forest) => {
                let mut values = Vec::with_capacity(forest.total_nodes());
                for tree in forest.trees() {
                    values.extend((0..tree.node_count()).map(|p| value(tree.id_of(tree.node_at(p)))));
                }
                values
            }
        }
    }

    /// Global half-open position range `[start, end)` of a subtree
    pub fn subtree_range(&self, id: &str) -> Result<(usize, usize)> {
        let (tree, offset, idx) = self.locate(id)?;
        let (start, end) = tree.subtree_range(idx);
        Ok((offset + start, offset + end))
    }

    /// Node IDs inside a subtree, in position order
    pub fn subtree_nodes(&self, id: &str) -> Result<Vec<String>> {
        let (tree, _, idx) = self.locate(id)?;
        let (start, end) = tree.subtree_range(idx);
        Ok((start..end)
            .map(|p| tree.id_of(tree.node_at(p)).to_string())
            .collect())
    }
}
