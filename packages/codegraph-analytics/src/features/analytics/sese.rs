//! Single-entry single-exit region detection.
//!
//! Dominator and post-dominator trees are inputs; computing them is a
//! collaborator's job. A node N with immediate post-dominator P forms a
//! region when N dominates P; the region's members are the nodes dominated
//! by N and post-dominated by P, collected by a BFS from N that never walks
//! past P.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::Result;

/// Immediate-dominator tree (also used for post-dominators with the edges
/// of the reversed graph).
#[derive(Debug, Clone)]
pub struct DominatorTree {
    root: String,
    /// node → immediate dominator; the root has no entry
    idom: FxHashMap<String, String>,
}

impl DominatorTree {
    pub fn new(root: impl Into<String>, idom: FxHashMap<String, String>) -> Self {
        Self {
            root: root.into(),
            idom,
        }
    }

    /// Convenience constructor from `(node, idom)` pairs
    pub fn from_pairs<I, S>(root: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self::new(
            root,
            pairs
                .into_iter()
                .map(|(n, d)| (n.into(), d.into()))
                .collect(),
        )
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Immediate dominator of `node`, if it is not the root
    pub fn idom(&self, node: &str) -> Option<&str> {
        self.idom.get(node).map(String::as_str)
    }

    /// Does `a` dominate `b`? Every node dominates itself; otherwise walk
    /// `b`'s idom chain toward the root.
    pub fn dominates(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let mut cur = b;
        while let Some(parent) = self.idom(cur) {
            if parent == a {
                return true;
            }
            if parent == cur {
                break;
            }
            cur = parent;
        }
        false
    }
}

/// One detected region
#[derive(Debug, Clone)]
pub struct SeseRegion {
    pub entry: String,
    pub exit: String,
    /// Members in BFS discovery order (entry first)
    pub nodes: Vec<String>,
    /// Index of the smallest strictly-containing region
    pub parent: Option<usize>,
    /// 0 for outermost regions
    pub depth: usize,
}

/// Region set plus the innermost-region index per node
#[derive(Debug, Clone, Default)]
pub struct SeseAnalysis {
    pub regions: Vec<SeseRegion>,
    pub region_of: FxHashMap<String, usize>,
}

/// Detect all regions and build the containment hierarchy.
pub fn sese_regions(
    ctx: &CancelToken,
    graph: &CodeGraph,
    dom: &DominatorTree,
    pdom: &DominatorTree,
) -> Result<SeseAnalysis> {
    let mut regions: Vec<SeseRegion> = Vec::new();

    for (i, node) in graph.nodes().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let entry = node.id();
        let Some(exit) = pdom.idom(entry) else {
            continue;
        };
        if exit == entry || !dom.dominates(entry, exit) {
            continue;
        }
        let members = collect_region(ctx, graph, dom, pdom, entry, exit)?;
        regions.push(SeseRegion {
            entry: entry.to_string(),
            exit: exit.to_string(),
            nodes: members,
            parent: None,
            depth: 0,
        });
    }

    // Containment: largest first; each smaller region picks the smallest
    // strictly-containing one as its parent.
    let mut order: Vec<usize> = (0..regions.len()).collect();
    order.sort_by(|&a, &b| {
        regions[b]
            .nodes
            .len()
            .cmp(&regions[a].nodes.len())
            .then_with(|| regions[a].entry.cmp(&regions[b].entry))
    });

    let sets: Vec<FxHashSet<&str>> = regions
        .iter()
        .map(|r| r.nodes.iter().map(String::as_str).collect())
        .collect();

    let mut parents: Vec<Option<usize>> = vec![None; regions.len()];
    for (rank, &i) in order.iter().enumerate() {
        ctx.check()?;
        let mut parent: Option<usize> = None;
        for &j in order[..rank].iter().rev() {
            // walking larger regions from smallest to largest
            if sets[j].len() > sets[i].len() && sets[i].is_subset(&sets[j]) {
                parent = Some(j);
                break;
            }
        }
        parents[i] = parent;
    }
    drop(sets);
    for &i in order.iter() {
        let parent = parents[i];
        regions[i].parent = parent;
        regions[i].depth = parent.map(|p| regions[p].depth + 1).unwrap_or(0);
    }

    // Innermost region per node: smallest containing region wins.
    let mut region_of: FxHashMap<String, usize> = FxHashMap::default();
    for &i in order.iter().rev() {
        for node in &regions[i].nodes {
            region_of.entry(node.clone()).or_insert(i);
        }
    }

    Ok(SeseAnalysis { regions, region_of })
}

/// BFS from `entry`, keeping nodes dominated by the entry and
/// post-dominated by the exit, never expanding past the exit.
fn collect_region(
    ctx: &CancelToken,
    graph: &CodeGraph,
    dom: &DominatorTree,
    pdom: &DominatorTree,
    entry: &str,
    exit: &str,
) -> Result<Vec<String>> {
    let mut members = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut queue: VecDeque<String> = VecDeque::new();
    seen.insert(entry.to_string());
    queue.push_back(entry.to_string());
    let mut steps = 0usize;

    while let Some(id) = queue.pop_front() {
        steps += 1;
        if steps % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        if !(dom.dominates(entry, &id) && pdom.dominates(exit, &id)) {
            continue;
        }
        members.push(id.clone());
        if id == exit {
            continue;
        }
        let Some(node) = graph.get_node(&id) else {
            continue;
        };
        for edge in graph.outgoing_edges(node) {
            if seen.insert(edge.to_id.clone()) {
                queue.push_back(edge.to_id.clone());
            }
        }
    }
    Ok(members)
}
