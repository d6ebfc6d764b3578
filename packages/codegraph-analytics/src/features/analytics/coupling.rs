//! Package coupling metrics (afferent/efferent, instability, abstractness).

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{Result, SymbolKind};

/// Coupling report for one package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouplingMetrics {
    pub package: String,
    /// Edges crossing into the package
    pub afferent: usize,
    /// Edges crossing out of the package
    pub efferent: usize,
    /// `Ef / (Af + Ef)`, 0 when both are 0
    pub instability: f64,
    /// Interface-kind symbols in the package
    pub abstract_types: usize,
    /// All type-kind symbols in the package
    pub total_types: usize,
    /// `abstract_types / total_types`, 0 when the package has no types
    pub abstractness: f64,
}

impl CouplingMetrics {
    fn zero(package: &str) -> Self {
        Self {
            package: package.to_string(),
            afferent: 0,
            efferent: 0,
            instability: 0.0,
            abstract_types: 0,
            total_types: 0,
            abstractness: 0.0,
        }
    }
}

/// Metrics for one package. Unknown packages yield zero-filled metrics, not
/// an error.
pub fn package_coupling(
    ctx: &CancelToken,
    graph: &CodeGraph,
    package: &str,
) -> Result<CouplingMetrics> {
    ctx.check()?;
    let mut metrics = CouplingMetrics::zero(package);

    for (i, node) in graph.nodes().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let sym = node.symbol();
        if sym.package != package {
            continue;
        }
        if sym.kind.is_type() {
            metrics.total_types += 1;
            if sym.kind == SymbolKind::Interface {
                metrics.abstract_types += 1;
            }
        }
    }

    for (i, edge) in graph.edges().iter().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let from_pkg = graph.get_node(&edge.from_id).map(|n| n.symbol().package.as_str());
        let to_pkg = graph.get_node(&edge.to_id).map(|n| n.symbol().package.as_str());
        let (Some(from_pkg), Some(to_pkg)) = (from_pkg, to_pkg) else {
            continue;
        };
        if from_pkg == to_pkg {
            continue;
        }
        if to_pkg == package {
            metrics.afferent += 1;
        }
        if from_pkg == package {
            metrics.efferent += 1;
        }
    }

    let cross = metrics.afferent + metrics.efferent;
    if cross > 0 {
        metrics.instability = metrics.efferent as f64 / cross as f64;
    }
    if metrics.total_types > 0 {
        metrics.abstractness = metrics.abstract_types as f64 / metrics.total_types as f64;
    }
    Ok(metrics)
}

/// Metrics for every package present in the graph, sorted by package name.
pub fn all_package_coupling(ctx: &CancelToken, graph: &CodeGraph) -> Result<Vec<CouplingMetrics>> {
    let mut packages: FxHashSet<&str> = FxHashSet::default();
    for node in graph.nodes() {
        packages.insert(node.symbol().package.as_str());
    }
    let mut names: Vec<&str> = packages.into_iter().collect();
    names.sort_unstable();

    // Avoid re-walking edges per package on wide graphs.
    let mut by_package: FxHashMap<&str, CouplingMetrics> = names
        .iter()
        .map(|&p| (p, CouplingMetrics::zero(p)))
        .collect();

    for (i, node) in graph.nodes().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let sym = node.symbol();
        let entry = by_package
            .get_mut(sym.package.as_str())
            .expect("every package was registered");
        if sym.kind.is_type() {
            entry.total_types += 1;
            if sym.kind == SymbolKind::Interface {
                entry.abstract_types += 1;
            }
        }
    }
    for (i, edge) in graph.edges().iter().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let from_pkg = graph.get_node(&edge.from_id).map(|n| n.symbol().package.clone());
        let to_pkg = graph.get_node(&edge.to_id).map(|n| n.symbol().package.clone());
        let (Some(from_pkg), Some(to_pkg)) = (from_pkg, to_pkg) else {
            continue;
        };
        if from_pkg == to_pkg {
            continue;
        }
        if let Some(m) = by_package.get_mut(to_pkg.as_str()) {
            m.afferent += 1;
        }
        if let Some(m) = by_package.get_mut(from_pkg.as_str()) {
            m.efferent += 1;
        }
    }

    Ok(names
        .into_iter()
        .map(|name| {
            let mut m = by_package.remove(name).expect("registered");
            let cross = m.afferent + m.efferent;
            if cross > 0 {
                m.instability = m.efferent as f64 / cross as f64;
            }
            if m.total_types > 0 {
                m.abstractness = m.abstract_types as f64 / m.total_types as f64;
            }
            m
        })
        .collect())
}
