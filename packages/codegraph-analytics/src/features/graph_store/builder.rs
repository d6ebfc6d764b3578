//! Graph builder: parse results in, frozen graph out.
//!
//! The builder aggregates per-file and per-edge errors instead of aborting;
//! a batch with broken files still produces a frozen graph plus a report of
//! what was skipped. Resolution passes run only after every file has been
//! ingested, so cross-file references resolve regardless of batch order.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::path::Component;
use std::path::Path;
use tracing::{debug, warn};

use super::graph::CodeGraph;
use crate::shared::models::{CallSite, EdgeKind, Location, MethodSig, Symbol, SymbolKind};

/// One file's worth of parser output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseResult {
    pub file_path: String,
    /// Source language, lowercase ("go", "python", ...)
    pub language: String,
    pub package: String,
    pub symbols: Vec<Symbol>,
    /// Imported package paths
    #[serde(default)]
    pub imports: Vec<String>,
}

/// Aggregated build outcome
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub files_processed: usize,
    pub files_failed: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    /// Per-file and per-edge diagnostics, in discovery order
    pub errors: Vec<String>,
}

impl BuildReport {
    fn record_error(&mut self, msg: String) {
        warn!("{msg}");
        self.errors.push(msg);
    }
}

/// Assembles a raw mutable graph from parse-result batches and freezes it.
pub struct GraphBuilder {
    results: Vec<ParseResult>,
    report: BuildReport,
    project: String,
}

/// Registries built during ingestion, consumed by the resolution passes
#[derive(Default)]
struct Registries {
    /// node id → lowercase language
    lang_of: AHashMap<String, String>,
    /// simple name → node ids (callables and types alike)
    by_name: AHashMap<String, Vec<String>>,
    /// type name → type node ids
    types_by_name: AHashMap<String, Vec<String>>,
    /// (receiver type name, method name) → method node ids
    methods_by_receiver: AHashMap<(String, String), Vec<String>>,
    /// import path → placeholder node id
    externals: AHashMap<String, String>,
    /// nodes that exist in the graph (symbols that ingested cleanly)
    known: AHashSet<String>,
}

impl GraphBuilder {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            report: BuildReport::default(),
            project: project.into(),
        }
    }

    /// Queue one parse result. `None` models a file the parser failed on; it
    /// counts toward `files_failed` but never aborts the build.
    pub fn add_parse_result(&mut self, result: Option<ParseResult>) {
        match result {
            Some(r) => {
                if has_path_traversal(&r.file_path) {
                    self.report.files_failed += 1;
                    self.report
                        .record_error(format!("rejected path-traversal file path: {}", r.file_path));
                } else {
                    self.results.push(r);
                }
            }
            None => {
                self.report.files_failed += 1;
                self.report.record_error("nil parse result".to_string());
            }
        }
    }

    /// Ingest everything queued, run the resolution passes, freeze.
    pub fn build(mut self) -> (CodeGraph, BuildReport) {
        let mut graph = CodeGraph::new(self.project.clone());
        let mut reg = Registries::default();

        // Pass 1: nodes, registries, import placeholders
        let results = std::mem::take(&mut self.results);
        for result in &results {
            self.ingest_file(&mut graph, &mut reg, result);
        }

        // Pass 2: cross-file edges
        for result in &results {
            for symbol in &result.symbols {
                self.link_symbol(&mut graph, &mut reg, symbol, &result.package);
            }
        }
        self.infer_implements(&mut graph, &reg);

        graph.freeze();
        debug!(
            files = self.report.files_processed,
            failed = self.report.files_failed,
            nodes = self.report.nodes_created,
            edges = self.report.edges_created,
            "graph build complete"
        );
        (graph, self.report)
    }

    // ── Pass 1: ingestion ────────────────────────────────────────────────

    fn ingest_file(&mut self, graph: &mut CodeGraph, reg: &mut Registries, result: &ParseResult) {
        self.report.files_processed += 1;
        let lang = result.language.to_ascii_lowercase();

        let mut top_level = Vec::new();
        for symbol in &result.symbols {
            if self.ingest_symbol(graph, reg, symbol, &lang) {
                top_level.push(symbol.id.clone());
            }
        }

        for import in &result.imports {
            let ext_id = self.external_placeholder(graph, reg, import);
            // File-level granularity is expressed through the file's
            // top-level symbols; files themselves are not nodes.
            for sym_id in &top_level {
                self.try_edge(
                    graph,
                    sym_id,
                    &ext_id,
                    EdgeKind::Imports,
                    Location::new(&result.file_path, 0, 0),
                );
            }
        }
    }

    /// Returns true when the symbol landed in the graph.
    fn ingest_symbol(
        &mut self,
        graph: &mut CodeGraph,
        reg: &mut Registries,
        symbol: &Symbol,
        lang: &str,
    ) -> bool {
        let mut stored = symbol.clone();
        stored.children.clear();

        let id = stored.id.clone();
        let ok = match graph.add_node(stored) {
            Ok(()) => {
                self.report.nodes_created += 1;
                reg.known.insert(id.clone());
                reg.lang_of.insert(id.clone(), lang.to_string());
                reg.by_name
                    .entry(symbol.name.clone())
                    .or_default()
                    .push(id.clone());
                if symbol.kind.is_type() {
                    reg.types_by_name
                        .entry(symbol.name.clone())
                        .or_default()
                        .push(id.clone());
                }
                if symbol.kind == SymbolKind::Method {
                    if let Some(recv) = &symbol.receiver {
                        reg.methods_by_receiver
                            .entry((recv.clone(), symbol.name.clone()))
                            .or_default()
                            .push(id.clone());
                    }
                }
                true
            }
            Err(e) => {
                self.report
                    .record_error(format!("skipping symbol {}: {e}", symbol.id));
                false
            }
        };

        for child in &symbol.children {
            self.ingest_symbol(graph, reg, child, lang);
        }
        ok
    }

    fn external_placeholder(
        &mut self,
        graph: &mut CodeGraph,
        reg: &mut Registries,
        import_path: &str,
    ) -> String {
        if let Some(id) = reg.externals.get(import_path) {
            return id.clone();
        }
        let id = format!("external:{import_path}");
        let name = import_path
            .rsplit('/')
            .next()
            .unwrap_or(import_path)
            .to_string();
        let placeholder = Symbol::new(&id, name, SymbolKind::External).with_package(import_path);
        if graph.add_node(placeholder).is_ok() {
            self.report.nodes_created += 1;
        }
        reg.externals.insert(import_path.to_string(), id.clone());
        reg.known.insert(id.clone());
        id
    }

    // ── Pass 2: edge resolution ──────────────────────────────────────────

    fn link_symbol(
        &mut self,
        graph: &mut CodeGraph,
        reg: &mut Registries,
        symbol: &Symbol,
        package: &str,
    ) {
        if reg.known.contains(&symbol.id) {
            // Receiver association: cross-file methods attach to their
            // declared receiver type by name.
            if symbol.kind == SymbolKind::Method {
                if let Some(recv) = &symbol.receiver {
                    if let Some(type_id) = best_match(reg.types_by_name.get(recv), graph, package) {
                        self.try_edge(
                            graph,
                            &symbol.id,
                            &type_id,
                            EdgeKind::Receives,
                            Location::new(&symbol.file_path, 0, 0),
                        );
                    }
                }
            }

            // Declared interfaces: IMPLEMENTS when the target is known,
            // REFERENCES to a placeholder otherwise.
            for iface in &symbol.metadata.implements {
                match best_match(reg.types_by_name.get(iface), graph, package) {
                    Some(target) => self.try_edge(
                        graph,
                        &symbol.id,
                        &target,
                        EdgeKind::Implements,
                        Location::new(&symbol.file_path, 0, 0),
                    ),
                    None => {
                        let target = self.external_placeholder(graph, reg, iface);
                        self.try_edge(
                            graph,
                            &symbol.id,
                            &target,
                            EdgeKind::References,
                            Location::new(&symbol.file_path, 0, 0),
                        );
                    }
                }
            }

            // Declared base types: EMBEDS when known, REFERENCES otherwise.
            for base in &symbol.metadata.extends {
                match best_match(reg.types_by_name.get(base), graph, package) {
                    Some(target) => self.try_edge(
                        graph,
                        &symbol.id,
                        &target,
                        EdgeKind::Embeds,
                        Location::new(&symbol.file_path, 0, 0),
                    ),
                    None => {
                        let target = self.external_placeholder(graph, reg, base);
                        self.try_edge(
                            graph,
                            &symbol.id,
                            &target,
                            EdgeKind::References,
                            Location::new(&symbol.file_path, 0, 0),
                        );
                    }
                }
            }

            // Declared return type, only when that type is a known node.
            if let Some(ret) = &symbol.metadata.return_type {
                if let Some(target) = best_match(reg.types_by_name.get(ret), graph, package) {
                    self.try_edge(
                        graph,
                        &symbol.id,
                        &target,
                        EdgeKind::Returns,
                        Location::new(&symbol.file_path, 0, 0),
                    );
                }
            }

            for call in &symbol.calls {
                self.link_call(graph, reg, symbol, call, package);
            }
        }

        for child in &symbol.children {
            self.link_symbol(graph, reg, child, package);
        }
    }

    /// One CALLS edge per site: to the best-match target, or to a
    /// deduplicated placeholder. Receiver-less method calls stay unresolved
    /// placeholders; no speculative fan-out over implementations.
    fn link_call(
        &mut self,
        graph: &mut CodeGraph,
        reg: &mut Registries,
        caller: &Symbol,
        call: &CallSite,
        package: &str,
    ) {
        let target_id = if call.is_method {
            match &call.receiver {
                Some(recv) => best_match(
                    reg.methods_by_receiver
                        .get(&(recv.clone(), call.target.clone())),
                    graph,
                    package,
                )
                .unwrap_or_else(|| {
                    self.external_placeholder(graph, reg, &format!("{recv}.{}", call.target))
                }),
                None => self.external_placeholder(graph, reg, &call.target),
            }
        } else {
            best_match(reg.by_name.get(&call.target), graph, package)
                .unwrap_or_else(|| self.external_placeholder(graph, reg, &call.target))
        };

        self.try_edge(
            graph,
            &caller.id,
            &target_id,
            EdgeKind::Calls,
            call.location.clone(),
        );
    }

    /// Structural IMPLEMENTS: same-language method-set subset, only when the
    /// parser provided method metadata on both sides.
    fn infer_implements(&mut self, graph: &mut CodeGraph, reg: &Registries) {
        let mut interfaces: Vec<(String, Vec<MethodSig>, String)> = Vec::new();
        let mut concretes: Vec<(String, Vec<MethodSig>, String)> = Vec::new();

        for node in graph.nodes() {
            let sym = node.symbol();
            if sym.metadata.methods.is_empty() {
                continue;
            }
            let Some(lang) = reg.lang_of.get(&sym.id) else {
                continue;
            };
            if lang != "go" && lang != "python" {
                continue;
            }
            match sym.kind {
                SymbolKind::Interface => interfaces.push((
                    sym.id.clone(),
                    sym.metadata.methods.clone(),
                    lang.clone(),
                )),
                SymbolKind::Class | SymbolKind::Struct => {
                    concretes.push((sym.id.clone(), sym.metadata.methods.clone(), lang.clone()))
                }
                _ => {}
            }
        }

        let mut seen: AHashSet<(String, String)> = graph
            .edges()
            .iter()
            .filter(|e| e.kind == EdgeKind::Implements)
            .map(|e| (e.from_id.clone(), e.to_id.clone()))
            .collect();

        for (iface_id, iface_methods, iface_lang) in &interfaces {
            for (conc_id, conc_methods, conc_lang) in &concretes {
                if iface_lang != conc_lang {
                    continue;
                }
                let satisfied = iface_methods.iter().all(|m| {
                    conc_methods
                        .iter()
                        .any(|c| c.name == m.name && c.arity == m.arity)
                });
                if satisfied && seen.insert((conc_id.clone(), iface_id.clone())) {
                    self.try_edge(
                        graph,
                        conc_id,
                        iface_id,
                        EdgeKind::Implements,
                        Location::default(),
                    );
                }
            }
        }
    }

    fn try_edge(
        &mut self,
        graph: &mut CodeGraph,
        from: &str,
        to: &str,
        kind: EdgeKind,
        location: Location,
    ) {
        match graph.add_edge(from, to, kind, location) {
            Ok(()) => self.report.edges_created += 1,
            Err(e) => self
                .report
                .record_error(format!("edge {from} -{}-> {to}: {e}", kind.as_str())),
        }
    }
}

/// Deterministic best match: prefer a candidate in the caller's package,
/// then the lexicographically smallest node ID.
fn best_match(candidates: Option<&Vec<String>>, graph: &CodeGraph, package: &str) -> Option<String> {
    let candidates = candidates?;
    let mut same_pkg: Vec<&String> = candidates
        .iter()
        .filter(|id| {
            graph
                .get_node(id)
                .is_some_and(|n| n.symbol().package == package)
        })
        .collect();
    same_pkg.sort_unstable();
    if let Some(id) = same_pkg.first() {
        return Some((*id).clone());
    }
    let mut all: Vec<&String> = candidates.iter().collect();
    all.sort_unstable();
    all.first().map(|id| (*id).clone())
}

fn has_path_traversal(path: &str) -> bool {
    Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
}
