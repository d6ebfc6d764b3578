//! Dead-code detection.
//!
//! A callable symbol is dead when nothing calls it, nothing references it,
//! and its name does not mark it as an entry point the runtime or test
//! harness invokes directly.

use crate::features::graph_store::CodeGraph;
use crate::shared::cancel::CancelToken;
use crate::shared::constants::CANCEL_POLL_INTERVAL;
use crate::shared::models::{EdgeKind, Result, SymbolKind};

const HARNESS_PREFIXES: [&str; 4] = ["Test", "Benchmark", "Fuzz", "Example"];

/// Entry points are exempt from dead-code reporting: exact `main` / `init`,
/// harness functions (`Test...`, `Benchmark...`, `Fuzz...`, `Example...`
/// with at least one character after the prefix), and `ServeHTTP` methods.
fn is_entry_point(name: &str, kind: SymbolKind) -> bool {
    if name == "main" || name == "init" {
        return true;
    }
    if HARNESS_PREFIXES
        .iter()
        .any(|p| name.len() > p.len() && name.starts_with(p))
    {
        return true;
    }
    name == "ServeHTTP" && kind == SymbolKind::Method
}

/// IDs of callable symbols with zero incoming CALLS and zero incoming
/// REFERENCES edges, excluding entry points. Sorted for determinism.
pub fn dead_code(ctx: &CancelToken, graph: &CodeGraph) -> Result<Vec<String>> {
    let mut dead = Vec::new();
    for (i, node) in graph.nodes().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            ctx.check()?;
        }
        let sym = node.symbol();
        if !sym.kind.is_callable() {
            continue;
        }
        if is_entry_point(&sym.name, sym.kind) {
            continue;
        }
        let referenced = graph
            .incoming_edges(node)
            .any(|e| matches!(e.kind, EdgeKind::Calls | EdgeKind::References));
        if !referenced {
            dead.push(sym.id.clone());
        }
    }
    dead.sort_unstable();
    Ok(dead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Location, Symbol};

    fn symbol(id: &str, name: &str, kind: SymbolKind) -> Symbol {
        Symbol::new(id, name, kind)
    }

    #[test]
    fn test_uncalled_function_is_dead() {
        let mut g = CodeGraph::new("/proj");
        g.add_node(symbol("a", "Orphan", SymbolKind::Function))
            .unwrap();
        g.freeze();
        assert_eq!(dead_code(&CancelToken::new(), &g).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_called_function_is_alive() {
        let mut g = CodeGraph::new("/proj");
        g.add_node(symbol("a", "Caller", SymbolKind::Function))
            .unwrap();
        g.add_node(symbol("b", "Callee", SymbolKind::Function))
            .unwrap();
        g.add_edge("a", "b", EdgeKind::Calls, Location::default())
            .unwrap();
        g.freeze();
        // a is uncalled, b is called
        assert_eq!(dead_code(&CancelToken::new(), &g).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_referenced_function_is_alive() {
        let mut g = CodeGraph::new("/proj");
        g.add_node(symbol("a", "Referrer", SymbolKind::Function))
            .unwrap();
        g.add_node(symbol("b", "Target", SymbolKind::Function))
            .unwrap();
        g.add_edge("a", "b", EdgeKind::References, Location::default())
            .unwrap();
        g.freeze();
        assert_eq!(dead_code(&CancelToken::new(), &g).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_non_callable_kinds_ignored() {
        let mut g = CodeGraph::new("/proj");
        g.add_node(symbol("i", "Shape", SymbolKind::Interface))
            .unwrap();
        g.add_node(symbol("v", "config", SymbolKind::Variable))
            .unwrap();
        g.freeze();
        assert!(dead_code(&CancelToken::new(), &g).unwrap().is_empty());
    }

    #[test]
    fn test_entry_point_names() {
        assert!(is_entry_point("main", SymbolKind::Function));
        assert!(is_entry_point("init", SymbolKind::Function));
        assert!(is_entry_point("TestFoo", SymbolKind::Function));
        assert!(is_entry_point("BenchmarkX", SymbolKind::Function));
        assert!(is_entry_point("FuzzParse", SymbolKind::Function));
        assert!(is_entry_point("ExampleUsage", SymbolKind::Function));

        // the bare prefixes are ordinary names
        assert!(!is_entry_point("Test", SymbolKind::Function));
        assert!(!is_entry_point("Benchmark", SymbolKind::Function));
        assert!(!is_entry_point("Fuzz", SymbolKind::Function));
        assert!(!is_entry_point("Example", SymbolKind::Function));

        // ServeHTTP only counts as a method
        assert!(is_entry_point("ServeHTTP", SymbolKind::Method));
        assert!(!is_entry_point("ServeHTTP", SymbolKind::Function));

        assert!(!is_entry_point("Main", SymbolKind::Function));
        assert!(!is_entry_point("initialize", SymbolKind::Function));
    }

    #[test]
    fn test_entry_points_never_reported() {
        let mut g = CodeGraph::new("/proj");
        g.add_node(symbol("m", "main", SymbolKind::Function)).unwrap();
        g.add_node(symbol("t", "TestParse", SymbolKind::Function))
            .unwrap();
        g.add_node(symbol("s", "ServeHTTP", SymbolKind::Method))
            .unwrap();
        g.add_node(symbol("bare", "Test", SymbolKind::Function))
            .unwrap();
        g.freeze();
        assert_eq!(dead_code(&CancelToken::new(), &g).unwrap(), vec!["bare"]);
    }
}
