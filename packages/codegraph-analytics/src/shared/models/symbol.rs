//! Symbol model handed over by the external parser.
//!
//! Symbols arrive as `ParseResult` batches; the builder owns converting them
//! into graph nodes and edges. IDs are canonical `file:line:name` strings and
//! stay stable across rebuilds of the same snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location of a symbol or call site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Symbol kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Struct,
    Interface,
    Field,
    Variable,
    /// Placeholder for an entity that lives outside the analyzed snapshot
    External,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Field => "field",
            SymbolKind::Variable => "variable",
            SymbolKind::External => "external",
        }
    }

    /// Callable kinds participate in CALLS analytics (dead code, hotspots)
    #[inline]
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }

    /// Type kinds participate in coupling/abstractness metrics
    #[inline]
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Interface
        )
    }
}

/// Declared method signature (name, arity, receiver) carried in metadata.
/// Used for structural IMPLEMENTS inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    pub arity: usize,
    #[serde(default)]
    pub receiver: Option<String>,
}

/// A call site extracted by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Callee name as written at the site (may be unqualified)
    pub target: String,
    /// True when invoked through a receiver expression
    pub is_method: bool,
    #[serde(default)]
    pub receiver: Option<String>,
    pub location: Location,
}

/// Parser-declared metadata attached to a symbol
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Declared methods (present for types; drives method-set inference)
    #[serde(default)]
    pub methods: Vec<MethodSig>,
    /// Explicitly declared implemented interfaces/protocols
    #[serde(default)]
    pub implements: Vec<String>,
    /// Explicitly declared base types
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub return_type: Option<String>,
}

/// Source symbol handed over by the parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Stable canonical ID (`file:line:name`)
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    pub package: String,
    #[serde(default)]
    pub receiver: Option<String>,
    #[serde(default)]
    pub exported: bool,
    /// Nested symbols (methods of a class, fields of a struct, ...)
    #[serde(default)]
    pub children: Vec<Symbol>,
    #[serde(default)]
    pub metadata: SymbolMetadata,
    /// Call sites found in this symbol's body
    #[serde(default)]
    pub calls: Vec<CallSite>,
}

impl Symbol {
    /// Minimal symbol for tests and placeholder construction
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            file_path: String::new(),
            package: String::new(),
            receiver: None,
            exported: false,
            children: Vec::new(),
            metadata: SymbolMetadata::default(),
            calls: Vec::new(),
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self
    }

    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }
}
