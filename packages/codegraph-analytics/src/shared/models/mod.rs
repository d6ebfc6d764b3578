//! Shared models

mod edge;
mod error;
mod symbol;

pub use edge::{Edge, EdgeKind};
pub use error::{GraphError, Result};
pub use symbol::{CallSite, Location, MethodSig, Symbol, SymbolKind, SymbolMetadata};
