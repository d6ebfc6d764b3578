//! Typed edges of the code graph

use serde::{Deserialize, Serialize};

use super::symbol::Location;

/// Edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    Calls,
    Implements,
    Embeds,
    Receives,
    Returns,
    References,
    Imports,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Calls => "CALLS",
            EdgeKind::Implements => "IMPLEMENTS",
            EdgeKind::Embeds => "EMBEDS",
            EdgeKind::Receives => "RECEIVES",
            EdgeKind::Returns => "RETURNS",
            EdgeKind::References => "REFERENCES",
            EdgeKind::Imports => "IMPORTS",
        }
    }

    /// All kinds, in stable order (used when hashing edge sets)
    pub const ALL: [EdgeKind; 7] = [
        EdgeKind::Calls,
        EdgeKind::Implements,
        EdgeKind::Embeds,
        EdgeKind::Receives,
        EdgeKind::Returns,
        EdgeKind::References,
        EdgeKind::Imports,
    ];
}

/// Directed edge between two nodes, identified by node IDs.
///
/// Edges live in the graph's arena; nodes refer to them by index, so the
/// struct itself carries no back-pointers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from_id: String,
    pub to_id: String,
    pub kind: EdgeKind,
    pub location: Location,
}

impl Edge {
    pub fn new(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        kind: EdgeKind,
        location: Location,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            kind,
            location,
        }
    }

    #[inline]
    pub fn is_self_loop(&self) -> bool {
        self.from_id == self.to_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_as_str() {
        assert_eq!(EdgeKind::Calls.as_str(), "CALLS");
        assert_eq!(EdgeKind::Imports.as_str(), "IMPORTS");
    }

    #[test]
    fn test_self_loop() {
        let e = Edge::new("a", "a", EdgeKind::Calls, Location::default());
        assert!(e.is_self_loop());
        let e = Edge::new("a", "b", EdgeKind::Calls, Location::default());
        assert!(!e.is_self_loop());
    }
}
