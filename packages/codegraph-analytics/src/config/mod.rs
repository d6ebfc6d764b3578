//! Engine configuration.
//!
//! Every knob has a production default; a YAML file can override any subset.
//!
//! ```yaml
//! pagerank:
//!   damping: 0.85
//!   max_iterations: 100
//! path_engine:
//!   slow_query_threshold_ms: 50
//!   query_cache_size: 1024
//! crs:
//!   auto_session: true
//!   session_timeout_ms: 30000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::features::analytics::PageRankConfig;
use crate::shared::models::{GraphError, Result};

/// Path engine knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathEngineConfig {
    /// Queries slower than this only log a warning; they are never aborted
    pub slow_query_threshold_ms: u64,

    /// Bounded LRU capacity for the path-query result cache (0 disables it)
    pub query_cache_size: usize,
}

impl Default for PathEngineConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: 50,
            query_cache_size: 1024,
        }
    }
}

/// CRS recording knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrsSettings {
    /// Create a session on demand when a recording call arrives without one
    pub auto_session: bool,

    /// Inactivity timeout in milliseconds; 0 disables expiry
    pub session_timeout_ms: u64,
}

impl Default for CrsSettings {
    fn default() -> Self {
        Self {
            auto_session: false,
            session_timeout_ms: 0,
        }
    }
}

impl CrsSettings {
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_ms > 0).then(|| Duration::from_millis(self.session_timeout_ms))
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pagerank: PageRankConfig,
    pub path_engine: PathEngineConfig,
    pub crs: CrsSettings,
}

impl EngineConfig {
    /// Parse from a YAML document; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GraphError::ValidationFailed(format!("config parse error: {e}")))
    }

    /// Load from a YAML file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GraphError::ValidationFailed(format!(
                "cannot read config {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.path_engine.slow_query_threshold_ms, 50);
        assert_eq!(cfg.path_engine.query_cache_size, 1024);
        assert!(!cfg.crs.auto_session);
        assert!(cfg.crs.session_timeout().is_none());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let cfg = EngineConfig::from_yaml_str(
            "path_engine:\n  query_cache_size: 64\ncrs:\n  auto_session: true\n",
        )
        .unwrap();
        assert_eq!(cfg.path_engine.query_cache_size, 64);
        assert!(cfg.crs.auto_session);
        // untouched section keeps defaults
        assert_eq!(cfg.path_engine.slow_query_threshold_ms, 50);
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(EngineConfig::from_yaml_str("pagerank: [").is_err());
    }
}
