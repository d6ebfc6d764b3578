//! Step records and error classification.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::shared::models::{GraphError, Result};

/// Outcome derived from error presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success,
    Failure,
}

/// Coarse error category surfaced to downstream agents.
///
/// The same classification is used by every engine so that consumers see
/// consistent categories regardless of which analytic produced the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    None,
    ToolNotFound,
    InvalidParams,
    Timeout,
    Internal,
}

/// Shared pure classification of engine errors.
pub fn classify_error(error: Option<&GraphError>) -> ErrorCategory {
    match error {
        None => ErrorCategory::None,
        Some(GraphError::NodeNotFound(_)) => ErrorCategory::ToolNotFound,
        Some(GraphError::NodesInDifferentTrees { .. }) | Some(GraphError::CrossTree { .. }) => {
            ErrorCategory::InvalidParams
        }
        Some(GraphError::InvalidRange { .. }) => ErrorCategory::InvalidParams,
        Some(GraphError::DeadlineExceeded) => ErrorCategory::Timeout,
        // Cancelled, HldNotInitialized, and anything unanticipated
        Some(_) => ErrorCategory::Internal,
    }
}

/// Serialized operation arguments carried by a step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolParams {
    /// Primary subject of the operation (usually a node ID)
    pub target: String,
    /// Human-readable rendering of the remaining arguments
    pub query: String,
    /// Batch size for batch operations, 0 otherwise
    pub limit: u64,
}

/// One observable analytic call.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub session_id: String,
    /// Monotonic within a session, starting at 1; 0 on unrecorded steps
    pub step_number: u64,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
    pub decision: String,
    pub tool: String,
    pub tool_params: ToolParams,
    pub outcome: Outcome,
    pub error_category: ErrorCategory,
    pub error_message: String,
    pub duration_ms: u64,
    pub result_summary: String,
    pub propagate: bool,
    pub terminal: bool,
}

impl StepRecord {
    pub(crate) fn build(
        session_id: String,
        step_number: u64,
        tool: &str,
        params: ToolParams,
        error: Option<&GraphError>,
        started: Instant,
        summary: String,
    ) -> Self {
        let outcome = if error.is_some() {
            Outcome::Failure
        } else {
            Outcome::Success
        };
        Self {
            session_id,
            step_number,
            timestamp: Utc::now(),
            actor: "engine".to_string(),
            decision: format!("invoke:{tool}"),
            tool: tool.to_string(),
            tool_params: params,
            outcome,
            error_category: classify_error(error),
            error_message: error.map(|e| e.to_string()).unwrap_or_default(),
            duration_ms: started.elapsed().as_millis() as u64,
            result_summary: summary,
            propagate: error.is_some(),
            terminal: false,
        }
    }

    /// Fall-through step when recording is unavailable: carries the outcome
    /// but is never delivered anywhere.
    pub(crate) fn unrecorded(
        tool: &str,
        params: ToolParams,
        error: Option<&GraphError>,
        started: Instant,
        summary: String,
    ) -> Self {
        Self::build(String::new(), 0, tool, params, error, started, summary)
    }

    /// JSON rendering for recorder backends that persist or ship steps
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| GraphError::ValidationFailed(format!("step serialization: {e}")))
    }

    /// Local validation before delivery: required fields present, outcome
    /// consistent with the error category.
    pub fn validate(&self) -> Result<()> {
        if self.tool.is_empty() {
            return Err(GraphError::ValidationFailed("step without tool".into()));
        }
        if self.actor.is_empty() {
            return Err(GraphError::ValidationFailed("step without actor".into()));
        }
        if self.session_id.is_empty() {
            return Err(GraphError::ValidationFailed("step without session".into()));
        }
        if self.step_number == 0 {
            return Err(GraphError::ValidationFailed(
                "step numbers start at 1".into(),
            ));
        }
        match (self.outcome, self.error_category) {
            (Outcome::Success, ErrorCategory::None) => {}
            (Outcome::Success, _) => {
                return Err(GraphError::ValidationFailed(
                    "successful step carries an error category".into(),
                ))
            }
            (Outcome::Failure, ErrorCategory::None) => {
                return Err(GraphError::ValidationFailed(
                    "failed step without an error category".into(),
                ))
            }
            (Outcome::Failure, _) => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_table() {
        assert_eq!(classify_error(None), ErrorCategory::None);
        assert_eq!(
            classify_error(Some(&GraphError::NodeNotFound("x".into()))),
            ErrorCategory::ToolNotFound
        );
        assert_eq!(
            classify_error(Some(&GraphError::NodesInDifferentTrees {
                u: "a".into(),
                v: "b".into()
            })),
            ErrorCategory::InvalidParams
        );
        assert_eq!(
            classify_error(Some(&GraphError::CrossTree {
                u: "a".into(),
                v: "b".into()
            })),
            ErrorCategory::InvalidParams
        );
        assert_eq!(
            classify_error(Some(&GraphError::DeadlineExceeded)),
            ErrorCategory::Timeout
        );
        assert_eq!(
            classify_error(Some(&GraphError::Cancelled)),
            ErrorCategory::Internal
        );
        assert_eq!(
            classify_error(Some(&GraphError::HldNotInitialized)),
            ErrorCategory::Internal
        );
        assert_eq!(
            classify_error(Some(&GraphError::EmptyGraph)),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_build_success_and_failure() {
        let started = Instant::now();
        let ok = StepRecord::build(
            "s1".into(),
            1,
            "LCA",
            ToolParams::default(),
            None,
            started,
            "n42".into(),
        );
        assert_eq!(ok.outcome, Outcome::Success);
        assert_eq!(ok.error_category, ErrorCategory::None);
        assert!(ok.validate().is_ok());

        let err = GraphError::NodeNotFound("ghost".into());
        let failed = StepRecord::build(
            "s1".into(),
            2,
            "LCA",
            ToolParams::default(),
            Some(&err),
            started,
            String::new(),
        );
        assert_eq!(failed.outcome, Outcome::Failure);
        assert_eq!(failed.error_category, ErrorCategory::ToolNotFound);
        assert!(failed.error_message.contains("ghost"));
        assert!(failed.propagate);
        assert!(failed.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inconsistency() {
        let started = Instant::now();
        let mut step = StepRecord::build(
            "s1".into(),
            1,
            "LCA",
            ToolParams::default(),
            None,
            started,
            String::new(),
        );
        step.error_category = ErrorCategory::Internal;
        assert!(step.validate().is_err());

        let mut step = StepRecord::unrecorded(
            "LCA",
            ToolParams::default(),
            None,
            started,
            String::new(),
        );
        assert!(step.validate().is_err(), "unrecorded steps do not validate");
        step.session_id = "s".into();
        step.step_number = 1;
        assert!(step.validate().is_ok());
    }

    #[test]
    fn test_serializes_to_json() {
        let step = StepRecord::build(
            "s1".into(),
            1,
            "PathQuery",
            ToolParams {
                target: "a".into(),
                query: "a->b SUM".into(),
                limit: 0,
            },
            None,
            Instant::now(),
            "aggregate=7".into(),
        );
        let json = step.to_json().unwrap();
        assert!(json.contains("\"tool\":\"PathQuery\""));
        assert!(json.contains("\"outcome\":\"Success\""));
    }
}
