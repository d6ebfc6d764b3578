//! CRS recording layer.
//!
//! Every engine exposes a plain operation and a `_with_crs` companion that
//! additionally yields a step record. Recording is strictly best-effort: a
//! missing recorder, an inactive session, or a delivery failure never refuses
//! or fails the underlying computation.

mod recorder;
mod session;
mod step;

pub use recorder::{InMemoryRecorder, Recorder};
pub use session::{CrsConfig, CrsRecorder, SessionGuard};
pub use step::{classify_error, ErrorCategory, Outcome, StepRecord, ToolParams};

use std::time::Instant;

use crate::shared::models::GraphError;

/// Build (and, when a session is live, deliver) the step for one finished
/// operation. With no recorder configured the step is returned lightweight:
/// empty session, step number 0, never delivered.
pub(crate) fn emit_step(
    recorder: Option<&CrsRecorder>,
    tool: &str,
    params: ToolParams,
    error: Option<&GraphError>,
    started: Instant,
    summary: impl Into<String>,
) -> StepRecord {
    match recorder {
        Some(r) => r.finish_step(tool, params, error, started, summary.into()),
        None => StepRecord::unrecorded(tool, params, error, started, summary.into()),
    }
}
