//! Recorder port and the in-memory reference implementation.

use parking_lot::Mutex;

use super::step::StepRecord;
use crate::shared::models::Result;

/// Pluggable observer for step records. Only `record_step` and
/// `set_session_id` sit on the hot path; richer history/query surfaces
/// belong to concrete implementations.
pub trait Recorder: Send + Sync {
    fn record_step(&self, step: &StepRecord) -> Result<()>;

    fn set_session_id(&self, session_id: &str);
}

/// Keeps every delivered step in memory. The default sink for tests and for
/// agent runtimes that drain steps after each task.
#[derive(Default)]
pub struct InMemoryRecorder {
    steps: Mutex<Vec<StepRecord>>,
    current_session: Mutex<String>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn steps(&self) -> Vec<StepRecord> {
        self.steps.lock().clone()
    }

    /// Steps belonging to one session, in delivery order
    pub fn steps_for(&self, session_id: &str) -> Vec<StepRecord> {
        self.steps
            .lock()
            .iter()
            .filter(|s| s.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.steps.lock().clear();
    }

    pub fn current_session(&self) -> String {
        self.current_session.lock().clone()
    }

    /// Distinct session IDs in first-seen order
    pub fn sessions(&self) -> Vec<String> {
        let steps = self.steps.lock();
        let mut seen = Vec::new();
        for step in steps.iter() {
            if !seen.contains(&step.session_id) {
                seen.push(step.session_id.clone());
            }
        }
        seen
    }

    /// Most recently delivered step
    pub fn last_step(&self) -> Option<StepRecord> {
        self.steps.lock().last().cloned()
    }

    /// Steps produced by one tool, across sessions
    pub fn steps_for_tool(&self, tool: &str) -> Vec<StepRecord> {
        self.steps
            .lock()
            .iter()
            .filter(|s| s.tool == tool)
            .cloned()
            .collect()
    }
}

impl Recorder for InMemoryRecorder {
    fn record_step(&self, step: &StepRecord) -> Result<()> {
        self.steps.lock().push(step.clone());
        Ok(())
    }

    fn set_session_id(&self, session_id: &str) {
        *self.current_session.lock() = session_id.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::crs::step::ToolParams;
    use std::time::Instant;

    #[test]
    fn test_in_memory_round_trip() {
        let recorder = InMemoryRecorder::new();
        let step = StepRecord::build(
            "s1".into(),
            1,
            "LCA",
            ToolParams::default(),
            None,
            Instant::now(),
            String::new(),
        );
        recorder.record_step(&step).unwrap();
        recorder.set_session_id("s1");

        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.steps_for("s1").len(), 1);
        assert!(recorder.steps_for("other").is_empty());
        assert_eq!(recorder.current_session(), "s1");
    }

    #[test]
    fn test_history_queries() {
        let recorder = InMemoryRecorder::new();
        for (session, n, tool) in [("a", 1, "LCA"), ("a", 2, "Distance"), ("b", 1, "LCA")] {
            let step = StepRecord::build(
                session.into(),
                n,
                tool,
                ToolParams::default(),
                None,
                Instant::now(),
                String::new(),
            );
            recorder.record_step(&step).unwrap();
        }

        assert_eq!(recorder.sessions(), vec!["a", "b"]);
        assert_eq!(recorder.last_step().unwrap().session_id, "b");
        assert_eq!(recorder.steps_for_tool("LCA").len(), 2);
        assert_eq!(recorder.steps_for_tool("Distance").len(), 1);

        recorder.clear();
        assert!(recorder.last_step().is_none());
        assert!(recorder.sessions().is_empty());
    }
}
