//! Session stack and step numbering.
//!
//! One mutex guards the whole session state; step counters are owned by the
//! current frame, so pushing a nested session starts independent numbering
//! and popping resumes the outer count where it left off.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::recorder::Recorder;
use super::step::{StepRecord, ToolParams};
use crate::config::CrsSettings;
use crate::shared::models::{GraphError, Result};

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

fn monotonic_millis() -> u64 {
    PROCESS_START.elapsed().as_millis() as u64
}

/// Recording configuration
#[derive(Debug, Clone, Default)]
pub struct CrsConfig {
    /// Create a session on demand when a recording call arrives without one
    pub auto_session: bool,
    /// Inactivity window after which a session is considered stale
    pub session_timeout: Option<Duration>,
}

impl From<&CrsSettings> for CrsConfig {
    fn from(settings: &CrsSettings) -> Self {
        Self {
            auto_session: settings.auto_session,
            session_timeout: settings.session_timeout(),
        }
    }
}

struct SessionFrame {
    id: String,
    /// Last assigned step number; the next step is `counter + 1`
    counter: u64,
    last_activity: Instant,
    auto: bool,
}

#[derive(Default)]
struct SessionState {
    current: Option<SessionFrame>,
    stack: Vec<SessionFrame>,
}

/// Session-scoped step recording around a pluggable `Recorder`.
pub struct CrsRecorder {
    recorder: Arc<dyn Recorder>,
    config: CrsConfig,
    state: Mutex<SessionState>,
    auto_seq: AtomicU64,
}

impl CrsRecorder {
    pub fn new(recorder: Arc<dyn Recorder>, config: CrsConfig) -> Self {
        Self {
            recorder,
            config,
            state: Mutex::new(SessionState::default()),
            auto_seq: AtomicU64::new(0),
        }
    }

    /// Begin a session with a caller-chosen id; resets the step counter.
    pub fn start_session(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(GraphError::ValidationFailed(
                "session id must not be empty".into(),
            ));
        }
        let mut state = self.state.lock();
        state.current = Some(SessionFrame {
            id: id.to_string(),
            counter: 0,
            last_activity: Instant::now(),
            auto: false,
        });
        self.recorder.set_session_id(id);
        Ok(())
    }

    /// End the current session; errors when none is active.
    pub fn end_session(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.current.take().is_none() {
            return Err(GraphError::ValidationFailed("no active session".into()));
        }
        self.recorder.set_session_id("");
        Ok(())
    }

    /// Suspend the current session (id and counter) and switch to a fresh
    /// one whose numbering starts at 1. Requires an active session.
    pub fn push_session(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(GraphError::ValidationFailed(
                "session id must not be empty".into(),
            ));
        }
        let mut state = self.state.lock();
        let outer = state
            .current
            .take()
            .ok_or_else(|| GraphError::ValidationFailed("push requires an active session".into()))?;
        state.stack.push(outer);
        state.current = Some(SessionFrame {
            id: id.to_string(),
            counter: 0,
            last_activity: Instant::now(),
            auto: false,
        });
        self.recorder.set_session_id(id);
        Ok(())
    }

    /// Restore the most recently pushed session, id *and* step counter, so
    /// the outer session continues numbering where it left off.
    pub fn pop_session(&self) -> Result<()> {
        let mut state = self.state.lock();
        let outer = state
            .stack
            .pop()
            .ok_or_else(|| GraphError::ValidationFailed("pop on an empty session stack".into()))?;
        self.recorder.set_session_id(&outer.id);
        state.current = Some(outer);
        Ok(())
    }

    /// Current session id, if any (test and tooling aid)
    pub fn current_session(&self) -> Option<String> {
        self.state.lock().current.as_ref().map(|f| f.id.clone())
    }

    /// RAII wrapper around `start_session`/`end_session`.
    pub fn session_scope(&self, id: &str) -> Result<SessionGuard<'_>> {
        self.start_session(id)?;
        Ok(SessionGuard {
            crs: self,
            done: false,
        })
    }

    /// Claim the next step slot. Handles auto-session creation and the
    /// inactivity timeout; `None` means recording is off for this call.
    fn next_step(&self) -> Option<(String, u64)> {
        enum Action {
            UseCurrent,
            StartFresh,
            Stop,
        }

        let mut state = self.state.lock();
        let now = Instant::now();

        let action = match &state.current {
            Some(frame) => {
                let expired = self
                    .config
                    .session_timeout
                    .is_some_and(|t| now.duration_since(frame.last_activity) > t);
                if !expired {
                    Action::UseCurrent
                } else if self.config.auto_session {
                    // Stale session (manual or auto) is discarded; a fresh
                    // auto-session takes over.
                    debug!(stale = %frame.id, was_auto = frame.auto, "session expired");
                    Action::StartFresh
                } else {
                    // Expired manual session without auto-session: recording
                    // simply stops.
                    Action::Stop
                }
            }
            None if self.config.auto_session => Action::StartFresh,
            None => Action::Stop,
        };

        match action {
            Action::Stop => return None,
            Action::StartFresh => state.current = Some(self.fresh_auto_frame()),
            Action::UseCurrent => {}
        }

        let frame = state.current.as_mut().expect("session frame present");
        frame.counter += 1;
        frame.last_activity = now;
        Some((frame.id.clone(), frame.counter))
    }

    fn fresh_auto_frame(&self) -> SessionFrame {
        let seq = self.auto_seq.fetch_add(1, Ordering::Relaxed);
        let id = format!("auto_{}_{}", monotonic_millis(), seq);
        self.recorder.set_session_id(&id);
        SessionFrame {
            id,
            counter: 0,
            last_activity: Instant::now(),
            auto: true,
        }
    }

    /// Build the step for a finished operation and deliver it when a session
    /// is live. Validation or delivery failures are logged, never surfaced.
    pub(crate) fn finish_step(
        &self,
        tool: &str,
        params: ToolParams,
        error: Option<&GraphError>,
        started: Instant,
        summary: String,
    ) -> StepRecord {
        match self.next_step() {
            Some((session_id, step_number)) => {
                let step = StepRecord::build(
                    session_id,
                    step_number,
                    tool,
                    params,
                    error,
                    started,
                    summary,
                );
                match step.validate() {
                    Ok(()) => {
                        if let Err(e) = self.recorder.record_step(&step) {
                            warn!(tool, error = %e, "failed to deliver step record");
                        }
                    }
                    Err(e) => warn!(tool, error = %e, "dropping invalid step record"),
                }
                step
            }
            None => StepRecord::unrecorded(tool, params, error, started, summary),
        }
    }
}

/// Ends the session on drop; explicit `start_session`/`end_session` remain
/// available for callers that prefer manual control.
pub struct SessionGuard<'a> {
    crs: &'a CrsRecorder,
    done: bool,
}

impl SessionGuard<'_> {
    /// End the session eagerly (idempotent with the drop)
    pub fn finish(mut self) -> Result<()> {
        self.done = true;
        self.crs.end_session()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.crs.end_session();
        }
    }
}
