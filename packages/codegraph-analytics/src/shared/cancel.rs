//! Cooperative cancellation.
//!
//! Long-running algorithms poll a shared token every `CANCEL_POLL_INTERVAL`
//! inner iterations. Cancellation never rolls back side effects already
//! applied; callers needing atomicity wrap updates in their own transaction
//! discipline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::models::{GraphError, Result};

/// Shared cancellation token with an optional deadline.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that never cancels (the common case for tests and batch jobs)
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    /// Token that reports `DeadlineExceeded` once `deadline` has passed
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Poll point for long loops. Distinguishes explicit cancellation from an
    /// elapsed deadline.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(GraphError::Cancelled);
        }
        if let Some(d) = self.deadline {
            if Instant::now() >= d {
                return Err(GraphError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
