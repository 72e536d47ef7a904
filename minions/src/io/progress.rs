//! Progress reporting and cancellation for a run.
//!
//! Every suspension point (model call, file operation, user prompt) runs
//! inside [`Progress::wrap`]. Cancellation is observed at those boundaries:
//! a cancelled run skips further work, and work that finishes after
//! cancellation has its result discarded.

use std::cell::{Cell, RefCell};
use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::status::StatusReport;

/// The run was cancelled at a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cancelled by user")]
pub struct Cancelled;

impl From<Cancelled> for StatusReport {
    fn from(_: Cancelled) -> Self {
        StatusReport::cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Open,
    Closed,
}

pub struct Progress {
    name: String,
    token: CancellationToken,
    deadline: Option<Instant>,
    phase: Cell<Phase>,
    steps: RefCell<Vec<String>>,
}

impl Progress {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_token(name, CancellationToken::new())
    }

    /// Share an externally owned token, e.g. one cancelled from a signal
    /// handler thread.
    pub fn with_token(name: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            name: name.into(),
            token,
            deadline: None,
            phase: Cell::new(Phase::Idle),
            steps: RefCell::new(Vec::new()),
        }
    }

    /// Cancel the run once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        if let Some(deadline) = self.deadline
            && !self.token.is_cancelled()
            && Instant::now() >= deadline
        {
            warn!(run = %self.name, "run deadline passed, cancelling");
            self.token.cancel();
        }
        self.token.is_cancelled()
    }

    /// Titles of the steps wrapped so far, in order.
    pub fn steps(&self) -> Vec<String> {
        self.steps.borrow().clone()
    }

    /// Run `work` as a titled step unless the run is cancelled.
    pub fn wrap<T>(&self, title: &str, work: impl FnOnce() -> T) -> Result<T, Cancelled> {
        if self.is_cancelled() {
            debug!(step = title, "skipping step, run cancelled");
            return Err(Cancelled);
        }
        if self.phase.get() == Phase::Idle {
            info!(run = %self.name, "started");
            self.phase.set(Phase::Open);
        }
        info!(step = title, "working");
        self.steps.borrow_mut().push(title.to_string());
        let value = work();
        if self.is_cancelled() {
            debug!(step = title, "discarding result, run cancelled");
            return Err(Cancelled);
        }
        Ok(value)
    }

    /// Mark the run complete. Idempotent.
    pub fn close(&self) {
        if self.phase.replace(Phase::Closed) != Phase::Closed {
            info!(run = %self.name, steps = self.steps.borrow().len(), "closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.phase.get() == Phase::Closed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;

    #[test]
    fn runs_work_and_records_steps() {
        let progress = Progress::new("test");
        assert_eq!(progress.wrap("first", || 2 + 2), Ok(4));
        assert_eq!(progress.steps(), vec!["first".to_string()]);
    }

    #[test]
    fn cancellation_before_a_step_skips_it() {
        let progress = Progress::new("test");
        progress.cancel();
        let ran = Cell::new(false);
        assert_eq!(progress.wrap("skipped", || ran.set(true)), Err(Cancelled));
        assert!(!ran.get());
    }

    #[test]
    fn cancellation_during_a_step_discards_its_result() {
        let progress = Progress::new("test");
        let result = progress.wrap("interrupted", || {
            progress.cancel();
            "late reply"
        });
        assert_eq!(result, Err(Cancelled));
    }

    #[test]
    fn external_token_cancels() {
        let token = CancellationToken::new();
        let progress = Progress::with_token("test", token.clone());
        token.cancel();
        assert!(progress.is_cancelled());
    }

    #[test]
    fn passed_deadline_cancels() {
        let progress =
            Progress::new("test").with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(progress.is_cancelled());
        assert!(progress.token().is_cancelled());
    }

    #[test]
    fn close_is_idempotent() {
        let progress = Progress::new("test");
        progress.close();
        progress.close();
        assert!(progress.is_closed());
    }
}
