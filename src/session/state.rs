//! Session state machine.
//!
//! Pure bookkeeping: no I/O, no timers. The manager task feeds it outcomes
//! and publishes the resulting snapshot.
//!
//! # State Machine
//!
//! ```text
//!            start()             attempt ok
//! ┌──────┐ ─────────> ┌─────────┐ ─────────> ┌─────────┐
//! │ Idle │            │ Loading │            │ Running │
//! └──────┘ <───────── └─────────┘            └─────────┘
//!    ▲       stop()        │ budget spent        │    │
//!    │                     ▼                     │    │ transport error
//!    │    stop()      ┌────────┐ <───────────────┘    │
//!    └─────────────── │ Failed │ <────────────────────┘
//!     (Running only)  └────────┘ ──start()──> Loading
//! ```
//!
//! `stop()` leaves `Failed` untouched: it halts the session but keeps the
//! error on screen.

use super::retry::{RetryConfig, RetryDecision, RetryState};
use super::status::{SessionStatus, StatusSnapshot};
use crate::core::{RETRY_BUDGET_EXCEEDED, TransportError};

/// How a runtime transport error was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// The running session was demoted to `Failed`.
    Demoted,
    /// A start sequence is in flight; its return values decide.
    Advisory,
    /// No session to fail.
    Ignored,
}

/// Status plus the retry counter of the in-flight start sequence.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    snapshot: StatusSnapshot,
    retry: Option<RetryState>,
}

impl SessionState {
    /// Idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    /// Current status.
    pub fn status(&self) -> &SessionStatus {
        &self.snapshot.status
    }

    /// Whether a start sequence is in flight.
    pub fn in_flight(&self) -> bool {
        self.retry.is_some()
    }

    /// Begin a start sequence.
    ///
    /// Returns `false`, changing nothing, if already running or a sequence
    /// is in flight.
    pub fn begin_start(&mut self, config: RetryConfig) -> bool {
        if self.snapshot.status.is_running() || self.in_flight() {
            return false;
        }
        self.retry = Some(RetryState::new(config));
        self.snapshot = StatusSnapshot {
            status: SessionStatus::Loading,
            loading: true,
            message: None,
            attempt: 0,
        };
        true
    }

    /// The transport started.
    pub fn attempt_succeeded(&mut self) {
        self.retry = None;
        self.snapshot.status = SessionStatus::Running;
        self.snapshot.loading = false;
        self.snapshot.message = None;
    }

    /// The transport failed to start.
    pub fn attempt_failed(&mut self, error: &TransportError) -> RetryDecision {
        let Some(retry) = self.retry.as_mut() else {
            return RetryDecision::Exhausted;
        };

        let decision = retry.record_failure();
        self.snapshot.attempt = retry.attempt();
        match decision {
            RetryDecision::RetryAfter(_) => {
                self.snapshot.message = Some(error.to_string());
            }
            RetryDecision::Exhausted => {
                self.retry = None;
                self.snapshot.status = SessionStatus::Failed(RETRY_BUDGET_EXCEEDED.to_string());
                self.snapshot.loading = false;
                self.snapshot.message = Some(RETRY_BUDGET_EXCEEDED.to_string());
            }
        }
        decision
    }

    /// The session was stopped. Returns whether the snapshot changed.
    pub fn stopped(&mut self) -> bool {
        self.retry = None;
        match self.snapshot.status {
            SessionStatus::Loading | SessionStatus::Running => {
                self.snapshot.status = SessionStatus::Idle;
                self.snapshot.loading = false;
                self.snapshot.message = None;
                true
            }
            SessionStatus::Idle | SessionStatus::Failed(_) => false,
        }
    }

    /// The transport reported a runtime failure.
    pub fn runtime_error(&mut self, error: &TransportError) -> ErrorDisposition {
        match self.snapshot.status {
            SessionStatus::Running => {
                let reason = error.to_string();
                self.snapshot.status = SessionStatus::Failed(reason.clone());
                self.snapshot.message = Some(reason);
                self.snapshot.loading = false;
                ErrorDisposition::Demoted
            }
            SessionStatus::Loading => ErrorDisposition::Advisory,
            SessionStatus::Idle | SessionStatus::Failed(_) => ErrorDisposition::Ignored,
        }
    }
}
