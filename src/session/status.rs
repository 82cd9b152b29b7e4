//! Published session status.

use std::fmt;

/// Lifecycle status of the camera session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// No session and no attempt in progress.
    #[default]
    Idle,
    /// A start sequence is running.
    Loading,
    /// The transport is streaming.
    Running,
    /// The last start sequence or the running session failed.
    Failed(String),
}

impl SessionStatus {
    /// Whether the stream is up.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Failure reason, if failed.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Loading => f.write_str("loading"),
            Self::Running => f.write_str("running"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// What the UI observes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Current status.
    pub status: SessionStatus,
    /// A start sequence is in flight (drives the spinner).
    pub loading: bool,
    /// Latest failure description.
    ///
    /// Per-attempt reason while loading, the failure reason once failed,
    /// `None` when running or never failed.
    pub message: Option<String>,
    /// Failed attempts in the current (or last) start sequence.
    pub attempt: u32,
}

impl StatusSnapshot {
    /// Initial snapshot.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Text for the error label (empty when there is nothing to show).
    pub fn error_text(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}
