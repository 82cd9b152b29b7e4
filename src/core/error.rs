//! Error types for r2cam.

use thiserror::Error;

/// Failures raised by a stream transport.
///
/// Returned synchronously from a start attempt, or reported asynchronously
/// while a session is running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the camera.
    #[error("unable to connect to {endpoint}: {reason}")]
    Connect {
        /// Endpoint being dialled (`host:port`).
        endpoint: String,
        /// Underlying cause.
        reason: String,
    },

    /// Connect did not complete in time.
    #[error("connection to {endpoint} timed out after {timeout_ms} ms")]
    Timeout {
        /// Endpoint being dialled (`host:port`).
        endpoint: String,
        /// Timeout that elapsed.
        timeout_ms: u64,
    },

    /// I/O failure on an established stream.
    #[error("stream i/o error: {0}")]
    Io(String),

    /// Peer closed the stream.
    #[error("stream closed by camera")]
    Closed,

    /// Transport-specific failure.
    #[error("{0}")]
    Rejected(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Invalid configuration, detected once at construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Host is empty.
    #[error("camera host is empty")]
    EmptyHost,

    /// Host contains characters that cannot form an address.
    #[error("invalid camera host: {0:?}")]
    InvalidHost(String),

    /// Port 0 cannot be dialled.
    #[error("camera port must be non-zero")]
    ZeroPort,

    /// Port did not parse.
    #[error("invalid camera port: {0:?}")]
    InvalidPort(String),

    /// Unknown transport kind name.
    #[error("unsupported transport kind: {0:?}")]
    UnsupportedTransport(String),

    /// Retry budget must allow at least one attempt.
    #[error("max attempts must be at least 1")]
    InvalidAttempts,

    /// Backoff settings are inconsistent.
    #[error("invalid backoff: {0}")]
    InvalidBackoff(String),
}

/// Errors surfaced by a session handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The manager task has exited.
    #[error("session manager is no longer running")]
    Closed,
}

/// Top-level r2cam errors.
#[derive(Debug, Error)]
pub enum R2CamError {
    /// Session error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
