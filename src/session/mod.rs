//! r2cam - Session Layer
//!
//! Owns the stream lifecycle on behalf of the UI:
//!
//! - **Manager**: [`SessionManager`] runs the start sequence, honours stop,
//!   and is the only writer of status
//! - **Handle**: [`SessionHandle`] queues commands and exposes status
//! - **Retry**: [`RetryConfig`] / [`BackoffPolicy`] bound each start sequence
//! - **State**: [`SessionState`], the pure transition table behind the manager
//!
//! # Data Flow
//!
//! ```text
//!   SessionHandle ──commands──> SessionManager ──start/stop──> StreamTransport
//!        ▲                          │    ▲                          │
//!        └────── watch<Status> ─────┘    └──── TransportEvents ─────┘
//! ```

mod config;
mod handle;
mod manager;
mod retry;
mod state;
mod status;

pub use config::{SessionConfig, SessionConfigBuilder};
pub use handle::{AppPhase, SessionHandle};
pub use manager::SessionManager;
pub use retry::{BackoffPolicy, RetryConfig, RetryDecision, RetryState};
pub use state::{ErrorDisposition, SessionState};
pub use status::{SessionStatus, StatusSnapshot};
