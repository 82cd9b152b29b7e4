//! # r2cam
//!
//! Session lifecycle for a live H.264 camera stream shown in a mobile viewer.
//!
//! The crate sits between a UI layer and a byte transport. It owns the
//! question "is the stream up, and if not, why": it drives bounded start
//! attempts with backoff, honours stop at any point, turns runtime transport
//! errors into a failed status, and publishes every change from a single
//! task so the UI only ever reads.
//!
//! ## Feature Flags
//!
//! - `tcp` (default): built-in H.264-over-TCP transport ([`transport::TcpH264Transport`])
//!
//! ## Modules
//!
//! - [`core`]: Core traits, constants, and error types
//! - [`transport`]: Connection parameters, event delivery, TCP transport
//! - [`session`]: Session manager, handle, retry policy, status
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use r2cam::prelude::*;
//!
//! struct Discard;
//!
//! impl FrameSink for Discard {
//!     fn push(&mut self, _chunk: &[u8]) -> Option<FrameSize> {
//!         None
//!     }
//! }
//!
//! # async fn run() -> Result<(), SessionError> {
//! let config = SessionConfig::builder().host("172.20.10.1").port(4444).build();
//! let session = SessionManager::spawn_tcp(config, Discard)?;
//!
//! session.on_phase_change(AppPhase::Active)?;
//! let snapshot = session
//!     .wait_for(|s| s.status.is_running() || s.status.failure().is_some())
//!     .await?;
//! println!("camera: {}", snapshot.status);
//!
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod core;
pub mod session;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::session::{
        AppPhase, BackoffPolicy, RetryConfig, SessionConfig, SessionConfigBuilder,
        SessionHandle, SessionManager, SessionStatus, StatusSnapshot,
    };

    pub use crate::transport::{ConnectionParameters, TransportEvents, TransportKind};

    #[cfg(feature = "tcp")]
    pub use crate::transport::TcpH264Transport;
}

// Re-export commonly used items at crate root
pub use crate::core::{
    ConfigError, FrameSink, FrameSize, R2CamError, SessionError, StreamTransport, TransportError,
};
pub use crate::session::{SessionConfig, SessionHandle, SessionManager, SessionStatus, StatusSnapshot};
pub use crate::transport::{ConnectionParameters, TransportEvents, TransportKind};
