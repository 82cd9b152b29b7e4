//! r2cam - Transport Layer
//!
//! Everything between the camera socket and the session manager:
//!
//! - **Connection parameters**: [`ConnectionParameters`] and the closed
//!   [`TransportKind`] set
//! - **Event delivery**: [`TransportEvents`] / [`TransportEventReceiver`],
//!   the only path from transport I/O threads into the manager
//! - **TCP transport**: [`TcpH264Transport`] (requires `tcp` feature)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         UI layer (SessionHandle)        │
//! ├─────────────────────────────────────────┤
//! │          Session manager task           │
//! ├──────────────────────┬──────────────────┤
//! │  start() / stop()    │  ▲ events        │  ← This module
//! ├──────────────────────┴──────────────────┤
//! │     StreamTransport  →  FrameSink       │
//! ├─────────────────────────────────────────┤
//! │                 TCP                     │
//! └─────────────────────────────────────────┘
//! ```

mod events;
mod params;
#[cfg(feature = "tcp")]
mod tcp;

pub use events::*;
pub use params::*;
#[cfg(feature = "tcp")]
pub use tcp::TcpH264Transport;
