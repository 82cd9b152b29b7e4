//! Session and transport constants.
//!
//! Defaults match the stock camera rig: a Raspberry Pi streaming raw
//! H.264 over TCP on a phone hotspot.

use std::time::Duration;

// =============================================================================
// CAMERA ENDPOINT
// =============================================================================

/// Default camera host (the Pi joins the phone hotspot at this address).
pub const DEFAULT_CAMERA_HOST: &str = "172.20.10.1";

/// Default camera port.
pub const DEFAULT_CAMERA_PORT: u16 = 4444;

// =============================================================================
// RETRY POLICY
// =============================================================================

/// Transport start attempts per `start()` call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay between failed attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// Upper bound on a single exponential backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Status message once every attempt of a start sequence has failed.
pub const RETRY_BUDGET_EXCEEDED: &str = "exceeded retry budget";

// =============================================================================
// TRANSPORT
// =============================================================================

/// Time allowed for the TCP connect of a single attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read buffer handed to the frame sink.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Environment variable prefix used by [`crate::session::SessionConfig::from_env`].
pub const ENV_PREFIX: &str = "R2CAM_";
