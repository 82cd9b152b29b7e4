//! Core traits for r2cam.
//!
//! These traits are the seams to the collaborators the session manager does
//! not own: the byte transport and the decoder behind it.

use std::fmt;
use std::future::Future;

use super::error::TransportError;

/// Pixel dimensions of the decoded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameSize {
    /// Create a frame size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A byte-level streaming session to the camera.
///
/// The session manager is the only caller of `start`/`stop`. Asynchronous
/// events (geometry, runtime errors) are reported through the
/// [`crate::transport::TransportEvents`] handle the transport was built with,
/// from whatever thread the transport runs its I/O on.
///
/// # Requirements
///
/// - `start` MUST either establish a session or return the failure reason
/// - `stop` MUST be idempotent and MUST NOT fail
/// - after `stop`, the transport MUST NOT report further errors for the
///   stopped session (late reports are tolerated but ignored)
///
/// # Example
///
/// ```ignore
/// struct AlwaysUp;
///
/// impl StreamTransport for AlwaysUp {
///     async fn start(&mut self) -> Result<(), TransportError> {
///         Ok(())
///     }
///
///     fn stop(&mut self) {}
/// }
/// ```
pub trait StreamTransport: Send + 'static {
    /// Attempt to establish the streaming session.
    fn start(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Tear down the session if one exists.
    fn stop(&mut self);
}

/// Consumer of the raw stream bytes (the platform decoder / render surface).
///
/// Decoding is not this crate's concern; a sink only hands bytes to whatever
/// does it and reports when it learns the picture dimensions.
pub trait FrameSink: Send + 'static {
    /// Feed a chunk of stream bytes.
    ///
    /// Returns `Some` when the decoder detected new frame geometry.
    fn push(&mut self, chunk: &[u8]) -> Option<FrameSize>;

    /// Discard decoder state at the end of a session.
    fn reset(&mut self) {}
}
