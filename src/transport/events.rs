//! Event delivery from a transport to the session manager.
//!
//! Transports run their I/O wherever they like and report through
//! [`TransportEvents`]. The manager owns the matching
//! [`TransportEventReceiver`] and drains it on its own task, so every status
//! write happens in one place.
//!
//! - Errors travel over an unbounded FIFO: never dropped, never reordered.
//! - Geometry travels over a `watch` slot: under backpressure only the latest
//!   size survives.
//!
//! Each error carries the session epoch it was raised in. The manager advances
//! the epoch whenever it stops the transport, so a report from a torn-down
//! session cannot demote a newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, watch};

use crate::core::{FrameSize, TransportError};

/// An event observed by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The decoder reported picture dimensions.
    FrameGeometry(FrameSize),
    /// The running session failed.
    Error(TransportError),
}

#[derive(Debug)]
struct TaggedError {
    epoch: u64,
    error: TransportError,
}

/// Create a connected sender/receiver pair.
pub fn event_channel() -> (TransportEvents, TransportEventReceiver) {
    let (errors_tx, errors_rx) = mpsc::unbounded_channel();
    let (geometry_tx, geometry_rx) = watch::channel(None);
    let epoch = Arc::new(AtomicU64::new(0));

    let events = TransportEvents {
        errors: errors_tx,
        geometry: Arc::new(geometry_tx),
        epoch: Arc::clone(&epoch),
        pinned: None,
    };
    let receiver = TransportEventReceiver {
        errors: errors_rx,
        geometry: geometry_rx,
        errors_open: true,
        geometry_open: true,
        epoch,
    };
    (events, receiver)
}

/// Reporting handle given to a transport.
///
/// Cheap to clone and safe to use from any thread, including threads outside
/// the tokio runtime.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    errors: mpsc::UnboundedSender<TaggedError>,
    geometry: Arc<watch::Sender<Option<FrameSize>>>,
    epoch: Arc<AtomicU64>,
    pinned: Option<u64>,
}

impl TransportEvents {
    /// Report detected frame geometry.
    pub fn frame_geometry(&self, size: FrameSize) {
        self.geometry.send_replace(Some(size));
    }

    /// Report a runtime failure of the session.
    pub fn error(&self, error: TransportError) {
        let epoch = self
            .pinned
            .unwrap_or_else(|| self.epoch.load(Ordering::Acquire));
        if self.errors.send(TaggedError { epoch, error }).is_err() {
            tracing::debug!("session manager gone, transport error not delivered");
        }
    }

    /// A copy bound to the current session.
    ///
    /// Give this to the I/O task of a freshly started session: once the
    /// manager stops that session, everything the copy reports is discarded.
    pub fn pin(&self) -> Self {
        Self {
            pinned: Some(self.epoch.load(Ordering::Acquire)),
            ..self.clone()
        }
    }

    /// Whether reports from this handle would still be delivered.
    pub fn is_current(&self) -> bool {
        match self.pinned {
            Some(epoch) => epoch == self.epoch.load(Ordering::Acquire),
            None => true,
        }
    }

    /// Whether the receiving manager still exists.
    pub fn is_connected(&self) -> bool {
        !self.errors.is_closed()
    }
}

/// Receiving side, owned by the session manager.
#[derive(Debug)]
pub struct TransportEventReceiver {
    errors: mpsc::UnboundedReceiver<TaggedError>,
    geometry: watch::Receiver<Option<FrameSize>>,
    errors_open: bool,
    geometry_open: bool,
    epoch: Arc<AtomicU64>,
}

impl TransportEventReceiver {
    /// Invalidate every pinned handle of the current session.
    pub fn advance_epoch(&mut self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current session epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Next event for the current session.
    ///
    /// Errors take priority over geometry. Stale errors are logged and
    /// skipped. Pends forever once every sender is gone. Cancel safe.
    pub async fn recv(&mut self) -> TransportEvent {
        loop {
            if !self.errors_open && !self.geometry_open {
                return std::future::pending().await;
            }

            tokio::select! {
                biased;

                tagged = self.errors.recv(), if self.errors_open => match tagged {
                    Some(tagged) => {
                        let current = self.epoch.load(Ordering::Acquire);
                        if tagged.epoch == current {
                            return TransportEvent::Error(tagged.error);
                        }
                        tracing::debug!(
                            epoch = tagged.epoch,
                            current,
                            reason = %tagged.error,
                            "dropping error from a stopped session"
                        );
                    }
                    None => self.errors_open = false,
                },

                changed = self.geometry.changed(), if self.geometry_open => match changed {
                    Ok(()) => {
                        if let Some(size) = *self.geometry.borrow_and_update() {
                            return TransportEvent::FrameGeometry(size);
                        }
                    }
                    Err(_) => self.geometry_open = false,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_errors_arrive_in_order() {
        let (events, mut rx) = event_channel();
        events.error(TransportError::Io("first".into()));
        events.error(TransportError::Closed);

        assert_eq!(
            rx.recv().await,
            TransportEvent::Error(TransportError::Io("first".into()))
        );
        assert_eq!(rx.recv().await, TransportEvent::Error(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_geometry_coalesces_to_latest() {
        let (events, mut rx) = event_channel();
        events.frame_geometry(FrameSize::new(640, 480));
        events.frame_geometry(FrameSize::new(1280, 720));

        assert_eq!(
            rx.recv().await,
            TransportEvent::FrameGeometry(FrameSize::new(1280, 720))
        );
    }

    #[tokio::test]
    async fn test_errors_before_geometry() {
        let (events, mut rx) = event_channel();
        events.frame_geometry(FrameSize::new(640, 480));
        events.error(TransportError::Closed);

        assert_eq!(rx.recv().await, TransportEvent::Error(TransportError::Closed));
        assert_eq!(
            rx.recv().await,
            TransportEvent::FrameGeometry(FrameSize::new(640, 480))
        );
    }

    #[tokio::test]
    async fn test_pinned_errors_dropped_after_epoch_advance() {
        let (events, mut rx) = event_channel();
        let session = events.pin();
        assert!(session.is_current());

        rx.advance_epoch();
        assert!(!session.is_current());
        session.error(TransportError::Closed);
        events.error(TransportError::Io("fresh".into()));

        assert_eq!(
            rx.recv().await,
            TransportEvent::Error(TransportError::Io("fresh".into()))
        );
    }

    #[tokio::test]
    async fn test_errors_from_foreign_thread() {
        let (events, mut rx) = event_channel();
        let worker = std::thread::spawn(move || {
            for i in 0..5 {
                events.error(TransportError::Io(format!("e{i}")));
            }
        });
        worker.join().unwrap();

        for i in 0..5 {
            assert_eq!(
                rx.recv().await,
                TransportEvent::Error(TransportError::Io(format!("e{i}")))
            );
        }
    }

    #[tokio::test]
    async fn test_closed_receiver_is_reported() {
        let (events, rx) = event_channel();
        assert!(events.is_connected());
        drop(rx);
        assert!(!events.is_connected());
        // Sending after the manager is gone must not panic.
        events.error(TransportError::Closed);
        events.frame_geometry(FrameSize::new(1, 1));
    }
}
