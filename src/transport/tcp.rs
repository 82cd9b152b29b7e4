//! H.264-over-TCP byte transport.
//!
//! Dials the camera, then runs a reader task that hands every chunk to a
//! [`FrameSink`]. The transport never looks inside the bytes; geometry comes
//! from whatever the sink reports.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::events::TransportEvents;
use super::params::ConnectionParameters;
use crate::core::{
    DEFAULT_CONNECT_TIMEOUT, FrameSink, READ_BUFFER_SIZE, StreamTransport, TransportError,
};

/// Reader task of a running session.
#[derive(Debug)]
struct ActiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Raw H.264 stream read from a TCP socket.
pub struct TcpH264Transport<S: FrameSink> {
    params: ConnectionParameters,
    connect_timeout: Duration,
    events: TransportEvents,
    sink: Arc<Mutex<S>>,
    session: Option<ActiveSession>,
}

impl<S: FrameSink> TcpH264Transport<S> {
    /// Create a transport for `params` feeding `sink`.
    pub fn new(params: ConnectionParameters, events: TransportEvents, sink: S) -> Self {
        Self {
            params,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            events,
            sink: Arc::new(Mutex::new(sink)),
            session: None,
        }
    }

    /// Set the per-attempt connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Whether a reader task is live.
    pub fn is_running(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| !session.task.is_finished())
    }

    /// Shared access to the sink.
    pub fn sink(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.sink)
    }
}

impl<S: FrameSink> StreamTransport for TcpH264Transport<S> {
    async fn start(&mut self) -> Result<(), TransportError> {
        if self.is_running() {
            return Ok(());
        }
        // A finished reader from an earlier session is just cleared.
        self.stop();

        let stream = connect(self.params.endpoint(), self.connect_timeout).await?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(error = %err, "could not disable nagle");
        }
        tracing::info!(endpoint = %self.params, "camera stream connected");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(read_loop(
            stream,
            Arc::clone(&self.sink),
            self.events.pin(),
            cancel.clone(),
        ));
        self.session = Some(ActiveSession { cancel, task });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            tracing::debug!(endpoint = %self.params, "camera stream stopped");
            self.sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .reset();
        }
    }
}

impl<S: FrameSink> Drop for TcpH264Transport<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
        }
    }
}

async fn connect(endpoint: String, timeout: Duration) -> Result<TcpStream, TransportError> {
    match tokio::time::timeout(timeout, TcpStream::connect(&endpoint)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(err)) => Err(TransportError::Connect {
            endpoint,
            reason: err.to_string(),
        }),
        Err(_) => Err(TransportError::Timeout {
            endpoint,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

async fn read_loop<S: FrameSink>(
    mut stream: TcpStream,
    sink: Arc<Mutex<S>>,
    events: TransportEvents,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            read = stream.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                if !cancel.is_cancelled() {
                    events.error(TransportError::Closed);
                }
                return;
            }
            Ok(n) => {
                let geometry = sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(&buf[..n]);
                if let Some(size) = geometry {
                    tracing::debug!(%size, "decoder reported frame geometry");
                    events.frame_geometry(size);
                }
            }
            Err(err) => {
                if !cancel.is_cancelled() {
                    events.error(err.into());
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FrameSize;
    use crate::transport::{TransportEvent, event_channel};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Counts bytes; reports a fixed geometry on the first chunk.
    #[derive(Default)]
    struct CountingSink {
        bytes: usize,
        resets: usize,
    }

    impl FrameSink for CountingSink {
        fn push(&mut self, chunk: &[u8]) -> Option<FrameSize> {
            let first = self.bytes == 0;
            self.bytes += chunk.len();
            first.then_some(FrameSize::new(1280, 720))
        }

        fn reset(&mut self) {
            self.resets += 1;
            self.bytes = 0;
        }
    }

    async fn listener() -> (TcpListener, ConnectionParameters) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, ConnectionParameters::h264("127.0.0.1", port))
    }

    #[tokio::test]
    async fn test_start_streams_bytes_and_reports_geometry() {
        let (listener, params) = listener().await;
        let (events, mut rx) = event_channel();
        let mut transport = TcpH264Transport::new(params, events, CountingSink::default());

        transport.start().await.unwrap();
        let (mut camera, _) = listener.accept().await.unwrap();
        camera.write_all(&[0, 0, 0, 1, 0x67, 0x42]).await.unwrap();

        assert_eq!(
            rx.recv().await,
            TransportEvent::FrameGeometry(FrameSize::new(1280, 720))
        );
        assert!(transport.is_running());
        assert_eq!(transport.sink().lock().unwrap().bytes, 6);
    }

    #[tokio::test]
    async fn test_peer_close_reports_error() {
        let (listener, params) = listener().await;
        let (events, mut rx) = event_channel();
        let mut transport = TcpH264Transport::new(params, events, CountingSink::default());

        transport.start().await.unwrap();
        let (camera, _) = listener.accept().await.unwrap();
        drop(camera);

        assert_eq!(rx.recv().await, TransportEvent::Error(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, params) = listener().await;
        drop(listener);
        let (events, _rx) = event_channel();
        let mut transport = TcpH264Transport::new(params, events, CountingSink::default());

        let err = transport.start().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(!transport.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_resets_sink() {
        let (listener, params) = listener().await;
        let (events, _rx) = event_channel();
        let mut transport = TcpH264Transport::new(params, events, CountingSink::default());

        transport.stop();
        transport.start().await.unwrap();
        let _camera = listener.accept().await.unwrap();
        transport.stop();
        transport.stop();

        assert!(!transport.is_running());
        assert_eq!(transport.sink().lock().unwrap().resets, 1);
    }
}
