//! Session manager task.
//!
//! The manager owns the transport and the session state. It runs as a single
//! task and is the only writer of the published status: UI commands arrive
//! over one channel, transport events over another, and both are handled on
//! this task in arrival order.
//!
//! # Start sequence
//!
//! ```text
//! attempt = 0
//! while attempt < max_attempts:
//!     transport.start()          ── ok ──> Running
//!     attempt += 1, publish reason
//!     sleep(backoff)             (unless budget spent)
//! Failed("exceeded retry budget")
//! ```
//!
//! Both the attempt and the backoff sleep are raced against incoming
//! commands, so a `stop()` abandons the sequence at once and a `start()`
//! arriving mid-sequence is ignored.

use std::future::Future;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::handle::{Command, SessionHandle};
use super::retry::{RetryConfig, RetryDecision};
use super::state::{ErrorDisposition, SessionState};
use super::status::StatusSnapshot;
use crate::core::{FrameSize, SessionError, StreamTransport, TransportError};
#[cfg(feature = "tcp")]
use crate::core::FrameSink;
#[cfg(feature = "tcp")]
use crate::transport::TcpH264Transport;
use crate::transport::{
    ConnectionParameters, TransportEvent, TransportEventReceiver, TransportEvents, event_channel,
};

/// Why a wait inside a start sequence ended early.
#[derive(Debug)]
enum Interrupt {
    Stop,
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Outcome of racing a future against the command channel.
enum Waited<T> {
    Done(T),
    Interrupted(Interrupt),
}

/// Whether the manager loop keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Everything the manager owns besides the transport.
///
/// Kept apart from the transport so an in-flight `transport.start()` can be
/// raced against the channels without borrowing conflicts.
struct Context {
    params: ConnectionParameters,
    retry: RetryConfig,
    state: SessionState,
    status: watch::Sender<StatusSnapshot>,
    geometry: watch::Sender<Option<FrameSize>>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: TransportEventReceiver,
}

impl Context {
    fn publish(&self) {
        let snapshot = self.state.snapshot();
        self.status.send_if_modified(|current| {
            if *current == *snapshot {
                return false;
            }
            *current = snapshot.clone();
            true
        });
    }

    fn on_geometry(&self, size: FrameSize) {
        debug!(%size, endpoint = %self.params, "frame geometry detected");
        self.geometry.send_replace(Some(size));
    }

    /// Race `fut` against commands, handling transport events meanwhile.
    async fn wait_or_interrupt<F: Future>(&mut self, fut: F) -> Waited<F::Output> {
        tokio::pin!(fut);
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(Command::Start) => {
                        debug!("start ignored, start sequence already in flight");
                    }
                    Some(Command::Stop) => return Waited::Interrupted(Interrupt::Stop),
                    Some(Command::Shutdown(ack)) => {
                        return Waited::Interrupted(Interrupt::Shutdown(Some(ack)));
                    }
                    None => return Waited::Interrupted(Interrupt::Shutdown(None)),
                },

                event = self.events.recv() => match event {
                    TransportEvent::FrameGeometry(size) => self.on_geometry(size),
                    TransportEvent::Error(err) => {
                        let disposition = self.state.runtime_error(&err);
                        debug!(
                            reason = %err,
                            ?disposition,
                            "transport error during start sequence"
                        );
                    }
                },

                output = &mut fut => return Waited::Done(output),
            }
        }
    }
}

/// Owns one transport and drives its lifecycle.
pub struct SessionManager<T: StreamTransport> {
    transport: T,
    ctx: Context,
}

impl<T: StreamTransport> SessionManager<T> {
    /// Build a manager and its handle without starting the task.
    ///
    /// `make_transport` is called exactly once, with the validated parameters
    /// and the event handle the transport must report through. Drive the
    /// returned manager with [`SessionManager::run`] on the context that
    /// should own status writes, or use [`SessionManager::spawn`].
    pub fn new<F>(
        config: SessionConfig,
        make_transport: F,
    ) -> Result<(Self, SessionHandle), SessionError>
    where
        F: FnOnce(&SessionConfig, TransportEvents) -> T,
    {
        config.validate()?;

        let (events_tx, events_rx) = event_channel();
        let transport = make_transport(&config, events_tx);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::idle());
        let (geometry_tx, geometry_rx) = watch::channel(None);

        let handle = SessionHandle::new(config.params.clone(), command_tx, status_rx, geometry_rx);
        let manager = Self {
            transport,
            ctx: Context {
                params: config.params,
                retry: config.retry,
                state: SessionState::new(),
                status: status_tx,
                geometry: geometry_tx,
                commands: command_rx,
                events: events_rx,
            },
        };
        Ok((manager, handle))
    }

    /// Build a manager and run it on a new tokio task.
    pub fn spawn<F>(config: SessionConfig, make_transport: F) -> Result<SessionHandle, SessionError>
    where
        F: FnOnce(&SessionConfig, TransportEvents) -> T,
    {
        let (manager, handle) = Self::new(config, make_transport)?;
        tokio::spawn(manager.run());
        Ok(handle)
    }

    /// Process commands and events until shutdown or until every handle is
    /// dropped.
    pub async fn run(mut self) {
        info!(endpoint = %self.ctx.params, "session manager started");
        loop {
            let flow = tokio::select! {
                biased;

                command = self.ctx.commands.recv() => match command {
                    Some(Command::Start) => self.start_sequence().await,
                    Some(Command::Stop) => {
                        self.stop();
                        Flow::Continue
                    }
                    Some(Command::Shutdown(ack)) => self.shutdown(Some(ack)),
                    None => self.shutdown(None),
                },

                event = self.ctx.events.recv() => {
                    self.on_event(event);
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }
        info!(endpoint = %self.ctx.params, "session manager stopped");
    }

    async fn start_sequence(&mut self) -> Flow {
        if !self.ctx.state.begin_start(self.ctx.retry) {
            debug!(status = %self.ctx.state.status(), "start ignored");
            return Flow::Continue;
        }
        info!(
            endpoint = %self.ctx.params,
            max_attempts = self.ctx.retry.max_attempts,
            "starting stream"
        );
        self.ctx.publish();

        loop {
            let result = match self.ctx.wait_or_interrupt(self.transport.start()).await {
                Waited::Done(result) => result,
                Waited::Interrupted(interrupt) => return self.abandon(interrupt),
            };

            let err = match result {
                Ok(()) => {
                    self.ctx.state.attempt_succeeded();
                    self.ctx.publish();
                    info!(endpoint = %self.ctx.params, "stream running");
                    return Flow::Continue;
                }
                Err(err) => err,
            };

            match self.ctx.state.attempt_failed(&err) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(
                        attempt = self.ctx.state.snapshot().attempt,
                        reason = %err,
                        delay_ms = delay.as_millis() as u64,
                        "stream start failed, retrying"
                    );
                    self.ctx.publish();
                    if let Waited::Interrupted(interrupt) =
                        self.ctx.wait_or_interrupt(tokio::time::sleep(delay)).await
                    {
                        return self.abandon(interrupt);
                    }
                }
                RetryDecision::Exhausted => {
                    error!(
                        endpoint = %self.ctx.params,
                        attempts = self.ctx.state.snapshot().attempt,
                        reason = %err,
                        "stream start failed, retry budget exhausted"
                    );
                    self.ctx.publish();
                    return Flow::Continue;
                }
            }
        }
    }

    fn abandon(&mut self, interrupt: Interrupt) -> Flow {
        info!(attempt = self.ctx.state.snapshot().attempt, "start sequence abandoned");
        match interrupt {
            Interrupt::Stop => {
                self.stop();
                Flow::Continue
            }
            Interrupt::Shutdown(ack) => self.shutdown(ack),
        }
    }

    fn stop(&mut self) {
        self.halt_transport();
        if self.ctx.state.stopped() {
            info!(endpoint = %self.ctx.params, "stream stopped");
            self.ctx.publish();
        } else {
            debug!(status = %self.ctx.state.status(), "stop left status unchanged");
        }
    }

    fn shutdown(&mut self, ack: Option<oneshot::Sender<()>>) -> Flow {
        self.stop();
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        Flow::Exit
    }

    /// Stop the transport and invalidate anything its old session reports.
    fn halt_transport(&mut self) {
        self.transport.stop();
        self.ctx.events.advance_epoch();
    }

    fn on_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::FrameGeometry(size) => self.ctx.on_geometry(size),
            TransportEvent::Error(err) => self.on_transport_error(err),
        }
    }

    fn on_transport_error(&mut self, err: TransportError) {
        match self.ctx.state.runtime_error(&err) {
            ErrorDisposition::Demoted => {
                // Tear the half-broken session down before surfacing the failure.
                self.halt_transport();
                error!(endpoint = %self.ctx.params, reason = %err, "stream failed");
                self.ctx.publish();
            }
            ErrorDisposition::Advisory | ErrorDisposition::Ignored => {
                debug!(
                    reason = %err,
                    status = %self.ctx.state.status(),
                    "transport error ignored"
                );
            }
        }
    }
}

#[cfg(feature = "tcp")]
impl<S: FrameSink> SessionManager<TcpH264Transport<S>> {
    /// Spawn a manager driving the built-in H.264-over-TCP transport.
    pub fn spawn_tcp(config: SessionConfig, sink: S) -> Result<SessionHandle, SessionError> {
        Self::spawn(config, |config, events| {
            TcpH264Transport::new(config.params.clone(), events, sink)
                .with_connect_timeout(config.connect_timeout)
        })
    }
}
