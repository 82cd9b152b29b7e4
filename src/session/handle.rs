//! UI-facing handle to a session manager.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::status::{SessionStatus, StatusSnapshot};
use crate::core::{FrameSize, SessionError};
use crate::transport::ConnectionParameters;

/// Requests from the UI to the manager task.
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    Stop,
    Shutdown(oneshot::Sender<()>),
}

/// App lifecycle phase, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    /// Foreground and interactive.
    Active,
    /// Visible but not receiving input.
    Inactive,
    /// Not visible.
    Background,
}

/// Handle the UI layer uses to drive and observe a camera session.
///
/// Cloning is cheap; all clones talk to the same manager. Commands are
/// queued and return immediately. Status is read-only from here.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    params: Arc<ConnectionParameters>,
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<StatusSnapshot>,
    geometry: watch::Receiver<Option<FrameSize>>,
}

impl SessionHandle {
    pub(crate) fn new(
        params: ConnectionParameters,
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<StatusSnapshot>,
        geometry: watch::Receiver<Option<FrameSize>>,
    ) -> Self {
        Self {
            params: Arc::new(params),
            commands,
            status,
            geometry,
        }
    }

    /// Request a start sequence. No-op if running or already starting.
    pub fn start(&self) -> Result<(), SessionError> {
        self.send(Command::Start)
    }

    /// Halt the session and any start sequence in flight.
    pub fn stop(&self) -> Result<(), SessionError> {
        self.send(Command::Stop)
    }

    /// Map an app lifecycle transition onto start/stop.
    ///
    /// `Active` starts, `Background` stops, `Inactive` changes nothing.
    pub fn on_phase_change(&self, phase: AppPhase) -> Result<(), SessionError> {
        tracing::debug!(?phase, "app phase changed");
        match phase {
            AppPhase::Active => self.start(),
            AppPhase::Background => self.stop(),
            AppPhase::Inactive => Ok(()),
        }
    }

    /// Stop the transport and end the manager task.
    ///
    /// Resolves once the manager has torn down.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Shutdown(ack_tx))?;
        ack_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    /// Latest published status.
    pub fn status(&self) -> SessionStatus {
        self.status.borrow().status.clone()
    }

    /// Whether a start sequence is in flight.
    pub fn is_loading(&self) -> bool {
        self.status.borrow().loading
    }

    /// Reactive view of the status.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    ///
    /// Checks the current snapshot first.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<StatusSnapshot, SessionError>
    where
        F: FnMut(&StatusSnapshot) -> bool,
    {
        let mut status = self.status.clone();
        let snapshot = status
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Latest frame geometry seen by the manager.
    pub fn frame_geometry(&self) -> Option<FrameSize> {
        *self.geometry.borrow()
    }

    /// Reactive view of the frame geometry.
    pub fn subscribe_geometry(&self) -> watch::Receiver<Option<FrameSize>> {
        self.geometry.clone()
    }

    /// Connection parameters the session was built with.
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }

    /// Whether the manager task is still accepting commands.
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed)
    }
}
