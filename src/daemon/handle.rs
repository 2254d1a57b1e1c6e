use flume::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use super::shared::{ServiceCommand, ServiceStatus};
use crate::errors::{AppError, AppResult};
use crate::notification::{Notification, NotificationId};
use crate::popup::DispatchSignal;

/// Caller side of a running [`NotificationService`](super::NotificationService)
///
/// Cheap to clone and usable from any thread. The caller keeps owning the
/// `Arc<Notification>`s it submits: dropping the last one makes the service
/// close the popup on its next sweep.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    commands: Sender<ServiceCommand>,
    signals: Receiver<DispatchSignal>,
    shutdown: Sender<()>,
}

impl ServiceHandle {
    pub(super) fn new(
        commands: Sender<ServiceCommand>,
        signals: Receiver<DispatchSignal>,
        shutdown: Sender<()>,
    ) -> Self {
        Self {
            commands,
            signals,
            shutdown,
        }
    }

    fn send(&self, command: ServiceCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::ServiceStopped)
    }

    pub fn submit(&self, notification: &Arc<Notification>) -> AppResult<()> {
        self.send(ServiceCommand::Submit(Arc::clone(notification)))
    }

    /// Replace the content of an on-screen popup; fails when there is none
    pub async fn refresh(&self, notification: &Arc<Notification>) -> AppResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::Refresh {
            notification: Arc::clone(notification),
            reply,
        })?;
        rx.await.map_err(|_| AppError::ServiceStopped)??;
        Ok(())
    }

    pub fn dismiss(&self, id: NotificationId) -> AppResult<()> {
        self.send(ServiceCommand::Dismiss(id))
    }

    pub fn reload(&self) -> AppResult<()> {
        self.send(ServiceCommand::Reload)
    }

    pub async fn status(&self) -> AppResult<ServiceStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(ServiceCommand::Status(reply))?;
        rx.await.map_err(|_| AppError::ServiceStopped)
    }

    /// Ask the service to stop; never blocks, repeated calls are no-ops
    pub fn shutdown(&self) {
        match self.shutdown.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => debug!("Service already stopping"),
            Err(TrySendError::Disconnected(())) => debug!("Service already stopped"),
        }
    }

    /// Signals for submitted notifications.
    ///
    /// Clones of the receiver share one queue: each signal is delivered to
    /// exactly one of them.
    pub fn signals(&self) -> Receiver<DispatchSignal> {
        self.signals.clone()
    }
}
