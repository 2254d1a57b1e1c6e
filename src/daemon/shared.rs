//! Messages exchanged between service handles and the service loop

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::notification::{Notification, NotificationId};
use crate::popup::DispatchError;

/// Commands marshalled onto the service's executor
#[derive(Debug)]
pub enum ServiceCommand {
    Submit(Arc<Notification>),
    Refresh {
        notification: Arc<Notification>,
        reply: oneshot::Sender<Result<(), DispatchError>>,
    },
    Dismiss(NotificationId),
    /// Drop cached event files
    Reload,
    Status(oneshot::Sender<ServiceStatus>),
}

/// Snapshot of the service state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub queued: usize,
    pub creating: usize,
    pub live: usize,
    pub capabilities_known: bool,
    pub capabilities: Vec<String>,
    pub bus_connected: bool,
    pub started_at: chrono::DateTime<chrono::Local>,
    pub uptime_secs: u64,
}
