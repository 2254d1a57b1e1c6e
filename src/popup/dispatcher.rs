//! Popup dispatcher: capability gate, request translation and event routing
//!
//! The dispatcher is a single-threaded state machine. Every entry point takes
//! `&mut self` and returns without waiting on the daemon; replies and daemon
//! signals are fed back through [`PopupDispatcher::handle_event`]. Results for
//! the caller are reported as [`DispatchSignal`]s on a flume channel.

use std::sync::{Arc, Weak};

use flume::Sender;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bus::{BusCall, BusError, BusEvent, CallToken, CloseReason, NotificationBus, ServerHandle};
use crate::notification::{Notification, NotificationId};

use super::capabilities::{CapabilityCache, PendingEntry, PendingQueue};
use super::correlation::{CorrelationTable, PendingCall};
use super::handles::{HandleTable, Lookup};
use super::translator::{build_notify_call, DisplayConfig, DEFAULT_ACTION_KEY};

/// Upward signals delivered to the owner of the notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum DispatchSignal {
    /// An action was invoked; 0 is the default action, 1.. the declared actions
    ActionTriggered { id: NotificationId, ordinal: i32 },
    /// The popup is gone, or could not be shown
    Completed { id: NotificationId },
    /// The user dismissed the popup; tear the whole notification down
    Teardown { id: NotificationId },
}

impl DispatchSignal {
    pub fn id(&self) -> NotificationId {
        match self {
            DispatchSignal::ActionTriggered { id, .. }
            | DispatchSignal::Completed { id }
            | DispatchSignal::Teardown { id } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("notification {0} has no popup to update")]
    NothingToUpdate(NotificationId),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Where a notification is in its popup lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Absent,
    /// Parked until the daemon's capabilities are known
    Queued,
    PendingCreate,
    Live(ServerHandle),
    /// Close call issued, reply outstanding
    Closing,
}

pub struct PopupDispatcher<B> {
    bus: B,
    capabilities: CapabilityCache,
    queue: PendingQueue,
    handles: HandleTable,
    calls: CorrelationTable,
    signals: Sender<DispatchSignal>,
    desktop_entry: Option<String>,
}

impl<B: NotificationBus> PopupDispatcher<B> {
    pub fn new(bus: B, signals: Sender<DispatchSignal>) -> Self {
        Self {
            bus,
            capabilities: CapabilityCache::new(),
            queue: PendingQueue::new(),
            handles: HandleTable::new(),
            calls: CorrelationTable::new(),
            signals,
            desktop_entry: None,
        }
    }

    /// Desktop file id advertised with every popup
    pub fn with_desktop_entry(mut self, desktop_entry: Option<String>) -> Self {
        self.desktop_entry = desktop_entry;
        self
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn capabilities(&self) -> &CapabilityCache {
        &self.capabilities
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn creating(&self) -> usize {
        self.calls.creating()
    }

    pub fn live(&self) -> usize {
        self.handles.len()
    }

    pub fn state_of(&self, id: NotificationId) -> RequestState {
        if let Some(handle) = self.handles.handle_of(id) {
            RequestState::Live(handle)
        } else if self.calls.is_creating(id) {
            RequestState::PendingCreate
        } else if self.queue.contains(id) {
            RequestState::Queued
        } else if self.calls.is_closing(id) {
            RequestState::Closing
        } else {
            RequestState::Absent
        }
    }

    /// Live notification behind an id
    pub fn notification(&self, id: NotificationId) -> Option<Arc<Notification>> {
        self.handles.notification(id)
    }

    /// Show a popup for `notification`.
    ///
    /// Already shown (or being created): completes immediately without a
    /// second popup. Capabilities unknown: parks the request and queries them.
    pub fn submit(&mut self, notification: &Arc<Notification>, config: DisplayConfig) {
        let id = notification.id;

        if self.handles.handle_of(id).is_some() || self.calls.is_creating(id) {
            debug!("Notification {} is already on screen", id);
            self.emit(DispatchSignal::Completed { id });
            return;
        }

        if !self.capabilities.is_clean() {
            debug!("Capabilities unknown, queueing notification {}", id);
            self.queue.push(PendingEntry {
                id,
                notification: Arc::downgrade(notification),
                config,
            });
            self.query_capabilities();
            return;
        }

        self.send_create(notification, &config);
    }

    /// Replace the content of a popup that is on screen.
    ///
    /// Fails locally, without any bus traffic, when there is no popup.
    pub fn refresh(
        &mut self,
        notification: &Arc<Notification>,
        config: DisplayConfig,
    ) -> Result<(), DispatchError> {
        let id = notification.id;
        let Some(handle) = self.handles.handle_of(id) else {
            debug!("Nothing to update for notification {}", id);
            return Err(DispatchError::NothingToUpdate(id));
        };

        self.handles.retarget(id, Arc::downgrade(notification));
        let call = build_notify_call(
            notification,
            &config,
            &self.capabilities,
            Some(handle),
            self.desktop_entry.as_deref(),
        );
        let token = self.calls.register(PendingCall::Update { id });
        if let Err(e) = self.bus.send(token, BusCall::Notify(call)) {
            error!("Failed to send update for notification {}: {}", id, e);
            self.calls.resolve(token);
            return Err(e.into());
        }
        Ok(())
    }

    /// Close the popup of `id` and forget any queued submission of it.
    ///
    /// Returns whether a live popup was closed.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let dequeued = self.queue.remove(id);
        let cancelled = self.calls.cancel_creates(id);

        match self.handles.remove_id(id) {
            Some(handle) => {
                self.send_close(id, handle);
                true
            }
            None => {
                debug!(
                    "No popup handle to close for notification {} (dequeued {}, cancelled {})",
                    id, dequeued, cancelled
                );
                false
            }
        }
    }

    /// Forget the capability cache, e.g. after reconnecting to the bus
    pub fn invalidate_capabilities(&mut self) {
        self.capabilities.invalidate();
        if !self.queue.is_empty() {
            self.query_capabilities();
        }
    }

    /// Close popups whose notification was dropped by its owner
    pub fn purge_dropped(&mut self) {
        for (handle, id) in self.handles.purge_dead() {
            debug!("Notification {} was dropped while on screen", id);
            self.send_close(id, handle);
        }
    }

    /// Feed a reply or daemon signal into the state machine
    pub fn handle_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::CapabilitiesReply { token, result } => {
                self.on_capabilities_reply(token, result)
            }
            BusEvent::NotifyReply { token, result } => self.on_notify_reply(token, result),
            BusEvent::CloseReply { token, result } => {
                if let Some(PendingCall::Close { handle, .. }) = self.calls.resolve(token) {
                    if let Err(e) = result {
                        warn!("Closing popup {} failed: {}", handle, e);
                    }
                }
            }
            BusEvent::ActionInvoked { handle, action_key } => {
                self.on_action_invoked(handle, &action_key)
            }
            BusEvent::NotificationClosed { handle, reason } => {
                self.on_notification_closed(handle, CloseReason::from_code(reason))
            }
            BusEvent::ServiceRestarted => self.on_service_restarted(),
        }
    }

    fn send_create(&mut self, notification: &Arc<Notification>, config: &DisplayConfig) {
        let id = notification.id;
        let call = build_notify_call(
            notification,
            config,
            &self.capabilities,
            None,
            self.desktop_entry.as_deref(),
        );
        let token = self.calls.register(PendingCall::Create {
            id,
            notification: Arc::downgrade(notification),
            cancelled: false,
        });
        debug!("Sending notification {} as {}", id, token);

        if let Err(e) = self.bus.send(token, BusCall::Notify(call)) {
            error!("Failed to send notification {}: {}", id, e);
            self.calls.resolve(token);
            self.emit(DispatchSignal::Completed { id });
        }
    }

    fn send_close(&mut self, id: NotificationId, handle: ServerHandle) {
        debug!("Closing popup {} of notification {}", handle, id);
        let token = self.calls.register(PendingCall::Close { id, handle });
        if let Err(e) = self.bus.send(token, BusCall::CloseNotification(handle)) {
            warn!("Failed to close popup {}: {}", handle, e);
            self.calls.resolve(token);
        }
    }

    fn query_capabilities(&mut self) {
        if self.capabilities.is_querying() {
            return;
        }

        let token = self.calls.register(PendingCall::Capabilities);
        self.capabilities.begin_query(token);
        debug!("Querying daemon capabilities as {}", token);

        if let Err(e) = self.bus.send(token, BusCall::GetCapabilities) {
            warn!("Capability query failed, assuming none: {}", e);
            self.calls.resolve(token);
            self.finish_capability_query(token, Vec::new());
        }
    }

    fn on_capabilities_reply(&mut self, token: CallToken, result: Result<Vec<String>, BusError>) {
        if !matches!(self.calls.resolve(token), Some(PendingCall::Capabilities)) {
            debug!("Ignoring capability reply for unknown {}", token);
            return;
        }
        let capabilities = result.unwrap_or_else(|e| {
            warn!("Capability query failed, assuming none: {}", e);
            Vec::new()
        });
        self.finish_capability_query(token, capabilities);
    }

    fn finish_capability_query(&mut self, token: CallToken, capabilities: Vec<String>) {
        if !self.capabilities.resolve(token, capabilities) {
            debug!("Discarding stale capability reply {}", token);
            return;
        }
        info!("Daemon capabilities: {:?}", self.capabilities.list());

        for entry in self.queue.take_all() {
            match entry.notification.upgrade() {
                Some(notification) => self.submit(&notification, entry.config),
                None => debug!("Queued notification {} was dropped", entry.id),
            }
        }
    }

    fn on_notify_reply(&mut self, token: CallToken, result: Result<u32, BusError>) {
        match self.calls.resolve(token) {
            Some(PendingCall::Create {
                id,
                notification,
                cancelled,
            }) => self.on_create_reply(id, notification, cancelled, result),
            Some(PendingCall::Update { id }) => match result {
                Ok(raw) => debug!("Notification {} updated in popup {}", id, raw),
                Err(e) => warn!("Updating notification {} failed: {}", id, e),
            },
            Some(other) => warn!("Notify reply for a non-notify call {:?}", other),
            None => debug!("Ignoring notify reply for unknown {}", token),
        }
    }

    fn on_create_reply(
        &mut self,
        id: NotificationId,
        notification: Weak<Notification>,
        cancelled: bool,
        result: Result<u32, BusError>,
    ) {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                error!("Daemon rejected notification {}: {}", id, e);
                if !cancelled {
                    self.emit(DispatchSignal::Completed { id });
                }
                return;
            }
        };

        let Some(handle) = ServerHandle::new(raw) else {
            warn!("Daemon returned the reserved handle 0 for notification {}", id);
            if !cancelled {
                self.emit(DispatchSignal::Completed { id });
            }
            return;
        };

        if cancelled || notification.strong_count() == 0 {
            debug!("Popup {} is orphaned, closing it", handle);
            self.send_close(id, handle);
            return;
        }

        debug!("Notification {} is live as popup {}", id, handle);
        if let Some(previous) = self.handles.insert(handle, id, notification) {
            warn!("Notification {} already had popup {}, closing it", id, previous);
            self.send_close(id, previous);
        }
    }

    fn on_action_invoked(&mut self, raw: u32, action_key: &str) {
        let Some(handle) = ServerHandle::new(raw) else {
            return;
        };
        let notification = match self.handles.get(handle) {
            Lookup::Live(notification) => notification,
            Lookup::Dropped(id) => {
                debug!("Action on popup of dropped notification {}", id);
                self.send_close(id, handle);
                return;
            }
            Lookup::Unknown => return,
        };

        let ordinal = if action_key == DEFAULT_ACTION_KEY && notification.default_action().is_some() {
            0
        } else {
            let parsed = action_key.parse::<i32>().ok();
            match parsed {
                Some(ordinal) if ordinal >= 1 && ordinal as usize <= notification.actions.len() => {
                    ordinal
                }
                _ => {
                    warn!(
                        "Invalid action key '{}' for notification {}",
                        action_key, notification.id
                    );
                    parsed.unwrap_or(0)
                }
            }
        };

        self.emit(DispatchSignal::ActionTriggered {
            id: notification.id,
            ordinal,
        });
    }

    fn on_notification_closed(&mut self, raw: u32, reason: CloseReason) {
        let Some((id, notification)) = ServerHandle::new(raw).and_then(|handle| self.handles.remove(handle))
        else {
            return;
        };

        if notification.strong_count() == 0 {
            debug!("Popup of dropped notification {} closed", id);
            return;
        }

        debug!("Popup of notification {} closed: {:?}", id, reason);
        self.emit(DispatchSignal::Completed { id });
        if reason.is_user_dismissal() {
            self.emit(DispatchSignal::Teardown { id });
        }
    }

    fn on_service_restarted(&mut self) {
        info!("Notification daemon restarted, dropping {} popups", self.handles.len());
        for (_, id, notification) in self.handles.drain() {
            if notification.strong_count() > 0 {
                self.emit(DispatchSignal::Completed { id });
            }
        }
        self.invalidate_capabilities();
    }

    fn emit(&self, signal: DispatchSignal) {
        if self.signals.send(signal).is_err() {
            debug!("No listener for {:?}", signal);
        }
    }
}
