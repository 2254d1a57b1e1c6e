use flume::{Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::handle::ServiceHandle;
use super::shared::{ServiceCommand, ServiceStatus};
use crate::bus::{BusEvent, NotificationBus};
use crate::config::{Config, EventsRegistry};
use crate::execute::run_event_command;
use crate::notification::Notification;
use crate::popup::{DispatchSignal, DisplayConfig, PopupDispatcher};

/// Serialized executor owning the popup dispatcher
///
/// Every command, bus reply and daemon signal is handled on the task running
/// [`run`](Self::run), one at a time, so the dispatcher never needs a lock.
pub struct NotificationService<B> {
    dispatcher: PopupDispatcher<B>,
    events: EventsRegistry,
    default_app_name: String,
    commands: Receiver<ServiceCommand>,
    bus_events: Receiver<BusEvent>,
    dispatch_signals: Receiver<DispatchSignal>,
    outbound: Sender<DispatchSignal>,
    shutdown: Receiver<()>,
    purge_interval: Duration,
    started_at: chrono::DateTime<chrono::Local>,
    started: Instant,
    bus_connected: bool,
}

impl<B: NotificationBus> NotificationService<B> {
    pub fn new(bus: B, bus_events: Receiver<BusEvent>, config: &Config) -> (Self, ServiceHandle) {
        let (command_tx, command_rx) = flume::unbounded();
        let (dispatch_tx, dispatch_rx) = flume::unbounded();
        let (outbound_tx, outbound_rx) = flume::unbounded();
        let (shutdown_tx, shutdown_rx) = flume::bounded(1);

        let dispatcher = PopupDispatcher::new(bus, dispatch_tx)
            .with_desktop_entry(config.app.desktop_entry.clone());

        let service = NotificationService {
            dispatcher,
            events: EventsRegistry::new(config.app.events_dir.clone()),
            default_app_name: config.app.name.clone(),
            commands: command_rx,
            bus_events,
            dispatch_signals: dispatch_rx,
            outbound: outbound_tx,
            shutdown: shutdown_rx,
            purge_interval: Duration::from_secs(config.daemon.purge_interval_secs.max(1)),
            started_at: chrono::Local::now(),
            started: Instant::now(),
            bus_connected: true,
        };
        let handle = ServiceHandle::new(command_tx, outbound_rx, shutdown_tx);
        (service, handle)
    }

    pub fn dispatcher(&self) -> &PopupDispatcher<B> {
        &self.dispatcher
    }

    pub async fn run(mut self) {
        info!("Notification service started");

        let commands = self.commands.clone();
        let bus_events = self.bus_events.clone();
        let shutdown = self.shutdown.clone();
        let mut purge = interval(self.purge_interval);
        purge.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv_async() => match command {
                    Ok(command) => {
                        self.handle_command(command);
                        self.drain_signals();
                    }
                    Err(_) => {
                        info!("All service handles dropped");
                        break;
                    }
                },

                event = bus_events.recv_async(), if self.bus_connected => match event {
                    Ok(event) => {
                        self.dispatcher.handle_event(event);
                        self.drain_signals();
                    }
                    Err(_) => {
                        warn!("Notification bus closed, popups can no longer be shown");
                        self.bus_connected = false;
                    }
                },

                _ = purge.tick() => {
                    self.dispatcher.purge_dropped();
                    self.drain_signals();
                }

                _ = shutdown.recv_async() => {
                    info!("Received shutdown signal, stopping notification service");
                    break;
                }
            }
        }

        info!("Notification service stopped");
    }

    fn handle_command(&mut self, command: ServiceCommand) {
        match command {
            ServiceCommand::Submit(notification) => self.submit(&notification),
            ServiceCommand::Refresh {
                notification,
                reply,
            } => {
                let config = self.display_config(&notification);
                let result = self.dispatcher.refresh(&notification, config);
                if reply.send(result).is_err() {
                    debug!("Refresh caller for {} went away", notification.id);
                }
            }
            ServiceCommand::Dismiss(id) => {
                self.dispatcher.dismiss(id);
            }
            ServiceCommand::Reload => {
                info!("Reloading event configuration");
                self.events.reload();
            }
            ServiceCommand::Status(reply) => {
                if reply.send(self.status()).is_err() {
                    debug!("Status caller went away");
                }
            }
        }
    }

    fn submit(&mut self, notification: &Arc<Notification>) {
        let config = self.display_config(notification);
        debug!(
            "Submitting notification {} ({}/{})",
            notification.id, config.app_name, config.event_id
        );

        if let Some(command) = config.event().and_then(|event| event.execute.as_deref()) {
            run_event_command(command, notification);
        }

        if !config.shows_popup() {
            debug!("Event '{}' has popups disabled", config.event_id);
            self.forward(DispatchSignal::Completed {
                id: notification.id,
            });
            return;
        }

        self.dispatcher.submit(notification, config);
    }

    /// Handle what the dispatcher emitted before it sees the next event, so
    /// each signal is judged against the state that produced it
    fn drain_signals(&mut self) {
        while let Ok(signal) = self.dispatch_signals.try_recv() {
            self.handle_signal(signal);
        }
    }

    fn handle_signal(&mut self, signal: DispatchSignal) {
        self.forward(signal);

        if let DispatchSignal::ActionTriggered { id, .. } = signal {
            let resident = self
                .dispatcher
                .notification(id)
                .is_some_and(|notification| notification.is_resident());
            if !resident && self.dispatcher.dismiss(id) {
                debug!("Closed notification {} after its action", id);
                self.forward(DispatchSignal::Completed { id });
            }
        }
    }

    fn forward(&self, signal: DispatchSignal) {
        if self.outbound.send(signal).is_err() {
            debug!("No subscriber for {:?}", signal);
        }
    }

    fn display_config(&mut self, notification: &Notification) -> DisplayConfig {
        let app_name = if notification.app_name.is_empty() {
            self.default_app_name.as_str()
        } else {
            notification.app_name.as_str()
        };
        self.events.display_config(app_name, &notification.event_id)
    }

    fn status(&self) -> ServiceStatus {
        let capabilities = self.dispatcher.capabilities();
        ServiceStatus {
            queued: self.dispatcher.queued(),
            creating: self.dispatcher.creating(),
            live: self.dispatcher.live(),
            capabilities_known: capabilities.is_clean(),
            capabilities: capabilities.list(),
            bus_connected: self.bus_connected,
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}
