//! Session-bus transport for `org.freedesktop.Notifications`
//!
//! The dispatcher never awaits: [`DbusBus::send`] pushes the call onto a flume
//! channel and a single worker task performs the calls one at a time. Replies
//! and daemon signals are forwarded as [`BusEvent`]s on the receiver returned
//! by [`connect`].

use std::collections::HashMap;
use std::time::Duration;

use flume::{Receiver, Sender};
use futures_util::StreamExt;
use tracing::{debug, info, warn};
use zbus::zvariant::{Structure, Value};
use zbus::Connection;

use super::{BusCall, BusError, BusEvent, CallToken, NotificationBus, NotifyCall};
use crate::notification::{HintValue, ImageData};

#[zbus::proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    fn get_capabilities(&self) -> zbus::Result<Vec<String>>;

    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: &[&str],
        hints: HashMap<&str, Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    fn close_notification(&self, id: u32) -> zbus::Result<()>;

    #[zbus(signal)]
    fn action_invoked(&self, id: u32, action_key: String) -> zbus::Result<()>;

    #[zbus(signal)]
    fn notification_closed(&self, id: u32, reason: u32) -> zbus::Result<()>;
}

/// Outbound half of a session-bus connection
#[derive(Debug, Clone)]
pub struct DbusBus {
    calls: Sender<(CallToken, BusCall)>,
}

impl NotificationBus for DbusBus {
    fn send(&mut self, token: CallToken, call: BusCall) -> Result<(), BusError> {
        self.calls
            .send((token, call))
            .map_err(|_| BusError::Disconnected)
    }
}

fn bus_error(method: &str, err: zbus::Error) -> BusError {
    match err {
        zbus::Error::InputOutput(_) => BusError::Disconnected,
        other => BusError::call(method, other.to_string()),
    }
}

async fn notifications_proxy() -> Result<NotificationsProxy<'static>, BusError> {
    let connection = Connection::session()
        .await
        .map_err(|e| bus_error("connect", e))?;
    NotificationsProxy::new(&connection)
        .await
        .map_err(|e| bus_error("connect", e))
}

/// Connect to the session bus and start the call worker and signal forwarders.
///
/// Each call gets `call_timeout` to answer; a timed out call is reported as a
/// failed reply.
pub async fn connect(call_timeout: Duration) -> Result<(DbusBus, Receiver<BusEvent>), BusError> {
    let proxy = notifications_proxy().await?;
    let (call_tx, call_rx) = flume::unbounded::<(CallToken, BusCall)>();
    let (event_tx, event_rx) = flume::unbounded::<BusEvent>();

    let actions = proxy
        .receive_action_invoked()
        .await
        .map_err(|e| bus_error("AddMatch", e))?;
    let closed = proxy
        .receive_notification_closed()
        .await
        .map_err(|e| bus_error("AddMatch", e))?;
    // The owner-changed stream borrows its proxy, so it is created inside the
    // task that owns a clone of the proxy; the subscription result is handed
    // back so a failed AddMatch still fails `connect`.
    let owner_proxy = proxy.inner().clone();
    let (owners_tx, owners_rx) = flume::bounded::<Result<(), BusError>>(1);

    let owner_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut owners = match owner_proxy.receive_owner_changed().await {
            Ok(owners) => {
                let _ = owners_tx.send_async(Ok(())).await;
                owners
            }
            Err(e) => {
                let _ = owners_tx.send_async(Err(bus_error("AddMatch", e))).await;
                return;
            }
        };
        while let Some(owner) = owners.next().await {
            match owner {
                Some(name) => info!("Notification daemon is now owned by {}", name),
                None => info!("Notification daemon left the bus"),
            }
            if owner_tx.send_async(BusEvent::ServiceRestarted).await.is_err() {
                break;
            }
        }
    });
    owners_rx
        .recv_async()
        .await
        .map_err(|_| BusError::Disconnected)??;

    tokio::spawn(run_call_worker(proxy, call_rx, event_tx.clone(), call_timeout));

    let tx = event_tx.clone();
    tokio::spawn(async move {
        let mut actions = actions;
        while let Some(signal) = actions.next().await {
            match signal.args() {
                Ok(args) => {
                    let event = BusEvent::ActionInvoked {
                        handle: *args.id(),
                        action_key: args.action_key().clone(),
                    };
                    if tx.send_async(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Malformed ActionInvoked signal: {}", e),
            }
        }
        debug!("ActionInvoked stream ended");
    });

    let tx = event_tx.clone();
    tokio::spawn(async move {
        let mut closed = closed;
        while let Some(signal) = closed.next().await {
            match signal.args() {
                Ok(args) => {
                    let event = BusEvent::NotificationClosed {
                        handle: *args.id(),
                        reason: *args.reason(),
                    };
                    if tx.send_async(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("Malformed NotificationClosed signal: {}", e),
            }
        }
        debug!("NotificationClosed stream ended");
    });

    info!("Connected to the notification daemon");
    Ok((DbusBus { calls: call_tx }, event_rx))
}

async fn run_call_worker(
    proxy: NotificationsProxy<'static>,
    calls: Receiver<(CallToken, BusCall)>,
    events: Sender<BusEvent>,
    call_timeout: Duration,
) {
    while let Ok((token, call)) = calls.recv_async().await {
        let method = call.method();
        debug!("Calling {} as {}", method, token);

        let event = match call {
            BusCall::GetCapabilities => BusEvent::CapabilitiesReply {
                token,
                result: with_timeout(method, call_timeout, proxy.get_capabilities()).await,
            },
            BusCall::Notify(notify) => BusEvent::NotifyReply {
                token,
                result: with_timeout(method, call_timeout, send_notify(&proxy, &notify)).await,
            },
            BusCall::CloseNotification(handle) => BusEvent::CloseReply {
                token,
                result: with_timeout(method, call_timeout, proxy.close_notification(handle.get()))
                    .await,
            },
        };

        if events.send_async(event).await.is_err() {
            break;
        }
    }
    debug!("Bus call worker stopped");
}

async fn with_timeout<T>(
    method: &str,
    call_timeout: Duration,
    call: impl std::future::Future<Output = zbus::Result<T>>,
) -> Result<T, BusError> {
    match tokio::time::timeout(call_timeout, call).await {
        Ok(result) => result.map_err(|e| bus_error(method, e)),
        Err(_) => Err(BusError::call(
            method,
            format!("no reply within {} ms", call_timeout.as_millis()),
        )),
    }
}

async fn send_notify(proxy: &NotificationsProxy<'static>, call: &NotifyCall) -> zbus::Result<u32> {
    let actions: Vec<&str> = call.actions.iter().map(String::as_str).collect();
    let hints: HashMap<&str, Value<'_>> = call
        .hints
        .iter()
        .map(|(key, value)| (key.as_str(), hint_value(value)))
        .collect();

    proxy
        .notify(
            &call.app_name,
            call.replaces_id,
            &call.app_icon,
            &call.summary,
            &call.body,
            &actions,
            hints,
            call.expire_timeout,
        )
        .await
}

fn hint_value(value: &HintValue) -> Value<'_> {
    match value {
        HintValue::Bool(b) => Value::from(*b),
        HintValue::Byte(b) => Value::from(*b),
        HintValue::Int(i) => Value::from(*i),
        HintValue::UInt(u) => Value::from(*u),
        HintValue::Str(s) => Value::from(s.as_str()),
        HintValue::Image(image) => image_value(image),
    }
}

/// `(iiibiiay)` as defined for the `image-data` hint
fn image_value(image: &ImageData) -> Value<'static> {
    Value::from(Structure::from((
        image.width,
        image.height,
        image.rowstride,
        image.has_alpha,
        image.bits_per_sample,
        image.channels,
        image.data.clone(),
    )))
}

/// One-shot capability query outside the dispatcher
pub async fn fetch_capabilities(call_timeout: Duration) -> Result<Vec<String>, BusError> {
    let proxy = notifications_proxy().await?;
    with_timeout("GetCapabilities", call_timeout, proxy.get_capabilities()).await
}
