//! `send`: build a notification, show it and optionally follow its signals

use super::super::{CliContext, SendArgs};
use crate::bus::NotifyCall;
use crate::daemon::{spawn_dbus_service, ServiceHandle};
use crate::notification::{HintValue, Notification, NotificationId, RESIDENT_HINT};
use crate::config::EventsRegistry;
use crate::popup::{build_notify_call, CapabilityCache, DispatchSignal};
use anyhow::{Context, Result};
use flume::Receiver;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const SETTLE_POLL: Duration = Duration::from_millis(20);
const TEARDOWN_GRACE: Duration = Duration::from_millis(100);

pub struct SendHandler<'a> {
    context: &'a CliContext,
}

impl<'a> SendHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle(&self, args: SendArgs) -> Result<()> {
        let config = self.context.config();
        let notification = Arc::new(build_notification(&args, &config.app.name));

        if args.dry_run {
            let call = self.preview(&notification, &args);
            println!("{}", serde_json::to_string_pretty(&call)?);
            return Ok(());
        }

        let service = spawn_dbus_service(&config)
            .await
            .context("Failed to connect to the notification daemon")?;
        let signals = service.signals();
        service.submit(&notification)?;

        if args.wait {
            while let Ok(signal) = signals.recv_async().await {
                if signal.id() != notification.id {
                    continue;
                }
                print_signal(&signal, args.json)?;
                if matches!(signal, DispatchSignal::Completed { .. }) {
                    // a user dismissal follows its completion
                    if let Some(teardown) =
                        wait_for_teardown(&signals, notification.id, TEARDOWN_GRACE).await
                    {
                        print_signal(&teardown, args.json)?;
                    }
                    break;
                }
            }
        } else {
            wait_until_delivered(&service).await?;
        }

        service.shutdown();
        Ok(())
    }

    /// Notify call as it would be sent to a daemon supporting everything
    fn preview(&self, notification: &Notification, args: &SendArgs) -> NotifyCall {
        let config = self.context.config();
        let mut events = EventsRegistry::new(config.app.events_dir.clone());
        let app_name = args.app.as_deref().unwrap_or(config.app.name.as_str());
        let display = events.display_config(app_name, &args.event);
        let capabilities = CapabilityCache::with_capabilities(["actions", "body-markup"]);
        build_notify_call(
            notification,
            &display,
            &capabilities,
            None,
            config.app.desktop_entry.as_deref(),
        )
    }
}

/// Teardown of `id` arriving within `grace`, skipping signals of other notifications
async fn wait_for_teardown(
    signals: &Receiver<DispatchSignal>,
    id: NotificationId,
    grace: Duration,
) -> Option<DispatchSignal> {
    let deadline = Instant::now() + grace;
    loop {
        match tokio::time::timeout_at(deadline, signals.recv_async()).await {
            Ok(Ok(signal @ DispatchSignal::Teardown { .. })) if signal.id() == id => {
                return Some(signal)
            }
            Ok(Ok(other)) => debug!("Ignoring {:?} while waiting for teardown", other),
            Ok(Err(_)) | Err(_) => return None,
        }
    }
}

pub fn build_notification(args: &SendArgs, default_app: &str) -> Notification {
    let mut notification = Notification::new(args.event.clone())
        .with_app_name(args.app.clone().unwrap_or_else(|| default_app.to_string()))
        .with_text(args.body.clone().unwrap_or_default())
        .with_urgency(args.urgency)
        .with_actions(args.actions.iter().cloned())
        .persistent(args.persistent)
        .skip_grouping(args.skip_grouping);

    if let Some(title) = &args.title {
        notification = notification.with_title(title.clone());
    }
    if let Some(icon) = &args.icon {
        notification = notification.with_icon_name(icon.clone());
    }
    if let Some(label) = &args.default_action {
        notification = notification.with_default_action(label.clone());
    }
    for (key, value) in &args.hints {
        notification = notification.with_hint(key.clone(), parse_hint_value(value));
    }
    if args.resident {
        notification = notification.with_hint(RESIDENT_HINT, true);
    }
    notification
}

/// `true`/`false` become booleans, integers become `i32`, anything else a string
pub fn parse_hint_value(raw: &str) -> HintValue {
    match raw {
        "true" => HintValue::Bool(true),
        "false" => HintValue::Bool(false),
        _ => raw
            .parse::<i32>()
            .map(HintValue::Int)
            .unwrap_or_else(|_| HintValue::Str(raw.to_string())),
    }
}

/// Return once no call is outstanding for the submitted notification
async fn wait_until_delivered(service: &ServiceHandle) -> Result<()> {
    loop {
        let status = service.status().await?;
        if status.queued == 0 && status.creating == 0 {
            debug!("Notification delivered: {:?}", status);
            return Ok(());
        }
        tokio::time::sleep(SETTLE_POLL).await;
    }
}

fn print_signal(signal: &DispatchSignal, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(signal)?);
        return Ok(());
    }
    match signal {
        DispatchSignal::ActionTriggered { ordinal: 0, .. } => println!("action default"),
        DispatchSignal::ActionTriggered { ordinal, .. } => println!("action {}", ordinal),
        DispatchSignal::Teardown { .. } => println!("dismissed"),
        DispatchSignal::Completed { .. } => println!("closed"),
    }
    Ok(())
}
