//! Common test utilities and helpers
//!
//! Reusable helpers for driving the CLI binary and the notification service
//! from integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use popup_notifier::bus::{BusCall, BusEvent, CallToken, MemoryBus};
use popup_notifier::{Config, NotificationService, ServiceHandle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Command for the popup-notifier binary
pub fn cli() -> Command {
    Command::cargo_bin("popup-notifier").expect("Failed to find popup-notifier binary")
}

/// Test environment with a project directory holding its own configuration
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self { temp_dir }
    }

    pub fn project_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.project_path().join(".popup-notifier").join("config.toml")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.project_path().join(".popup-notifier").join("events")
    }

    /// Write `<events dir>/<app>.notifyrc.toml`
    pub fn write_events(&self, app: &str, content: &str) {
        std::fs::create_dir_all(self.events_dir()).expect("Failed to create events dir");
        std::fs::write(self.events_dir().join(format!("{app}.notifyrc.toml")), content)
            .expect("Failed to write events file");
    }

    /// CLI command pointed at this project
    pub fn command(&self) -> Command {
        let mut cmd = cli();
        cmd.arg("--project").arg(self.project_path());
        cmd
    }

    /// Service configuration reading events from this environment
    pub fn service_config(&self) -> Config {
        let mut config = Config::default();
        config.app.events_dir = Some(self.events_dir());
        config
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// A running service over a recording bus
pub struct ServiceFixture {
    pub bus: MemoryBus,
    pub events: flume::Sender<BusEvent>,
    pub handle: ServiceHandle,
    pub task: tokio::task::JoinHandle<()>,
}

impl ServiceFixture {
    pub fn start(config: &Config) -> Self {
        let bus = MemoryBus::new();
        let (events, events_rx) = flume::unbounded();
        let (service, handle) = NotificationService::new(bus.clone(), events_rx, config);
        let task = tokio::spawn(service.run());
        Self {
            bus,
            events,
            handle,
            task,
        }
    }

    pub fn send(&self, event: BusEvent) {
        self.events.send(event).expect("Service stopped");
    }

    /// Wait until `n` calls of `method` were sent and return their tokens
    pub async fn tokens(&self, method: &str, n: usize) -> Vec<CallToken> {
        let bus = self.bus.clone();
        let method = method.to_string();
        wait_until(|| bus.count(&method) >= n).await;
        self.bus.tokens(&method)
    }

    /// Answer the capability query and wait for the creation call
    pub async fn accept_first(&self, capabilities: &[&str], handle: u32) {
        let token = self.tokens("GetCapabilities", 1).await[0];
        self.send(BusEvent::CapabilitiesReply {
            token,
            result: Ok(capabilities.iter().map(|c| c.to_string()).collect()),
        });
        let token = self.tokens("Notify", 1).await[0];
        self.send(BusEvent::NotifyReply {
            token,
            result: Ok(handle),
        });
        let status_handle = self.handle.clone();
        wait_until_async(move || {
            let handle = status_handle.clone();
            async move { handle.status().await.map(|s| s.live == 1).unwrap_or(false) }
        })
        .await;
    }

    pub fn notify_calls(&self) -> Vec<popup_notifier::bus::NotifyCall> {
        self.bus
            .calls()
            .into_iter()
            .filter_map(|(_, call)| match call {
                BusCall::Notify(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

/// Poll `condition` for up to two seconds
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

pub async fn wait_until_async<F, Fut>(condition: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

/// Next signal within a second
pub async fn next_signal(handle: &ServiceHandle) -> popup_notifier::DispatchSignal {
    tokio::time::timeout(Duration::from_secs(1), handle.signals().recv_async())
        .await
        .expect("no signal in time")
        .expect("service stopped")
}
