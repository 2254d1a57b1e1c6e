use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::notification::Urgency;

/// Main configuration structure for the popup notifier
///
/// Contains the application identity used on the wire, bus call settings and
/// the service/logging options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Application identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Used when a notification does not name its application
    pub name: String,
    /// Desktop file id advertised through the `desktop-entry` hint
    pub desktop_entry: Option<String>,
    /// Directory holding `<app>.notifyrc.toml` event files
    pub events_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "popup-notifier".to_string(),
            desktop_entry: None,
            events_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BusConfig {
    pub call_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 25_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    pub log_level: String,
    pub log_path: Option<PathBuf>,
    /// How often handles of dropped notifications are swept
    pub purge_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_path: None,
            purge_interval_secs: 30,
        }
    }
}

/// Per-application event description, read from `<app>.notifyrc.toml`
///
/// ```toml
/// [global]
/// name = "Builder"
/// icon_name = "applications-development"
///
/// [events.build-failed]
/// icon_name = "dialog-error"
/// urgency = "critical"
/// execute = "logger build failed: %s"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EventsFile {
    pub global: GlobalSection,
    pub events: HashMap<String, EventSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GlobalSection {
    /// Pretty application name shown as the popup's caption
    pub name: Option<String>,
    /// Caption fallback when `name` is missing
    pub comment: Option<String>,
    pub icon_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventSection {
    pub name: Option<String>,
    pub icon_name: Option<String>,
    /// Applied when the notification itself leaves urgency at default
    pub urgency: Option<Urgency>,
    /// Show a popup for this event
    pub popup: bool,
    /// Shell command started for every occurrence of the event
    pub execute: Option<String>,
}

impl Default for EventSection {
    fn default() -> Self {
        Self {
            name: None,
            icon_name: None,
            urgency: None,
            popup: true,
            execute: None,
        }
    }
}

impl EventsFile {
    pub fn event(&self, event_id: &str) -> Option<&EventSection> {
        self.events.get(event_id)
    }
}
