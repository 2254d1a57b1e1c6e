//! Translation of a notification request into the daemon's `Notify` arguments

use std::collections::HashMap;
use std::sync::Arc;

use crate::bus::{NotifyCall, ServerHandle};
use crate::notification::{HintValue, Notification, Urgency};
use crate::shared::config::{EventSection, EventsFile};

use super::capabilities::CapabilityCache;
use super::markup::strip_rich_text;

pub const HINT_APP_NAME: &str = "x-kde-appname";
pub const HINT_EVENT_ID: &str = "x-kde-eventId";
pub const HINT_SKIP_GROUPING: &str = "x-kde-skipGrouping";
pub const HINT_TRANSIENT: &str = "transient";
pub const HINT_DESKTOP_ENTRY: &str = "desktop-entry";
pub const HINT_URGENCY: &str = "urgency";
pub const HINT_IMAGE_DATA: &str = "image-data";

/// Image hints an attached raster replaces, current and deprecated spellings
const IMAGE_HINTS: &[&str] = &["image-data", "image_data", "image-path", "image_path", "icon_data"];

/// Key the daemon reports for the default action
pub const DEFAULT_ACTION_KEY: &str = "default";

/// Display configuration of one notification: the application's event file
/// plus the event being raised
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    pub app_name: String,
    pub event_id: String,
    pub events: Arc<EventsFile>,
}

impl DisplayConfig {
    pub fn new(app_name: impl Into<String>, event_id: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            event_id: event_id.into(),
            events: Arc::new(EventsFile::default()),
        }
    }

    pub fn with_events(mut self, events: Arc<EventsFile>) -> Self {
        self.events = events;
        self
    }

    pub fn event(&self) -> Option<&EventSection> {
        self.events.event(&self.event_id)
    }

    /// Pretty application name: global name, then global comment, then app name
    pub fn caption(&self) -> &str {
        let global = &self.events.global;
        global
            .name
            .as_deref()
            .or(global.comment.as_deref())
            .unwrap_or(self.app_name.as_str())
    }

    /// Event icon, then global icon, then the app name as icon name
    pub fn icon_name(&self) -> &str {
        self.event()
            .and_then(|event| event.icon_name.as_deref())
            .or(self.events.global.icon_name.as_deref())
            .unwrap_or(self.app_name.as_str())
    }

    /// Whether the event asks for a popup at all
    pub fn shows_popup(&self) -> bool {
        self.event().map_or(true, |event| event.popup)
    }

    pub fn default_urgency(&self) -> Urgency {
        self.event()
            .and_then(|event| event.urgency)
            .unwrap_or_default()
    }
}

/// `name.desktop` → `name`; only one suffix is removed
pub fn strip_desktop_suffix(name: &str) -> &str {
    name.strip_suffix(".desktop").unwrap_or(name)
}

/// Build the `Notify` arguments for a notification.
///
/// `replaces` is the live handle when updating an existing popup.
pub fn build_notify_call(
    notification: &Notification,
    config: &DisplayConfig,
    capabilities: &CapabilityCache,
    replaces: Option<ServerHandle>,
    desktop_entry: Option<&str>,
) -> NotifyCall {
    let caption = config.caption().to_string();
    let app_icon = notification
        .icon_name()
        .unwrap_or_else(|| config.icon_name())
        .to_string();

    let mut summary = notification.title().unwrap_or(caption.as_str()).to_string();
    let mut body = notification.text.clone();
    if !capabilities.supports_body_markup() {
        summary = strip_rich_text(&summary);
        body = strip_rich_text(&body);
    }

    let actions = if capabilities.supports_actions() {
        flatten_actions(notification)
    } else {
        Vec::new()
    };

    let urgency = match notification.urgency {
        Urgency::Default => config.default_urgency(),
        explicit => explicit,
    };

    NotifyCall {
        app_name: caption,
        replaces_id: replaces.map_or(0, ServerHandle::get),
        app_icon,
        summary,
        body,
        actions,
        hints: build_hints(notification, urgency, desktop_entry),
        expire_timeout: if notification.flags.persistent { 0 } else { -1 },
    }
}

/// `[default, label, 1, label, 2, label, ...]`
fn flatten_actions(notification: &Notification) -> Vec<String> {
    let mut actions = Vec::with_capacity((notification.actions.len() + 1) * 2);
    if let Some(label) = notification.default_action() {
        actions.push(DEFAULT_ACTION_KEY.to_string());
        actions.push(label.to_string());
    }
    for (index, label) in notification.actions.iter().enumerate() {
        actions.push((index + 1).to_string());
        actions.push(label.clone());
    }
    actions
}

fn build_hints(
    notification: &Notification,
    urgency: Urgency,
    desktop_entry: Option<&str>,
) -> HashMap<String, HintValue> {
    let mut hints: HashMap<String, HintValue> = HashMap::new();

    if !notification.app_name.is_empty() {
        hints.insert(HINT_APP_NAME.to_string(), notification.app_name.as_str().into());
    }
    if !notification.event_id.is_empty() {
        hints.insert(HINT_EVENT_ID.to_string(), notification.event_id.as_str().into());
    }
    if notification.flags.skip_grouping {
        hints.insert(HINT_SKIP_GROUPING.to_string(), HintValue::Int(1));
    }
    if !notification.flags.persistent {
        hints.insert(HINT_TRANSIENT.to_string(), HintValue::Bool(true));
    }
    if let Some(entry) = desktop_entry.map(strip_desktop_suffix).filter(|e| !e.is_empty()) {
        hints.insert(HINT_DESKTOP_ENTRY.to_string(), entry.into());
    }
    if let Some(level) = urgency.wire_value() {
        hints.insert(HINT_URGENCY.to_string(), HintValue::Byte(level));
    }

    for (key, value) in &notification.hints {
        hints.insert(key.clone(), value.clone());
    }

    if let Some(image) = &notification.image {
        for key in IMAGE_HINTS {
            hints.remove(*key);
        }
        hints.insert(HINT_IMAGE_DATA.to_string(), HintValue::Image(image.clone()));
    }

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::ImageData;
    use crate::shared::config::GlobalSection;

    fn all_capabilities() -> CapabilityCache {
        CapabilityCache::with_capabilities(["actions", "body-markup"])
    }

    fn events() -> Arc<EventsFile> {
        let mut events = EventsFile {
            global: GlobalSection {
                name: Some("Builder".into()),
                comment: Some("Build tool".into()),
                icon_name: Some("applications-development".into()),
            },
            ..Default::default()
        };
        events.events.insert(
            "build-failed".into(),
            EventSection {
                icon_name: Some("dialog-error".into()),
                urgency: Some(Urgency::Critical),
                ..Default::default()
            },
        );
        Arc::new(events)
    }

    #[test]
    fn test_caption_and_icon_resolution() {
        let bare = DisplayConfig::new("builder", "build-done");
        assert_eq!(bare.caption(), "builder");
        assert_eq!(bare.icon_name(), "builder");

        let global = DisplayConfig::new("builder", "build-done").with_events(events());
        assert_eq!(global.caption(), "Builder");
        assert_eq!(global.icon_name(), "applications-development");

        let event = DisplayConfig::new("builder", "build-failed").with_events(events());
        assert_eq!(event.icon_name(), "dialog-error");
    }

    #[test]
    fn test_request_icon_wins() {
        let notification = Notification::new("build-failed").with_icon_name("custom");
        let config = DisplayConfig::new("builder", "build-failed").with_events(events());
        let call = build_notify_call(&notification, &config, &all_capabilities(), None, None);
        assert_eq!(call.app_icon, "custom");
        assert_eq!(call.app_name, "Builder");
    }

    #[test]
    fn test_title_defaults_to_caption() {
        let notification = Notification::new("build-done").with_text("done");
        let config = DisplayConfig::new("builder", "build-done").with_events(events());
        let call = build_notify_call(&notification, &config, &all_capabilities(), None, None);
        assert_eq!(call.summary, "Builder");
        assert_eq!(call.body, "done");
    }

    #[test]
    fn test_markup_stripped_without_capability() {
        let notification = Notification::new("e")
            .with_title("<b>Done</b>")
            .with_text("took <i>3s</i>");
        let config = DisplayConfig::new("builder", "e");

        let plain = build_notify_call(
            &notification,
            &config,
            &CapabilityCache::with_capabilities(["actions"]),
            None,
            None,
        );
        assert_eq!(plain.summary, "Done");
        assert_eq!(plain.body, "took 3s");

        let rich = build_notify_call(&notification, &config, &all_capabilities(), None, None);
        assert_eq!(rich.summary, "<b>Done</b>");
        assert_eq!(rich.body, "took <i>3s</i>");
    }

    #[test]
    fn test_action_list_encoding() {
        let notification = Notification::new("e")
            .with_default_action("Open")
            .with_actions(["Ignore", "Snooze"]);
        let config = DisplayConfig::new("app", "e");

        let call = build_notify_call(&notification, &config, &all_capabilities(), None, None);
        assert_eq!(
            call.action_pairs(),
            vec![("default", "Open"), ("1", "Ignore"), ("2", "Snooze")]
        );

        let without = build_notify_call(
            &notification,
            &config,
            &CapabilityCache::with_capabilities(["body-markup"]),
            None,
            None,
        );
        assert!(without.actions.is_empty());
    }

    #[test]
    fn test_hint_construction() {
        let notification = Notification::new("build-done")
            .with_app_name("builder")
            .skip_grouping(true)
            .with_urgency(Urgency::Low);
        let config = DisplayConfig::new("builder", "build-done");
        let call = build_notify_call(
            &notification,
            &config,
            &all_capabilities(),
            None,
            Some("org.example.Builder.desktop"),
        );

        assert_eq!(call.hints.get(HINT_APP_NAME), Some(&HintValue::from("builder")));
        assert_eq!(call.hints.get(HINT_EVENT_ID), Some(&HintValue::from("build-done")));
        assert_eq!(call.hints.get(HINT_SKIP_GROUPING), Some(&HintValue::Int(1)));
        assert_eq!(call.hints.get(HINT_TRANSIENT), Some(&HintValue::Bool(true)));
        assert_eq!(
            call.hints.get(HINT_DESKTOP_ENTRY),
            Some(&HintValue::from("org.example.Builder"))
        );
        assert_eq!(call.hints.get(HINT_URGENCY), Some(&HintValue::Byte(0)));
        assert_eq!(call.expire_timeout, -1);
    }

    #[test]
    fn test_persistent_notification() {
        let notification = Notification::new("e").persistent(true);
        let call = build_notify_call(
            &notification,
            &DisplayConfig::new("app", "e"),
            &all_capabilities(),
            None,
            None,
        );
        assert_eq!(call.expire_timeout, 0);
        assert!(!call.hints.contains_key(HINT_TRANSIENT));
        assert!(!call.hints.contains_key(HINT_URGENCY));
        assert!(!call.hints.contains_key(HINT_SKIP_GROUPING));
    }

    #[test]
    fn test_request_hints_win() {
        let notification = Notification::new("e")
            .with_urgency(Urgency::Critical)
            .with_hint(HINT_URGENCY, HintValue::Byte(0))
            .with_hint(HINT_TRANSIENT, false)
            .with_hint("x-custom", "value");
        let call = build_notify_call(
            &notification,
            &DisplayConfig::new("app", "e"),
            &all_capabilities(),
            None,
            None,
        );
        assert_eq!(call.hints.get(HINT_URGENCY), Some(&HintValue::Byte(0)));
        assert_eq!(call.hints.get(HINT_TRANSIENT), Some(&HintValue::Bool(false)));
        assert_eq!(call.hints.get("x-custom"), Some(&HintValue::from("value")));
    }

    #[test]
    fn test_image_replaces_image_hints() {
        let image = ImageData::from_rgba(1, 1, vec![255, 0, 0, 255]).unwrap();
        let notification = Notification::new("e")
            .with_hint("image_path", "/tmp/old.png")
            .with_hint(HINT_IMAGE_DATA, "stale")
            .with_image(image.clone());
        let call = build_notify_call(
            &notification,
            &DisplayConfig::new("app", "e"),
            &all_capabilities(),
            None,
            None,
        );
        assert!(!call.hints.contains_key("image_path"));
        assert_eq!(call.hints.get(HINT_IMAGE_DATA), Some(&HintValue::Image(image)));
    }

    #[test]
    fn test_event_urgency_applies_to_default() {
        let config = DisplayConfig::new("builder", "build-failed").with_events(events());

        let defaulted = build_notify_call(
            &Notification::new("build-failed"),
            &config,
            &all_capabilities(),
            None,
            None,
        );
        assert_eq!(defaulted.hints.get(HINT_URGENCY), Some(&HintValue::Byte(2)));

        let explicit = build_notify_call(
            &Notification::new("build-failed").with_urgency(Urgency::Low),
            &config,
            &all_capabilities(),
            None,
            None,
        );
        assert_eq!(explicit.hints.get(HINT_URGENCY), Some(&HintValue::Byte(0)));
    }

    #[test]
    fn test_update_targets_handle() {
        let handle = ServerHandle::new(12).unwrap();
        let call = build_notify_call(
            &Notification::new("e"),
            &DisplayConfig::new("app", "e"),
            &all_capabilities(),
            Some(handle),
            None,
        );
        assert_eq!(call.replaces_id, 12);
    }

    #[test]
    fn test_desktop_suffix_stripped_once() {
        assert_eq!(strip_desktop_suffix("org.app.Foo.desktop"), "org.app.Foo");
        assert_eq!(strip_desktop_suffix("org.app.Foo.desktop.desktop"), "org.app.Foo.desktop");
        assert_eq!(strip_desktop_suffix("org.app.Foo"), "org.app.Foo");
    }
}
