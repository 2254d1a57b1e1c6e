//! Notification object model
//!
//! A [`Notification`] is owned by the caller, usually behind an `Arc`. The popup
//! dispatcher only ever keeps `Weak` references to it, so dropping the last
//! `Arc` is enough to forget a notification.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

/// Hint that keeps a notification alive after one of its actions was invoked.
pub const RESIDENT_HINT: &str = "resident";

static NEXT_ID: AtomicU32 = AtomicU32::new(1);

/// Application-scoped identity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(pub u32);

impl NotificationId {
    /// Allocate the next free id for this process
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Display priority requested by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Default,
    Low,
    Normal,
    High,
    Critical,
}

impl Urgency {
    /// Value of the `urgency` hint, `None` when the hint must be omitted.
    ///
    /// The daemon only knows low, normal and critical, so normal and high
    /// collapse onto the same value.
    pub fn wire_value(self) -> Option<u8> {
        match self {
            Urgency::Default => None,
            Urgency::Low => Some(0),
            Urgency::Normal | Urgency::High => Some(1),
            Urgency::Critical => Some(2),
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Urgency::Default),
            "low" => Ok(Urgency::Low),
            "normal" => Ok(Urgency::Normal),
            "high" => Ok(Urgency::High),
            "critical" => Ok(Urgency::Critical),
            other => Err(format!(
                "unknown urgency '{other}', expected one of: default, low, normal, high, critical"
            )),
        }
    }
}

/// Behavioural flags of a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationFlags {
    /// Stay on screen until closed instead of expiring
    pub persistent: bool,
    /// Ask the daemon not to group this popup with others of the same app
    pub skip_grouping: bool,
}

/// Raw RGBA raster sent as the `image-data` hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageData {
    pub width: i32,
    pub height: i32,
    pub rowstride: i32,
    pub has_alpha: bool,
    pub bits_per_sample: i32,
    pub channels: i32,
    pub data: Vec<u8>,
}

impl ImageData {
    /// Wrap tightly packed 8-bit RGBA pixels.
    ///
    /// Returns `None` when `data` does not hold exactly `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
        if data.len() != expected {
            return None;
        }
        let width = i32::try_from(width).ok()?;
        let height = i32::try_from(height).ok()?;
        Some(Self {
            width,
            height,
            rowstride: width.checked_mul(4)?,
            has_alpha: true,
            bits_per_sample: 8,
            channels: 4,
            data,
        })
    }
}

/// Value stored in the hint map sent to the daemon
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HintValue {
    Bool(bool),
    Byte(u8),
    Int(i32),
    UInt(u32),
    Str(String),
    Image(ImageData),
}

impl HintValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HintValue::Bool(value) => Some(*value),
            HintValue::Byte(value) => Some(*value != 0),
            HintValue::Int(value) => Some(*value != 0),
            HintValue::UInt(value) => Some(*value != 0),
            HintValue::Str(value) => match value.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            HintValue::Image(_) => None,
        }
    }
}

impl From<bool> for HintValue {
    fn from(value: bool) -> Self {
        HintValue::Bool(value)
    }
}

impl From<u8> for HintValue {
    fn from(value: u8) -> Self {
        HintValue::Byte(value)
    }
}

impl From<i32> for HintValue {
    fn from(value: i32) -> Self {
        HintValue::Int(value)
    }
}

impl From<u32> for HintValue {
    fn from(value: u32) -> Self {
        HintValue::UInt(value)
    }
}

impl From<&str> for HintValue {
    fn from(value: &str) -> Self {
        HintValue::Str(value.to_string())
    }
}

impl From<String> for HintValue {
    fn from(value: String) -> Self {
        HintValue::Str(value)
    }
}

/// Caller-supplied hints, merged last into the wire hint map
pub type Hints = BTreeMap<String, HintValue>;

/// A notification request as issued by the application
///
/// Fields are public so that an updated copy can be built with struct update
/// syntax before calling `refresh`; keep the `id` to address the same popup.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub app_name: String,
    pub event_id: String,
    pub title: Option<String>,
    pub text: String,
    pub icon_name: Option<String>,
    pub default_action: Option<String>,
    pub actions: Vec<String>,
    pub urgency: Urgency,
    pub flags: NotificationFlags,
    pub hints: Hints,
    pub image: Option<ImageData>,
}

impl Notification {
    /// Create a notification for the given event with a freshly allocated id
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            id: NotificationId::next(),
            app_name: String::new(),
            event_id: event_id.into(),
            title: None,
            text: String::new(),
            icon_name: None,
            default_action: None,
            actions: Vec::new(),
            urgency: Urgency::Default,
            flags: NotificationFlags::default(),
            hints: Hints::new(),
            image: None,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_icon_name(mut self, icon_name: impl Into<String>) -> Self {
        self.icon_name = Some(icon_name.into());
        self
    }

    pub fn with_default_action(mut self, label: impl Into<String>) -> Self {
        self.default_action = Some(label.into());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.flags.persistent = persistent;
        self
    }

    pub fn skip_grouping(mut self, skip: bool) -> Self {
        self.flags.skip_grouping = skip;
        self
    }

    pub fn with_hint(mut self, key: impl Into<String>, value: impl Into<HintValue>) -> Self {
        self.hints.insert(key.into(), value.into());
        self
    }

    pub fn with_image(mut self, image: ImageData) -> Self {
        self.image = Some(image);
        self
    }

    /// Title to show, ignoring an empty string
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }

    /// Icon override, ignoring an empty string
    pub fn icon_name(&self) -> Option<&str> {
        self.icon_name.as_deref().filter(|icon| !icon.is_empty())
    }

    /// Label of the default action, ignoring an empty string
    pub fn default_action(&self) -> Option<&str> {
        self.default_action.as_deref().filter(|label| !label.is_empty())
    }

    /// Whether invoking an action leaves the notification open
    pub fn is_resident(&self) -> bool {
        self.hints
            .get(RESIDENT_HINT)
            .and_then(HintValue::as_bool)
            .unwrap_or(false)
    }
}
