//! Wire contract of the freedesktop notification daemon
//!
//! Outbound calls are fire-and-forget from the dispatcher's point of view: each
//! one is tagged with a [`CallToken`] and its reply comes back later as a
//! [`BusEvent`] carrying the same token. Signals emitted by the daemon arrive
//! through the same event stream.

pub mod memory;

#[cfg(feature = "dbus")]
pub mod dbus;

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use thiserror::Error;

use crate::notification::HintValue;

pub use memory::MemoryBus;

/// Daemon-assigned id of a popup on screen; zero is reserved by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ServerHandle(NonZeroU32);

impl ServerHandle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates an outbound call with its asynchronous reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallToken(pub u64);

impl fmt::Display for CallToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Arguments of `org.freedesktop.Notifications.Notify`, in wire order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyCall {
    pub app_name: String,
    /// Handle of the popup to replace, 0 to create a new one
    pub replaces_id: u32,
    pub app_icon: String,
    pub summary: String,
    pub body: String,
    /// Flattened `[key, label, key, label, ...]`
    pub actions: Vec<String>,
    pub hints: HashMap<String, HintValue>,
    /// Milliseconds; 0 never expires, -1 leaves it to the daemon
    pub expire_timeout: i32,
}

impl NotifyCall {
    /// Action list regrouped as `(key, label)` pairs
    pub fn action_pairs(&self) -> Vec<(&str, &str)> {
        self.actions
            .chunks(2)
            .filter_map(|pair| match pair {
                [key, label] => Some((key.as_str(), label.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Outbound daemon method call
#[derive(Debug, Clone, PartialEq)]
pub enum BusCall {
    GetCapabilities,
    Notify(NotifyCall),
    CloseNotification(ServerHandle),
}

impl BusCall {
    /// D-Bus member name of the call
    pub fn method(&self) -> &'static str {
        match self {
            BusCall::GetCapabilities => "GetCapabilities",
            BusCall::Notify(_) => "Notify",
            BusCall::CloseNotification(_) => "CloseNotification",
        }
    }
}

/// Inbound traffic: call replies and daemon signals
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    CapabilitiesReply {
        token: CallToken,
        result: Result<Vec<String>, BusError>,
    },
    NotifyReply {
        token: CallToken,
        result: Result<u32, BusError>,
    },
    CloseReply {
        token: CallToken,
        result: Result<(), BusError>,
    },
    ActionInvoked {
        handle: u32,
        action_key: String,
    },
    NotificationClosed {
        handle: u32,
        reason: u32,
    },
    /// The daemon's bus name changed owner; every handle it gave out is gone
    ServiceRestarted,
}

/// Reason code of `NotificationClosed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Expired,
    Dismissed,
    Closed,
    Undefined,
    Unknown(u32),
}

impl CloseReason {
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => CloseReason::Expired,
            2 => CloseReason::Dismissed,
            3 => CloseReason::Closed,
            4 => CloseReason::Undefined,
            other => CloseReason::Unknown(other),
        }
    }

    /// Dismissed by the user, as opposed to expiring or being closed by a call
    pub fn is_user_dismissal(self) -> bool {
        self == CloseReason::Dismissed
    }
}

/// Transport-level failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("notification bus is disconnected")]
    Disconnected,

    #[error("{method} call failed: {message}")]
    Call { method: String, message: String },
}

impl BusError {
    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        BusError::Call {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Outbound half of the daemon connection
///
/// `send` must not block: it hands the call to the transport and returns. The
/// reply, if any, is delivered later as a [`BusEvent`] tagged with `token`.
/// An `Err` means the call never left this process.
pub trait NotificationBus {
    fn send(&mut self, token: CallToken, call: BusCall) -> Result<(), BusError>;
}

impl<B: NotificationBus + ?Sized> NotificationBus for Box<B> {
    fn send(&mut self, token: CallToken, call: BusCall) -> Result<(), BusError> {
        self.as_mut().send(token, call)
    }
}
