//! Popup backend for the freedesktop notification daemon
//!
//! This module provides:
//! - The capability gate that parks requests until the daemon's features are known
//! - Translation of notifications into `Notify` calls
//! - The handle table linking daemon handles to caller-owned notifications
//! - The dispatcher that routes replies and daemon signals back to callers

pub mod capabilities;
pub mod correlation;
pub mod dispatcher;
pub mod handles;
pub mod markup;
pub mod translator;

// Re-export commonly used types
pub use capabilities::{CapabilityCache, PendingQueue};
pub use dispatcher::{DispatchError, DispatchSignal, PopupDispatcher, RequestState};
pub use handles::{HandleTable, Lookup};
pub use translator::{build_notify_call, DisplayConfig};
