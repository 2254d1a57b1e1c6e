//! Popup Notifier Library
//!
//! Relays application notifications to the freedesktop notification daemon
//! (`org.freedesktop.Notifications`) as popups, and routes the daemon's
//! action and close signals back to the notification's owner.

pub mod bus;
#[cfg(feature = "dbus")]
pub mod cli;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod execute;
pub mod notification;
pub mod popup;
pub mod shared;

// Re-export commonly used types for convenience
pub use bus::{BusCall, BusEvent, MemoryBus, NotificationBus, ServerHandle};
pub use config::{Config, ConfigManager, EventsRegistry};
pub use daemon::{NotificationService, ServiceHandle, ServiceStatus};
pub use errors::{AppError, AppResult};
pub use notification::{Notification, NotificationId, Urgency};
pub use popup::{DispatchSignal, PopupDispatcher};
