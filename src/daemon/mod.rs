//! Service module: the serialized executor around the popup dispatcher
//!
//! This module provides:
//! - The service loop owning the dispatcher and draining bus traffic
//! - A cloneable handle for submitting work from any thread
//! - Command and status types exchanged between the two

pub mod handle;
pub mod server;
pub mod shared;

// Re-export commonly used types
pub use handle::ServiceHandle;
pub use server::NotificationService;
pub use shared::{ServiceCommand, ServiceStatus};

/// Connect to the session bus and start a service on the current runtime
#[cfg(feature = "dbus")]
pub async fn spawn_dbus_service(
    config: &crate::config::Config,
) -> crate::errors::AppResult<ServiceHandle> {
    let timeout = std::time::Duration::from_millis(config.bus.call_timeout_ms);
    let (bus, events) = crate::bus::dbus::connect(timeout).await?;
    let (service, handle) = NotificationService::new(bus, events, config);
    tokio::spawn(service.run());
    Ok(handle)
}
