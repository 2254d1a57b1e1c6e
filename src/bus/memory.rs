//! In-process bus that records outbound calls
//!
//! Used to drive the dispatcher without a session bus: the owner inspects the
//! recorded calls and feeds replies back as [`BusEvent`](super::BusEvent)s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{BusCall, BusError, CallToken, NotificationBus, ServerHandle};

/// Recording bus; clones share the same call log
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    calls: Arc<Mutex<Vec<(CallToken, BusCall)>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail with [`BusError::Disconnected`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every call sent so far, in issuance order
    pub fn calls(&self) -> Vec<(CallToken, BusCall)> {
        self.log().clone()
    }

    /// Take the recorded calls, leaving the log empty
    pub fn take_calls(&self) -> Vec<(CallToken, BusCall)> {
        std::mem::take(&mut *self.log())
    }

    /// Number of recorded calls of one D-Bus method
    pub fn count(&self, method: &str) -> usize {
        self.log().iter().filter(|(_, call)| call.method() == method).count()
    }

    /// Tokens of the recorded calls of one D-Bus method, in issuance order
    pub fn tokens(&self, method: &str) -> Vec<CallToken> {
        self.log()
            .iter()
            .filter(|(_, call)| call.method() == method)
            .map(|(token, _)| *token)
            .collect()
    }

    /// Handles passed to `CloseNotification`, in issuance order
    pub fn closed_handles(&self) -> Vec<ServerHandle> {
        self.log()
            .iter()
            .filter_map(|(_, call)| match call {
                BusCall::CloseNotification(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    fn log(&self) -> MutexGuard<'_, Vec<(CallToken, BusCall)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NotificationBus for MemoryBus {
    fn send(&mut self, token: CallToken, call: BusCall) -> Result<(), BusError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BusError::Disconnected);
        }
        self.log().push((token, call));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_log() {
        let bus = MemoryBus::new();
        let mut sender = bus.clone();
        sender.send(CallToken(1), BusCall::GetCapabilities).unwrap();

        assert_eq!(bus.count("GetCapabilities"), 1);
        assert_eq!(bus.tokens("GetCapabilities"), vec![CallToken(1)]);
    }

    #[test]
    fn test_offline_bus_rejects_calls() {
        let mut bus = MemoryBus::new();
        bus.set_offline(true);
        assert_eq!(
            bus.send(CallToken(1), BusCall::GetCapabilities),
            Err(BusError::Disconnected)
        );
        assert!(bus.calls().is_empty());
    }
}
