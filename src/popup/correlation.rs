//! Outstanding bus calls, keyed by the token their reply will carry

use std::collections::HashMap;
use std::sync::Weak;

use crate::bus::{CallToken, ServerHandle};
use crate::notification::{Notification, NotificationId};

/// What an outstanding call was issued for
#[derive(Debug, Clone)]
pub enum PendingCall {
    Capabilities,
    Create {
        id: NotificationId,
        notification: Weak<Notification>,
        /// Dismissed while the call was in flight; the reply's handle is an orphan
        cancelled: bool,
    },
    Update {
        id: NotificationId,
    },
    Close {
        id: NotificationId,
        handle: ServerHandle,
    },
}

#[derive(Debug, Default)]
pub struct CorrelationTable {
    next_token: u64,
    calls: HashMap<CallToken, PendingCall>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call and hand out the token to send it with
    pub fn register(&mut self, call: PendingCall) -> CallToken {
        self.next_token += 1;
        let token = CallToken(self.next_token);
        self.calls.insert(token, call);
        token
    }

    /// Take the call a reply belongs to
    pub fn resolve(&mut self, token: CallToken) -> Option<PendingCall> {
        self.calls.remove(&token)
    }

    /// Whether a live (not cancelled) creation call is in flight for `id`
    pub fn is_creating(&self, id: NotificationId) -> bool {
        self.calls.values().any(|call| {
            matches!(call, PendingCall::Create { id: pending, cancelled: false, .. } if *pending == id)
        })
    }

    pub fn is_closing(&self, id: NotificationId) -> bool {
        self.calls
            .values()
            .any(|call| matches!(call, PendingCall::Close { id: pending, .. } if *pending == id))
    }

    /// Mark in-flight creation calls of `id` as cancelled, returning how many
    pub fn cancel_creates(&mut self, id: NotificationId) -> usize {
        let mut cancelled_count = 0;
        for call in self.calls.values_mut() {
            if let PendingCall::Create {
                id: pending,
                cancelled,
                ..
            } = call
            {
                if *pending == id && !*cancelled {
                    *cancelled = true;
                    cancelled_count += 1;
                }
            }
        }
        cancelled_count
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Number of live creation calls in flight
    pub fn creating(&self) -> usize {
        self.calls
            .values()
            .filter(|call| matches!(call, PendingCall::Create { cancelled: false, .. }))
            .count()
    }
}
