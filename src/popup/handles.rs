//! Bidirectional mapping between daemon handles and caller-owned notifications

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tracing::debug;

use crate::bus::ServerHandle;
use crate::notification::{Notification, NotificationId};

/// Result of resolving a daemon handle
#[derive(Debug, Clone)]
pub enum Lookup {
    Live(Arc<Notification>),
    /// The owner dropped the notification; the entry was removed but the
    /// popup may still be on screen
    Dropped(NotificationId),
    Unknown,
}

#[derive(Debug, Clone)]
struct Entry {
    id: NotificationId,
    notification: Weak<Notification>,
}

/// Live popups, keyed both by daemon handle and by notification id
///
/// Entries hold weak references: once the owner drops a notification its
/// entry is a tombstone, purged on the next lookup or sweep.
#[derive(Debug, Default)]
pub struct HandleTable {
    by_handle: HashMap<ServerHandle, Entry>,
    by_id: HashMap<NotificationId, ServerHandle>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle; returns the handle previously held by `id`, which is
    /// no longer in the table.
    pub fn insert(
        &mut self,
        handle: ServerHandle,
        id: NotificationId,
        notification: Weak<Notification>,
    ) -> Option<ServerHandle> {
        if let Some(stale) = self.by_handle.insert(handle, Entry { id, notification }) {
            if stale.id != id {
                self.by_id.remove(&stale.id);
            }
        }
        let previous = self.by_id.insert(id, handle).filter(|old| *old != handle);
        if let Some(old) = previous {
            self.by_handle.remove(&old);
        }
        previous
    }

    pub fn handle_of(&self, id: NotificationId) -> Option<ServerHandle> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, handle: ServerHandle) -> bool {
        self.by_handle.contains_key(&handle)
    }

    /// The notification behind `handle`, purging the entry if it was dropped
    pub fn get(&mut self, handle: ServerHandle) -> Lookup {
        let Some(entry) = self.by_handle.get(&handle) else {
            return Lookup::Unknown;
        };
        match entry.notification.upgrade() {
            Some(notification) => Lookup::Live(notification),
            None => {
                debug!("Purging tombstone for handle {}", handle);
                let id = entry.id;
                self.remove(handle);
                Lookup::Dropped(id)
            }
        }
    }

    /// Live notification for an id
    pub fn notification(&self, id: NotificationId) -> Option<Arc<Notification>> {
        let handle = self.by_id.get(&id)?;
        self.by_handle.get(handle)?.notification.upgrade()
    }

    /// Point an existing entry at a newer copy of the notification
    pub fn retarget(&mut self, id: NotificationId, notification: Weak<Notification>) -> bool {
        let Some(handle) = self.by_id.get(&id) else {
            return false;
        };
        match self.by_handle.get_mut(handle) {
            Some(entry) => {
                entry.notification = notification;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, handle: ServerHandle) -> Option<(NotificationId, Weak<Notification>)> {
        let entry = self.by_handle.remove(&handle)?;
        if self.by_id.get(&entry.id) == Some(&handle) {
            self.by_id.remove(&entry.id);
        }
        Some((entry.id, entry.notification))
    }

    pub fn remove_id(&mut self, id: NotificationId) -> Option<ServerHandle> {
        let handle = self.by_id.remove(&id)?;
        self.by_handle.remove(&handle);
        Some(handle)
    }

    /// Remove every tombstone, returning the freed handles with their ids
    pub fn purge_dead(&mut self) -> Vec<(ServerHandle, NotificationId)> {
        let dead: Vec<(ServerHandle, NotificationId)> = self
            .by_handle
            .iter()
            .filter(|(_, entry)| entry.notification.strong_count() == 0)
            .map(|(handle, entry)| (*handle, entry.id))
            .collect();
        for (handle, _) in &dead {
            self.remove(*handle);
        }
        dead
    }

    /// Empty the table
    pub fn drain(&mut self) -> Vec<(ServerHandle, NotificationId, Weak<Notification>)> {
        self.by_id.clear();
        self.by_handle
            .drain()
            .map(|(handle, entry)| (handle, entry.id, entry.notification))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}
