//! Capability gate: daemon feature cache and the queue of requests waiting on it

use std::collections::{HashSet, VecDeque};
use std::sync::Weak;

use crate::bus::CallToken;
use crate::notification::{Notification, NotificationId};

use super::translator::DisplayConfig;

pub const CAP_ACTIONS: &str = "actions";
pub const CAP_BODY_MARKUP: &str = "body-markup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Dirty,
    Querying(CallToken),
    Clean,
}

/// Capabilities advertised by the daemon, owned by one dispatcher
#[derive(Debug, Clone)]
pub struct CapabilityCache {
    capabilities: HashSet<String>,
    state: CacheState,
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self {
            capabilities: HashSet::new(),
            state: CacheState::Dirty,
        }
    }

    /// A cache that is already clean, holding the given capabilities
    pub fn with_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            state: CacheState::Clean,
        }
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn is_clean(&self) -> bool {
        self.state == CacheState::Clean
    }

    pub fn is_querying(&self) -> bool {
        matches!(self.state, CacheState::Querying(_))
    }

    pub fn has(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn supports_actions(&self) -> bool {
        self.has(CAP_ACTIONS)
    }

    pub fn supports_body_markup(&self) -> bool {
        self.has(CAP_BODY_MARKUP)
    }

    /// Sorted capability names
    pub fn list(&self) -> Vec<String> {
        let mut list: Vec<String> = self.capabilities.iter().cloned().collect();
        list.sort();
        list
    }

    pub fn begin_query(&mut self, token: CallToken) {
        self.state = CacheState::Querying(token);
    }

    /// Store the reply of the query identified by `token`.
    ///
    /// Returns `false`, leaving the cache untouched, when `token` is not the
    /// query currently outstanding.
    pub fn resolve<I>(&mut self, token: CallToken, capabilities: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        if self.state != CacheState::Querying(token) {
            return false;
        }
        self.capabilities = capabilities.into_iter().collect();
        self.state = CacheState::Clean;
        true
    }

    /// Forget the cached set; the next gated request queries again
    pub fn invalidate(&mut self) {
        self.capabilities.clear();
        self.state = CacheState::Dirty;
    }
}

/// Request parked until the capability set is known
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub id: NotificationId,
    pub notification: Weak<Notification>,
    pub config: DisplayConfig,
}

/// Requests parked while the capability query is outstanding, in arrival order
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<PendingEntry>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: PendingEntry) {
        self.entries.push_back(entry);
    }

    /// Drop every entry of `id`, returning how many were removed
    pub fn remove(&mut self, id: NotificationId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before - self.entries.len()
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// Empty the queue, handing back the entries in arrival order
    pub fn take_all(&mut self) -> Vec<PendingEntry> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(notification: &Arc<Notification>) -> PendingEntry {
        PendingEntry {
            id: notification.id,
            notification: Arc::downgrade(notification),
            config: DisplayConfig::new("app", &notification.event_id),
        }
    }

    #[test]
    fn test_cache_starts_dirty() {
        let cache = CapabilityCache::new();
        assert_eq!(cache.state(), CacheState::Dirty);
        assert!(!cache.supports_actions());
    }

    #[test]
    fn test_resolve_requires_matching_token() {
        let mut cache = CapabilityCache::new();
        cache.begin_query(CallToken(3));

        assert!(!cache.resolve(CallToken(2), vec!["actions".to_string()]));
        assert!(cache.is_querying());

        assert!(cache.resolve(CallToken(3), vec!["actions".to_string()]));
        assert!(cache.is_clean());
        assert!(cache.supports_actions());
        assert!(!cache.supports_body_markup());
    }

    #[test]
    fn test_invalidate_clears_capabilities() {
        let mut cache = CapabilityCache::with_capabilities(["actions", "body-markup"]);
        assert_eq!(cache.list(), vec!["actions", "body-markup"]);

        cache.invalidate();
        assert_eq!(cache.state(), CacheState::Dirty);
        assert!(cache.list().is_empty());
    }

    #[test]
    fn test_queue_preserves_order_and_removes_by_id() {
        let first = Arc::new(Notification::new("one"));
        let second = Arc::new(Notification::new("two"));
        let mut queue = PendingQueue::new();
        queue.push(entry(&first));
        queue.push(entry(&second));
        queue.push(entry(&first));

        assert_eq!(queue.remove(first.id), 2);
        assert!(!queue.contains(first.id));

        let drained = queue.take_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, second.id);
        assert!(queue.is_empty());
    }
}
