//! Stale-while-revalidate resource cache.
//!
//! Every cache key runs its own small state machine (see [`EntryState`]).
//! Distinct keys share nothing but the map that owns them; no lock is held
//! across a fetch.

mod entry;
mod resource;

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

pub use entry::{CacheKey, EntryState};
pub use resource::{Resource, ResourceOptions, RevalidatePolicy, Revalidation, Snapshot};

use entry::Entry;

/// Environment events that trigger revalidation of mounted resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentSignal {
    /// The client regained focus.
    Focus,
    /// Connectivity was restored.
    Reconnect,
}

const CHANNEL_CAPACITY: usize = 64;

/// Shared cache handle. Cloning is cheap and yields the same cache.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<HashMap<CacheKey, Arc<Mutex<Entry>>>>,
    signals: broadcast::Sender<EnvironmentSignal>,
    updates: broadcast::Sender<CacheKey>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCache {
    /// Empty cache.
    pub fn new() -> Self {
        let (signals, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                signals,
                updates,
            }),
        }
    }

    /// Broadcast a focus/reconnect event to every listening resource.
    pub fn signal(&self, signal: EnvironmentSignal) {
        debug!(?signal, "environment signal");
        let _ = self.inner.signals.send(signal);
    }

    /// Receive environment signals.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<EnvironmentSignal> {
        self.inner.signals.subscribe()
    }

    /// Receive the key of every entry whose state changes.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<CacheKey> {
        self.inner.updates.subscribe()
    }

    /// Current state of a key, or `None` if the key was never used.
    pub fn state(&self, key: &CacheKey) -> Option<EntryState> {
        let slot = self.inner.entries.lock().get(key).cloned()?;
        let state = slot.lock().state();
        Some(state)
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether the cache holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries nobody is mounted on and nothing is fetching.
    /// Returns the number of entries removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|_, slot| {
            let entry = slot.lock();
            entry.consumers > 0 || entry.in_flight
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "pruned cache entries");
        }
        removed
    }

    /// Slot for `key`, created if missing, with `consumers` registered on it
    /// while the map lock is held so `prune` cannot race the registration.
    pub(crate) fn acquire(&self, key: &CacheKey, consumers: usize) -> Arc<Mutex<Entry>> {
        let mut entries = self.inner.entries.lock();
        let slot = Arc::clone(entries.entry(key.clone()).or_default());
        slot.lock().consumers += consumers;
        slot
    }

    pub(crate) fn notify(&self, key: &CacheKey) {
        let _ = self.inner.updates.send(key.clone());
    }
}
