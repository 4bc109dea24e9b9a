use std::{marker::PhantomData, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, warn};

use super::{
    entry::{CacheKey, Entry, EntryState, StoredValue},
    EnvironmentSignal, ResourceCache,
};
use crate::{
    api::{client::fetch_envelope, FetchError, Fetcher, ResourceRequest},
    config::AppConfig,
    models::Envelope,
};

/// Mount options for [`ResourceCache::use_resource`].
#[derive(Debug, Clone)]
pub struct ResourceOptions<T> {
    /// Seed value, applied only if the key has no value yet.
    pub initial_data: Option<Envelope<T>>,
    /// Fetch on mount even when a value is already present. Defaults to
    /// `true` without a seed and `false` with one.
    pub revalidate_on_mount: Option<bool>,
}

impl<T> Default for ResourceOptions<T> {
    fn default() -> Self {
        Self {
            initial_data: None,
            revalidate_on_mount: None,
        }
    }
}

impl<T> ResourceOptions<T> {
    /// Options seeded with server-rendered data.
    pub fn seeded(initial_data: Option<Envelope<T>>) -> Self {
        Self {
            initial_data,
            revalidate_on_mount: None,
        }
    }
}

/// Which environment signals revalidate a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevalidatePolicy {
    /// React to [`EnvironmentSignal::Focus`].
    pub on_focus: bool,
    /// React to [`EnvironmentSignal::Reconnect`].
    pub on_reconnect: bool,
}

impl Default for RevalidatePolicy {
    fn default() -> Self {
        Self {
            on_focus: true,
            on_reconnect: true,
        }
    }
}

impl From<&AppConfig> for RevalidatePolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            on_focus: config.revalidate_on_focus,
            on_reconnect: config.revalidate_on_reconnect,
        }
    }
}

impl RevalidatePolicy {
    fn accepts(&self, signal: EnvironmentSignal) -> bool {
        match signal {
            EnvironmentSignal::Focus => self.on_focus,
            EnvironmentSignal::Reconnect => self.on_reconnect,
        }
    }
}

/// Outcome of a revalidation trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum Revalidation {
    /// A fetch ran and succeeded.
    Resolved,
    /// A fetch ran and failed; the error is stored on the entry.
    Failed(FetchError),
    /// Another fetch for the key was already in flight.
    Deduplicated,
}

/// Point-in-time view of a resource.
#[derive(Debug)]
pub struct Snapshot<T> {
    /// Last good value.
    pub data: Option<Arc<Envelope<T>>>,
    /// Error from the latest fetch, if it failed.
    pub error: Option<FetchError>,
    /// Entry state.
    pub state: EntryState,
    /// When the value was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            state: self.state,
            updated_at: self.updated_at,
        }
    }
}

/// A mounted consumer of one cache key.
///
/// Clones share the binding to the current key, so a watcher spawned from a
/// handle follows it across [`Resource::set_request`]. Dropping the handle
/// unregisters it; the entry itself stays until [`ResourceCache::prune`]
/// finds it unused.
pub struct Resource<T> {
    cache: ResourceCache,
    fetcher: Arc<dyn Fetcher>,
    binding: Arc<Mutex<Binding>>,
    revalidate_on_mount: bool,
    _marker: PhantomData<fn() -> T>,
}

/// Key currently backing a family of cloned handles.
struct Binding {
    request: ResourceRequest,
    key: CacheKey,
    slot: Arc<Mutex<Entry>>,
    /// Live handles sharing this binding; each counts as one consumer.
    handles: usize,
}

impl ResourceCache {
    /// Mount a typed consumer on `request`'s key, applying the seed if the
    /// key has no value yet.
    pub fn use_resource<T>(
        &self,
        fetcher: Arc<dyn Fetcher>,
        request: ResourceRequest,
        options: ResourceOptions<T>,
    ) -> Resource<T>
    where
        T: Send + Sync + 'static,
    {
        let key = CacheKey::from(&request);
        let slot = self.acquire(&key, 1);
        let seeded = options.initial_data.is_some();
        if let Some(initial) = options.initial_data {
            let mut entry = slot.lock();
            if entry.value.is_none() {
                debug!(url = %key.url, "seeding cache entry");
                entry.resolve(Arc::new(initial));
            }
        }

        Resource {
            cache: self.clone(),
            fetcher,
            binding: Arc::new(Mutex::new(Binding {
                request,
                key,
                slot,
                handles: 1,
            })),
            revalidate_on_mount: options.revalidate_on_mount.unwrap_or(!seeded),
            _marker: PhantomData,
        }
    }
}

impl<T> Resource<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Request backing this resource.
    pub fn request(&self) -> ResourceRequest {
        self.binding.lock().request.clone()
    }

    /// Key of the backing entry.
    pub fn key(&self) -> CacheKey {
        self.binding.lock().key.clone()
    }

    /// Current state of the backing entry.
    pub fn state(&self) -> EntryState {
        self.slot().lock().state()
    }

    /// Last good value, if any.
    pub fn data(&self) -> Option<Arc<Envelope<T>>> {
        let value = self.slot().lock().value.clone()?;
        self.downcast(value)
    }

    /// Error from the latest fetch, if it failed.
    pub fn error(&self) -> Option<FetchError> {
        self.slot().lock().error.clone()
    }

    /// Consistent view of value, error and state.
    pub fn snapshot(&self) -> Snapshot<T> {
        let (value, error, state, updated_at) = {
            let slot = self.slot();
            let entry = slot.lock();
            (
                entry.value.clone(),
                entry.error.clone(),
                entry.state(),
                entry.updated_at,
            )
        };
        Snapshot {
            data: value.and_then(|value| self.downcast(value)),
            error,
            state,
            updated_at,
        }
    }

    /// First-mount fetch. Skipped when the entry already has a value and the
    /// resource was not asked to revalidate on mount.
    pub async fn mount(&self) -> Option<Revalidation> {
        let has_value = self.slot().lock().value.is_some();
        if has_value && !self.revalidate_on_mount {
            return None;
        }
        Some(self.revalidate().await)
    }

    /// Re-run the fetch for the key currently bound. A trigger arriving
    /// while a fetch is already in flight is a no-op.
    pub async fn revalidate(&self) -> Revalidation {
        let (request, key, slot) = {
            let binding = self.binding.lock();
            (
                binding.request.clone(),
                binding.key.clone(),
                Arc::clone(&binding.slot),
            )
        };
        {
            let mut entry = slot.lock();
            if entry.in_flight {
                debug!(url = %key.url, "revalidation already in flight");
                return Revalidation::Deduplicated;
            }
            entry.in_flight = true;
        }
        let guard = InFlight {
            slot: &slot,
            cache: &self.cache,
            key: &key,
        };
        self.cache.notify(&key);

        let result = fetch_envelope::<T>(self.fetcher.as_ref(), &request).await;

        let outcome = {
            let mut entry = slot.lock();
            match result {
                Ok(envelope) => {
                    entry.resolve(Arc::new(envelope));
                    Revalidation::Resolved
                }
                Err(err) => {
                    warn!(url = %key.url, %err, "revalidation failed");
                    entry.fail(err.clone());
                    Revalidation::Failed(err)
                }
            }
        };
        drop(guard);
        outcome
    }

    /// Point the resource, and every clone of it, at a different request
    /// (e.g. a new id) and fetch it. The previous key keeps its value for
    /// other consumers.
    pub async fn set_request(&mut self, request: ResourceRequest) -> Option<Revalidation> {
        let key = CacheKey::from(&request);
        {
            let mut binding = self.binding.lock();
            if key == binding.key {
                return None;
            }
            let handles = binding.handles;
            let slot = self.cache.acquire(&key, handles);
            let previous = std::mem::replace(&mut binding.slot, slot);
            {
                let mut entry = previous.lock();
                entry.consumers = entry.consumers.saturating_sub(handles);
            }
            debug!(from = %binding.key.url, to = %key.url, "rebinding resource");
            binding.request = request;
            binding.key = key;
        }
        Some(self.revalidate().await)
    }

    /// Spawn a task that revalidates on focus/reconnect signals allowed by
    /// `policy`. The task holds its own consumer registration until aborted
    /// and always targets the key currently bound.
    pub fn watch_environment(&self, policy: RevalidatePolicy) -> JoinHandle<()> {
        let resource = self.clone();
        let mut signals = self.cache.subscribe_signals();
        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) if policy.accepts(signal) => {
                        resource.revalidate().await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "environment signals lagged");
                        resource.revalidate().await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn downcast(&self, value: StoredValue) -> Option<Arc<Envelope<T>>> {
        match value.downcast::<Envelope<T>>() {
            Ok(envelope) => Some(envelope),
            Err(_) => {
                warn!(url = %self.key().url, "cache entry holds a different payload type");
                None
            }
        }
    }
}

impl<T> Resource<T> {
    fn slot(&self) -> Arc<Mutex<Entry>> {
        Arc::clone(&self.binding.lock().slot)
    }
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        {
            let mut binding = self.binding.lock();
            binding.handles += 1;
            binding.slot.lock().consumers += 1;
        }
        Self {
            cache: self.cache.clone(),
            fetcher: Arc::clone(&self.fetcher),
            binding: Arc::clone(&self.binding),
            revalidate_on_mount: self.revalidate_on_mount,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Resource<T> {
    fn drop(&mut self) {
        let mut binding = self.binding.lock();
        binding.handles = binding.handles.saturating_sub(1);
        let mut entry = binding.slot.lock();
        entry.consumers = entry.consumers.saturating_sub(1);
    }
}

/// Clears the in-flight flag even when the fetch future is dropped midway,
/// so an abandoned navigation cannot wedge the key.
struct InFlight<'a> {
    slot: &'a Mutex<Entry>,
    cache: &'a ResourceCache,
    key: &'a CacheKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.slot.lock().in_flight = false;
        self.cache.notify(self.key);
    }
}
