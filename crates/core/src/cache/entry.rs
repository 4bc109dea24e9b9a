use std::{any::Any, sync::Arc};

use chrono::{DateTime, Utc};

use crate::api::{FetchError, ResourceRequest};

/// Lifecycle of a cache key.
///
/// `Empty` is only ever the starting point: once a key has been fetched it
/// moves between `Validating`, `Resolved` and `Errored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Never fetched, never seeded.
    Empty,
    /// A fetch is in flight.
    Validating,
    /// The last fetch succeeded (or the entry was seeded).
    Resolved,
    /// The last fetch failed; a previous value may still be present.
    Errored,
}

/// Key identifying a cache entry: the URL plus a fingerprint of the headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Request URL.
    pub url: String,
    /// Sorted header fingerprint.
    pub headers: String,
}

impl From<&ResourceRequest> for CacheKey {
    fn from(request: &ResourceRequest) -> Self {
        Self {
            url: request.url.clone(),
            headers: request.headers_fingerprint(),
        }
    }
}

pub(crate) type StoredValue = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub(crate) struct Entry {
    pub(crate) value: Option<StoredValue>,
    pub(crate) error: Option<FetchError>,
    pub(crate) in_flight: bool,
    pub(crate) consumers: usize,
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub(crate) fn state(&self) -> EntryState {
        if self.in_flight {
            EntryState::Validating
        } else if self.error.is_some() {
            EntryState::Errored
        } else if self.value.is_some() {
            EntryState::Resolved
        } else {
            EntryState::Empty
        }
    }

    pub(crate) fn resolve(&mut self, value: StoredValue) {
        self.value = Some(value);
        self.error = None;
        self.updated_at = Some(Utc::now());
    }

    /// Failed refreshes keep whatever value was already there.
    pub(crate) fn fail(&mut self, error: FetchError) {
        self.error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_previous_value() {
        let mut entry = Entry::default();
        assert_eq!(entry.state(), EntryState::Empty);

        entry.resolve(Arc::new(1_u8));
        assert_eq!(entry.state(), EntryState::Resolved);

        entry.fail(FetchError::Http { status: 500 });
        assert_eq!(entry.state(), EntryState::Errored);
        assert!(entry.value.is_some());

        entry.resolve(Arc::new(2_u8));
        assert_eq!(entry.state(), EntryState::Resolved);
        assert!(entry.error.is_none());
    }
}
