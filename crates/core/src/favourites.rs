//! Favourite membership overlaid onto listing collections.

use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::{
    cache::{Resource, Revalidation},
    models::{Envelope, FavouriteListing, Identified},
};

/// Ids present in the favourites cache's current value. Empty until that
/// cache resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavouriteSet {
    ids: HashSet<String>,
}

impl FavouriteSet {
    /// Set from raw ids.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Set from an optional id envelope; `None` (still loading) is empty.
    pub fn from_id_envelope(envelope: Option<&Envelope<Vec<String>>>) -> Self {
        envelope
            .map(|env| Self::from_ids(env.data.iter().cloned()))
            .unwrap_or_default()
    }

    /// Set from an optional envelope of full favourite records.
    pub fn from_record_envelope(envelope: Option<&Envelope<Vec<FavouriteListing>>>) -> Self {
        envelope
            .map(|env| Self::from_ids(env.data.iter().map(|record| record.id.clone())))
            .unwrap_or_default()
    }

    /// Whether `item` is favourited.
    pub fn is_favourite(&self, item: &impl Identified) -> bool {
        self.ids.contains(item.id())
    }

    /// Number of favourited ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing is favourited (or nothing has loaded).
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// An item of the primary collection with its overlay flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Marked<T> {
    /// Primary item.
    pub item: T,
    /// Membership in the favourites set.
    pub favourite: bool,
}

/// Join a primary collection with the favourite set by id.
pub fn overlay<T>(items: &[T], favourites: &FavouriteSet) -> Vec<Marked<T>>
where
    T: Identified + Clone,
{
    items
        .iter()
        .map(|item| Marked {
            item: item.clone(),
            favourite: favourites.is_favourite(item),
        })
        .collect()
}

/// Favourite ids kept fresh by their own cache entry.
#[derive(Clone)]
pub struct FavouritesOverlay {
    resource: Resource<Vec<String>>,
}

impl FavouritesOverlay {
    /// Wrap a mounted favourites resource.
    pub fn new(resource: Resource<Vec<String>>) -> Self {
        Self { resource }
    }

    /// Backing resource.
    pub fn resource(&self) -> &Resource<Vec<String>> {
        &self.resource
    }

    /// Current membership set.
    pub fn current(&self) -> FavouriteSet {
        let data: Option<Arc<Envelope<Vec<String>>>> = self.resource.data();
        FavouriteSet::from_id_envelope(data.as_deref())
    }

    /// Membership test against the current value.
    pub fn is_favourite(&self, item: &impl Identified) -> bool {
        self.current().is_favourite(item)
    }

    /// Refresh after a favourite was toggled elsewhere.
    pub async fn refresh_after_toggle(&self) -> Revalidation {
        debug!(url = %self.resource.key().url, "refreshing favourites after toggle");
        self.resource.revalidate().await
    }
}
