use std::fmt;

/// API endpoints known to the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiRoute {
    /// Collection of listing summaries.
    GetPropertyListings,
    /// Single listing; the id is appended as a route segment.
    GetPropertyListing,
    /// Ids of the signed-in user's favourite listings.
    FavouritePropertiesIds,
    /// Full favourite listing records.
    FavouriteProperties,
}

/// Static properties of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointProps {
    /// Path relative to the API base URL.
    pub path: &'static str,
    /// Whether the endpoint requires a bearer token.
    pub authenticated: bool,
}

impl ApiRoute {
    /// Routing table lookup.
    pub const fn props(self) -> EndpointProps {
        let path = match self {
            Self::GetPropertyListings => "/api/v1/property/listings",
            Self::GetPropertyListing => "/api/v1/property/listing",
            Self::FavouritePropertiesIds => "/api/v1/property/favourites/ids",
            Self::FavouriteProperties => "/api/v1/property/favourites",
        };
        EndpointProps {
            path,
            authenticated: true,
        }
    }

    /// Path relative to the API base URL.
    pub const fn path(self) -> &'static str {
        self.props().path
    }
}

/// Client-side navigation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppRoute {
    /// Sign-in form.
    SignIn,
    /// Listing collection.
    Listings,
    /// Listing detail for an id.
    ListingDetail(String),
    /// Sign-out page.
    SignOut,
}

impl AppRoute {
    /// Route path, e.g. `/listing/p9`.
    pub fn path(&self) -> String {
        match self {
            Self::SignIn => "/signin".to_string(),
            Self::Listings => "/home/listing".to_string(),
            Self::ListingDetail(id) => format!("/listing/{id}"),
            Self::SignOut => "/signout".to_string(),
        }
    }
}

impl fmt::Display for AppRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
