use tokio::task::JoinHandle;

use super::{bootstrap, gate, InitialProps, PageContext, PageView};
use crate::{
    api::{ApiClient, ApiRoute, FetchOptions},
    auth::AuthState,
    cache::{Resource, ResourceOptions, Revalidation},
    context::AppContext,
    favourites::{overlay, FavouritesOverlay, Marked},
    models::ListingSummary,
};

/// Copy shown when the listings cannot be loaded.
pub const LISTINGS_FAILED: &str = "failed to load";

/// Listing collection with the favourites overlay.
pub struct ListingsPage {
    listings: Resource<Vec<ListingSummary>>,
    favourites: FavouritesOverlay,
}

impl ListingsPage {
    /// Server bootstrap for the listing collection.
    pub async fn initial_props(
        api: &ApiClient,
        ctx: &PageContext,
    ) -> InitialProps<Vec<ListingSummary>> {
        bootstrap(api, ctx, ApiRoute::GetPropertyListings, None).await
    }

    /// Mount on the client, seeding the listings with the bootstrap payload.
    pub fn mount(ctx: &AppContext, props: InitialProps<Vec<ListingSummary>>) -> Self {
        let api = ctx.api();
        let options = FetchOptions::client(ctx.client_token());

        let listings = ctx.cache().use_resource(
            api.fetcher(),
            api.request(ApiRoute::GetPropertyListings, &options),
            ResourceOptions::seeded(props.payload),
        );
        let favourites = FavouritesOverlay::new(ctx.cache().use_resource(
            api.fetcher(),
            api.request(ApiRoute::FavouritePropertiesIds, &options),
            ResourceOptions::default(),
        ));

        Self {
            listings,
            favourites,
        }
    }

    /// Run first-mount fetches for both resources concurrently.
    pub async fn load(&self) -> (Option<Revalidation>, Option<Revalidation>) {
        tokio::join!(self.listings.mount(), self.favourites.resource().mount())
    }

    /// Listings resource.
    pub fn listings(&self) -> &Resource<Vec<ListingSummary>> {
        &self.listings
    }

    /// Favourites overlay.
    pub fn favourites(&self) -> &FavouritesOverlay {
        &self.favourites
    }

    /// Revalidate both resources on focus/reconnect.
    pub fn watch_environment(&self, ctx: &AppContext) -> Vec<JoinHandle<()>> {
        let policy = ctx.revalidate_policy();
        vec![
            self.listings.watch_environment(policy),
            self.favourites.resource().watch_environment(policy),
        ]
    }

    /// Render state. Favourites never block the listings.
    pub fn view(&self, auth: AuthState) -> PageView<Vec<Marked<ListingSummary>>> {
        let favourites = self.favourites.current();
        gate(auth, self.listings.snapshot(), LISTINGS_FAILED, |envelope| {
            overlay(&envelope.data, &favourites)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        api::FetchError,
        auth::AuthStore,
        config::AppConfig,
        testing::ScriptedFetcher,
        token::{IncomingRequest, MemoryCookieStore, TOKEN_COOKIE},
    };

    const SERVER_LISTINGS: &str = "http://localhost:5000/api/v1/property/listings";
    const CLIENT_LISTINGS: &str = "http://localhost:3000/api/v1/property/listings";
    const CLIENT_FAVOURITES: &str = "http://localhost:3000/api/v1/property/favourites/ids";

    fn context(fetcher: &Arc<ScriptedFetcher>) -> AppContext {
        let cookies = MemoryCookieStore::new();
        cookies.set(TOKEN_COOKIE, "abc123");
        AppContext::new(
            Arc::new(AppConfig::default()),
            fetcher.clone(),
            AuthStore::new(),
            Arc::new(cookies),
        )
        .expect("valid default config")
    }

    fn ids(view: &PageView<Vec<Marked<ListingSummary>>>) -> Vec<(String, bool)> {
        match view {
            PageView::Ready(items) => items
                .iter()
                .map(|marked| (marked.item.id.clone(), marked.favourite))
                .collect(),
            other => panic!("expected ready view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hydrated_first_render_has_no_loading_state() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(
            SERVER_LISTINGS,
            Ok(json!({ "data": [{ "id": "p1" }, { "id": "p2" }] })),
        );
        let ctx = context(&fetcher);
        let request = IncomingRequest::with_cookie("token=abc123");

        let props =
            ListingsPage::initial_props(ctx.api(), &PageContext::new(Some(request))).await;
        assert!(!props.error);
        assert_eq!(fetcher.requests()[0].bearer(), Some("abc123"));

        let page = ListingsPage::mount(&ctx, props);
        let view = page.view(AuthState::Authenticated);
        assert_eq!(
            ids(&view),
            vec![("p1".to_string(), false), ("p2".to_string(), false)]
        );
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn favourites_resolve_after_listings() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(CLIENT_LISTINGS, Ok(json!({ "data": [{ "id": "p1" }, { "id": "p2" }] })));
        fetcher.push(CLIENT_FAVOURITES, Ok(json!({ "data": ["p2"] })));
        let ctx = context(&fetcher);

        let page = ListingsPage::mount(&ctx, InitialProps::skipped());
        assert_eq!(page.view(AuthState::Authenticated), PageView::Loading);

        page.listings().mount().await;
        assert_eq!(
            ids(&page.view(AuthState::Authenticated)),
            vec![("p1".to_string(), false), ("p2".to_string(), false)]
        );

        page.favourites().resource().mount().await;
        assert_eq!(
            ids(&page.view(AuthState::Authenticated)),
            vec![("p1".to_string(), false), ("p2".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn favourites_failure_does_not_block_listings() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(CLIENT_LISTINGS, Ok(json!({ "data": [{ "id": "p1" }] })));
        fetcher.push(CLIENT_FAVOURITES, Err(FetchError::Http { status: 500 }));
        let ctx = context(&fetcher);

        let page = ListingsPage::mount(&ctx, InitialProps::skipped());
        page.load().await;
        assert_eq!(
            ids(&page.view(AuthState::Authenticated)),
            vec![("p1".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn failed_listings_without_cache_render_failure() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(CLIENT_LISTINGS, Err(FetchError::Http { status: 500 }));
        let ctx = context(&fetcher);

        let page = ListingsPage::mount(&ctx, InitialProps::skipped());
        page.load().await;
        assert_eq!(
            page.view(AuthState::Authenticated),
            PageView::Failed(LISTINGS_FAILED)
        );
    }

    #[tokio::test]
    async fn unauthenticated_wins_over_every_data_state() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctx = context(&fetcher);
        let page = ListingsPage::mount(&ctx, InitialProps::skipped());
        assert_eq!(page.view(AuthState::Unknown), PageView::Unauthenticated);
        page.load().await;
        assert_eq!(page.view(AuthState::Unauthenticated), PageView::Unauthenticated);
    }
}
