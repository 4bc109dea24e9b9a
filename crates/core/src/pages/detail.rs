use std::sync::Arc;

use tokio::task::JoinHandle;

use super::{bootstrap, gate, InitialProps, PageContext, PageView};
use crate::{
    api::{ApiClient, ApiRoute, FetchOptions, ResourceRequest},
    auth::AuthState,
    cache::{Resource, ResourceOptions, Revalidation},
    context::AppContext,
    models::{Envelope, ListingDetail},
};

/// Copy shown when the listing cannot be loaded.
pub const DETAIL_FAILED: &str = "failed to load data";
/// Name of the path parameter carrying the listing id.
pub const ID_PARAM: &str = "id";

/// Single listing view keyed by id.
pub struct ListingDetailPage {
    listing: Resource<ListingDetail>,
    token: Option<String>,
    api: ApiClient,
}

impl ListingDetailPage {
    /// Server bootstrap; requires the `id` path parameter.
    pub async fn initial_props(api: &ApiClient, ctx: &PageContext) -> InitialProps<ListingDetail> {
        bootstrap(api, ctx, ApiRoute::GetPropertyListing, Some(ID_PARAM)).await
    }

    /// Mount on the client for `id`, seeded with the bootstrap payload.
    pub fn mount(ctx: &AppContext, id: &str, props: InitialProps<ListingDetail>) -> Self {
        let api = ctx.api().clone();
        let token = ctx.client_token();
        let listing = ctx.cache().use_resource(
            api.fetcher(),
            detail_request(&api, token.clone(), id),
            ResourceOptions::seeded(props.payload),
        );
        Self {
            listing,
            token,
            api,
        }
    }

    /// First-mount fetch.
    pub async fn load(&self) -> Option<Revalidation> {
        self.listing.mount().await
    }

    /// Switch to another listing; the new key is fetched.
    pub async fn navigate(&mut self, id: &str) -> Option<Revalidation> {
        let request = detail_request(&self.api, self.token.clone(), id);
        self.listing.set_request(request).await
    }

    /// Listing resource.
    pub fn listing(&self) -> &Resource<ListingDetail> {
        &self.listing
    }

    /// Revalidate on focus/reconnect.
    pub fn watch_environment(&self, ctx: &AppContext) -> JoinHandle<()> {
        self.listing.watch_environment(ctx.revalidate_policy())
    }

    /// Render state.
    pub fn view(&self, auth: AuthState) -> PageView<Arc<Envelope<ListingDetail>>> {
        gate(auth, self.listing.snapshot(), DETAIL_FAILED, |envelope| envelope)
    }
}

fn detail_request(api: &ApiClient, token: Option<String>, id: &str) -> ResourceRequest {
    api.request(
        ApiRoute::GetPropertyListing,
        &FetchOptions::client(token).segment(id),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        api::FetchError,
        auth::AuthStore,
        cache::EnvironmentSignal,
        config::AppConfig,
        pages::BootstrapError,
        testing::ScriptedFetcher,
        token::{IncomingRequest, MemoryCookieStore, TOKEN_COOKIE},
    };

    const CLIENT_P9: &str = "http://localhost:3000/api/v1/property/listing/p9";

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

    fn detail(id: &str) -> serde_json::Value {
        json!({ "data": { "id": id, "title": "Loft", "photos": [] } })
    }

    #[tokio::test]
    async fn bootstrap_requires_id_before_fetching() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctx = context(&fetcher);
        let page_ctx = PageContext::new(Some(IncomingRequest::with_cookie("token=abc123")));

        let props = ListingDetailPage::initial_props(ctx.api(), &page_ctx).await;
        assert!(props.error);
        assert_eq!(
            props.reason,
            Some(BootstrapError::MissingRouteParameter(ID_PARAM))
        );
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn empty_token_cookie_skips_bootstrap_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ctx = context(&fetcher);
        let page_ctx =
            PageContext::new(Some(IncomingRequest::with_cookie("token="))).with_param(ID_PARAM, "p9");

        let props = ListingDetailPage::initial_props(ctx.api(), &page_ctx).await;
        assert!(props.error);
        assert!(props.payload.is_none());
        assert_eq!(props.reason, Some(BootstrapError::MissingToken));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn bootstrap_fetches_listing_by_id() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(
            "http://localhost:5000/api/v1/property/listing/p9",
            Ok(detail("p9")),
        );
        let ctx = context(&fetcher);
        let page_ctx = PageContext::new(Some(IncomingRequest::with_cookie("token=abc123")))
            .with_param(ID_PARAM, "p9");

        let props = ListingDetailPage::initial_props(ctx.api(), &page_ctx).await;
        let page = ListingDetailPage::mount(&ctx, "p9", props);
        assert_eq!(page.load().await, None);
        match page.view(AuthState::Authenticated) {
            PageView::Ready(envelope) => assert_eq!(envelope.data.id, "p9"),
            other => panic!("expected ready view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_renders_failure_without_retrying() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(CLIENT_P9, Err(FetchError::Http { status: 404 }));
        let ctx = context(&fetcher);

        let page = ListingDetailPage::mount(&ctx, "p9", InitialProps::skipped());
        page.load().await;
        assert_eq!(page.view(AuthState::Authenticated), PageView::Failed(DETAIL_FAILED));

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn navigating_to_another_id_changes_key() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push(CLIENT_P9, Ok(detail("p9")));
        fetcher.push(
            "http://localhost:3000/api/v1/property/listing/p10",
            Ok(detail("p10")),
        );
        let ctx = context(&fetcher);

        let mut page = ListingDetailPage::mount(&ctx, "p9", InitialProps::skipped());
        page.load().await;
        assert_eq!(page.navigate("p10").await, Some(Revalidation::Resolved));
        match page.view(AuthState::Authenticated) {
            PageView::Ready(envelope) => assert_eq!(envelope.data.id, "p10"),
            other => panic!("expected ready view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn focus_after_navigation_refreshes_the_new_listing() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let client_p10 = "http://localhost:3000/api/v1/property/listing/p10";
        fetcher.push(CLIENT_P9, Ok(detail("p9")));
        fetcher.push(client_p10, Ok(detail("p10")));
        fetcher.push(client_p10, Ok(detail("p10")));
        let ctx = context(&fetcher);

        let mut page = ListingDetailPage::mount(&ctx, "p9", InitialProps::skipped());
        page.load().await;
        let watcher = page.watch_environment(&ctx);
        tokio::task::yield_now().await;
        page.navigate("p10").await;

        let mut updates = ctx.cache().subscribe_updates();
        ctx.cache().signal(EnvironmentSignal::Focus);
        for _ in 0..2 {
            tokio::time::timeout(std::time::Duration::from_secs(1), updates.recv())
                .await
                .unwrap()
                .unwrap();
        }
        watcher.abort();

        let last = fetcher.requests().pop().unwrap();
        assert_eq!(last.url, client_p10);
        assert_eq!(fetcher.calls(), 3);
    }
}
