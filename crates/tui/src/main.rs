mod app;

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use listings_core::{
    config::{self, AppConfig},
    token::{MemoryCookieStore, TOKEN_COOKIE},
    AppContext, AuthStore, HttpFetcher,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let cookies = MemoryCookieStore::new();
    if let Some(token) = config.token.as_deref() {
        cookies.set(TOKEN_COOKIE, token);
    }

    let auth = AuthStore::global().clone();
    auth.sync_with_token(config.token.as_deref());

    let context = AppContext::new(
        Arc::new(config),
        Arc::new(HttpFetcher::new()),
        auth,
        Arc::new(cookies),
    )?;

    let mut app = app::ListingsApp::new(context);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("listings.log");

    let env_filter = EnvFilter::from_default_env();

    // The terminal belongs to the UI, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .compact()
        .with_ansi(false)
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
