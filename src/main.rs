//! M1 Feed Crawler — Binary Entrypoint
//! Boots the Axum HTTP server: one endpoint triggers a crawl run, `/diag`
//! serves read-only diagnostics, `/metrics` the Prometheus exposition.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use m1_feed_crawler::api::{router, AppState};
use m1_feed_crawler::fetch::{rss::RssFetcher, synthetic::SyntheticFetcher, ItemFetcher};
use m1_feed_crawler::metrics;
use m1_feed_crawler::sources::SourceRegistry;
use m1_feed_crawler::store::MemoryStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn fetcher_from_env() -> Arc<dyn ItemFetcher> {
    match std::env::var("CRAWLER_FETCHER").as_deref() {
        Ok("rss") => Arc::new(RssFetcher::new()),
        _ => Arc::new(SyntheticFetcher::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let state = AppState {
        registry: Arc::new(SourceRegistry::FromEnv),
        fetcher: fetcher_from_env(),
        store: Arc::new(MemoryStore::new()),
    };

    let app = router(state).merge(metrics::install());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "feed crawler listening");
    axum::serve(listener, app).await?;
    Ok(())
}
