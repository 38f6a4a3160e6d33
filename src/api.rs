// src/api.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{any, get},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::config::CrawlerConfig;
use crate::fetch::ItemFetcher;
use crate::pipeline::{run_crawl, RunOutcome};
use crate::sources::SourceRegistry;
use crate::store::FeedStore;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SourceRegistry>,
    pub fetcher: Arc<dyn ItemFetcher>,
    pub store: Arc<dyn FeedStore>,
}

/// Build the public router. CORS is wide open (`Access-Control-Allow-Origin:
/// *`, standard request-header allow-list) and preflight `OPTIONS` requests
/// short-circuit inside the CORS layer with an empty 200.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(trigger_run))
        .route("/run", any(trigger_run))
        .route("/diag", get(diagnostics))
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Any method starts a run. Callers always get structured JSON back.
async fn trigger_run(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    // Config is read once per run so env changes apply without a restart.
    let cfg = CrawlerConfig::from_env();

    match run_crawl(&state.registry, state.fetcher.as_ref(), state.store.as_ref(), &cfg).await {
        RunOutcome::Completed(summary) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "run_id": summary.run_id,
                "sources_processed": summary.sources_processed,
                "items_fetched": summary.items_fetched,
                "items_new": summary.items_new,
                "items_skipped": summary.items_skipped,
                "score_threshold": summary.score_threshold,
            })),
        ),
        RunOutcome::Failed { run_id, error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": error,
                "run_id": run_id,
            })),
        ),
    }
}

/// Read-only diagnostics: per-locale enabled-source counts, the 10 most
/// recently persisted URLs, and the latest run log row.
async fn diagnostics(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let sources = match state.registry.merged() {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("{e:#}") })),
            )
        }
    };

    let mut by_locale: BTreeMap<String, usize> = BTreeMap::new();
    for s in sources.iter().filter(|s| s.enabled) {
        *by_locale.entry(s.locale.to_string()).or_insert(0) += 1;
    }

    let last_urls = match state.store.recent_urls(10).await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("{e:#}") })),
            )
        }
    };
    let latest_job = match state.store.latest_run().await {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": format!("{e:#}") })),
            )
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "source_count_by_locale": by_locale,
            "last_10_urls": last_urls,
            "latest_job": latest_job,
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
