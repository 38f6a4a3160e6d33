// src/metrics.rs
//! Prometheus exposition. The crawl series themselves are described and
//! updated by the pipeline; this module only installs the recorder and
//! serves the rendered snapshot.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the global Prometheus recorder and return the `/metrics` router.
/// Crawl series are pre-described so they render before the first run.
pub fn install() -> Router {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("prometheus: install recorder");

    crate::pipeline::describe_run_metrics();

    Router::new().route(
        "/metrics",
        get(move || {
            let h = handle.clone();
            async move { h.render() }
        }),
    )
}
