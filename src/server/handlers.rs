//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;
use crate::metrics::exporter_info;
use crate::transformer::{PrometheusFormatter, CONTENT_TYPE};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// Root endpoint - displays basic info
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Eureka Exporter</title>
</head>
<body>
    <h1>Eureka Exporter</h1>
    <p>Version: {}</p>
    <p>Cluster: {}</p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.config.eureka.cluster_name,
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint - runs one scrape cycle and returns Prometheus format
///
/// Per-target failures never fail the response; they show up as missing
/// or DOWN samples and in the self-metrics.
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let mut snapshot = state.collector.collect().await;
    let registry_samples = snapshot.sample_count();

    snapshot.extend(state.collector.metrics().to_families());
    snapshot.extend([exporter_info()]);

    let output = PrometheusFormatter::new().format(snapshot.families());

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        registry_samples,
        "Metrics collection complete"
    );

    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], output)
}
