//! Scrape endpoints.
//!
//! Read-only views over [`HealthState`]; the poller is the only writer.

use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::metrics::HealthState;

pub fn router(health: HealthState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/debug/vars", get(debug_vars))
        // Liveness (no dependency on Squadcast)
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readiness_check))
        .with_state(health)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

async fn metrics_handler(State(health): State<HealthState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        health.encode(),
    )
}

async fn debug_vars(State(health): State<HealthState>) -> impl IntoResponse {
    Json(health.snapshot())
}

/// Ready once the first poll cycle has finished, whatever its outcome.
async fn readiness_check(State(health): State<HealthState>) -> impl IntoResponse {
    if health.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "waiting for first poll")
    }
}
