//! Health and metrics HTTP endpoints
//!
//! Deliberately tiny: the product surface of this process is the AudioSocket
//! port, not HTTP. These endpoints exist for load balancers and Prometheus.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::state::AppState;

#[derive(Clone)]
struct HttpState {
    app: AppState,
    prometheus: PrometheusHandle,
}

/// Build the health/metrics router
pub fn create_router(app: AppState, prometheus: PrometheusHandle) -> Router {
    let state = HttpState { app, prometheus };

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health(State(state): State<HttpState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "active_sessions": state.app.registry.count(),
    }))
}

async fn ready(State(state): State<HttpState>) -> impl IntoResponse {
    // Ready once flows are loaded; they are loaded before the listener binds
    if state.app.flows.flow_ids().is_empty() {
        (StatusCode::SERVICE_UNAVAILABLE, "no flows loaded").into_response()
    } else {
        (StatusCode::OK, "ready").into_response()
    }
}

async fn metrics_handler(State(state): State<HttpState>) -> String {
    state.prometheus.render()
}
