use axum::Json;
use axum::extract::State;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use tollgate_gateway::{GatewayError, MetricsSnapshot};

use super::AppState;
use super::proxy::into_response;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub metrics: MetricsSnapshot,
}

/// `GET /_tollgate/health`: liveness plus a snapshot of the gateway counters.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        metrics: state.gateway.metrics().snapshot(),
    })
}

/// Any other method on the health path. It is never proxied, so it gets the
/// gateway's JSON `route_not_found` error.
pub async fn not_routed(uri: Uri) -> Response {
    into_response(GatewayError::RouteNotFound(uri.path().to_owned()).to_response())
}
