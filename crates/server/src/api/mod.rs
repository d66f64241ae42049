pub mod health;
pub mod proxy;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use tollgate_gateway::Gateway;

/// Path of the unauthenticated health endpoint. It is never proxied.
pub const HEALTH_PATH: &str = "/_tollgate/health";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Request bodies larger than this are rejected with 413.
    pub max_body_bytes: usize,
}

/// Build the router: the health endpoint plus a fallback that proxies every
/// other request through the gateway.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health::health).fallback(health::not_routed))
        .fallback(proxy::proxy)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
