use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use reqwest::header::HOST;
use tokio::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use tollgate_core::{RouteTable, TokenRecord, UsageEvent};
use tollgate_store::ConfigStore;

use crate::auth::TokenAuthenticator;
use crate::authz::authorize;
use crate::cors;
use crate::error::GatewayError;
use crate::inject::CredentialInjector;
use crate::metrics::GatewayMetrics;
use crate::proxy::{Forwarded, ProxyForwarder};
use crate::request::{ProxyRequest, ProxyResponse};
use crate::router::match_route;
use crate::usage::UsageReporter;

const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// The edge request handler.
///
/// Every request runs, in order: authenticate, load routes, match, authorize,
/// inject backend credentials, forward. Nothing is carried between requests;
/// the token and the route table are read from the [`ConfigStore`] each
/// time. Build one with [`GatewayBuilder`](crate::GatewayBuilder).
pub struct Gateway {
    pub(crate) store: Arc<dyn ConfigStore>,
    pub(crate) authenticator: TokenAuthenticator,
    pub(crate) injector: CredentialInjector,
    pub(crate) forwarder: ProxyForwarder,
    pub(crate) usage: Option<UsageReporter>,
    pub(crate) metrics: Arc<GatewayMetrics>,
    pub(crate) public_host: Option<String>,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("credential_header", self.authenticator.header())
            .field("public_host", &self.public_host)
            .field("usage", &self.usage.as_ref().map(UsageReporter::endpoint))
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Handle one inbound request. Always produces a response; failures are
    /// rendered as JSON errors. Every response carries CORS headers.
    pub async fn handle(&self, req: ProxyRequest) -> ProxyResponse {
        let request_id = Uuid::now_v7();
        let span = info_span!(
            "gateway.handle",
            %request_id,
            method = %req.method,
            path = %req.path,
        );
        self.handle_inner(req).instrument(span).await
    }

    async fn handle_inner(&self, req: ProxyRequest) -> ProxyResponse {
        self.metrics.increment_requests();
        if cors::is_preflight(&req) {
            self.metrics.increment_preflights();
            return cors::preflight_response();
        }

        let received_at = Utc::now();
        let started = Instant::now();

        let token = match self.authenticator.authenticate(&req.headers, received_at).await {
            Ok(token) => token,
            Err(err) => return self.reject(&err),
        };

        let (route_path, outcome) = self.dispatch(&req, &token).await;
        let (mut response, elapsed, error_message) = match outcome {
            Ok(Forwarded { response, elapsed }) => {
                self.metrics.increment_forwarded();
                info!(
                    route = %route_path,
                    status = response.status.as_u16(),
                    upstream_ms = millis(elapsed),
                    "request proxied"
                );
                (response, elapsed, None)
            }
            Err(err) => (self.reject(&err), started.elapsed(), Some(err.to_string())),
        };
        cors::apply_cors(&mut response.headers);

        if let Some(usage) = &self.usage {
            let event = UsageEvent {
                credential_hash: token.credential_hash,
                route_path,
                timestamp: received_at,
                response_status: response.status.as_u16(),
                response_time_ms: millis(elapsed),
                ip_address: req.client_ip.clone(),
                user_agent: req.user_agent().map(str::to_owned),
                request_method: req.method.to_string(),
                error_message,
            };
            usage.report(event).await;
        }
        response
    }

    /// Steps after authentication. Returns the route path for usage
    /// reporting alongside the outcome.
    async fn dispatch(
        &self,
        req: &ProxyRequest,
        token: &TokenRecord,
    ) -> (String, Result<Forwarded, GatewayError>) {
        let routes = match self.load_routes().await {
            Ok(routes) => routes,
            Err(err) => return (req.path.clone(), Err(err)),
        };
        let route = match match_route(&routes, &req.path) {
            Ok(route) => route,
            Err(err) => return (req.path.clone(), Err(err)),
        };
        let route_path = route.prefix().to_owned();

        if let Err(err) = authorize(token, route.entry) {
            return (route_path, Err(err));
        }

        let injected = self
            .injector
            .headers_for(route.entry.backend_auth.as_ref())
            .await;
        let result = self
            .forwarder
            .forward(req, &route, &injected, self.gateway_host(req))
            .await;
        (route_path, result)
    }

    async fn load_routes(&self) -> Result<RouteTable, GatewayError> {
        match self.store.routes().await? {
            Some(routes) if !routes.is_empty() => Ok(routes),
            _ => Err(GatewayError::RoutesNotConfigured),
        }
    }

    /// Host callers reached the gateway on: the configured public host,
    /// else the first `X-Forwarded-Host`, else `Host`.
    fn gateway_host<'a>(&'a self, req: &'a ProxyRequest) -> Option<&'a str> {
        self.public_host
            .as_deref()
            .or_else(|| {
                req.header_str(X_FORWARDED_HOST)
                    .and_then(|v| v.split(',').next())
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
            })
            .or_else(|| req.header_str(HOST))
    }

    fn reject(&self, err: &GatewayError) -> ProxyResponse {
        self.metrics.record_error(err);
        if err.status_code().is_server_error() {
            warn!(code = err.error_code(), error = %err, "request failed");
        } else {
            info!(code = err.error_code(), status = err.status_code().as_u16(), "request rejected");
        }
        err.to_response()
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn usage(&self) -> Option<&UsageReporter> {
        self.usage.as_ref()
    }

    /// Wait for in-flight usage reports. Call during server shutdown.
    pub async fn shutdown(&self) {
        if let Some(usage) = &self.usage {
            usage.shutdown().await;
        }
        info!("gateway shutdown complete");
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
