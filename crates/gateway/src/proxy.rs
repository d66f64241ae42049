use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{
    CONNECTION, CONTENT_LENGTH, HOST, HeaderMap, HeaderName, HeaderValue, LOCATION, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};
use reqwest::redirect::Policy;
use reqwest::Client;
use tokio::time::Instant;
use tracing::debug;

use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;
use crate::redirect::{RedirectContext, rewrite_location};
use crate::request::{ProxyBody, ProxyRequest, ProxyResponse};
use crate::router::RouteMatch;

const KEEP_ALIVE: &str = "keep-alive";
const PROXY_CONNECTION: &str = "proxy-connection";

/// A relayed upstream response and how long the backend took to answer.
#[derive(Debug)]
pub struct Forwarded {
    pub response: ProxyResponse,
    /// Time from sending the request until response headers arrived.
    pub elapsed: Duration,
}

/// Issues the upstream call for a matched route.
pub struct ProxyForwarder {
    client: Client,
    public_scheme: String,
    strip_header: Option<HeaderName>,
    metrics: Arc<GatewayMetrics>,
}

impl ProxyForwarder {
    pub fn new(
        client: Client,
        public_scheme: impl Into<String>,
        strip_header: Option<HeaderName>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            client,
            public_scheme: public_scheme.into(),
            strip_header,
            metrics,
        }
    }

    /// An HTTP client that never follows redirects.
    pub fn build_client(timeout: Option<Duration>) -> Result<Client, GatewayError> {
        let mut builder = Client::builder().redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))
    }

    /// Forward `req` to the matched backend.
    ///
    /// `injected` headers replace any inbound header of the same name. When
    /// `gateway_host` is known, 3xx `Location` headers are rewritten into the
    /// gateway's path space; status, other headers and the body are relayed
    /// as received.
    pub async fn forward(
        &self,
        req: &ProxyRequest,
        route: &RouteMatch<'_>,
        injected: &HeaderMap,
        gateway_host: Option<&str>,
    ) -> Result<Forwarded, GatewayError> {
        let url = upstream_url(
            &route.entry.backend_base_url,
            route.residual,
            req.query.as_deref(),
        );
        let headers = upstream_headers(&req.headers, injected, self.strip_header.as_ref());

        debug!(upstream = %url, "forwarding request");
        let started = Instant::now();
        let upstream = self
            .client
            .request(req.method.clone(), &url)
            .headers(headers)
            .body(req.body.clone())
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(e.without_url().to_string()))?;
        let elapsed = started.elapsed();

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_response_hop_by_hop(&mut headers);

        if status.is_redirection()
            && let Some(host) = gateway_host
        {
            let ctx = RedirectContext {
                backend_base_url: &route.entry.backend_base_url,
                matched_prefix: route.prefix(),
                gateway_scheme: &self.public_scheme,
                gateway_host: host,
            };
            if rewrite_redirect(&mut headers, &ctx) {
                self.metrics.increment_redirects_rewritten();
            }
        }

        Ok(Forwarded {
            response: ProxyResponse::new(status, headers, ProxyBody::from(upstream)),
            elapsed,
        })
    }

}

fn rewrite_redirect(headers: &mut HeaderMap, ctx: &RedirectContext<'_>) -> bool {
    let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let rewritten = rewrite_location(location, ctx).into_owned();
    if rewritten == location {
        return false;
    }
    debug!(from = location, to = %rewritten, "rewriting redirect location");
    let Ok(value) = HeaderValue::from_str(&rewritten) else {
        return false;
    };
    headers.insert(LOCATION, value);
    true
}

/// `backend_base_url + residual + ?query`, concatenated verbatim.
pub fn upstream_url(backend_base_url: &str, residual: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{backend_base_url}{residual}?{query}"),
        None => format!("{backend_base_url}{residual}"),
    }
}

/// Inbound headers minus hop-by-hop ones, overlaid with `injected`.
pub fn upstream_headers(
    inbound: &HeaderMap,
    injected: &HeaderMap,
    strip: Option<&HeaderName>,
) -> HeaderMap {
    let listed = connection_tokens(inbound);
    let mut headers = HeaderMap::with_capacity(inbound.len() + injected.len());
    for (name, value) in inbound {
        if is_request_hop_by_hop(name)
            || listed.iter().any(|token| token == name.as_str())
            || strip == Some(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    for (name, value) in injected {
        headers.insert(name.clone(), value.clone());
    }
    headers
}

fn is_request_hop_by_hop(name: &HeaderName) -> bool {
    [CONNECTION, TRANSFER_ENCODING, TE, TRAILER, UPGRADE, HOST, CONTENT_LENGTH].contains(name)
        || name.as_str() == KEEP_ALIVE
        || name.as_str() == PROXY_CONNECTION
}

/// Header names listed in `Connection`, lowercased.
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Drop hop-by-hop headers from an upstream response. `Content-Length` is
/// kept.
fn strip_response_hop_by_hop(headers: &mut HeaderMap) {
    for token in connection_tokens(headers) {
        headers.remove(token.as_str());
    }
    for name in [CONNECTION, TRANSFER_ENCODING, TE, TRAILER, UPGRADE] {
        headers.remove(name);
    }
    headers.remove(KEEP_ALIVE);
    headers.remove(PROXY_CONNECTION);
}
