use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{CONTENT_LENGTH, HOST};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::response::Response;
use tracing::debug;

use tollgate_gateway::{GatewayError, ProxyBody, ProxyRequest, ProxyResponse};

use super::AppState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Fallback handler: every non-health request goes through the gateway.
pub async fn proxy(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let limit = state.max_body_bytes;

    if declared_length(&parts).is_some_and(|len| len > limit) {
        return into_response(GatewayError::PayloadTooLarge { limit }.to_response());
    }
    // A chunked body that overruns the limit surfaces here as well.
    let body = match axum::body::to_bytes(body, limit).await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "failed to read request body");
            return into_response(GatewayError::PayloadTooLarge { limit }.to_response());
        }
    };

    let request = proxy_request(parts).with_body(body);
    into_response(state.gateway.handle(request).await)
}

fn declared_length(parts: &Parts) -> Option<usize> {
    parts
        .headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// First hop of `X-Forwarded-For`, else the peer address.
fn client_ip(parts: &Parts) -> Option<String> {
    let forwarded = parts
        .headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_owned());
    }
    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

fn proxy_request(parts: Parts) -> ProxyRequest {
    let client_ip = client_ip(&parts);
    let mut headers = parts.headers;

    // HTTP/2 carries the authority in the URI rather than a Host header.
    if !headers.contains_key(HOST)
        && let Some(authority) = parts.uri.authority()
        && let Ok(value) = HeaderValue::from_str(authority.as_str())
    {
        headers.insert(HOST, value);
    }

    let mut request = ProxyRequest::new(parts.method, parts.uri.path()).with_headers(headers);
    if let Some(query) = parts.uri.query() {
        request = request.with_query(query);
    }
    if let Some(ip) = client_ip {
        request = request.with_client_ip(ip);
    }
    request
}

pub(crate) fn into_response(proxied: ProxyResponse) -> Response {
    let body = match proxied.body {
        ProxyBody::Full(bytes) => Body::from(bytes),
        ProxyBody::Stream(stream) => Body::from_stream(stream),
    };
    let mut response = Response::new(body);
    *response.status_mut() = proxied.status;
    *response.headers_mut() = proxied.headers;
    response
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, Request as HttpRequest, StatusCode};

    use super::*;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn forwarded_for_wins_over_peer() {
        let mut p = parts(
            HttpRequest::builder()
                .uri("/api/x")
                .header(X_FORWARDED_FOR, "203.0.113.7, 10.0.0.1"),
        );
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000))));
        assert_eq!(client_ip(&p).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn peer_address_fallback() {
        let mut p = parts(HttpRequest::builder().uri("/api/x"));
        assert!(client_ip(&p).is_none());
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000))));
        assert_eq!(client_ip(&p).as_deref(), Some("10.0.0.9"));
    }

    #[test]
    fn builds_proxy_request_from_parts() {
        let p = parts(
            HttpRequest::builder()
                .method(Method::POST)
                .uri("https://gw.example.com/api/image/v1/resize?w=10")
                .header("x-api-key", "k"),
        );
        let req = proxy_request(p);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/api/image/v1/resize");
        assert_eq!(req.query.as_deref(), Some("w=10"));
        assert_eq!(req.header_str(HOST), Some("gw.example.com"));
        assert_eq!(req.header_str("x-api-key"), Some("k"));
    }

    #[test]
    fn declared_length_parses_header() {
        let p = parts(HttpRequest::builder().header(CONTENT_LENGTH, "42"));
        assert_eq!(declared_length(&p), Some(42));
        let p = parts(HttpRequest::builder().header(CONTENT_LENGTH, "lots"));
        assert_eq!(declared_length(&p), None);
    }

    #[test]
    fn relays_status_and_headers() {
        let mut proxied = ProxyResponse::empty(StatusCode::ACCEPTED);
        proxied
            .headers
            .insert("x-upstream", HeaderValue::from_static("1"));
        let response = into_response(proxied);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-upstream"], "1");
    }
}
