use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use thiserror::Error;

use tollgate_store::StoreError;

use crate::cors::apply_cors;
use crate::request::{ProxyBody, ProxyResponse};

/// Reasons a request terminates before (or instead of) a proxied response.
///
/// Each variant maps to a fixed status and a short machine-readable code.
/// The `Display` text is the human-readable message sent to callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Please provide the {header} header")]
    MissingCredential { header: String },

    #[error("The provided API key is invalid or has been revoked")]
    InvalidCredential,

    #[error("The API key has expired")]
    CredentialExpired,

    #[error("Token does not have permission for '{service}'. Available scopes: {scopes}")]
    PermissionDenied { service: String, scopes: String },

    #[error("No route configured for {0}")]
    RouteNotFound(String),

    #[error("No routes have been configured")]
    RoutesNotConfigured,

    /// The upstream call failed before a response arrived.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Config store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    /// The gateway was misconfigured. Only produced while building.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredential { .. } | Self::InvalidCredential | Self::CredentialExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::RoutesNotConfigured
            | Self::Upstream(_)
            | Self::Store(_)
            | Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingCredential { .. } => "missing_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::CredentialExpired => "credential_expired",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::RouteNotFound(_) => "route_not_found",
            Self::RoutesNotConfigured => "routes_not_configured",
            Self::Upstream(_) => "upstream_fault",
            Self::Store(_) => "store_unavailable",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::Configuration(_) => "internal_error",
        }
    }

    /// The `{ "error", "message" }` JSON body.
    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error_code(),
            "message": self.to_string(),
        })
    }

    /// Render as a JSON response carrying the CORS headers.
    pub fn to_response(&self) -> ProxyResponse {
        let body = serde_json::to_vec_pretty(&self.body()).unwrap_or_default();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        apply_cors(&mut headers);
        ProxyResponse::new(
            self.status_code(),
            headers,
            ProxyBody::Full(Bytes::from(body)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (
                GatewayError::MissingCredential {
                    header: "X-API-Key".into(),
                },
                401,
            ),
            (GatewayError::InvalidCredential, 401),
            (GatewayError::CredentialExpired, 401),
            (
                GatewayError::PermissionDenied {
                    service: "image".into(),
                    scopes: "video".into(),
                },
                403,
            ),
            (GatewayError::RouteNotFound("/x".into()), 404),
            (GatewayError::RoutesNotConfigured, 500),
            (GatewayError::Upstream("refused".into()), 500),
            (
                GatewayError::Store(StoreError::Connection("down".into())),
                500,
            ),
            (GatewayError::PayloadTooLarge { limit: 10 }, 413),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn permission_denied_lists_scopes() {
        let err = GatewayError::PermissionDenied {
            service: "image".into(),
            scopes: "video, tag:docs".into(),
        };
        assert_eq!(
            err.to_string(),
            "Token does not have permission for 'image'. Available scopes: video, tag:docs"
        );
        assert_eq!(err.body()["error"], "permission_denied");
    }

    #[tokio::test]
    async fn response_is_json_with_cors() {
        let response = GatewayError::RouteNotFound("/nowhere".into()).to_response();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.headers[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers["access-control-allow-origin"], "*");

        let body = response.body.collect().await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "route_not_found");
        assert_eq!(value["message"], "No route configured for /nowhere");
    }
}
