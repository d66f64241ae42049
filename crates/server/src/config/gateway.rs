use serde::Deserialize;

/// Request-handling options for the gateway core.
#[derive(Debug, Deserialize)]
pub struct GatewaySection {
    /// Header carrying the caller's API key.
    #[serde(default = "default_credential_header")]
    pub credential_header: String,
    /// Scheme used when rewriting backend redirects.
    #[serde(default = "default_public_scheme")]
    pub public_scheme: String,
    /// Fixed public host for redirect rewriting. Falls back to the inbound
    /// `X-Forwarded-Host` or `Host` header.
    pub public_host: Option<String>,
    /// Remove the caller's credential header before forwarding upstream.
    #[serde(default)]
    pub strip_credential_header: bool,
    /// Deadline for upstream calls in seconds. `0` disables it.
    #[serde(default)]
    pub upstream_timeout_seconds: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            credential_header: default_credential_header(),
            public_scheme: default_public_scheme(),
            public_host: None,
            strip_credential_header: false,
            upstream_timeout_seconds: 0,
        }
    }
}

fn default_credential_header() -> String {
    tollgate_core::DEFAULT_API_KEY_HEADER.to_owned()
}

fn default_public_scheme() -> String {
    "https".to_owned()
}
