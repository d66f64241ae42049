use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::HeaderName;

use tollgate_core::DEFAULT_API_KEY_HEADER;
use tollgate_store::ConfigStore;

use crate::auth::TokenAuthenticator;
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::inject::CredentialInjector;
use crate::metrics::GatewayMetrics;
use crate::proxy::ProxyForwarder;
use crate::secrets::{SecretChain, StoreSecrets};
use crate::usage::{DEFAULT_USAGE_TIMEOUT, UsageMode, UsageReporter};

/// Default usage ingestion base URL.
pub const DEFAULT_USAGE_BASE_URL: &str = "http://localhost:8000";

/// Where and how usage events are posted.
#[derive(Debug, Clone)]
pub struct UsageSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub mode: UsageMode,
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_USAGE_BASE_URL.to_owned(),
            timeout: DEFAULT_USAGE_TIMEOUT,
            mode: UsageMode::Background,
        }
    }
}

/// Fluent builder for constructing a [`Gateway`] instance.
///
/// A [`ConfigStore`] is required. Without an explicit [`SecretChain`] the
/// gateway resolves backend secrets from the store alone. Usage reporting
/// is off unless [`usage`](Self::usage) is called.
pub struct GatewayBuilder {
    store: Option<Arc<dyn ConfigStore>>,
    secrets: Option<SecretChain>,
    credential_header: String,
    public_scheme: String,
    public_host: Option<String>,
    strip_credential_header: bool,
    upstream_timeout: Option<Duration>,
    client: Option<Client>,
    usage: Option<UsageSettings>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            secrets: None,
            credential_header: DEFAULT_API_KEY_HEADER.to_owned(),
            public_scheme: "https".to_owned(),
            public_host: None,
            strip_credential_header: false,
            upstream_timeout: None,
            client: None,
            usage: None,
            metrics: None,
        }
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn secrets(mut self, secrets: SecretChain) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Header the caller's API key is read from.
    #[must_use]
    pub fn credential_header(mut self, header: impl Into<String>) -> Self {
        self.credential_header = header.into();
        self
    }

    /// Scheme used for rewritten redirect URLs.
    #[must_use]
    pub fn public_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.public_scheme = scheme.into();
        self
    }

    /// Fixed gateway host for redirect rewriting. Without one the inbound
    /// `X-Forwarded-Host` or `Host` header is used.
    #[must_use]
    pub fn public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into()).filter(|h: &String| !h.is_empty());
        self
    }

    /// Drop the caller's credential header before forwarding.
    #[must_use]
    pub fn strip_credential_header(mut self, strip: bool) -> Self {
        self.strip_credential_header = strip;
        self
    }

    #[must_use]
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = Some(timeout);
        self
    }

    /// Use a preconfigured upstream client. It should not follow redirects.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn usage(mut self, settings: UsageSettings) -> Self {
        self.usage = Some(settings);
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        let store = self
            .store
            .ok_or_else(|| GatewayError::Configuration("config store is required".into()))?;

        let header = HeaderName::from_bytes(self.credential_header.as_bytes()).map_err(|_| {
            GatewayError::Configuration(format!(
                "invalid credential header name: {:?}",
                self.credential_header
            ))
        })?;

        if !matches!(self.public_scheme.as_str(), "http" | "https") {
            return Err(GatewayError::Configuration(format!(
                "public scheme must be http or https, got {:?}",
                self.public_scheme
            )));
        }

        let metrics = self.metrics.unwrap_or_default();
        let client = match self.client {
            Some(client) => client,
            None => ProxyForwarder::build_client(self.upstream_timeout)?,
        };
        let secrets = self.secrets.unwrap_or_else(|| {
            SecretChain::new().with_provider(StoreSecrets::new(Arc::clone(&store)))
        });
        let usage = self
            .usage
            .map(|s| UsageReporter::new(&s.base_url, s.timeout, s.mode, Arc::clone(&metrics)))
            .transpose()?;

        let strip_header = self.strip_credential_header.then(|| header.clone());
        Ok(Gateway {
            authenticator: TokenAuthenticator::new(Arc::clone(&store), header),
            injector: CredentialInjector::new(Arc::new(secrets)),
            forwarder: ProxyForwarder::new(
                client,
                self.public_scheme,
                strip_header,
                Arc::clone(&metrics),
            ),
            store,
            usage,
            metrics,
            public_host: self.public_host,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
