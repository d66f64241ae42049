//! The Tollgate edge request pipeline.
//!
//! [`Gateway::handle`] turns a [`ProxyRequest`] into a [`ProxyResponse`]:
//! it authenticates the caller's API key, picks the most specific route,
//! checks the token's scopes, injects backend credentials and forwards the
//! call, then emits a best-effort usage event. The crate knows nothing about
//! the HTTP server in front of it.

pub mod auth;
pub mod authz;
pub mod builder;
pub mod cors;
pub mod error;
pub mod gateway;
pub mod inject;
pub mod metrics;
pub mod proxy;
pub mod redirect;
pub mod request;
pub mod router;
pub mod secrets;
pub mod usage;


pub use auth::TokenAuthenticator;
pub use builder::{DEFAULT_USAGE_BASE_URL, GatewayBuilder, UsageSettings};
pub use error::GatewayError;
pub use gateway::Gateway;
pub use inject::CredentialInjector;
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use proxy::ProxyForwarder;
pub use redirect::{RedirectContext, rewrite_location};
pub use request::{BodyStream, ProxyBody, ProxyRequest, ProxyResponse};
pub use router::{RouteMatch, match_route};
pub use secrets::{EnvSecrets, SecretChain, SecretError, SecretProvider, StaticSecrets, StoreSecrets};
pub use usage::{DEFAULT_USAGE_TIMEOUT, INGEST_PATH, UsageMode, UsageReporter};
