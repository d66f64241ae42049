//! Ordered secret resolution for backend credentials.
//!
//! A route's `backend_auth` names secrets indirectly. [`SecretChain`] asks
//! each [`SecretProvider`] in turn and takes the first non-empty value:
//! deployment-time overrides come first, the config store's `secret:` keys
//! last. Adding another source means adding another provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, warn};

use tollgate_store::{ConfigStore, StoreError};

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret store error: {0}")]
    Store(#[from] StoreError),

    #[error("secret provider error: {0}")]
    Provider(String),
}

/// A single source of secret values.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Look up a secret by reference name. `None` if this provider does not
    /// hold it.
    async fn resolve(&self, ref_name: &str) -> Result<Option<SecretString>, SecretError>;
}

/// Fixed override bindings, typically from the deployment config.
#[derive(Default)]
pub struct StaticSecrets {
    values: HashMap<String, SecretString>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, ref_name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(ref_name.into(), SecretString::new(value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticSecrets {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |secrets, (k, v)| secrets.with(k, v))
    }
}

#[async_trait]
impl SecretProvider for StaticSecrets {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn resolve(&self, ref_name: &str) -> Result<Option<SecretString>, SecretError> {
        Ok(self
            .values
            .get(ref_name)
            .map(|v| SecretString::new(v.expose_secret().clone())))
    }
}

/// Override bindings read from environment variables named
/// `{prefix}{ref_name}`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecrets {
    prefix: String,
}

impl EnvSecrets {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, ref_name: &str) -> String {
        format!("{}{ref_name}", self.prefix)
    }
}

#[async_trait]
impl SecretProvider for EnvSecrets {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn resolve(&self, ref_name: &str) -> Result<Option<SecretString>, SecretError> {
        let var = self.var_name(ref_name);
        match std::env::var(&var) {
            Ok(value) => Ok(Some(SecretString::new(value))),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::Provider(format!(
                "environment variable {var} is not valid unicode"
            ))),
        }
    }
}

/// Secret records stored under `secret:<ref_name>` in the config store.
pub struct StoreSecrets {
    store: Arc<dyn ConfigStore>,
}

impl StoreSecrets {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SecretProvider for StoreSecrets {
    fn name(&self) -> &'static str {
        "store"
    }

    async fn resolve(&self, ref_name: &str) -> Result<Option<SecretString>, SecretError> {
        Ok(self.store.secret(ref_name).await?.map(SecretString::new))
    }
}

/// Providers consulted in order; the first non-empty value wins.
///
/// A failing provider is logged and skipped, so resolution itself never
/// fails.
#[derive(Clone, Default)]
pub struct SecretChain {
    providers: Vec<Arc<dyn SecretProvider>>,
}

impl SecretChain {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl SecretProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn resolve(&self, ref_name: &str) -> Option<SecretString> {
        for provider in &self.providers {
            match provider.resolve(ref_name).await {
                Ok(Some(value)) if !value.expose_secret().is_empty() => {
                    debug!(ref_name, provider = provider.name(), "secret resolved");
                    return Some(value);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(ref_name, provider = provider.name(), error = %e, "secret lookup failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use tollgate_store::StoreKey;
    use tollgate_store_memory::MemoryConfigStore;

    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl SecretProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn resolve(&self, _ref_name: &str) -> Result<Option<SecretString>, SecretError> {
            Err(SecretError::Provider("vault sealed".into()))
        }
    }

    fn store_with(pairs: &[(&str, &str)]) -> Arc<dyn ConfigStore> {
        let store = MemoryConfigStore::new();
        for (name, value) in pairs {
            store.insert(&StoreKey::secret(*name), *value);
        }
        Arc::new(store)
    }

    async fn resolved(chain: &SecretChain, name: &str) -> Option<String> {
        chain
            .resolve(name)
            .await
            .map(|s| s.expose_secret().clone())
    }

    #[tokio::test]
    async fn override_shadows_store() {
        let chain = SecretChain::new()
            .with_provider(StaticSecrets::new().with("SVC_TOKEN", "override"))
            .with_provider(StoreSecrets::new(store_with(&[("SVC_TOKEN", "stored")])));
        assert_eq!(resolved(&chain, "SVC_TOKEN").await.as_deref(), Some("override"));
    }

    #[tokio::test]
    async fn falls_back_to_store() {
        let chain = SecretChain::new()
            .with_provider(StaticSecrets::new().with("OTHER", "x"))
            .with_provider(StoreSecrets::new(store_with(&[("SVC_TOKEN", "stored")])));
        assert_eq!(resolved(&chain, "SVC_TOKEN").await.as_deref(), Some("stored"));
        assert_eq!(resolved(&chain, "MISSING").await, None);
    }

    #[tokio::test]
    async fn empty_values_are_skipped() {
        let chain = SecretChain::new()
            .with_provider(StaticSecrets::new().with("SVC_TOKEN", ""))
            .with_provider(StoreSecrets::new(store_with(&[("SVC_TOKEN", "stored")])));
        assert_eq!(resolved(&chain, "SVC_TOKEN").await.as_deref(), Some("stored"));
    }

    #[tokio::test]
    async fn failing_provider_is_skipped() {
        let chain = SecretChain::new()
            .with_provider(FailingProvider)
            .with_provider(StaticSecrets::new().with("SVC_TOKEN", "ok"));
        assert_eq!(resolved(&chain, "SVC_TOKEN").await.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn env_provider_reads_prefixed_variables() {
        // PATH is set in every test environment.
        let env = EnvSecrets::with_prefix("PA");
        assert!(env.resolve("TH").await.unwrap().is_some());
        let env = EnvSecrets::with_prefix("TOLLGATE_TEST_UNSET_");
        assert!(env.resolve("NOTHING").await.unwrap().is_none());
    }

    #[test]
    fn static_secrets_from_iter() {
        let secrets: StaticSecrets = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(secrets.len(), 2);
    }
}
