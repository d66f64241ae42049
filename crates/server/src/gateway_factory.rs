use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tollgate_gateway::{
    EnvSecrets, Gateway, GatewayBuilder, SecretChain, StaticSecrets, StoreSecrets, UsageSettings,
};
use tollgate_store::ConfigStore;

use crate::config::{SecretsConfig, TollgateConfig};
use crate::error::ServerError;

/// Assemble the secret resolution chain: static overrides, then environment
/// variables, then `secret:<ref>` in the config store.
pub fn secret_chain(config: &SecretsConfig, store: Arc<dyn ConfigStore>) -> SecretChain {
    let mut chain = SecretChain::new();
    if !config.overrides.is_empty() {
        chain = chain.with_provider(config.overrides.iter().collect::<StaticSecrets>());
    }
    if let Some(prefix) = &config.env_prefix {
        chain = chain.with_provider(EnvSecrets::with_prefix(prefix.clone()));
    }
    chain.with_provider(StoreSecrets::new(store))
}

/// Build the [`Gateway`] described by `config` on top of `store`.
pub fn build_gateway(
    config: &TollgateConfig,
    store: Arc<dyn ConfigStore>,
) -> Result<Gateway, ServerError> {
    let section = &config.gateway;
    let secrets = secret_chain(&config.secrets, Arc::clone(&store));
    info!(providers = secrets.len(), "secret chain assembled");

    let mut builder = GatewayBuilder::new()
        .store(store)
        .secrets(secrets)
        .credential_header(section.credential_header.clone())
        .public_scheme(section.public_scheme.clone())
        .strip_credential_header(section.strip_credential_header);

    if let Some(host) = &section.public_host {
        builder = builder.public_host(host.clone());
    }
    if section.upstream_timeout_seconds > 0 {
        builder = builder.upstream_timeout(Duration::from_secs(section.upstream_timeout_seconds));
    }
    if config.usage.enabled {
        builder = builder.usage(UsageSettings {
            base_url: config.usage.base_url.clone(),
            timeout: Duration::from_secs(config.usage.timeout_seconds),
            mode: config.usage.mode,
        });
    } else {
        info!("usage reporting disabled");
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use tollgate_store::StoreKey;
    use tollgate_store_memory::MemoryConfigStore;

    use super::*;

    fn store() -> Arc<dyn ConfigStore> {
        let store = MemoryConfigStore::new();
        store.insert(&StoreKey::secret("SVC"), "from-store");
        store.insert(&StoreKey::secret("ONLY_STORE"), "store-only");
        Arc::new(store)
    }

    #[tokio::test]
    async fn overrides_shadow_store() {
        let config = SecretsConfig {
            env_prefix: None,
            overrides: [("SVC".to_owned(), "override".to_owned())].into(),
        };
        let chain = secret_chain(&config, store());
        assert_eq!(chain.len(), 2);

        let svc = chain.resolve("SVC").await.unwrap();
        assert_eq!(svc.expose_secret(), "override");
        let only = chain.resolve("ONLY_STORE").await.unwrap();
        assert_eq!(only.expose_secret(), "store-only");
        assert!(chain.resolve("MISSING").await.is_none());
    }

    #[test]
    fn env_prefix_adds_provider() {
        let config = SecretsConfig {
            env_prefix: Some("TOLLGATE_SECRET_".into()),
            overrides: std::collections::HashMap::new(),
        };
        assert_eq!(secret_chain(&config, store()).len(), 2);
    }

    #[tokio::test]
    async fn builds_with_defaults() {
        let config = TollgateConfig::default();
        let gateway = build_gateway(&config, store()).unwrap();
        assert!(gateway.usage().is_some());
    }

    #[tokio::test]
    async fn usage_can_be_disabled() {
        let config = TollgateConfig::from_toml("[usage]\nenabled = false").unwrap();
        let gateway = build_gateway(&config, store()).unwrap();
        assert!(gateway.usage().is_none());
    }

    #[test]
    fn rejects_bad_scheme() {
        let config = TollgateConfig::from_toml("[gateway]\npublic_scheme = \"ftp\"").unwrap();
        assert!(matches!(
            build_gateway(&config, store()),
            Err(ServerError::Gateway(_))
        ));
    }
}
