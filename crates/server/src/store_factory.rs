use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tollgate_store::{CachedConfigStore, ConfigStore};
use tollgate_store_memory::MemoryConfigStore;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::ServerError;

/// Construct the configured [`ConfigStore`], wrapped in a
/// [`CachedConfigStore`] when `cache_ttl_seconds` is non-zero.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn ConfigStore>, ServerError> {
    let store: Arc<dyn ConfigStore> = match config.backend {
        StoreBackend::Memory => Arc::new(create_memory_store(config).await?),
        StoreBackend::Redis => create_redis_store(config)?,
    };

    if config.cache_ttl_seconds == 0 {
        return Ok(store);
    }
    info!(
        ttl_seconds = config.cache_ttl_seconds,
        max_entries = config.cache_max_entries,
        "caching config store reads"
    );
    Ok(Arc::new(CachedConfigStore::new(
        store,
        config.cache_max_entries,
        Duration::from_secs(config.cache_ttl_seconds),
    )))
}

async fn create_memory_store(config: &StoreConfig) -> Result<MemoryConfigStore, ServerError> {
    let Some(path) = config.seed_path.as_deref() else {
        info!("using empty in-memory config store");
        return Ok(MemoryConfigStore::new());
    };
    Ok(MemoryConfigStore::load_snapshot(path).await?)
}

#[cfg(feature = "redis")]
fn create_redis_store(config: &StoreConfig) -> Result<Arc<dyn ConfigStore>, ServerError> {
    let redis_config = tollgate_store_redis::RedisConfig {
        url: config.url.clone(),
        prefix: config.prefix.clone(),
        pool_size: config.pool_size,
        ..tollgate_store_redis::RedisConfig::default()
    };
    let store = tollgate_store_redis::RedisConfigStore::new(&redis_config)?;
    info!(url = %config.url, prefix = %config.prefix, "using redis config store");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
fn create_redis_store(_config: &StoreConfig) -> Result<Arc<dyn ConfigStore>, ServerError> {
    Err(ServerError::Config(
        "redis backend requires the 'redis' feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use tollgate_store::StoreKey;

    use super::*;

    #[tokio::test]
    async fn memory_without_seed_is_empty() {
        let store = create_store(&StoreConfig::default()).await.unwrap();
        assert!(store.get(&StoreKey::Routes).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_seeded_from_snapshot() {
        let path = std::env::temp_dir().join(format!("tollgate-seed-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"routes": {"/api/a": "http://a.internal"}, "secret:A": "s"}"#,
        )
        .unwrap();

        let config = StoreConfig {
            seed_path: Some(path.to_string_lossy().into_owned()),
            cache_ttl_seconds: 30,
            ..StoreConfig::default()
        };
        let store = create_store(&config).await.unwrap();
        let routes = store.routes().await.unwrap().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(store.secret("A").await.unwrap().as_deref(), Some("s"));

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn missing_seed_file_fails() {
        let config = StoreConfig {
            seed_path: Some("/nonexistent/kv.json".into()),
            ..StoreConfig::default()
        };
        assert!(matches!(
            create_store(&config).await,
            Err(ServerError::Store(_))
        ));
    }
}
