use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;

use tollgate_store::error::StoreError;
use tollgate_store::key::StoreKey;
use tollgate_store::store::ConfigStore;

use crate::config::RedisConfig;

/// Render a [`StoreKey`] into a Redis key, applying `prefix` if non-empty.
pub fn render_key(prefix: &str, key: &StoreKey) -> String {
    if prefix.is_empty() {
        key.canonical()
    } else {
        format!("{prefix}:{}", key.canonical())
    }
}

/// Redis-backed implementation of [`ConfigStore`].
///
/// Values are plain Redis strings written by the control plane.
pub struct RedisConfigStore {
    pool: Pool,
    prefix: String,
}

impl RedisConfigStore {
    /// Create a new `RedisConfigStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
        })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ConfigStore for RedisConfigStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        let redis_key = render_key(&self.prefix, key);
        let mut conn = self.conn().await?;
        let val: Option<String> = conn
            .get(&redis_key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tracing::trace!(key = %redis_key, hit = val.is_some(), "redis config read");
        Ok(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_without_prefix() {
        assert_eq!(render_key("", &StoreKey::Routes), "routes");
        assert_eq!(render_key("", &StoreKey::token("ab")), "token:ab");
    }

    #[test]
    fn renders_with_prefix() {
        assert_eq!(
            render_key("tollgate", &StoreKey::secret("X")),
            "tollgate:secret:X"
        );
    }

    #[test]
    fn invalid_url_is_connection_error() {
        let config = RedisConfig {
            url: "not a url".into(),
            ..RedisConfig::default()
        };
        assert!(matches!(
            RedisConfigStore::new(&config),
            Err(StoreError::Connection(_))
        ));
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;

    fn test_config() -> RedisConfig {
        RedisConfig {
            url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: format!("tollgate-test-{}", uuid::Uuid::new_v4()),
            ..RedisConfig::default()
        }
    }

    #[tokio::test]
    async fn store_conformance() {
        let config = test_config();
        let store = RedisConfigStore::new(&config).expect("pool creation should succeed");

        let mut conn = store.conn().await.expect("redis should be reachable");
        for (key, value) in tollgate_store::testing::fixtures() {
            let _: () = conn
                .set(render_key(&config.prefix, &key), value)
                .await
                .expect("seeding should succeed");
        }
        drop(conn);

        tollgate_store::testing::run_store_conformance_tests(&store)
            .await
            .expect("conformance tests should pass");
    }
}
