use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::error::StoreError;
use crate::key::StoreKey;
use crate::store::ConfigStore;

/// A TTL read-through cache in front of another [`ConfigStore`].
///
/// Absent keys are cached too, so a missing token costs one backend read per
/// TTL window. Concurrent misses on the same key coalesce into a single
/// backend read. Errors are never cached.
pub struct CachedConfigStore {
    inner: Arc<dyn ConfigStore>,
    cache: Cache<String, Option<String>>,
}

impl CachedConfigStore {
    pub fn new(inner: Arc<dyn ConfigStore>, max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl ConfigStore for CachedConfigStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        let inner = Arc::clone(&self.inner);
        self.cache
            .try_get_with(key.canonical(), async move { inner.get(key).await })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
