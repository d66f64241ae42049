use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;

use tollgate_store::error::StoreError;
use tollgate_store::key::StoreKey;
use tollgate_store::store::ConfigStore;

/// In-memory [`ConfigStore`] backed by a [`DashMap`].
///
/// Used for tests and for single-node deployments seeded from a snapshot
/// file. Writes go through [`insert`](Self::insert); the gateway itself only
/// reads.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    data: DashMap<String, String>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw value under `key`, replacing any previous value.
    pub fn insert(&self, key: &StoreKey, value: impl Into<String>) {
        self.data.insert(key.canonical(), value.into());
    }

    /// Store `value` serialized as JSON under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if `value` cannot be serialized.
    pub fn insert_json<T: serde::Serialize + ?Sized>(
        &self,
        key: &StoreKey,
        value: &T,
    ) -> Result<(), StoreError> {
        self.insert(key, serde_json::to_string(value)?);
        Ok(())
    }

    pub fn remove(&self, key: &StoreKey) -> bool {
        self.data.remove(&key.canonical()).is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Build a store from a JSON snapshot.
    ///
    /// The snapshot is an object keyed by canonical store keys (`routes`,
    /// `token:<hash>`, `secret:<name>`). String values are stored verbatim;
    /// any other JSON value is stored in its serialized form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if the snapshot is not a JSON
    /// object.
    pub fn from_snapshot(snapshot: &str) -> Result<Self, StoreError> {
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(snapshot)?;
        let store = Self::new();
        for (key, value) in entries {
            if StoreKey::parse(&key).is_none() {
                tracing::warn!(key = %key, "ignoring snapshot entry outside the gateway namespace");
                continue;
            }
            let raw = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            store.data.insert(key, raw);
        }
        Ok(store)
    }

    /// Read a JSON snapshot file and build a store from it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the file cannot be read and
    /// [`StoreError::Serialization`] if it is not a valid snapshot.
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))?;
        let store = Self::from_snapshot(&raw)?;
        tracing::info!(path = %path.display(), entries = store.len(), "loaded config snapshot");
        Ok(store)
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
        Ok(self
            .data
            .get(&key.canonical())
            .map(|entry| entry.value().clone()))
    }
}
