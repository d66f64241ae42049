use async_trait::async_trait;

use tollgate_core::{RouteTable, TokenRecord};

use crate::error::StoreError;
use crate::key::StoreKey;

/// Read-only access to the config namespace published by the control plane.
///
/// Backends implement [`get`](Self::get); the typed reads are provided on
/// top of it and decode the stored JSON. Implementations must be
/// `Send + Sync` and safe for concurrent access. No freshness guarantee is
/// made: a store may lag the control plane.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the raw stored value for a key. Returns `None` if absent.
    async fn get(&self, key: &StoreKey) -> Result<Option<String>, StoreError>;

    /// Fetch a token record by credential hash.
    async fn token(&self, credential_hash: &str) -> Result<Option<TokenRecord>, StoreError> {
        let Some(raw) = self.get(&StoreKey::token(credential_hash)).await? else {
            return Ok(None);
        };
        let record: TokenRecord = serde_json::from_str(&raw)?;
        Ok(Some(record.with_hash(credential_hash)))
    }

    /// Fetch the full route table.
    async fn routes(&self) -> Result<Option<RouteTable>, StoreError> {
        let Some(raw) = self.get(&StoreKey::Routes).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Fetch a secret value by reference name. Empty values count as absent.
    async fn secret(&self, ref_name: &str) -> Result<Option<String>, StoreError> {
        let raw = self.get(&StoreKey::secret(ref_name)).await?;
        Ok(raw.map(|raw| decode_secret(&raw)).filter(|v| !v.is_empty()))
    }
}

/// Decode a stored secret.
///
/// Accepts a bare string, a JSON string, or `{"value": "..."}`. Anything
/// else is taken verbatim.
pub fn decode_secret(raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::String(value)) => value,
        Ok(serde_json::Value::Object(map)) => match map.get("value") {
            Some(serde_json::Value::String(value)) => value.clone(),
            _ => raw.to_owned(),
        },
        _ => raw.to_owned(),
    }
}
