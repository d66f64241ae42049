use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName};
use tracing::debug;

use tollgate_core::{TokenRecord, hash_credential};
use tollgate_store::ConfigStore;

use crate::error::GatewayError;

/// Validates the caller's opaque API key against the config store.
pub struct TokenAuthenticator {
    store: Arc<dyn ConfigStore>,
    header: HeaderName,
}

impl TokenAuthenticator {
    pub fn new(store: Arc<dyn ConfigStore>, header: HeaderName) -> Self {
        Self { store, header }
    }

    /// The header the credential is read from.
    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Authenticate the request headers as of `now`.
    ///
    /// The raw key is hashed and looked up under `token:<hash>`. A token
    /// whose `expires_at` lies before `now` is rejected.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, GatewayError> {
        let Some(raw) = headers.get(&self.header) else {
            return Err(self.missing());
        };
        if raw.is_empty() {
            return Err(self.missing());
        }
        // Keys are issued as text; anything else cannot match a stored hash.
        let raw = raw.to_str().map_err(|_| GatewayError::InvalidCredential)?;

        let hash = hash_credential(raw);
        let Some(record) = self.store.token(&hash).await? else {
            debug!("credential hash not found");
            return Err(GatewayError::InvalidCredential);
        };
        if record.is_expired(now) {
            return Err(GatewayError::CredentialExpired);
        }
        Ok(record)
    }

    fn missing(&self) -> GatewayError {
        GatewayError::MissingCredential {
            header: self.header.to_string(),
        }
    }
}
