use tollgate_core::{AuthType, ScopeSpec};

use crate::error::StoreError;
use crate::key::StoreKey;
use crate::store::ConfigStore;

/// Credential hash of the fixture token (not a real sha256 digest).
pub const FIXTURE_TOKEN_HASH: &str = "conformance-token-hash";

/// Key-value pairs every conformance run expects the store to be seeded with.
pub fn fixtures() -> Vec<(StoreKey, String)> {
    vec![
        (
            StoreKey::token(FIXTURE_TOKEN_HASH),
            r#"{"name":"ci","department":"platform","scopes":["image","tag:media"],"created_at":"2026-01-01T00:00:00","expires_at":null}"#
                .to_owned(),
        ),
        (
            StoreKey::Routes,
            r#"{"/api/image":{"url":"https://image.internal","tags":["media"],"backend_auth":{"type":"bearer","refs":{"token":"IMAGE_TOKEN"}}},"/api/legacy":"https://legacy.internal"}"#
                .to_owned(),
        ),
        (StoreKey::secret("IMAGE_TOKEN"), "image-secret".to_owned()),
        (
            StoreKey::secret("WRAPPED"),
            r#"{"value":"wrapped-secret"}"#.to_owned(),
        ),
        (StoreKey::secret("EMPTY"), String::new()),
    ]
}

/// Run the config store conformance test suite.
///
/// The store must have been seeded with [`fixtures`] beforehand.
///
/// # Errors
///
/// Returns an error if the backend fails a read.
pub async fn run_store_conformance_tests(store: &dyn ConfigStore) -> Result<(), StoreError> {
    test_get_missing(store).await?;
    test_raw_get(store).await?;
    test_token(store).await?;
    test_routes(store).await?;
    test_secrets(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn ConfigStore) -> Result<(), StoreError> {
    let val = store.get(&StoreKey::token("missing")).await?;
    assert!(val.is_none(), "get on missing key should return None");
    assert!(store.token("missing").await?.is_none());
    assert!(store.secret("MISSING").await?.is_none());
    Ok(())
}

async fn test_raw_get(store: &dyn ConfigStore) -> Result<(), StoreError> {
    let val = store.get(&StoreKey::secret("IMAGE_TOKEN")).await?;
    assert_eq!(val.as_deref(), Some("image-secret"));
    Ok(())
}

async fn test_token(store: &dyn ConfigStore) -> Result<(), StoreError> {
    let record = store
        .token(FIXTURE_TOKEN_HASH)
        .await?
        .ok_or_else(|| StoreError::Backend("fixture token should be present".into()))?;
    assert_eq!(record.credential_hash, FIXTURE_TOKEN_HASH);
    assert_eq!(record.name.as_deref(), Some("ci"));
    assert_eq!(
        record.scopes,
        vec![ScopeSpec::Service("image".into()), ScopeSpec::Tag("media".into())]
    );
    assert!(record.expires_at.is_none());
    Ok(())
}

async fn test_routes(store: &dyn ConfigStore) -> Result<(), StoreError> {
    let table = store
        .routes()
        .await?
        .ok_or_else(|| StoreError::Backend("fixture routes should be present".into()))?;
    assert_eq!(table.len(), 2);
    let image = table
        .entries()
        .iter()
        .find(|e| e.path_prefix == "/api/image")
        .ok_or_else(|| StoreError::Backend("fixture image route should be present".into()))?;
    assert_eq!(image.backend_base_url, "https://image.internal");
    assert_eq!(
        image.backend_auth.as_ref().map(|a| a.auth_type),
        Some(AuthType::Bearer)
    );
    Ok(())
}

async fn test_secrets(store: &dyn ConfigStore) -> Result<(), StoreError> {
    assert_eq!(
        store.secret("IMAGE_TOKEN").await?.as_deref(),
        Some("image-secret")
    );
    assert_eq!(
        store.secret("WRAPPED").await?.as_deref(),
        Some("wrapped-secret")
    );
    assert!(
        store.secret("EMPTY").await?.is_none(),
        "empty secret should count as absent"
    );
    Ok(())
}
