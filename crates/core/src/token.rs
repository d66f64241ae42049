use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::scope::ScopeSpec;

/// A token as published by the control plane under `token:<credential_hash>`.
///
/// The hash is the lookup key rather than part of the stored value, so
/// `credential_hash` is skipped during deserialization and filled in by the
/// reader via [`with_hash`](Self::with_hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Lowercase hex SHA-256 of the raw credential.
    #[serde(skip)]
    pub credential_hash: String,
    /// Human-readable token name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning department or team.
    #[serde(default)]
    pub department: Option<String>,
    /// Granted permission scopes.
    #[serde(default)]
    pub scopes: Vec<ScopeSpec>,
    /// When the token was issued.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the token stops being valid. `None` means it never expires.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Create a record with the given hash and scopes and no expiry.
    pub fn new(credential_hash: impl Into<String>, scopes: Vec<ScopeSpec>) -> Self {
        Self {
            credential_hash: credential_hash.into(),
            name: None,
            department: None,
            scopes,
            created_at: None,
            expires_at: None,
        }
    }

    /// Attach the lookup hash to a freshly deserialized record.
    #[must_use]
    pub fn with_hash(mut self, credential_hash: impl Into<String>) -> Self {
        self.credential_hash = credential_hash.into();
        self
    }

    /// Set the expiry timestamp.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the token has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Comma-separated list of granted scopes, for error messages.
    pub fn scope_list(&self) -> String {
        self.scopes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Hash a raw credential to its lookup form (lowercase hex SHA-256).
///
/// Must stay byte-compatible with the control plane, which stores tokens
/// under `token:<sha256_hex(raw)>`.
pub fn hash_credential(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse an ISO-8601 timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{value}'"))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        assert_eq!(
            hash_credential("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn deserializes_control_plane_payload() {
        let json = r#"{
            "name": "ci-bot",
            "department": "platform",
            "scopes": ["image", "tag:media"],
            "created_at": "2026-01-01T08:30:00.123456",
            "expires_at": "2026-04-01T08:30:00.123456"
        }"#;
        let record: TokenRecord = serde_json::from_str(json).unwrap();
        let record = record.with_hash("deadbeef");

        assert_eq!(record.credential_hash, "deadbeef");
        assert_eq!(record.name.as_deref(), Some("ci-bot"));
        assert_eq!(record.scopes.len(), 2);
        let expected = Utc.with_ymd_and_hms(2026, 4, 1, 8, 30, 0).unwrap();
        assert_eq!(
            record.expires_at.map(|ts| ts.timestamp()),
            Some(expected.timestamp())
        );
    }

    #[test]
    fn null_expiry_never_expires() {
        let record: TokenRecord =
            serde_json::from_str(r#"{"scopes": ["*"], "expires_at": null}"#).unwrap();
        assert!(record.expires_at.is_none());
        assert!(!record.is_expired(Utc::now() + Duration::days(36_500)));
    }

    #[test]
    fn rfc3339_expiry_is_accepted() {
        let record: TokenRecord =
            serde_json::from_str(r#"{"scopes": [], "expires_at": "2020-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(record.is_expired(Utc::now()));
    }

    #[test]
    fn garbage_expiry_is_rejected() {
        let result: Result<TokenRecord, _> =
            serde_json::from_str(r#"{"scopes": [], "expires_at": "next tuesday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn expiry_boundary() {
        let now = Utc::now();
        let record = TokenRecord::new("h", vec![]).with_expiry(now + Duration::seconds(1));
        assert!(!record.is_expired(now));
        assert!(record.is_expired(now + Duration::seconds(2)));
    }

    #[test]
    fn scope_list_joins_wire_forms() {
        let record = TokenRecord::new("h", vec![ScopeSpec::parse("image"), ScopeSpec::parse("tag:x")]);
        assert_eq!(record.scope_list(), "image, tag:x");
    }
}
