use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Header used for `api_key` backend auth when the route does not name one.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// How the gateway authenticates itself to a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// No backend credentials are injected.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// A single header carrying a static key.
    ApiKey,
    /// `Authorization: Basic <base64(username:password)>`.
    Basic,
}

/// Backend-auth configuration attached to a route.
///
/// `refs` maps a slot name to the *name* of a secret, never to the secret
/// itself. Slots per type:
///
/// | type      | slots                   |
/// |-----------|-------------------------|
/// | `bearer`  | `token`                 |
/// | `api_key` | `key`                   |
/// | `basic`   | `username`, `password`  |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type", default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub refs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
}

impl AuthConfig {
    pub const TOKEN_SLOT: &'static str = "token";
    pub const KEY_SLOT: &'static str = "key";
    pub const USERNAME_SLOT: &'static str = "username";
    pub const PASSWORD_SLOT: &'static str = "password";

    /// Bearer auth resolving the token from `token_ref`.
    pub fn bearer(token_ref: impl Into<String>) -> Self {
        Self::with_refs(AuthType::Bearer, [(Self::TOKEN_SLOT, token_ref.into())])
    }

    /// API-key auth resolving the key from `key_ref`, sent in `header_name`.
    pub fn api_key(key_ref: impl Into<String>, header_name: Option<String>) -> Self {
        let mut config = Self::with_refs(AuthType::ApiKey, [(Self::KEY_SLOT, key_ref.into())]);
        config.header_name = header_name;
        config
    }

    /// Basic auth resolving both halves of the credential from secret refs.
    pub fn basic(username_ref: impl Into<String>, password_ref: impl Into<String>) -> Self {
        Self::with_refs(
            AuthType::Basic,
            [
                (Self::USERNAME_SLOT, username_ref.into()),
                (Self::PASSWORD_SLOT, password_ref.into()),
            ],
        )
    }

    fn with_refs<const N: usize>(auth_type: AuthType, refs: [(&str, String); N]) -> Self {
        Self {
            auth_type,
            refs: refs
                .into_iter()
                .map(|(slot, name)| (slot.to_owned(), name))
                .collect(),
            header_name: None,
        }
    }

    /// The secret reference name stored in `slot`, if any.
    pub fn secret_ref(&self, slot: &str) -> Option<&str> {
        self.refs
            .get(slot)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Header name for `api_key` auth.
    pub fn api_key_header(&self) -> &str {
        self.header_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_API_KEY_HEADER)
    }
}

/// A registered backend route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Path prefix the route is registered under, e.g. `/api/image`.
    pub path_prefix: String,
    /// Base URL requests are forwarded to, e.g. `https://svc.internal`.
    pub backend_base_url: String,
    /// Tags used for `tag:` scope matching.
    pub tags: BTreeSet<String>,
    /// Optional credentials injected on the upstream call.
    pub backend_auth: Option<AuthConfig>,
}

impl RouteEntry {
    pub fn new(path_prefix: impl Into<String>, backend_base_url: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            backend_base_url: backend_base_url.into(),
            tags: BTreeSet::new(),
            backend_auth: None,
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_backend_auth(mut self, auth: AuthConfig) -> Self {
        self.backend_auth = Some(auth);
        self
    }
}

/// The stored form of a route value: either a bare URL (legacy) or an object.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredRoute {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        tags: BTreeSet<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backend_auth: Option<AuthConfig>,
    },
}

/// The full route table, stored under the `routes` key as a JSON object
/// keyed by path prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<RouteEntry> for RouteTable {
    fn from_iter<T: IntoIterator<Item = RouteEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for RouteTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = BTreeMap::<String, StoredRoute>::deserialize(deserializer)?;
        Ok(stored
            .into_iter()
            .map(|(path_prefix, route)| match route {
                StoredRoute::Url(url) => RouteEntry::new(path_prefix, url),
                StoredRoute::Detailed {
                    url,
                    tags,
                    backend_auth,
                } => RouteEntry {
                    path_prefix,
                    backend_base_url: url,
                    tags,
                    backend_auth,
                },
            })
            .collect())
    }
}

impl Serialize for RouteTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let stored: BTreeMap<&str, StoredRoute> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.path_prefix.as_str(),
                    StoredRoute::Detailed {
                        url: entry.backend_base_url.clone(),
                        tags: entry.tags.clone(),
                        backend_auth: entry.backend_auth.clone(),
                    },
                )
            })
            .collect();
        stored.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_legacy_and_detailed_values() {
        let json = r#"{
            "/api/legacy": "https://legacy.internal",
            "/api/image": {
                "url": "https://svc.internal",
                "tags": ["media"],
                "backend_auth": {"type": "bearer", "refs": {"token": "IMAGE_TOKEN"}}
            }
        }"#;
        let table: RouteTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);

        let image = table
            .entries()
            .iter()
            .find(|e| e.path_prefix == "/api/image")
            .unwrap();
        assert!(image.tags.contains("media"));
        let auth = image.backend_auth.as_ref().unwrap();
        assert_eq!(auth.auth_type, AuthType::Bearer);
        assert_eq!(auth.secret_ref(AuthConfig::TOKEN_SLOT), Some("IMAGE_TOKEN"));

        let legacy = table
            .entries()
            .iter()
            .find(|e| e.path_prefix == "/api/legacy")
            .unwrap();
        assert!(legacy.tags.is_empty());
        assert!(legacy.backend_auth.is_none());
    }

    #[test]
    fn detailed_value_without_tags() {
        let table: RouteTable =
            serde_json::from_str(r#"{"/api/docs": {"url": "https://docs.internal"}}"#).unwrap();
        assert_eq!(table.entries()[0].backend_base_url, "https://docs.internal");
        assert!(table.entries()[0].tags.is_empty());
    }

    #[test]
    fn api_key_header_defaults() {
        let auth = AuthConfig::api_key("K", None);
        assert_eq!(auth.api_key_header(), DEFAULT_API_KEY_HEADER);
        let auth = AuthConfig::api_key("K", Some("X-Service-Key".into()));
        assert_eq!(auth.api_key_header(), "X-Service-Key");
    }

    #[test]
    fn empty_ref_names_are_ignored() {
        let auth = AuthConfig::bearer("");
        assert_eq!(auth.secret_ref(AuthConfig::TOKEN_SLOT), None);
    }

    #[test]
    fn auth_type_defaults_to_none() {
        let auth: AuthConfig = serde_json::from_str(r#"{"refs": {}}"#).unwrap();
        assert_eq!(auth.auth_type, AuthType::None);
    }

    #[test]
    fn serializes_back_to_keyed_object() {
        let table: RouteTable = vec![RouteEntry::new("/api/a", "http://a").with_tags(["x"])]
            .into_iter()
            .collect();
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["/api/a"]["url"], "http://a");
        assert_eq!(value["/api/a"]["tags"][0], "x");
    }
}
