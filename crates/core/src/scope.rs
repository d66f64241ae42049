use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix marking a scope that grants access by route tag.
pub const TAG_SCOPE_PREFIX: &str = "tag:";

/// A single permission scope carried by a token.
///
/// Scopes are stored as plain strings by the control plane:
///
/// - `"*"` grants access to every route.
/// - `"tag:<name>"` grants access to every route tagged `<name>`.
/// - anything else is a service name, matched against the second path
///   segment of a route prefix (`/api/image` -> `image`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScopeSpec {
    /// Wildcard scope (`"*"`).
    All,
    /// Exact service name.
    Service(String),
    /// Route tag reference, stored without the `tag:` prefix.
    Tag(String),
}

impl ScopeSpec {
    /// Parse a raw scope string. Every string is a valid scope.
    pub fn parse(raw: &str) -> Self {
        if raw == "*" {
            Self::All
        } else if let Some(tag) = raw.strip_prefix(TAG_SCOPE_PREFIX) {
            Self::Tag(tag.to_owned())
        } else {
            Self::Service(raw.to_owned())
        }
    }

    /// Return the tag name if this is a tag scope.
    pub fn as_tag(&self) -> Option<&str> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

impl From<String> for ScopeSpec {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for ScopeSpec {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<ScopeSpec> for String {
    fn from(scope: ScopeSpec) -> Self {
        scope.to_string()
    }
}

impl fmt::Display for ScopeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Service(name) => f.write_str(name),
            Self::Tag(tag) => write!(f, "{TAG_SCOPE_PREFIX}{tag}"),
        }
    }
}
