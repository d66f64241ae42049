use std::fmt;

/// A key in the gateway's config namespace.
///
/// The control plane publishes exactly three shapes of key; the canonical
/// string form is what appears in the underlying key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// `token:<credential_hash>` -> `TokenRecord` JSON.
    Token(String),
    /// `routes` -> the full route table.
    Routes,
    /// `secret:<ref_name>` -> secret value.
    Secret(String),
}

impl StoreKey {
    pub const TOKEN_PREFIX: &'static str = "token:";
    pub const ROUTES: &'static str = "routes";
    pub const SECRET_PREFIX: &'static str = "secret:";

    pub fn token(credential_hash: impl Into<String>) -> Self {
        Self::Token(credential_hash.into())
    }

    pub fn secret(ref_name: impl Into<String>) -> Self {
        Self::Secret(ref_name.into())
    }

    /// Render the key as it is stored, e.g. `token:ab12...`.
    pub fn canonical(&self) -> String {
        match self {
            Self::Token(hash) => format!("{}{hash}", Self::TOKEN_PREFIX),
            Self::Routes => Self::ROUTES.to_owned(),
            Self::Secret(name) => format!("{}{name}", Self::SECRET_PREFIX),
        }
    }

    /// Parse a canonical key string. Returns `None` for keys outside the
    /// gateway namespace.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == Self::ROUTES {
            Some(Self::Routes)
        } else if let Some(hash) = raw.strip_prefix(Self::TOKEN_PREFIX) {
            Some(Self::token(hash))
        } else {
            raw.strip_prefix(Self::SECRET_PREFIX).map(Self::secret)
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}
