use std::collections::HashMap;

use serde::Deserialize;

/// Secret override bindings consulted before the config store.
///
/// # Example
///
/// ```toml
/// [secrets]
/// env_prefix = "TOLLGATE_SECRET_"
///
/// [secrets.overrides]
/// IMAGE_TOKEN = "local-dev-token"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct SecretsConfig {
    /// When set, `{env_prefix}{ref}` environment variables are consulted
    /// after the static overrides.
    pub env_prefix: Option<String>,
    /// Literal values keyed by secret reference name.
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}
