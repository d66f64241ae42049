use serde::Deserialize;
use tollgate_gateway::{DEFAULT_USAGE_BASE_URL, UsageMode};

/// Usage reporting configuration.
#[derive(Debug, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Control-plane base URL; events are posted to `{base_url}/api/usage-log`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Upper bound on a single post, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub mode: UsageMode,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            mode: UsageMode::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_USAGE_BASE_URL.to_owned()
}

fn default_timeout() -> u64 {
    5
}
