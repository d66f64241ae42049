mod gateway;
mod secrets;
mod server;
mod store;
mod telemetry;
mod usage;

pub use gateway::*;
pub use secrets::*;
pub use server::*;
pub use store::*;
pub use telemetry::*;
pub use usage::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration loaded from `tollgate.toml`.
///
/// Every section is optional; a missing file or an empty document yields a
/// gateway on `127.0.0.1:8787` backed by an empty in-memory store.
#[derive(Debug, Default, Deserialize)]
pub struct TollgateConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl TollgateConfig {
    pub fn from_toml(contents: &str) -> Result<Self, ServerError> {
        toml::from_str(contents).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read the file at `path`, or fall back to defaults when it does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)
        } else {
            Self::from_toml("")
        }
    }
}
