use serde::Deserialize;

/// Which [`ConfigStore`](tollgate_store::ConfigStore) implementation backs
/// the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Redis,
}

/// Config store backend configuration.
///
/// # Example
///
/// ```toml
/// [store]
/// backend = "redis"
/// url = "redis://127.0.0.1:6379"
/// cache_ttl_seconds = 5
/// ```
#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON snapshot of the key namespace loaded into the memory backend.
    pub seed_path: Option<String>,
    /// Connection URL for the redis backend.
    #[serde(default = "default_store_url")]
    pub url: String,
    /// Key prefix for the redis backend.
    #[serde(default)]
    pub prefix: String,
    /// Redis connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// When non-zero, reads are cached for this many seconds.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
    /// Upper bound on cached keys.
    #[serde(default = "default_cache_capacity")]
    pub cache_max_entries: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            seed_path: None,
            url: default_store_url(),
            prefix: String::new(),
            pool_size: default_pool_size(),
            cache_ttl_seconds: 0,
            cache_max_entries: default_cache_capacity(),
        }
    }
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_owned()
}

fn default_pool_size() -> usize {
    10
}

fn default_cache_capacity() -> u64 {
    10_000
}
