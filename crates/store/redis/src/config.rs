use std::time::Duration;

/// Configuration for the Redis config store backend.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g. `redis://127.0.0.1:6379`).
    pub url: String,

    /// Optional namespace prepended to every key as `prefix:`. Empty means
    /// keys are read exactly as the control plane writes them.
    pub prefix: String,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for acquiring a pooled connection.
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            prefix: String::new(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}
