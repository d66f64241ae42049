use thiserror::Error;

/// Errors that can occur when starting or running the Tollgate server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The config store could not be constructed.
    #[error("store error: {0}")]
    Store(#[from] tollgate_store::StoreError),

    /// The gateway rejected its configuration.
    #[error("gateway error: {0}")]
    Gateway(#[from] tollgate_gateway::GatewayError),
}
