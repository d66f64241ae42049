//! HTTP front end for the Tollgate edge gateway.
//!
//! Loads `tollgate.toml`, builds the config store and the gateway core, and
//! serves an axum router whose fallback proxies every request.

pub mod api;
pub mod config;
pub mod error;
pub mod gateway_factory;
pub mod store_factory;
pub mod telemetry;
