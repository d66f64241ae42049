use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One best-effort telemetry record describing a single gateway request.
///
/// Built once per request after the response is known, posted once to the
/// usage ingestion endpoint and then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub credential_hash: String,
    /// Matched route prefix, or the raw request path when nothing matched.
    pub route_path: String,
    /// When the request was received, serialized as Unix epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub response_status: u16,
    pub response_time_ms: u64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_method: String,
    pub error_message: Option<String>,
}
