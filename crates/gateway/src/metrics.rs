use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::GatewayError;

/// Atomic counters tracking gateway request outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot). Counters never influence request
/// handling.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Requests received, including preflights.
    pub requests: AtomicU64,
    /// CORS preflights answered without authentication.
    pub preflights: AtomicU64,
    /// Requests forwarded to a backend and answered.
    pub forwarded: AtomicU64,
    /// Requests rejected with a 401.
    pub unauthenticated: AtomicU64,
    /// Requests rejected with a 403.
    pub forbidden: AtomicU64,
    /// Requests with no matching route, or no routes at all.
    pub route_misses: AtomicU64,
    /// Upstream calls that failed before a response arrived.
    pub upstream_errors: AtomicU64,
    /// Config store reads that failed.
    pub store_errors: AtomicU64,
    /// 3xx `Location` headers rewritten into the gateway's path space.
    pub redirects_rewritten: AtomicU64,
    /// Usage events accepted by the ingestion endpoint.
    pub usage_sent: AtomicU64,
    /// Usage events dropped (timeout, network error, non-2xx, panic).
    pub usage_dropped: AtomicU64,
}

impl GatewayMetrics {
    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_preflights(&self) {
        self.preflights.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_redirects_rewritten(&self) {
        self.redirects_rewritten.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_usage_sent(&self) {
        self.usage_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_usage_dropped(&self) {
        self.usage_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request that terminated with `err`.
    pub fn record_error(&self, err: &GatewayError) {
        let counter = match err {
            GatewayError::MissingCredential { .. }
            | GatewayError::InvalidCredential
            | GatewayError::CredentialExpired => &self.unauthenticated,
            GatewayError::PermissionDenied { .. } => &self.forbidden,
            GatewayError::RouteNotFound(_) | GatewayError::RoutesNotConfigured => {
                &self.route_misses
            }
            GatewayError::Upstream(_) => &self.upstream_errors,
            GatewayError::Store(_) => &self.store_errors,
            GatewayError::PayloadTooLarge { .. } | GatewayError::Configuration(_) => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            preflights: self.preflights.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            unauthenticated: self.unauthenticated.load(Ordering::Relaxed),
            forbidden: self.forbidden.load(Ordering::Relaxed),
            route_misses: self.route_misses.load(Ordering::Relaxed),
            upstream_errors: self.upstream_errors.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            redirects_rewritten: self.redirects_rewritten.load(Ordering::Relaxed),
            usage_sent: self.usage_sent.load(Ordering::Relaxed),
            usage_dropped: self.usage_dropped.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`GatewayMetrics`] at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub preflights: u64,
    pub forwarded: u64,
    pub unauthenticated: u64,
    pub forbidden: u64,
    pub route_misses: u64,
    pub upstream_errors: u64,
    pub store_errors: u64,
    pub redirects_rewritten: u64,
    pub usage_sent: u64,
    pub usage_dropped: u64,
}
