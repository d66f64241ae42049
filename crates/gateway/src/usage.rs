use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use tollgate_core::UsageEvent;

use crate::error::GatewayError;
use crate::metrics::GatewayMetrics;

/// Path the usage ingestion service accepts events on.
pub const INGEST_PATH: &str = "/api/usage-log";

/// Hard deadline for a single usage post.
pub const DEFAULT_USAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where usage posts run relative to the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageMode {
    /// Detached task that outlives the response; drained on shutdown.
    #[default]
    Background,
    /// Awaited before the response is returned, under the same deadline.
    Foreground,
}

/// Best-effort, fire-and-forget emission of [`UsageEvent`]s.
///
/// Each event is posted once. Timeouts, network errors, non-2xx answers and
/// panics inside the post are logged and dropped; nothing is retried and
/// nothing reaches the caller.
pub struct UsageReporter {
    client: Client,
    endpoint: Arc<str>,
    timeout: Duration,
    mode: UsageMode,
    tracker: TaskTracker,
    metrics: Arc<GatewayMetrics>,
}

impl UsageReporter {
    /// Create a reporter posting to `{base_url}/api/usage-log`.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        mode: UsageMode,
        metrics: Arc<GatewayMetrics>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::Configuration(format!("failed to build usage client: {e}"))
        })?;
        let endpoint = format!("{}{INGEST_PATH}", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
            mode,
            tracker: TaskTracker::new(),
            metrics,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mode(&self) -> UsageMode {
        self.mode
    }

    /// Background tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Emit one event. In background mode this returns immediately.
    pub async fn report(&self, event: UsageEvent) {
        let client = self.client.clone();
        let endpoint = Arc::clone(&self.endpoint);
        let metrics = Arc::clone(&self.metrics);
        let timeout = self.timeout;
        let send = async move { send_bounded(&client, &endpoint, timeout, &event, &metrics).await };

        match self.mode {
            UsageMode::Background => {
                self.tracker.spawn(send);
            }
            UsageMode::Foreground => send.await,
        }
    }

    /// Wait for every in-flight background post to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

async fn send_bounded(
    client: &Client,
    endpoint: &str,
    timeout: Duration,
    event: &UsageEvent,
    metrics: &GatewayMetrics,
) {
    let post = AssertUnwindSafe(post(client, endpoint, event)).catch_unwind();
    match tokio::time::timeout(timeout, post).await {
        Ok(Ok(Ok(()))) => {
            metrics.increment_usage_sent();
            debug!(route = %event.route_path, "usage event delivered");
        }
        Ok(Ok(Err(e))) => {
            metrics.increment_usage_dropped();
            warn!(error = %e.without_url(), "usage event rejected");
        }
        Ok(Err(_)) => {
            metrics.increment_usage_dropped();
            warn!("usage reporting panicked");
        }
        Err(_) => {
            metrics.increment_usage_dropped();
            warn!(?timeout, "usage reporting timed out");
        }
    }
}

async fn post(client: &Client, endpoint: &str, event: &UsageEvent) -> Result<(), reqwest::Error> {
    client
        .post(endpoint)
        .json(event)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
