//! Log subscriber and OpenTelemetry tracing initialization.
//!
//! Installs a [`tracing_subscriber`] registry with an `EnvFilter` (default
//! `info`), a text or JSON `fmt` layer and, when enabled, an OpenTelemetry
//! layer backed by an OTLP exporter.

use std::time::Duration;

use opentelemetry::trace::TracerProvider;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler, SdkTracerProvider};
use tracing::{Subscriber, info};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::TelemetryConfig;

/// Opaque handle returned by [`init`]. Dropping it is a no-op; call
/// [`TelemetryGuard::shutdown`] for a clean flush of pending spans.
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flush pending spans and shut down the exporter.
    pub fn shutdown(mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            tracing::warn!(error = %e, "OpenTelemetry tracer provider shutdown failed");
        }
    }
}

fn fmt_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    }
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

/// Initialize the tracing subscriber.
///
/// If the OTLP exporter fails to build (e.g. an invalid endpoint) the
/// server falls back to fmt-only logging and reports the error instead of
/// refusing to start.
pub fn init(config: &TelemetryConfig) -> TelemetryGuard {
    if !config.enabled {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer(config.json_logs))
            .init();
        return TelemetryGuard { provider: None };
    }

    global::set_text_map_propagator(opentelemetry_sdk::propagation::TraceContextPropagator::new());

    let exporter = match build_exporter(config) {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(fmt_layer(config.json_logs))
                .init();
            tracing::error!(
                error = %e,
                endpoint = %config.endpoint,
                protocol = %config.protocol,
                "failed to build OTLP exporter, falling back to fmt-only tracing"
            );
            return TelemetryGuard { provider: None };
        }
    };

    let mut resource_kvs = vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("process.pid", std::process::id().to_string()),
    ];
    if let Ok(hostname) = std::env::var("HOSTNAME").or_else(|_| std::env::var("HOST")) {
        resource_kvs.push(KeyValue::new("host.name", hostname));
    }
    for (k, v) in &config.resource_attributes {
        resource_kvs.push(KeyValue::new(k.clone(), v.clone()));
    }
    let resource = Resource::builder().with_attributes(resource_kvs).build();

    let provider = SdkTracerProvider::builder()
        .with_span_processor(BatchSpanProcessor::builder(exporter).build())
        .with_sampler(sampler(config.sample_ratio))
        .with_resource(resource)
        .build();
    global::set_tracer_provider(provider.clone());

    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer("tollgate"));
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer(config.json_logs))
        .with(otel_layer)
        .init();

    info!(
        endpoint = %config.endpoint,
        protocol = %config.protocol,
        sample_ratio = config.sample_ratio,
        "OpenTelemetry tracing enabled"
    );

    TelemetryGuard {
        provider: Some(provider),
    }
}

fn sampler(ratio: f64) -> Sampler {
    if (ratio - 1.0).abs() < f64::EPSILON {
        Sampler::AlwaysOn
    } else if ratio <= 0.0 {
        Sampler::AlwaysOff
    } else {
        Sampler::TraceIdRatioBased(ratio)
    }
}

fn build_exporter(
    config: &TelemetryConfig,
) -> Result<opentelemetry_otlp::SpanExporter, opentelemetry::trace::TraceError> {
    let timeout = Duration::from_secs(config.timeout_seconds);

    match config.protocol.as_str() {
        "http" => opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build(),
        "grpc" => opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(timeout)
            .build(),
        other => {
            tracing::warn!(protocol = %other, "unknown telemetry protocol, defaulting to gRPC");
            opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(&config.endpoint)
                .with_timeout(timeout)
                .build()
        }
    }
}
