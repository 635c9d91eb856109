//! Subscriber initialization with optional OTLP export (OpenTelemetry 0.31).

use once_cell::sync::OnceCell;
use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::error::ObservabilityError;

// Kept for flushing spans on shutdown
static TRACER_PROVIDER: OnceCell<SdkTracerProvider> = OnceCell::new();

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Install the global subscriber: env filter, console layer and, when an
/// endpoint is configured, an OTLP span exporter.
///
/// An exporter that fails to build degrades to console-only logging.
pub fn init(config: ObservabilityConfig) -> Result<(), ObservabilityError> {
    let env_filter = config
        .log_level
        .as_ref()
        .map(|level| EnvFilter::new(level.as_str()))
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.enable_console {
        let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
        layers.push(match config.log_format {
            LogFormat::Pretty => fmt.boxed(),
            LogFormat::Compact => fmt.compact().boxed(),
            LogFormat::Json => fmt.json().boxed(),
        });
    }

    let mut otlp_status = None;
    if let Some(endpoint) = &config.otlp_endpoint {
        match build_otlp_tracer_provider(&config, endpoint) {
            Ok((tracer, provider)) => {
                // Global provider must be set before the layer starts emitting
                global::set_tracer_provider(provider.clone());
                let _ = TRACER_PROVIDER.set(provider);
                layers.push(OpenTelemetryLayer::new(tracer).boxed());
                otlp_status = Some(Ok(endpoint.clone()));
            }
            Err(e) => otlp_status = Some(Err((endpoint.clone(), e))),
        }
    }

    Registry::default()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| ObservabilityError::AlreadyInitialized(e.to_string()))?;

    match otlp_status {
        Some(Ok(endpoint)) => tracing::info!(
            service.name = %config.service_name,
            otlp.endpoint = %endpoint,
            "OTLP tracing enabled"
        ),
        Some(Err((endpoint, e))) => tracing::warn!(
            service.name = %config.service_name,
            otlp.endpoint = %endpoint,
            error = %e,
            "OTLP export unavailable, logging to console only"
        ),
        None => tracing::debug!(
            service.name = %config.service_name,
            "tracing initialized without OTLP export"
        ),
    }

    Ok(())
}

fn build_otlp_tracer_provider(
    config: &ObservabilityConfig,
    endpoint: &str,
) -> Result<(opentelemetry_sdk::trace::SdkTracer, SdkTracerProvider), ObservabilityError> {
    let mut attributes = vec![KeyValue::new("service.name", config.service_name.clone())];
    if let Some(version) = &config.service_version {
        attributes.push(KeyValue::new("service.version", version.clone()));
    }
    for (key, value) in &config.resource_attributes {
        attributes.push(KeyValue::new(key.clone(), value.clone()));
    }
    // Resource constructors are private in 0.31; the builder is the public API
    let resource = Resource::builder().with_attributes(attributes).build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint.to_string())
        .build()
        .map_err(|e| ObservabilityError::Exporter(e.to_string()))?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer(config.service_name.clone());

    Ok((tracer, provider))
}

/// Flush and stop the OTLP exporter, if one was installed.
pub fn shutdown() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = %e, "tracer provider shutdown failed");
        }
    }
}
