//! OpenTelemetry initialization

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::{env_filter, stderr_layer};
use crate::Result;
use crate::config::TelemetryConfig;

static TRACER_PROVIDER: std::sync::OnceLock<SdkTracerProvider> = std::sync::OnceLock::new();

/// Initialize logging plus an OTLP span exporter when an endpoint is set
pub fn init_telemetry(config: &TelemetryConfig) -> Result<()> {
    // Build subscriber with optional OTLP layer
    if let Some(ref endpoint) = config.otlp_endpoint {
        let resource = Resource::builder()
            .with_service_name(config.service_name.clone())
            .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
            .with_attribute(KeyValue::new("service.namespace", "datafetch"))
            .build();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .map_err(|e| crate::Error::Config(format!("Failed to create OTLP exporter: {e}")))?;

        let provider = SdkTracerProvider::builder()
            .with_resource(resource)
            .with_batch_exporter(exporter)
            .build();

        let tracer = provider.tracer(config.service_name.clone());

        // Store provider for shutdown
        let _ = TRACER_PROVIDER.set(provider);

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(stderr_layer(config))
            .with(otel_layer)
            .init();

        tracing::info!("OpenTelemetry initialized with endpoint: {}", endpoint);
    } else {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(stderr_layer(config))
            .init();

        tracing::debug!("OpenTelemetry disabled (no endpoint configured)");
    }

    Ok(())
}

/// Shutdown OpenTelemetry and flush pending traces
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::warn!("Failed to shutdown tracer provider: {e:?}");
    }
}
