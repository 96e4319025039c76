//! Observability module for tracing, metrics, and logging
//!
//! Logs always go to stderr: stdout carries JSON-RPC in stdio mode.

#[cfg(feature = "metrics")]
mod metrics;

#[cfg(feature = "telemetry")]
mod telemetry;

#[cfg(feature = "metrics")]
pub use metrics::{
    init_metrics, record_cache_error, record_cache_hit, record_cache_miss, record_cache_write,
    record_fetch, record_payload_rejected, record_request, render_metrics, set_pool_stats,
};
#[cfg(feature = "telemetry")]
pub use telemetry::init_telemetry;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::Result;
use crate::config::TelemetryConfig;

/// Initialize observability stack
pub fn init_observability(config: &TelemetryConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    {
        init_metrics()?;
    }

    #[cfg(feature = "telemetry")]
    {
        init_telemetry(config)?;
    }

    #[cfg(not(feature = "telemetry"))]
    {
        init_basic_logging(config);
    }

    Ok(())
}

/// `RUST_LOG` when set, otherwise the configured level
fn env_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Plain or JSON formatter writing to stderr
fn stderr_layer<S>(config: &TelemetryConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    }
}

/// Initialize basic logging without OpenTelemetry
#[cfg(not(feature = "telemetry"))]
fn init_basic_logging(config: &TelemetryConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(stderr_layer(config))
        .init();
}

/// Shutdown observability stack
#[allow(clippy::missing_const_for_fn)]
pub fn shutdown_observability() {
    #[cfg(feature = "telemetry")]
    {
        telemetry::shutdown_telemetry();
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::Registry;

    use super::*;

    fn config(level: &str, json_logs: bool) -> TelemetryConfig {
        TelemetryConfig {
            otlp_endpoint: None,
            service_name: "datafetch-test".to_string(),
            log_level: level.to_string(),
            json_logs,
        }
    }

    #[test]
    fn test_telemetry_config_default() {
        let config = TelemetryConfig::default();
        assert!(config.otlp_endpoint.is_none());
        assert!(config.service_name.is_empty());
        assert!(config.log_level.is_empty());
        assert!(!config.json_logs);
    }

    #[test]
    fn test_env_filter_from_config_level() {
        let filter = env_filter(&config("warn", false));
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(filter.to_string(), "warn");
        }
    }

    #[test]
    fn test_stderr_layer_builds_both_formats() {
        let _plain: Box<dyn Layer<Registry> + Send + Sync> = stderr_layer(&config("info", false));
        let _json: Box<dyn Layer<Registry> + Send + Sync> = stderr_layer(&config("info", true));
    }

    #[test]
    fn test_shutdown_observability_no_panic() {
        shutdown_observability();
    }
}
