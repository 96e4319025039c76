//! Prometheus metrics for datafetch-mcp

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

// Server metrics
const METRIC_UPTIME: &str = "datafetch_mcp_uptime_seconds";
const METRIC_INFO: &str = "datafetch_mcp_info";
const METRIC_REQUESTS: &str = "datafetch_mcp_requests_total";
const METRIC_REQUEST_DURATION: &str = "datafetch_mcp_request_duration_seconds";

// Fetch metrics
const METRIC_FETCH_DURATION: &str = "datafetch_mcp_fetch_duration_seconds";
const METRIC_FETCH_TOTAL: &str = "datafetch_mcp_fetches_total";
const METRIC_FETCH_ATTEMPTS: &str = "datafetch_mcp_fetch_attempts_total";
const METRIC_PAYLOAD_REJECTED: &str = "datafetch_mcp_payload_rejected_total";

// Cache metrics
const METRIC_CACHE_HITS: &str = "datafetch_mcp_cache_hits_total";
const METRIC_CACHE_MISSES: &str = "datafetch_mcp_cache_misses_total";
const METRIC_CACHE_WRITES: &str = "datafetch_mcp_cache_writes_total";
const METRIC_CACHE_ERRORS: &str = "datafetch_mcp_cache_errors_total";

// Worker pool metrics
const METRIC_POOL_WORKERS: &str = "datafetch_mcp_pool_workers";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");
    describe_counter!(METRIC_REQUESTS, "Total data requests by outcome");
    describe_histogram!(METRIC_REQUEST_DURATION, "End-to-end request duration in seconds");

    describe_histogram!(
        METRIC_FETCH_DURATION,
        "Remote fetch duration in seconds, retries included"
    );
    describe_counter!(METRIC_FETCH_TOTAL, "Total remote fetches by outcome");
    describe_counter!(METRIC_FETCH_ATTEMPTS, "Total remote call attempts");
    describe_counter!(METRIC_PAYLOAD_REJECTED, "Fetched payloads rejected as too large");

    describe_counter!(METRIC_CACHE_HITS, "Total cache hits");
    describe_counter!(METRIC_CACHE_MISSES, "Total cache misses");
    describe_counter!(METRIC_CACHE_WRITES, "Total cache entries written");
    describe_counter!(METRIC_CACHE_ERRORS, "Cache read or write failures");

    describe_gauge!(METRIC_POOL_WORKERS, "Worker pool slots by state");

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record a finished data request.
pub fn record_request(operation: &str, outcome: &str, duration: Duration) {
    counter!(
        METRIC_REQUESTS,
        "operation" => operation.to_owned(),
        "outcome" => outcome.to_owned(),
    )
    .increment(1);
    histogram!(METRIC_REQUEST_DURATION, "outcome" => outcome.to_owned())
        .record(duration.as_secs_f64());
}

/// Record a remote fetch, successful or exhausted.
pub fn record_fetch(operation: &str, duration: Duration, attempts: u32, success: bool) {
    let status = if success { "success" } else { "error" };

    histogram!(METRIC_FETCH_DURATION, "operation" => operation.to_owned())
        .record(duration.as_secs_f64());
    counter!(
        METRIC_FETCH_TOTAL,
        "operation" => operation.to_owned(),
        "status" => status.to_owned(),
    )
    .increment(1);
    counter!(METRIC_FETCH_ATTEMPTS, "operation" => operation.to_owned())
        .increment(u64::from(attempts));
}

/// Record a payload rejected by the size guard.
pub fn record_payload_rejected(operation: &str) {
    counter!(METRIC_PAYLOAD_REJECTED, "operation" => operation.to_owned()).increment(1);
}

/// Record a cache hit.
pub fn record_cache_hit(freshness: &str) {
    counter!(METRIC_CACHE_HITS, "freshness" => freshness.to_owned()).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss(freshness: &str) {
    counter!(METRIC_CACHE_MISSES, "freshness" => freshness.to_owned()).increment(1);
}

/// Record a cache entry written.
pub fn record_cache_write() {
    counter!(METRIC_CACHE_WRITES).increment(1);
}

/// Record a swallowed cache failure.
pub fn record_cache_error(stage: &str) {
    counter!(METRIC_CACHE_ERRORS, "stage" => stage.to_owned()).increment(1);
}

/// Update worker pool gauges.
#[allow(clippy::cast_precision_loss)]
pub fn set_pool_stats(width: usize, in_flight: usize) {
    gauge!(METRIC_POOL_WORKERS, "state" => "max".to_owned()).set(width as f64);
    gauge!(METRIC_POOL_WORKERS, "state" => "in_use".to_owned()).set(in_flight as f64);
}
