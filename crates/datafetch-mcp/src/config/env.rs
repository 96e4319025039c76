//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

use super::builder::{ConfigBuilder, TransportMode};
use crate::Result;

/// Environment variable names
mod vars {
    pub const MCP_CACHE_ENABLED: &str = "MCP_CACHE_ENABLED";
    pub const MCP_CACHE_DIR: &str = "MCP_CACHE_DIR";
    pub const MCP_CACHE_HISTORICAL_TTL_SECS: &str = "MCP_CACHE_HISTORICAL_TTL_SECS";
    pub const MCP_CACHE_VOLATILE_TTL_SECS: &str = "MCP_CACHE_VOLATILE_TTL_SECS";
    pub const MCP_FETCH_WORKERS: &str = "MCP_FETCH_WORKERS";
    pub const MCP_FETCH_MAX_ATTEMPTS: &str = "MCP_FETCH_MAX_ATTEMPTS";
    pub const MCP_FETCH_RETRY_DELAY_MS: &str = "MCP_FETCH_RETRY_DELAY_MS";
    pub const MCP_MAX_PAYLOAD_BYTES: &str = "MCP_MAX_PAYLOAD_BYTES";
    pub const MCP_TRANSPORT: &str = "MCP_TRANSPORT";
    pub const MCP_HTTP_HOST: &str = "MCP_HTTP_HOST";
    pub const MCP_HTTP_PORT: &str = "MCP_HTTP_PORT";
    pub const MCP_HTTP_BEARER_TOKEN: &str = "MCP_HTTP_BEARER_TOKEN";
    pub const OTEL_EXPORTER_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
    pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const MCP_JSON_LOGS: &str = "MCP_JSON_LOGS";
}

/// Load configuration from environment variables.
///
/// Unparseable numeric values are ignored and keep the previous setting.
///
/// # Errors
///
/// Returns `Error::Config` if `MCP_TRANSPORT` names an unknown transport.
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    // Cache
    if let Ok(val) = env::var(vars::MCP_CACHE_ENABLED) {
        builder = builder.cache_enabled(parse_bool(&val));
    }

    if let Ok(dir) = env::var(vars::MCP_CACHE_DIR) {
        builder = builder.cache_dir(dir);
    }

    if let Some(secs) = parse_var::<u64>(vars::MCP_CACHE_HISTORICAL_TTL_SECS) {
        builder = builder.historical_ttl(Duration::from_secs(secs));
    }

    if let Some(secs) = parse_var::<u64>(vars::MCP_CACHE_VOLATILE_TTL_SECS) {
        builder = builder.volatile_ttl(Duration::from_secs(secs));
    }

    // Fetch
    if let Some(workers) = parse_var::<usize>(vars::MCP_FETCH_WORKERS)
        && let Some(nz) = NonZeroUsize::new(workers)
    {
        builder = builder.workers(nz);
    }

    if let Some(attempts) = parse_var::<u32>(vars::MCP_FETCH_MAX_ATTEMPTS)
        && let Some(nz) = NonZeroU32::new(attempts)
    {
        builder = builder.max_attempts(nz);
    }

    if let Some(ms) = parse_var::<u64>(vars::MCP_FETCH_RETRY_DELAY_MS) {
        builder = builder.retry_delay(Duration::from_millis(ms));
    }

    if let Some(bytes) = parse_var::<usize>(vars::MCP_MAX_PAYLOAD_BYTES) {
        builder = builder.max_payload_bytes(bytes);
    }

    // Transport
    if let Ok(transport) = env::var(vars::MCP_TRANSPORT) {
        let mode: TransportMode = transport.parse()?;
        builder = builder.transport_mode(mode);
    }

    if let Some(host) = parse_var::<IpAddr>(vars::MCP_HTTP_HOST) {
        builder = builder.http_host(host);
    }

    if let Some(port) = parse_var::<u16>(vars::MCP_HTTP_PORT) {
        builder = builder.http_port(port);
    }

    if let Ok(token) = env::var(vars::MCP_HTTP_BEARER_TOKEN) {
        builder = builder.bearer_token(Some(token));
    }

    // Telemetry
    if let Ok(endpoint) = env::var(vars::OTEL_EXPORTER_OTLP_ENDPOINT) {
        builder = builder.otlp_endpoint(Some(endpoint));
    }

    if let Ok(name) = env::var(vars::OTEL_SERVICE_NAME) {
        builder = builder.service_name(name);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::MCP_JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.trim().parse().ok()
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
