//! TOML configuration file loading

use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::builder::{ConfigBuilder, TransportMode};
use crate::Result;
use crate::catalog::OperationSpec;
use crate::warmup::WarmupEntry;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./datafetch-mcp.toml",
    "~/.config/datafetch-mcp/config.toml",
    "/etc/datafetch-mcp/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(cache) = config.cache {
        if let Some(enabled) = cache.enabled {
            builder = builder.cache_enabled(enabled);
        }

        if let Some(dir) = cache.dir {
            builder = builder.cache_dir(dir);
        }

        if let Some(secs) = cache.historical_ttl_secs {
            builder = builder.historical_ttl(Duration::from_secs(secs));
        }

        if let Some(secs) = cache.volatile_ttl_secs {
            builder = builder.volatile_ttl(Duration::from_secs(secs));
        }
    }

    if let Some(fetch) = config.fetch {
        if let Some(workers) = fetch.workers
            && let Some(nz) = NonZeroUsize::new(workers)
        {
            builder = builder.workers(nz);
        }

        if let Some(attempts) = fetch.max_attempts
            && let Some(nz) = NonZeroU32::new(attempts)
        {
            builder = builder.max_attempts(nz);
        }

        if let Some(ms) = fetch.retry_delay_ms {
            builder = builder.retry_delay(Duration::from_millis(ms));
        }

        if let Some(bytes) = fetch.max_payload_bytes {
            builder = builder.max_payload_bytes(bytes);
        }
    }

    if let Some(transport) = config.transport {
        if let Some(mode_str) = transport.mode {
            let mode: TransportMode = mode_str.parse()?;
            builder = builder.transport_mode(mode);
        }

        if let Some(host_str) = transport.http_host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.http_host(host);
        }

        if let Some(port) = transport.http_port {
            builder = builder.http_port(port);
        }

        if let Some(token) = transport.bearer_token {
            builder = builder.bearer_token(Some(token));
        }

        if let Some(secs) = transport.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(obs) = config.observability {
        if let Some(endpoint) = obs.otlp_endpoint {
            builder = builder.otlp_endpoint(Some(endpoint));
        }

        if let Some(name) = obs.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    if !config.operations.is_empty() {
        builder = builder.operations(config.operations);
    }

    if !config.warmup.is_empty() {
        builder = builder.warmup(config.warmup);
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    cache: Option<CacheFileConfig>,
    fetch: Option<FetchFileConfig>,
    transport: Option<TransportFileConfig>,
    observability: Option<ObservabilityConfig>,
    #[serde(default)]
    operations: Vec<OperationSpec>,
    #[serde(default)]
    warmup: Vec<WarmupEntry>,
}

#[derive(Debug, Deserialize)]
struct CacheFileConfig {
    enabled: Option<bool>,
    dir: Option<PathBuf>,
    historical_ttl_secs: Option<u64>,
    volatile_ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FetchFileConfig {
    workers: Option<usize>,
    max_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
    max_payload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TransportFileConfig {
    mode: Option<String>,
    http_host: Option<String>,
    http_port: Option<u16>,
    bearer_token: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    otlp_endpoint: Option<String>,
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}
