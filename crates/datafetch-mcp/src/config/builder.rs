//! Configuration builder

use std::net::{IpAddr, Ipv4Addr};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;
use crate::cache::CacheConfig;
use crate::catalog::OperationSpec;
use crate::constants::SERVICE_NAME;
use crate::fetch::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_RETRY_DELAY, DEFAULT_WORKERS,
};
use crate::warmup::WarmupEntry;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub transport: TransportConfig,
    pub telemetry: TelemetryConfig,
    pub operations: Vec<OperationSpec>,
    /// Requests replayed by the `warm` command
    pub warmup: Vec<WarmupEntry>,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    #[must_use]
    pub const fn fetch(&self) -> &FetchConfig {
        &self.fetch
    }
}

/// Fetch pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Concurrent blocking calls
    pub workers: NonZeroUsize,
    /// Attempts per fetch, including the first
    pub max_attempts: NonZeroU32,
    /// Fixed wait between attempts
    pub retry_delay: Duration,
    /// Size guard ceiling in bytes
    pub max_payload_bytes: usize,
}

impl FetchConfig {
    const DEFAULT_WORKERS: NonZeroUsize = match NonZeroUsize::new(DEFAULT_WORKERS) {
        Some(n) => n,
        None => NonZeroUsize::MIN,
    };
    const DEFAULT_MAX_ATTEMPTS: NonZeroU32 = match NonZeroU32::new(DEFAULT_MAX_ATTEMPTS) {
        Some(n) => n,
        None => NonZeroU32::MIN,
    };

    #[must_use]
    pub const fn new() -> Self {
        Self {
            workers: Self::DEFAULT_WORKERS,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport mode configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub http_host: IpAddr,
    pub http_port: u16,
    /// Shared secret required as `Authorization: Bearer <token>` when set
    pub bearer_token: Option<String>,
    /// Upper bound on one HTTP request, end to end
    pub request_timeout: Duration,
}

impl TransportConfig {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: TransportMode::Stdio,
            http_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: Self::DEFAULT_PORT,
            bearer_token: None,
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Transport mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Stdio,
    Http,
}

impl FromStr for TransportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" | "rest" => Ok(Self::Http),
            other => Err(Error::Config(format!(
                "unknown transport '{other}', expected 'stdio' or 'http'"
            ))),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    cache: CacheConfig,
    fetch: FetchConfig,
    transport: TransportConfig,
    telemetry: TelemetryConfig,
    operations: Vec<OperationSpec>,
    warmup: Vec<WarmupEntry>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: CacheConfig::default(),
            fetch: FetchConfig::new(),
            transport: TransportConfig::new(),
            telemetry: TelemetryConfig::default(),
            operations: Vec::new(),
            warmup: Vec::new(),
        }
    }

    // Cache

    /// Enable or disable the result cache (enabled by default)
    #[must_use]
    pub const fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache.root = root.into();
        self
    }

    /// TTL for results with a closed historical date range
    #[must_use]
    pub const fn historical_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl.historical = ttl;
        self
    }

    /// TTL for undated or recent results
    #[must_use]
    pub const fn volatile_ttl(mut self, ttl: Duration) -> Self {
        self.cache.ttl.volatile = ttl;
        self
    }

    // Fetch

    #[must_use]
    pub const fn workers(mut self, workers: NonZeroUsize) -> Self {
        self.fetch.workers = workers;
        self
    }

    #[must_use]
    pub const fn max_attempts(mut self, attempts: NonZeroU32) -> Self {
        self.fetch.max_attempts = attempts;
        self
    }

    #[must_use]
    pub const fn retry_delay(mut self, delay: Duration) -> Self {
        self.fetch.retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn max_payload_bytes(mut self, bytes: usize) -> Self {
        self.fetch.max_payload_bytes = bytes;
        self
    }

    // Transport

    #[must_use]
    pub const fn transport_mode(mut self, mode: TransportMode) -> Self {
        self.transport.mode = mode;
        self
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.transport.http_host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.transport.http_port = port;
        self
    }

    #[must_use]
    pub fn bearer_token(mut self, token: Option<String>) -> Self {
        self.transport.bearer_token = token;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.transport.request_timeout = timeout;
        self
    }

    // Telemetry

    #[must_use]
    pub fn otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.telemetry.otlp_endpoint = endpoint;
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: String) -> Self {
        self.telemetry.service_name = name;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    // Catalog

    /// Add one operation to the catalog
    #[must_use]
    pub fn operation(mut self, spec: OperationSpec) -> Self {
        self.operations.push(spec);
        self
    }

    /// Replace the catalog
    #[must_use]
    pub fn operations(mut self, specs: Vec<OperationSpec>) -> Self {
        self.operations = specs;
        self
    }

    // Warm-up

    #[must_use]
    pub fn warmup_entry(mut self, entry: WarmupEntry) -> Self {
        self.warmup.push(entry);
        self
    }

    /// Replace the warm-up list
    #[must_use]
    pub fn warmup(mut self, entries: Vec<WarmupEntry>) -> Self {
        self.warmup = entries;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        if self.fetch.max_payload_bytes == 0 {
            return Err(Error::Config("max_payload_bytes must be greater than 0".into()));
        }

        if self.cache.enabled && self.cache.root.as_os_str().is_empty() {
            return Err(Error::Config("cache directory must not be empty".into()));
        }

        let bearer_token = match self.transport.bearer_token {
            Some(token) if token.trim().is_empty() => {
                return Err(Error::Config("bearer token must not be empty".into()));
            }
            other => other,
        };

        for spec in &self.operations {
            if spec.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "operation with url '{}' has an empty name",
                    spec.url
                )));
            }
        }

        if self.warmup.iter().any(|e| e.operation.trim().is_empty()) {
            return Err(Error::Config("warm-up entry has an empty operation".into()));
        }

        // Apply defaults for telemetry
        let service_name = if self.telemetry.service_name.is_empty() {
            SERVICE_NAME.to_string()
        } else {
            self.telemetry.service_name
        };

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            cache: self.cache,
            fetch: self.fetch,
            transport: TransportConfig {
                bearer_token,
                ..self.transport
            },
            telemetry: TelemetryConfig {
                otlp_endpoint: self.telemetry.otlp_endpoint,
                service_name,
                log_level,
                json_logs: self.telemetry.json_logs,
            },
            operations: self.operations,
            warmup: self.warmup,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();

        assert!(config.cache.enabled);
        assert_eq!(config.cache.root, PathBuf::from("./cache"));
        assert_eq!(config.cache.ttl.historical, Duration::from_secs(30 * 86_400));
        assert_eq!(config.cache.ttl.volatile, Duration::from_secs(86_400));
        assert_eq!(config.fetch.workers.get(), 8);
        assert_eq!(config.fetch.max_attempts.get(), 3);
        assert_eq!(config.fetch.retry_delay, Duration::from_secs(1));
        assert_eq!(config.fetch.max_payload_bytes, 10 * 1024 * 1024);
        assert!(config.operations.is_empty());
    }

    #[test]
    fn test_builder_cache_settings() {
        let config = ConfigBuilder::new()
            .cache_enabled(false)
            .cache_dir("/var/cache/datafetch")
            .historical_ttl(Duration::from_secs(3600))
            .volatile_ttl(Duration::from_secs(60))
            .build()
            .unwrap();

        assert!(!config.cache().enabled);
        assert_eq!(config.cache.root, PathBuf::from("/var/cache/datafetch"));
        assert_eq!(config.cache.ttl.historical, Duration::from_secs(3600));
        assert_eq!(config.cache.ttl.volatile, Duration::from_secs(60));
    }

    #[test]
    fn test_builder_fetch_settings() {
        let config = ConfigBuilder::new()
            .workers(NonZeroUsize::new(2).unwrap())
            .max_attempts(NonZeroU32::new(5).unwrap())
            .retry_delay(Duration::from_millis(250))
            .max_payload_bytes(1024)
            .build()
            .unwrap();

        assert_eq!(
            *config.fetch(),
            FetchConfig {
                workers: NonZeroUsize::new(2).unwrap(),
                max_attempts: NonZeroU32::new(5).unwrap(),
                retry_delay: Duration::from_millis(250),
                max_payload_bytes: 1024,
            }
        );
    }

    #[test]
    fn test_builder_rejects_zero_payload() {
        let err = ConfigBuilder::new().max_payload_bytes(0).build().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_builder_rejects_empty_cache_dir() {
        assert!(ConfigBuilder::new().cache_dir("").build().is_err());
        assert!(
            ConfigBuilder::new()
                .cache_enabled(false)
                .cache_dir("")
                .build()
                .is_ok()
        );
    }

    #[test]
    fn test_builder_rejects_blank_bearer_token() {
        let err = ConfigBuilder::new()
            .bearer_token(Some("  ".to_string()))
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_builder_rejects_unnamed_operation() {
        let err = ConfigBuilder::new()
            .operation(OperationSpec::new("", "http://localhost/x"))
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_builder_operations() {
        let config = ConfigBuilder::new()
            .operation(OperationSpec::new("a", "http://localhost/a"))
            .operation(OperationSpec::new("b", "http://localhost/b"))
            .build()
            .unwrap();
        assert_eq!(config.operations.len(), 2);

        let replaced = ConfigBuilder::new()
            .operation(OperationSpec::new("a", "http://localhost/a"))
            .operations(vec![OperationSpec::new("c", "http://localhost/c")])
            .build()
            .unwrap();
        assert_eq!(replaced.operations[0].name, "c");
    }

    #[test]
    fn test_builder_warmup() {
        let config = ConfigBuilder::new()
            .warmup_entry(WarmupEntry::new("a", crate::types::Params::new()))
            .warmup_entry(WarmupEntry::new("b", crate::types::Params::new()).weekly())
            .build()
            .unwrap();
        assert_eq!(config.warmup.len(), 2);
        assert!(ConfigBuilder::new().build().unwrap().warmup.is_empty());

        let err = ConfigBuilder::new()
            .warmup(vec![WarmupEntry::new(" ", crate::types::Params::new())])
            .build()
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_transport_mode_parsing() {
        assert_eq!(
            "stdio".parse::<TransportMode>().unwrap(),
            TransportMode::Stdio
        );
        assert_eq!(
            "http".parse::<TransportMode>().unwrap(),
            TransportMode::Http
        );
        assert_eq!(
            "HTTP".parse::<TransportMode>().unwrap(),
            TransportMode::Http
        );
        assert_eq!(
            " Stdio ".parse::<TransportMode>().unwrap(),
            TransportMode::Stdio
        );
    }

    #[test]
    fn test_unknown_transport_mode_rejected() {
        let err = "htpp".parse::<TransportMode>().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("htpp"));
        assert!("".parse::<TransportMode>().is_err());
    }

    #[test]
    fn test_builder_transport() {
        let config = ConfigBuilder::new()
            .transport_mode(TransportMode::Http)
            .http_host(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .http_port(9000)
            .bearer_token(Some("secret".to_string()))
            .request_timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        assert_eq!(config.transport.mode, TransportMode::Http);
        assert_eq!(config.transport.http_host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.transport.http_port, 9000);
        assert_eq!(config.transport.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.transport.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_transport_config_default() {
        let transport = TransportConfig::default();
        assert_eq!(transport.mode, TransportMode::Stdio);
        assert_eq!(transport.http_port, 8080);
        assert!(transport.bearer_token.is_none());
    }

    #[test]
    fn test_builder_telemetry_config() {
        let config = ConfigBuilder::new()
            .otlp_endpoint(Some("http://localhost:4317".to_string()))
            .service_name("test-service".to_string())
            .log_level("debug".to_string())
            .json_logs(true)
            .build()
            .unwrap();

        assert_eq!(
            config.telemetry.otlp_endpoint,
            Some("http://localhost:4317".to_string())
        );
        assert_eq!(config.telemetry.service_name, "test-service");
        assert_eq!(config.telemetry.log_level, "debug");
        assert!(config.telemetry.json_logs);
    }

    #[test]
    fn test_builder_telemetry_defaults() {
        let config = ConfigBuilder::new().build().unwrap();

        assert!(config.telemetry.otlp_endpoint.is_none());
        assert_eq!(config.telemetry.service_name, "datafetch-mcp");
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.telemetry.json_logs);
    }

    #[test]
    fn test_builder_debug() {
        let builder = ConfigBuilder::default();
        assert!(format!("{builder:?}").contains("ConfigBuilder"));
        let config = Config::builder().build().unwrap();
        assert!(format!("{config:?}").contains("FetchConfig"));
    }
}
