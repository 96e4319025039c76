//! Cache configuration types

use std::path::PathBuf;
use std::time::Duration;

/// Default cache root directory
pub const DEFAULT_CACHE_ROOT: &str = "./cache";

/// TTL granted to results whose date range is closed in the past: 30 days
pub const DEFAULT_HISTORICAL_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// TTL granted to undated or recent results: 1 day
pub const DEFAULT_VOLATILE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Age after which the maintenance sweep deletes entries: 30 days
pub const DEFAULT_CLEANUP_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cache TTL configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtlConfig {
    /// TTL for historical (closed date range) results
    pub historical: Duration,
    /// TTL for volatile (open or undated) results
    pub volatile: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheTtlConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            historical: DEFAULT_HISTORICAL_TTL,
            volatile: DEFAULT_VOLATILE_TTL,
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Directory holding one columnar file per fingerprint
    pub root: PathBuf,
    /// TTL configuration
    pub ttl: CacheTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from(DEFAULT_CACHE_ROOT),
            ttl: CacheTtlConfig::new(),
        }
    }
}
