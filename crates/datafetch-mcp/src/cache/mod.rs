//! Result cache for remote data operations
//!
//! Tabular results are persisted per `(operation, params)` fingerprint and
//! judged fresh against a content-aware TTL at lookup time.
//!
//! # Available Backends
//!
//! - [`NoopCache`] - No-op implementation (caching disabled)
//! - [`DiskCache`] - One Arrow IPC file per fingerprint under a root directory
//!
//! # Observability
//!
//! Wrap any cache with [`TracedCache`] to add tracing spans and logging.
//!
//! # Freshness
//!
//! [`TtlPolicy`] grants a long TTL to queries whose `end_date` (or `date`)
//! lies strictly before yesterday and a short one to everything else. Entry
//! age is the file's modification time, so an external sweep such as
//! [`CacheStore::purge_older_than`] can run without coordinating with
//! readers.
//!
//! # Concurrency
//!
//! Concurrent misses for the same fingerprint each fetch and each write; the
//! rename of a unique temp file makes the last writer win and readers never
//! see a torn entry.

mod config;
mod disk;
mod error;
mod fingerprint;
mod noop;
mod provider;
mod traced;
mod ttl;

use std::sync::Arc;

pub use config::{
    CacheConfig, CacheTtlConfig, DEFAULT_CACHE_ROOT, DEFAULT_CLEANUP_AGE, DEFAULT_HISTORICAL_TTL,
    DEFAULT_VOLATILE_TTL,
};
pub use disk::{DiskCache, ENTRY_EXTENSION};
pub use error::{CacheError, CacheResult};
pub use fingerprint::{Fingerprint, canonical_params};
pub use noop::NoopCache;
pub use provider::{CacheStats, CacheStore};
pub use traced::TracedCache;
pub use ttl::{Freshness, TtlPolicy, classify};

/// Create a cache store based on configuration
#[must_use]
pub fn create_cache(config: &CacheConfig) -> Arc<dyn CacheStore> {
    if !config.enabled {
        return Arc::new(NoopCache::new());
    }

    Arc::new(TracedCache::new(
        DiskCache::new(config.root.clone()),
        crate::constants::SERVICE_NAME,
    ))
}
