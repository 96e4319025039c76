//! Cache store trait definition

use std::time::Duration;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use super::error::CacheResult;
use super::fingerprint::Fingerprint;

/// Cache statistics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub skipped_writes: u64,
    pub errors: u64,
}

/// Async store for tabular fetch results
///
/// Only tabular data is persisted. Freshness is decided by the caller-supplied
/// TTL at lookup time, not at write time, so one entry can be judged against
/// whatever policy applies when it is read.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the entry for `fingerprint` if present and younger than `ttl`
    async fn lookup(&self, fingerprint: &Fingerprint, ttl: Duration)
    -> CacheResult<Option<RecordBatch>>;

    /// Persist `batch`, replacing any previous entry. Returns `false` when the
    /// write was skipped because the batch holds no rows.
    async fn store(&self, fingerprint: &Fingerprint, batch: &RecordBatch) -> CacheResult<bool>;

    /// Delete the entry for `fingerprint`
    async fn remove(&self, fingerprint: &Fingerprint) -> CacheResult<bool>;

    /// Delete every entry last written more than `age` ago
    async fn purge_older_than(&self, age: Duration) -> CacheResult<u64>;

    /// Health check for the cache backend
    async fn health_check(&self) -> CacheResult<()>;

    /// Get cache statistics for observability
    async fn stats(&self) -> CacheStats;
}
