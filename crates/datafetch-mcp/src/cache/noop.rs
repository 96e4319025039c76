//! No-op cache implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use super::error::CacheResult;
use super::fingerprint::Fingerprint;
use super::provider::{CacheStats, CacheStore};

/// No-op cache that never stores
///
/// Used for testing and when caching is disabled.
#[derive(Debug, Clone, Default)]
pub struct NoopCache {
    misses: Arc<AtomicU64>,
}

impl NoopCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for NoopCache {
    async fn lookup(
        &self,
        _fingerprint: &Fingerprint,
        _ttl: Duration,
    ) -> CacheResult<Option<RecordBatch>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn store(&self, _fingerprint: &Fingerprint, _batch: &RecordBatch) -> CacheResult<bool> {
        Ok(false)
    }

    async fn remove(&self, _fingerprint: &Fingerprint) -> CacheResult<bool> {
        Ok(false)
    }

    async fn purge_older_than(&self, _age: Duration) -> CacheResult<u64> {
        Ok(0)
    }

    async fn health_check(&self) -> CacheResult<()> {
        Ok(())
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        }
    }
}
