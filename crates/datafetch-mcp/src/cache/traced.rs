//! Traced cache wrapper for observability

use std::time::Duration;

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use tracing::Instrument;

use super::error::CacheResult;
use super::fingerprint::Fingerprint;
use super::provider::{CacheStats, CacheStore};

/// Wrapper that adds tracing to any `CacheStore`
///
/// Spans are debug-level; fingerprints are opaque digests and safe to log.
pub struct TracedCache<C> {
    inner: C,
    service_name: String,
}

impl<C: std::fmt::Debug> std::fmt::Debug for TracedCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracedCache")
            .field("inner", &self.inner)
            .field("service_name", &self.service_name)
            .finish()
    }
}

impl<C: Clone> Clone for TracedCache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

impl<C> TracedCache<C> {
    pub fn new(cache: C, service_name: impl Into<String>) -> Self {
        Self {
            inner: cache,
            service_name: service_name.into(),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CacheStore> CacheStore for TracedCache<C> {
    async fn lookup(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
    ) -> CacheResult<Option<RecordBatch>> {
        let span = tracing::debug_span!(
            "cache.lookup",
            cache.fingerprint = %fingerprint,
            cache.ttl_secs = ttl.as_secs(),
            service.name = %self.service_name,
            otel.name = "cache.lookup",
        );

        let result = self.inner.lookup(fingerprint, ttl).instrument(span).await;

        match &result {
            Ok(Some(batch)) => {
                tracing::debug!(
                    cache.result = "hit",
                    cache.fingerprint = %fingerprint,
                    cache.rows = batch.num_rows(),
                );
            }
            Ok(None) => {
                tracing::debug!(cache.result = "miss", cache.fingerprint = %fingerprint);
            }
            Err(e) => {
                tracing::warn!(
                    cache.result = "error",
                    cache.fingerprint = %fingerprint,
                    error = %e,
                );
            }
        }

        result
    }

    async fn store(&self, fingerprint: &Fingerprint, batch: &RecordBatch) -> CacheResult<bool> {
        let span = tracing::debug_span!(
            "cache.store",
            cache.fingerprint = %fingerprint,
            cache.rows = batch.num_rows(),
            service.name = %self.service_name,
            otel.name = "cache.store",
        );

        let result = self.inner.store(fingerprint, batch).instrument(span).await;

        match &result {
            Ok(written) => {
                tracing::debug!(
                    cache.operation = "store",
                    cache.fingerprint = %fingerprint,
                    cache.written = written,
                );
            }
            Err(e) => {
                tracing::warn!(
                    cache.operation = "store",
                    cache.fingerprint = %fingerprint,
                    error = %e,
                );
            }
        }

        result
    }

    async fn remove(&self, fingerprint: &Fingerprint) -> CacheResult<bool> {
        let span = tracing::debug_span!(
            "cache.remove",
            cache.fingerprint = %fingerprint,
            otel.name = "cache.remove",
        );

        self.inner.remove(fingerprint).instrument(span).await
    }

    async fn purge_older_than(&self, age: Duration) -> CacheResult<u64> {
        let span = tracing::debug_span!(
            "cache.purge",
            cache.max_age_secs = age.as_secs(),
            otel.name = "cache.purge",
        );

        let result = self.inner.purge_older_than(age).instrument(span).await;

        match &result {
            Ok(count) => {
                tracing::info!(
                    cache.operation = "purge",
                    cache.deleted_count = count,
                    cache.max_age_secs = age.as_secs(),
                    "Cache purge complete"
                );
            }
            Err(e) => {
                tracing::warn!(cache.operation = "purge", error = %e);
            }
        }

        result
    }

    async fn health_check(&self) -> CacheResult<()> {
        let span = tracing::debug_span!("cache.health_check", otel.name = "cache.health_check");

        self.inner.health_check().instrument(span).await
    }

    async fn stats(&self) -> CacheStats {
        self.inner.stats().await
    }
}
