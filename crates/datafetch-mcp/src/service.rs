//! Request orchestration: cache, fetch, guard, normalize, paginate

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::Instrument;

use crate::cache::{
    CacheStats, CacheStore, Fingerprint, Freshness, TtlPolicy, classify, create_cache,
};
use crate::catalog::OperationRegistry;
use crate::config::Config;
use crate::constants::STATUS_OK;
use crate::error::{Error, Result};
use crate::fetch::{FetchResult, Fetcher, RetryPolicy, SizeGuard, WorkerPool};
use crate::normalize::normalize;
use crate::paginate::paginate;
use crate::types::{FetchRequest, HealthResult, OperationInfo, PageRequest, PaginatedResult};

/// Shared request pipeline. Built once at startup and cloned as `Arc`.
pub struct DataService {
    registry: OperationRegistry,
    cache: Arc<dyn CacheStore>,
    ttl: TtlPolicy,
    fetcher: Fetcher,
    guard: SizeGuard,
}

impl fmt::Debug for DataService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataService")
            .field("registry", &self.registry)
            .field("cache", &"<CacheStore>")
            .field("ttl", &self.ttl)
            .field("fetcher", &self.fetcher)
            .field("guard", &self.guard)
            .finish()
    }
}

impl DataService {
    /// Service with default TTL, retry, pool, and size settings
    #[must_use]
    pub fn new(registry: OperationRegistry, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            registry,
            cache,
            ttl: TtlPolicy::default(),
            fetcher: Fetcher::default(),
            guard: SizeGuard::default(),
        }
    }

    /// Build the service described by `config`.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the operation catalog is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = OperationRegistry::from_catalog(&config.operations)?;
        let fetch = config.fetch();

        Ok(Self::new(registry, create_cache(config.cache()))
            .with_ttl(TtlPolicy::from_config(&config.cache.ttl))
            .with_fetcher(Fetcher::new(
                WorkerPool::new(fetch.workers.get()),
                RetryPolicy::new(fetch.max_attempts.get(), fetch.retry_delay),
            ))
            .with_guard(SizeGuard::new(fetch.max_payload_bytes)))
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    #[must_use]
    pub const fn with_guard(mut self, guard: SizeGuard) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Catalog entries sorted by name
    #[must_use]
    pub fn operations(&self) -> Vec<OperationInfo> {
        self.registry.list()
    }

    /// Serve one data request end to end.
    ///
    /// A fetch that fails on every attempt is not an error here: it yields an
    /// empty page with `error` set so callers always get a well-formed body.
    /// Cache failures degrade to a miss on read and are ignored on write.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownOperation` for names not in the catalog and
    /// `Error::PayloadTooLarge` when the fetched table exceeds the size guard.
    pub async fn handle_mcp_data_request(
        &self,
        request: FetchRequest,
        page: PageRequest,
        caller: &str,
    ) -> Result<PaginatedResult> {
        let span = tracing::info_span!(
            "data_request",
            request_id = request.request_id.as_deref().unwrap_or_default(),
            operation = %request.operation,
            caller,
            timeout = request.timeout,
            page = page.page(),
            page_size = page.page_size(),
        );

        let started = Instant::now();
        let operation = request.operation.clone();
        let result = self.process(request, page).instrument(span).await;

        #[cfg(feature = "metrics")]
        {
            let outcome = match &result {
                Ok(r) if r.is_error() => "fetch_failed",
                Ok(_) => "success",
                Err(e) if e.is_unknown_operation() => "unknown_operation",
                Err(e) if e.is_payload_too_large() => "payload_too_large",
                Err(_) => "error",
            };
            crate::observability::record_request(&operation, outcome, started.elapsed());
        }

        tracing::debug!(
            operation = %operation,
            elapsed_ms = started.elapsed().as_millis(),
            ok = result.is_ok(),
            "Data request finished"
        );

        result
    }

    async fn process(&self, request: FetchRequest, page: PageRequest) -> Result<PaginatedResult> {
        let FetchRequest {
            operation: name,
            params,
            request_id,
            ..
        } = request;

        let operation = self.registry.resolve(&name)?;

        let fingerprint = Fingerprint::new(&name, &params);
        let today = Local::now().date_naive();
        let freshness = classify(&params, today);
        let ttl = self.ttl.ttl_for_date(&params, today);

        let result = if let Some(batch) = self.cached(&fingerprint, ttl, freshness).await {
            tracing::info!(
                fingerprint = %fingerprint,
                freshness = freshness.as_str(),
                rows = batch.num_rows(),
                "Serving from cache"
            );
            FetchResult::Tabular(batch)
        } else {
            #[cfg(feature = "metrics")]
            let fetch_started = Instant::now();
            let fetched = match self
                .fetcher
                .fetch(&name, operation, Arc::new(params))
                .await
            {
                Ok(fetched) => fetched,
                Err(e @ Error::FetchFailed { .. }) => {
                    #[cfg(feature = "metrics")]
                    crate::observability::record_fetch(
                        &name,
                        fetch_started.elapsed(),
                        self.fetcher.policy().max_attempts(),
                        false,
                    );
                    tracing::error!(error = %e, "Fetch exhausted all attempts");
                    return Ok(PaginatedResult::failed(page, request_id, e.to_string()));
                }
                Err(e) => return Err(e),
            };

            #[cfg(feature = "metrics")]
            crate::observability::record_fetch(&name, fetched.elapsed, fetched.attempts, true);

            tracing::info!(
                attempts = fetched.attempts,
                elapsed_ms = fetched.elapsed.as_millis(),
                shape = fetched.result.shape(),
                "Fetched from remote"
            );

            if let Err(e) = self.guard.check(&fetched.result) {
                #[cfg(feature = "metrics")]
                crate::observability::record_payload_rejected(&name);
                tracing::warn!(error = %e, "Rejecting oversized payload");
                return Err(e);
            }

            if let Some(batch) = fetched.result.as_tabular() {
                self.remember(&fingerprint, batch).await;
            }

            fetched.result
        };

        let records = normalize(result);
        let page_out = paginate(records, page);

        Ok(PaginatedResult {
            records: page_out.records,
            total_records: page_out.total_records,
            current_page: page_out.current_page,
            total_pages: page_out.total_pages,
            request_id,
            error: None,
        })
    }

    async fn cached(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
        freshness: Freshness,
    ) -> Option<arrow::record_batch::RecordBatch> {
        match self.cache.lookup(fingerprint, ttl).await {
            Ok(Some(batch)) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_hit(freshness.as_str());
                Some(batch)
            }
            Ok(None) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_miss(freshness.as_str());
                None
            }
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_error("read");
                tracing::warn!(
                    fingerprint = %fingerprint,
                    freshness = freshness.as_str(),
                    error = %e,
                    "Cache read failed, treating as miss"
                );
                if e.is_corrupt() {
                    self.evict(fingerprint).await;
                }
                None
            }
        }
    }

    /// Drop an unreadable entry so a failed refetch cannot leave it behind
    async fn evict(&self, fingerprint: &Fingerprint) {
        match self.cache.remove(fingerprint).await {
            Ok(removed) => {
                tracing::debug!(fingerprint = %fingerprint, removed, "Evicted corrupt cache entry");
            }
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Cache eviction failed");
            }
        }
    }

    async fn remember(
        &self,
        fingerprint: &Fingerprint,
        batch: &arrow::record_batch::RecordBatch,
    ) {
        match self.cache.store(fingerprint, batch).await {
            Ok(true) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_write();
            }
            Ok(false) => {}
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_error("write");
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Cache write failed");
            }
        }
    }

    /// Delete cache entries older than `age`
    ///
    /// # Errors
    ///
    /// Returns `Error::Cache` if the cache directory cannot be listed.
    pub async fn purge_cache(&self, age: Duration) -> Result<u64> {
        Ok(self.cache.purge_older_than(age).await?)
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Liveness plus a cache backend probe
    pub async fn health(&self) -> HealthResult {
        #[cfg(feature = "metrics")]
        crate::observability::set_pool_stats(
            self.fetcher.pool().width(),
            self.fetcher.pool().in_flight(),
        );

        let status = match self.cache.health_check().await {
            Ok(()) => STATUS_OK.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Cache health check failed");
                "degraded".to_string()
            }
        };

        HealthResult {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            operations: self.registry.len(),
        }
    }
}
