//! Cached, paginated, retry-resilient facade over a catalog of remote data
//! operations, served over MCP (stdio or HTTP) and a small REST API.

pub mod cache;
pub mod catalog;
pub mod config;
mod constants;
mod error;
pub mod fetch;
pub mod normalize;
pub mod observability;
pub mod paginate;
pub mod server;
pub mod service;
pub mod transport;
pub mod types;
pub mod warmup;

pub use cache::{
    CacheConfig, CacheError, CacheResult, CacheStats, CacheStore, CacheTtlConfig, DiskCache,
    Fingerprint, NoopCache, TracedCache, TtlPolicy, create_cache,
};
pub use catalog::{Operation, OperationRegistry, OperationSpec};
pub use config::{Config, ConfigBuilder, TelemetryConfig, TransportConfig, TransportMode};
pub use error::{Error, Result};
pub use fetch::{FetchResult, Fetcher, RetryPolicy, SizeGuard, WorkerPool};
pub use server::ServerHandler;
pub use service::DataService;
pub use types::*;
pub use warmup::{WarmupEntry, WarmupSchedule};
