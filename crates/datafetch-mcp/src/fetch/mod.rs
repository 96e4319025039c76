//! Fetching: result shapes, the worker pool, retry, and the size guard

mod guard;
mod pool;
mod result;
mod retry;

pub use guard::{DEFAULT_MAX_PAYLOAD_BYTES, SizeGuard};
pub use pool::{DEFAULT_WORKERS, WorkerPool};
pub use result::FetchResult;
pub use retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, Fetched, Fetcher, RetryPolicy};
