//! Bounded pool for blocking operation calls

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Default number of concurrent blocking calls
pub const DEFAULT_WORKERS: usize = 8;

/// Runs blocking closures on the blocking thread pool, at most `width` at a time.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    width: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl WorkerPool {
    /// A width of zero is raised to one.
    #[must_use]
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            permits: Arc::new(Semaphore::new(width)),
            width,
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Calls currently holding a permit
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.width - self.permits.available_permits()
    }

    /// Run `f` once a permit is free.
    ///
    /// The permit travels with the closure, so dropping the returned future
    /// does not free the slot until the call itself finishes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Worker` if the call panics or the pool is closed.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| Error::Worker(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| Error::Worker(e.to_string()))
    }
}
