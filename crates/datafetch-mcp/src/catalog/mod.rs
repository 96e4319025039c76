//! Catalog of named remote operations
//!
//! Operation names are resolved against an explicit [`OperationRegistry`]
//! populated at startup. A name that is not registered fails with
//! [`Error::UnknownOperation`](crate::Error::UnknownOperation) before any
//! fetch is attempted.
//!
//! Operations are blocking: they are only ever invoked from the worker pool.

mod http;
mod registry;

pub use http::{HttpOperation, OperationSpec, ResponseFormat};
pub use registry::OperationRegistry;

use crate::fetch::FetchResult;
use crate::types::Params;

/// A named, parameterized data source
pub trait Operation: Send + Sync {
    /// Run the operation to completion on the calling thread.
    ///
    /// # Errors
    ///
    /// Any error is treated as transient and retried by the fetcher.
    fn invoke(&self, params: &Params) -> anyhow::Result<FetchResult>;

    /// Human-readable summary shown in catalog listings
    fn description(&self) -> &str {
        ""
    }
}

impl<F> Operation for F
where
    F: Fn(&Params) -> anyhow::Result<FetchResult> + Send + Sync,
{
    fn invoke(&self, params: &Params) -> anyhow::Result<FetchResult> {
        self(params)
    }
}

/// Closure operation with a catalog description
pub struct FnOperation<F> {
    description: String,
    f: F,
}

impl<F> FnOperation<F>
where
    F: Fn(&Params) -> anyhow::Result<FetchResult> + Send + Sync,
{
    pub fn new(description: impl Into<String>, f: F) -> Self {
        Self {
            description: description.into(),
            f,
        }
    }
}

impl<F> std::fmt::Debug for FnOperation<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnOperation")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(&Params) -> anyhow::Result<FetchResult> + Send + Sync,
{
    fn invoke(&self, params: &Params) -> anyhow::Result<FetchResult> {
        (self.f)(params)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
