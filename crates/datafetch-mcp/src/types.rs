//! Request and response types shared by the MCP tools and the HTTP API

use std::collections::BTreeMap;

use rmcp::ErrorData;
use rmcp::handler::server::wrapper::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{Error, Result};

/// Result type for MCP tool handlers returning structured JSON data
pub type ToolResult<T> = std::result::Result<Json<T>, ErrorData>;

/// Parameter bag passed to a remote operation. Keys iterate in sorted order.
pub type Params = BTreeMap<String, Value>;

/// One normalized record. Keys keep insertion order, so tabular column order
/// survives normalization.
pub type Record = serde_json::Map<String, Value>;

/// Request to invoke one named operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FetchRequest {
    /// Operation name from the catalog
    #[schemars(description = "Name of the catalog operation to invoke. Example: 'stock_zh_a_hist'")]
    pub operation: String,
    /// Operation parameters
    #[serde(default)]
    #[schemars(
        description = "Operation parameters. Dates use YYYYMMDD, e.g. {\"symbol\": \"000001\", \"end_date\": \"20240131\"}"
    )]
    pub params: Params,
    /// Caller-chosen correlation id, echoed in the response
    #[serde(default)]
    #[schemars(description = "Correlation id echoed back in the response")]
    pub request_id: Option<String>,
    /// Advisory timeout in seconds
    #[serde(default)]
    #[schemars(description = "Advisory timeout in seconds (recorded, not enforced)")]
    pub timeout: Option<u64>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(operation: impl Into<String>, params: Params) -> Self {
        Self {
            operation: operation.into(),
            params,
            request_id: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Some(timeout_secs);
        self
    }
}

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Validate a 1-based page and a page size in `1..=100`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` when either value is out of range.
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page < 1 {
            return Err(Error::InvalidRequest(format!(
                "page must be >= 1, got {page}"
            )));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::InvalidRequest(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {page_size}"
            )));
        }
        Ok(Self { page, page_size })
    }

    /// Build from optional values, applying defaults for missing ones.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` when a supplied value is out of range.
    pub fn from_optional(page: Option<u32>, page_size: Option<u32>) -> Result<Self> {
        Self::new(
            page.unwrap_or(DEFAULT_PAGE),
            page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }
}

/// Paginated, normalized response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PaginatedResult {
    /// Records on the requested page
    #[serde(rename = "data")]
    #[schemars(description = "Records on the requested page")]
    pub records: Vec<Record>,
    #[schemars(description = "Total number of records across all pages")]
    pub total_records: usize,
    #[schemars(description = "Requested page number, echoed back")]
    pub current_page: u32,
    #[schemars(description = "Total number of pages (at least 1)")]
    pub total_pages: usize,
    #[schemars(description = "Correlation id from the request")]
    pub request_id: Option<String>,
    /// Set when the fetch failed after all retries
    #[schemars(description = "Error message when the fetch failed, otherwise null")]
    pub error: Option<String>,
}

impl PaginatedResult {
    /// Structurally valid empty result carrying a fetch failure
    #[must_use]
    pub fn failed(page: PageRequest, request_id: Option<String>, error: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            total_records: 0,
            current_page: page.page(),
            total_pages: 1,
            request_id,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OperationInfo {
    #[schemars(description = "Operation name")]
    pub name: String,
    #[schemars(description = "What the operation returns")]
    pub description: String,
}

/// Catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OperationList {
    #[schemars(description = "Available operations sorted by name")]
    pub operations: Vec<OperationInfo>,
}

/// Service health
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResult {
    /// "ok" when the cache backend is usable
    #[schemars(description = "Service status: ok or degraded")]
    pub status: String,
    #[schemars(description = "Server version")]
    pub version: String,
    #[schemars(description = "Number of registered operations")]
    pub operations: usize,
}

/// Parameters for the `fetch_data` tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchDataParams {
    #[schemars(description = "Catalog operation name. Use list_operations to discover names")]
    pub operation: String,
    #[serde(default)]
    #[schemars(
        description = "Operation parameters. Dates use YYYYMMDD, e.g. {\"symbol\": \"000001\", \"end_date\": \"20240131\"}"
    )]
    pub params: Params,
    #[serde(default)]
    #[schemars(description = "Correlation id echoed back in the response")]
    pub request_id: Option<String>,
    #[serde(default)]
    #[schemars(description = "Advisory timeout in seconds")]
    pub timeout: Option<u64>,
    #[serde(default)]
    #[schemars(description = "1-based page number (default 1)")]
    pub page: Option<u32>,
    #[serde(default)]
    #[schemars(description = "Records per page, 1 to 100 (default 20)")]
    pub page_size: Option<u32>,
}

impl FetchDataParams {
    /// Split into the fetch request and a validated page window.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRequest` for out-of-range paging values.
    pub fn into_parts(self) -> Result<(FetchRequest, PageRequest)> {
        let page = PageRequest::from_optional(self.page, self.page_size)?;
        let request = FetchRequest {
            operation: self.operation,
            params: self.params,
            request_id: self.request_id,
            timeout: self.timeout,
        };
        Ok((request, page))
    }
}
