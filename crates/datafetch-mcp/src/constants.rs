//! Constants for the data service

/// Service name used in tracing spans and MCP server info
pub const SERVICE_NAME: &str = "datafetch-mcp";

/// Caller identity for transports without authentication (stdio)
pub const SYSTEM_CALLER: &str = "_system";

/// Caller identity when an HTTP request carries no caller header
pub const ANONYMOUS_CALLER: &str = "anonymous";

/// Header carrying the caller identity on HTTP requests
pub const CALLER_ID_HEADER: &str = "x-caller-id";

/// Default page number (1-based)
pub const DEFAULT_PAGE: u32 = 1;

/// Default records per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Health status: success
pub const STATUS_OK: &str = "ok";
