use rmcp::ErrorData;
use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Operation '{operation}' failed after {attempts} attempt(s): {message}")]
    FetchFailed {
        operation: String,
        attempts: u32,
        message: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Worker pool error: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl Error {
    #[must_use]
    pub const fn is_unknown_operation(&self) -> bool {
        matches!(self, Self::UnknownOperation(_))
    }

    #[must_use]
    pub const fn is_payload_too_large(&self) -> bool {
        matches!(self, Self::PayloadTooLarge { .. })
    }

    #[must_use]
    pub const fn is_fetch_failed(&self) -> bool {
        matches!(self, Self::FetchFailed { .. })
    }

    #[must_use]
    pub const fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Client errors the caller can fix by changing the request
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownOperation(_) | Self::PayloadTooLarge { .. } | Self::InvalidRequest(_)
        )
    }

    /// HTTP status code for this error when surfaced over the REST endpoint
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::UnknownOperation(_) => 404,
            Self::PayloadTooLarge { .. } => 413,
            Self::InvalidRequest(_) => 400,
            Self::FetchFailed { .. }
            | Self::Worker(_)
            | Self::Config(_)
            | Self::Transport(_)
            | Self::Cache(_) => 500,
        }
    }
}

/// Convert our Error type to rmcp `ErrorData`
impl From<Error> for ErrorData {
    fn from(err: Error) -> Self {
        match err {
            Error::UnknownOperation(name) => {
                Self::invalid_params(format!("Unknown operation: '{name}'"), None)
            }
            Error::PayloadTooLarge { size, max } => Self::invalid_params(
                format!("Payload too large: {size} bytes exceeds limit of {max} bytes"),
                None,
            ),
            Error::InvalidRequest(msg) => {
                Self::invalid_params(format!("Invalid request: {msg}"), None)
            }
            Error::Config(msg) => Self::invalid_params(format!("Configuration error: {msg}"), None),
            err @ Error::FetchFailed { .. } => Self::internal_error(err.to_string(), None),
            Error::Worker(msg) => Self::internal_error(format!("Worker pool error: {msg}"), None),
            Error::Transport(msg) => Self::internal_error(format!("Transport error: {msg}"), None),
            Error::Cache(e) => Self::internal_error(format!("Cache error: {e}"), None),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_predicate() {
        let err = Error::UnknownOperation("stock_zh_a_hist".to_string());
        assert!(err.is_unknown_operation());
        assert!(err.is_client_error());
        assert!(!err.is_payload_too_large());
        assert!(!err.is_fetch_failed());
    }

    #[test]
    fn test_payload_too_large_predicate() {
        let err = Error::PayloadTooLarge {
            size: 20_000_000,
            max: 10_485_760,
        };
        assert!(err.is_payload_too_large());
        assert!(err.is_client_error());
        assert!(!err.is_unknown_operation());
    }

    #[test]
    fn test_fetch_failed_is_not_client_error() {
        let err = Error::FetchFailed {
            operation: "index_daily".to_string(),
            attempts: 3,
            message: "connection reset".to_string(),
        };
        assert!(err.is_fetch_failed());
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_config_and_transport_predicates() {
        assert!(Error::Config("bad".to_string()).is_config());
        assert!(Error::Transport("closed".to_string()).is_transport());
        assert!(Error::InvalidRequest("page".to_string()).is_invalid_request());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(Error::UnknownOperation("x".into()).http_status(), 404);
        assert_eq!(Error::PayloadTooLarge { size: 2, max: 1 }.http_status(), 413);
        assert_eq!(Error::InvalidRequest("x".into()).http_status(), 400);
        assert_eq!(Error::Worker("x".into()).http_status(), 500);
        assert_eq!(
            Error::FetchFailed {
                operation: "x".into(),
                attempts: 3,
                message: "boom".into(),
            }
            .http_status(),
            500
        );
    }

    #[test]
    fn test_too_large_status_exceeds_not_found() {
        let too_large = Error::PayloadTooLarge { size: 2, max: 1 }.http_status();
        let not_found = Error::UnknownOperation("x".into()).http_status();
        assert!(too_large > not_found);
    }

    #[test]
    fn test_error_display() {
        let err = Error::FetchFailed {
            operation: "macro_china_cpi".to_string(),
            attempts: 3,
            message: "timed out".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("macro_china_cpi"));
        assert!(msg.contains('3'));
        assert!(msg.contains("timed out"));

        let err = Error::PayloadTooLarge { size: 42, max: 10 };
        assert!(err.to_string().contains("42"));
        assert!(err.to_string().contains("10"));
    }

    #[test]
    fn test_cache_error_conversion() {
        let err: Error = CacheError::Io("disk full".to_string()).into();
        assert!(matches!(err, Error::Cache(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_to_error_data_unknown_operation() {
        let data: ErrorData = Error::UnknownOperation("nope".to_string()).into();
        assert!(data.message.contains("Unknown operation"));
        assert!(data.message.contains("nope"));
    }

    #[test]
    fn test_error_to_error_data_payload_too_large() {
        let data: ErrorData = Error::PayloadTooLarge { size: 100, max: 50 }.into();
        assert!(data.message.contains("too large"));
        assert!(data.message.contains("100"));
    }

    #[test]
    fn test_error_to_error_data_fetch_failed() {
        let data: ErrorData = Error::FetchFailed {
            operation: "op".to_string(),
            attempts: 3,
            message: "boom".to_string(),
        }
        .into();
        assert!(data.message.contains("boom"));
    }

    #[test]
    fn test_error_to_error_data_worker() {
        let data: ErrorData = Error::Worker("panicked".to_string()).into();
        assert!(data.message.contains("Worker pool error"));
    }
}
