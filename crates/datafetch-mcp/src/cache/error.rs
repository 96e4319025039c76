//! Cache error types

use thiserror::Error;

/// Cache operation errors
///
/// None of these ever reach a caller: the orchestrator treats read errors as a
/// miss and logs write errors.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt cache entry {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Cache worker error: {0}")]
    Worker(String),
}

impl CacheError {
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CacheError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = CacheError::Io("permission denied".to_string());
        assert!(err.to_string().contains("I/O"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_io_error_from_std() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_serialization_error_display() {
        let err = CacheError::Serialization("schema mismatch".to_string());
        assert!(err.to_string().contains("Serialization"));
    }

    #[test]
    fn test_corrupt_error_display() {
        let err = CacheError::Corrupt {
            path: "/tmp/abc.arrow".to_string(),
            message: "bad magic".to_string(),
        };
        assert!(err.is_corrupt());
        let msg = err.to_string();
        assert!(msg.contains("abc.arrow"));
        assert!(msg.contains("bad magic"));
    }

    #[test]
    fn test_worker_error_is_not_corrupt() {
        let err = CacheError::Worker("cancelled".to_string());
        assert!(!err.is_corrupt());
    }
}
