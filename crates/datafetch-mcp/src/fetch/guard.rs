//! Payload size ceiling

use super::result::FetchResult;
use crate::error::{Error, Result};

/// Default ceiling: 10 MiB
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Rejects fetched results whose in-memory footprint exceeds a ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeGuard {
    max_bytes: usize,
}

impl Default for SizeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_BYTES)
    }
}

impl SizeGuard {
    #[must_use]
    pub const fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Estimated footprint in bytes. Only tables are measured; every other
    /// shape counts as zero.
    #[must_use]
    pub fn estimate(result: &FetchResult) -> usize {
        result
            .as_tabular()
            .map_or(0, arrow::record_batch::RecordBatch::get_array_memory_size)
    }

    /// Pass `result` through or reject it.
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` when the estimate exceeds the ceiling.
    pub fn check(&self, result: &FetchResult) -> Result<usize> {
        let size = Self::estimate(result);
        if size > self.max_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                max: self.max_bytes,
            });
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use serde_json::json;

    use super::*;

    fn table(rows: usize) -> FetchResult {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, false),
        ]));
        let ids: Vec<i64> = (0..rows as i64).collect();
        let names: Vec<String> = (0..rows).map(|i| format!("row-{i}")).collect();
        FetchResult::Tabular(
            RecordBatch::try_new(
                schema,
                vec![
                    Arc::new(Int64Array::from(ids)),
                    Arc::new(StringArray::from(names)),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_small_table_passes() {
        let guard = SizeGuard::default();
        let size = guard.check(&table(100)).unwrap();
        assert!(size > 0);
        assert!(size < DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn test_estimate_grows_with_rows() {
        assert!(SizeGuard::estimate(&table(10_000)) > SizeGuard::estimate(&table(10)));
    }

    #[test]
    fn test_oversized_table_rejected() {
        let guard = SizeGuard::new(1024);
        let err = guard.check(&table(10_000)).unwrap_err();
        assert!(err.is_payload_too_large());
        assert_eq!(err.http_status(), 413);
    }

    #[test]
    fn test_non_tabular_always_passes() {
        let guard = SizeGuard::new(0);
        let huge = json!("x".repeat(100_000));
        assert_eq!(guard.check(&FetchResult::Scalar(huge)).unwrap(), 0);
        assert_eq!(guard.check(&FetchResult::Empty).unwrap(), 0);
    }

    #[test]
    fn test_default_ceiling_is_ten_mib() {
        assert_eq!(SizeGuard::default().max_bytes(), 10_485_760);
    }
}
