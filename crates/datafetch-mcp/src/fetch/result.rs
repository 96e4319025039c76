//! Shapes a remote operation may return

use arrow::record_batch::RecordBatch;
use serde_json::Value;

use crate::types::Record;

/// Raw result of one operation invocation
///
/// Remote catalogs are not type-consistent across calls, so every shape an
/// operation can produce is a variant here and downstream code matches
/// exhaustively instead of probing types at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Columnar table
    Tabular(RecordBatch),
    /// Already record-shaped rows
    RecordList(Vec<Record>),
    /// List of non-object values
    ScalarList(Vec<Value>),
    /// Single object
    Mapping(Record),
    /// Single non-null scalar
    Scalar(Value),
    /// Nothing returned
    Empty,
}

impl FetchResult {
    /// Classify a decoded JSON payload
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Array(items) if items.is_empty() => Self::Empty,
            Value::Array(items) if items.iter().all(Value::is_object) => Self::RecordList(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect(),
            ),
            Value::Array(items) => Self::ScalarList(items),
            Value::Object(map) => Self::Mapping(map),
            scalar => Self::Scalar(scalar),
        }
    }

    /// Shape label for logs and metrics
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Tabular(_) => "tabular",
            Self::RecordList(_) => "record_list",
            Self::ScalarList(_) => "scalar_list",
            Self::Mapping(_) => "mapping",
            Self::Scalar(_) => "scalar",
            Self::Empty => "empty",
        }
    }

    /// The table when this result is tabular
    #[must_use]
    pub const fn as_tabular(&self) -> Option<&RecordBatch> {
        match self {
            Self::Tabular(batch) => Some(batch),
            _ => None,
        }
    }
}

impl From<RecordBatch> for FetchResult {
    fn from(batch: RecordBatch) -> Self {
        Self::Tabular(batch)
    }
}
