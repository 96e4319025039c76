//! Conversion of any fetch result into uniform records
//!
//! Every record produced here is plain JSON: date and time values become
//! `YYYY-MM-DD HH:MM:SS` strings and every missing value (Arrow null, NaN,
//! infinity) becomes `null`.

use std::mem;

use arrow::array::timezone::Tz;
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    ArrowTemporalType, DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int8Type,
    Int16Type, Int32Type, Int64Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

use crate::fetch::FetchResult;
use crate::types::Record;

/// Canonical rendering of date and time values
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Key used when wrapping non-record values
const VALUE_KEY: &str = "value";

/// Key used when exploding a single mapping
const KEY_KEY: &str = "key";

/// Convert `result` into records. Never fails.
#[must_use]
pub fn normalize(result: FetchResult) -> Vec<Record> {
    match result {
        FetchResult::Tabular(batch) => normalize_table(&batch),
        FetchResult::RecordList(records) => records,
        FetchResult::ScalarList(values) => values.into_iter().map(value_record).collect(),
        FetchResult::Mapping(map) => map
            .into_iter()
            .map(|(key, value)| {
                let mut record = Record::new();
                record.insert(KEY_KEY.to_string(), Value::String(key));
                record.insert(VALUE_KEY.to_string(), value);
                record
            })
            .collect(),
        FetchResult::Scalar(Value::Null) | FetchResult::Empty => Vec::new(),
        FetchResult::Scalar(value) => vec![value_record(value)],
    }
}

fn value_record(value: Value) -> Record {
    let mut record = Record::new();
    record.insert(VALUE_KEY.to_string(), value);
    record
}

/// One record per row, keys in column order
#[must_use]
pub fn normalize_table(batch: &RecordBatch) -> Vec<Record> {
    let schema = batch.schema();
    let mut columns: Vec<Vec<Value>> = batch.columns().iter().map(column_values).collect();

    (0..batch.num_rows())
        .map(|row| {
            let mut record = Record::with_capacity(columns.len());
            for (field, cells) in schema.fields().iter().zip(columns.iter_mut()) {
                record.insert(field.name().clone(), mem::take(&mut cells[row]));
            }
            record
        })
        .collect()
}

macro_rules! primitive_values {
    ($array:expr, $ty:ty) => {
        $array
            .as_primitive::<$ty>()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::from))
            .collect()
    };
}

fn column_values(array: &ArrayRef) -> Vec<Value> {
    match array.data_type() {
        DataType::Null => vec![Value::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        DataType::Int8 => primitive_values!(array, Int8Type),
        DataType::Int16 => primitive_values!(array, Int16Type),
        DataType::Int32 => primitive_values!(array, Int32Type),
        DataType::Int64 => primitive_values!(array, Int64Type),
        DataType::UInt8 => primitive_values!(array, UInt8Type),
        DataType::UInt16 => primitive_values!(array, UInt16Type),
        DataType::UInt32 => primitive_values!(array, UInt32Type),
        DataType::UInt64 => primitive_values!(array, UInt64Type),
        // `Value::from` maps NaN and infinities to null
        DataType::Float32 => primitive_values!(array, Float32Type),
        DataType::Float64 => primitive_values!(array, Float64Type),
        DataType::Utf8 => string_values(array.as_string::<i32>().iter().collect()),
        DataType::LargeUtf8 => string_values(array.as_string::<i64>().iter().collect()),
        DataType::Utf8View => string_values(array.as_string_view().iter().collect()),
        DataType::Date32 => temporal_values::<Date32Type>(array, None),
        DataType::Date64 => temporal_values::<Date64Type>(array, None),
        DataType::Timestamp(unit, tz) => {
            let tz = tz.as_deref();
            match unit {
                TimeUnit::Second => temporal_values::<TimestampSecondType>(array, tz),
                TimeUnit::Millisecond => temporal_values::<TimestampMillisecondType>(array, tz),
                TimeUnit::Microsecond => temporal_values::<TimestampMicrosecondType>(array, tz),
                TimeUnit::Nanosecond => temporal_values::<TimestampNanosecondType>(array, tz),
            }
        }
        _ => display_values(array),
    }
}

fn format_datetime(dt: &NaiveDateTime) -> Value {
    Value::String(dt.format(DATETIME_FORMAT).to_string())
}

fn temporal_values<T>(array: &ArrayRef, tz: Option<&str>) -> Vec<Value>
where
    T: ArrowTemporalType,
    i64: From<T::Native>,
{
    let array = array.as_primitive::<T>();
    let tz = tz.and_then(|name| match name.parse::<Tz>() {
        Ok(tz) => Some(tz),
        Err(e) => {
            tracing::warn!(
                timezone = name,
                error = %e,
                "Unknown column timezone, rendering as UTC"
            );
            None
        }
    });

    (0..array.len())
        .map(|i| {
            if array.is_null(i) {
                return Value::Null;
            }
            let local = match tz {
                Some(tz) => array
                    .value_as_datetime_with_tz(i, tz)
                    .map(|dt| dt.naive_local()),
                None => array.value_as_datetime(i),
            };
            local.as_ref().map_or(Value::Null, format_datetime)
        })
        .collect()
}

/// Text columns are treated as datetimes when their first non-null cell is an
/// ISO-8601 datetime. Cells that then fail to parse keep their text.
fn string_values(cells: Vec<Option<&str>>) -> Vec<Value> {
    let is_datetime = cells
        .iter()
        .flatten()
        .next()
        .is_some_and(|first| parse_iso_datetime(first).is_some());

    cells
        .into_iter()
        .map(|cell| match cell {
            None => Value::Null,
            Some(text) if is_datetime => parse_iso_datetime(text)
                .as_ref()
                .map_or_else(|| Value::String(text.to_string()), format_datetime),
            Some(text) => Value::String(text.to_string()),
        })
        .collect()
}

/// `YYYY-MM-DDTHH:MM:SS[.fff][Z|±HH:MM]`, rendered in its own offset
fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if !text.contains('T') {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

fn display_values(array: &ArrayRef) -> Vec<Value> {
    let options = FormatOptions::default();
    match ArrayFormatter::try_new(array.as_ref(), &options) {
        Ok(formatter) => (0..array.len())
            .map(|i| {
                if array.is_null(i) {
                    Value::Null
                } else {
                    Value::String(formatter.value(i).to_string())
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!(
                data_type = %array.data_type(),
                error = %e,
                "Column type cannot be rendered, emitting nulls"
            );
            vec![Value::Null; array.len()]
        }
    }
}
