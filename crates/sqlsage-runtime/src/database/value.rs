//! Conversion of SQLite row values
//!
//! SQLite is dynamically typed, so each cell is decoded by its runtime
//! storage class rather than the declared column type.

use serde_json::{Map, Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Decode every cell of a row, in column order
pub fn row_values(row: &SqliteRow) -> Vec<Value> {
    (0..row.len()).map(|idx| cell_value(row, idx)).collect()
}

/// Decode a row into a column-name keyed object
pub fn row_object(row: &SqliteRow) -> Map<String, Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| (column.name().to_string(), cell_value(row, idx)))
        .collect()
}

fn cell_value(row: &SqliteRow, idx: usize) -> Value {
    let storage_class = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(e) => {
            tracing::warn!("Failed to read column {}: {}", idx, e);
            return Value::Null;
        }
    };

    match storage_class.as_str() {
        "INTEGER" => row.try_get::<i64, _>(idx).map(Value::from).unwrap_or(Value::Null),
        "REAL" => float_value(row, idx),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|bytes| Value::String(format!("<{} bytes>", bytes.len())))
            .unwrap_or(Value::Null),
        "TEXT" => row.try_get::<String, _>(idx).map(Value::String).unwrap_or(Value::Null),
        _ => {
            if let Ok(v) = row.try_get::<i64, _>(idx) {
                Value::from(v)
            } else if let Ok(v) = row.try_get::<String, _>(idx) {
                Value::String(v)
            } else {
                float_value(row, idx)
            }
        }
    }
}

fn float_value(row: &SqliteRow, idx: usize) -> Value {
    row.try_get::<f64, _>(idx)
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Render values as a tuple literal: `(1, 'Milk', 2.5, NULL)`
pub fn render_tuple(values: &[Value]) -> String {
    let parts: Vec<String> = values.iter().map(render_literal).collect();
    format!("({})", parts.join(", "))
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => other.to_string(),
    }
}
