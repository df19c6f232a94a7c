//! FILENAME: crosstab-session/src/source.rs
//! Conversion of data-source payloads into typed records and field catalogs.
//!
//! Payloads are converted once here; the engine never sees untyped JSON.

use crosstab_engine::{FieldCatalog, FieldSpec, Record, ScalarValue};
use serde_json::Value;

use crate::error::SessionError;

/// Converts one JSON value into a record scalar.
/// Booleans and nested values become text.
pub fn scalar_from_json(value: &Value) -> ScalarValue {
    match value {
        Value::Null => ScalarValue::Missing,
        Value::Number(n) => n.as_f64().map(ScalarValue::Number).unwrap_or(ScalarValue::Missing),
        Value::String(s) => ScalarValue::Text(s.clone()),
        Value::Bool(b) => ScalarValue::Text(b.to_string()),
        Value::Array(_) | Value::Object(_) => ScalarValue::Text(value.to_string()),
    }
}

/// Converts a JSON array of objects into records, preserving order.
pub fn records_from_json(payload: &Value) -> Result<Vec<Record>, SessionError> {
    let items = payload
        .as_array()
        .ok_or_else(|| SessionError::InvalidRecords("expected an array of objects".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<Record, SessionError> {
            let object = item.as_object().ok_or_else(|| {
                SessionError::InvalidRecords(format!("record {} is not an object", i))
            })?;
            Ok(object
                .iter()
                .map(|(key, value)| (key.clone(), scalar_from_json(value)))
                .collect())
        })
        .collect()
}

pub fn records_from_json_str(json: &str) -> Result<Vec<Record>, SessionError> {
    let payload: Value = serde_json::from_str(json)?;
    records_from_json(&payload)
}

/// Parses a field catalog: `[{ "id", "name", "type": "dimension" | "measure" }]`.
pub fn catalog_from_json_str(json: &str) -> Result<FieldCatalog, SessionError> {
    let fields: Vec<FieldSpec> = serde_json::from_str(json)?;
    Ok(FieldCatalog::new(fields))
}
