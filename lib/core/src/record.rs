//! Raw input records
//!
//! A record is a JSON object mapping field names to values, exactly as the
//! calling web backend sends it. Coercion into typed values happens against
//! a [`FeatureSchema`](crate::FeatureSchema).

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A raw, unvalidated record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; anything but an object is rejected.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::InvalidInput(format!(
                "record must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| Error::InvalidInput(format!("invalid JSON input: {}", e)))?;
        Self::from_value(value)
    }

    /// Field lookup. An explicit `null` is treated as absent.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    #[inline]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A labelled record consumed by `fit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub record: RawRecord,
    pub label: String,
}

impl TrainingExample {
    pub fn new(record: RawRecord, label: impl Into<String>) -> Self {
        Self {
            record,
            label: label.into(),
        }
    }
}

/// Coerce a value into a finite number.
///
/// Accepts numbers, numeric strings and booleans (`true` is 1).
pub fn coerce_number(field: &str, value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    match number {
        Some(x) if x.is_finite() => Ok(x),
        Some(_) => Err(Error::InvalidInput(format!(
            "field '{}' must be a finite number",
            field
        ))),
        None => Err(Error::InvalidInput(format!(
            "field '{}' must be numeric, got {}",
            field,
            json_type_name(value)
        ))),
    }
}

/// Coerce a value into a category string. Numbers and booleans are stringified.
pub fn coerce_category(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(Error::InvalidInput(format!(
            "field '{}' must be a string, got {}",
            field,
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
