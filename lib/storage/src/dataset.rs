//! Training dataset loading
//!
//! Examples are JSON objects holding the schema fields plus a label field.
//! A `.jsonl` / `.ndjson` file holds one object per line; any other file is
//! read as a single JSON array.

use jurusan_core::{Error, RawRecord, Result, TrainingExample};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Label column of the survey training data
pub const DEFAULT_LABEL_FIELD: &str = "jurusan_aktual";

pub fn load_examples<P: AsRef<Path>>(path: P, label_field: &str) -> Result<Vec<TrainingExample>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;

    let line_delimited = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl") | Some("ndjson")
    );

    let values: Vec<Value> = if line_delimited {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| Error::Serialization(format!("line {}: {}", n + 1, e)))
            })
            .collect::<Result<_>>()?
    } else {
        serde_json::from_str(&text)?
    };

    let examples = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| example_from_value(i, value, label_field))
        .collect::<Result<Vec<_>>>()?;

    info!("Loaded {} training examples from {:?}", examples.len(), path);
    Ok(examples)
}

/// Split a JSON object into a record and its label
pub fn example_from_value(i: usize, value: Value, label_field: &str) -> Result<TrainingExample> {
    let mut record = RawRecord::from_value(value)
        .map_err(|e| Error::InvalidInput(format!("example {}: {}", i, e)))?;

    match record.remove(label_field) {
        Some(Value::String(label)) if !label.is_empty() => Ok(TrainingExample::new(record, label)),
        _ => Err(Error::InvalidInput(format!(
            "example {} has no '{}' label",
            i, label_field
        ))),
    }
}
