//! Request normalization
//!
//! Survey forms send the mastered subjects as a list of display names
//! (`"mata_pelajaran_dikuasai": ["Matematika", "B Inggris"]`) rather than as
//! individual flags. This module expands that list into the 0/1 fields the
//! schema expects before the record reaches the classifier.

use ahash::AHashSet;
use jurusan_core::{Error, FeatureKind, FeatureSchema, RawRecord, Result};
use serde_json::Value;

pub const MASTERED_SUBJECTS_FIELD: &str = "mata_pelajaran_dikuasai";

/// Turn a request body into a raw record for `schema`.
///
/// Flags given explicitly in the body take precedence over the list.
pub fn normalize_request(schema: &FeatureSchema, body: Value) -> Result<RawRecord> {
    let mut record = RawRecord::from_value(body)?;

    let subjects = match record.remove(MASTERED_SUBJECTS_FIELD) {
        None | Some(Value::Null) => return Ok(record),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_lowercase())
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "{} must contain only strings",
                            MASTERED_SUBJECTS_FIELD
                        ))
                    })
            })
            .collect::<Result<AHashSet<String>>>()?,
        Some(_) => {
            return Err(Error::InvalidInput(format!(
                "{} must be a list of subject names",
                MASTERED_SUBJECTS_FIELD
            )));
        }
    };

    for feature in schema.iter().filter(|f| f.kind == FeatureKind::Ordinal01Score) {
        if record.contains(&feature.name) {
            continue;
        }
        let key = feature.name.to_lowercase();
        let spoken = key.replace('_', " ");
        let mastered = subjects.contains(&spoken) || subjects.contains(&key);
        record.insert(feature.name.clone(), if mastered { 1 } else { 0 });
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expands_subject_list() {
        let schema = FeatureSchema::student_survey();
        let record = normalize_request(
            &schema,
            json!({
                "jenis_kelamin": "Laki-laki",
                "mata_pelajaran_dikuasai": ["Matematika", "b inggris", "Seni_Budaya"],
                "minat_ipa": 0.9
            }),
        )
        .unwrap();

        assert_eq!(record.get("matematika"), Some(&json!(1)));
        assert_eq!(record.get("b_inggris"), Some(&json!(1)));
        assert_eq!(record.get("seni_budaya"), Some(&json!(1)));
        assert_eq!(record.get("fisika"), Some(&json!(0)));
        assert!(!record.contains(MASTERED_SUBJECTS_FIELD));
    }

    #[test]
    fn test_explicit_flag_wins() {
        let schema = FeatureSchema::student_survey();
        let record = normalize_request(
            &schema,
            json!({
                "jenis_kelamin": "Perempuan",
                "matematika": 0,
                "mata_pelajaran_dikuasai": ["Matematika"]
            }),
        )
        .unwrap();
        assert_eq!(record.get("matematika"), Some(&json!(0)));
    }

    #[test]
    fn test_without_list_is_untouched() {
        let schema = FeatureSchema::student_survey();
        let body = json!({"jenis_kelamin": "Perempuan", "kimia": 1});
        let record = normalize_request(&schema, body).unwrap();
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_malformed_list() {
        let schema = FeatureSchema::student_survey();
        assert!(normalize_request(&schema, json!({"mata_pelajaran_dikuasai": "Matematika"})).is_err());
        assert!(normalize_request(&schema, json!({"mata_pelajaran_dikuasai": [1, 2]})).is_err());
    }
}
