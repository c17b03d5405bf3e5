//! Feature schema definitions
//!
//! The schema is the ordered contract between raw records and numeric
//! feature vectors. Every vector produced or consumed by a model has exactly
//! `schema.len()` entries, in schema order. A schema is fixed at fit time and
//! travels inside the model artifact.

use crate::record::{coerce_category, coerce_number, RawRecord};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Subjects a student can mark as mastered (0/1 flags) in the survey pipeline
pub const MASTERY_SUBJECTS: [&str; 10] = [
    "matematika",
    "fisika",
    "kimia",
    "biologi",
    "b_indonesia",
    "b_inggris",
    "sejarah",
    "geografi",
    "informatika",
    "seni_budaya",
];

/// Interest scores in [0, 1] in the survey pipeline
pub const INTEREST_FIELDS: [&str; 4] = ["minat_ipa", "minat_ips", "minat_bahasa", "minat_seni"];

/// Raw academic scores (0-100) in the database pipeline
pub const ACADEMIC_SCORE_FIELDS: [&str; 17] = [
    "matematika",
    "bahasa_indonesia",
    "bahasa_inggris",
    "fisika",
    "kimia",
    "biologi",
    "sejarah",
    "geografi",
    "ekonomi",
    "sosiologi",
    "pkn",
    "seni_budaya",
    "prakarya",
    "pjok",
    "peminatan_1",
    "peminatan_2",
    "rata_rata_keseluruhan",
];

pub const GENDER_FIELD: &str = "jenis_kelamin";

/// Fill value for an absent mastery flag
pub const DEFAULT_MASTERY: f64 = 0.0;
/// Fill value for an absent interest score
pub const DEFAULT_INTEREST: f64 = 0.0;
/// Fill value for an absent academic score or confidence level
pub const DEFAULT_ACADEMIC_SCORE: f64 = 75.0;
pub const DEFAULT_COLLEGE_PLAN: &str = "Iya";
pub const DEFAULT_MAJOR_CATEGORY: &str = "Unknown";

fn default_version() -> u32 {
    1
}

/// Ordered feature schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSchema {
    /// Schema version for future compatibility
    #[serde(default = "default_version")]
    pub version: u32,

    /// Features in vector order
    pub features: Vec<FeatureDef>,
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureDef>) -> Self {
        Self {
            version: 1,
            features,
        }
    }

    /// Primary pipeline: gender, ten mastery flags, four interest scores.
    pub fn student_survey() -> Self {
        let mut features = Vec::with_capacity(1 + MASTERY_SUBJECTS.len() + INTEREST_FIELDS.len());
        features.push(FeatureDef::categorical(GENDER_FIELD));
        features.extend(
            MASTERY_SUBJECTS
                .iter()
                .map(|name| FeatureDef::ordinal(*name).with_default_number(DEFAULT_MASTERY)),
        );
        features.extend(INTEREST_FIELDS.iter().map(|name| {
            FeatureDef::continuous(*name)
                .with_range(0.0, 1.0)
                .with_default_number(DEFAULT_INTEREST)
        }));
        Self::new(features)
    }

    /// Database pipeline: gender, seventeen raw scores, college plan,
    /// major category and confidence level.
    pub fn academic_record() -> Self {
        let mut features = Vec::with_capacity(1 + ACADEMIC_SCORE_FIELDS.len() + 3);
        features.push(FeatureDef::categorical(GENDER_FIELD));
        features.extend(ACADEMIC_SCORE_FIELDS.iter().map(|name| {
            FeatureDef::continuous(*name)
                .with_range(0.0, 100.0)
                .with_default_number(DEFAULT_ACADEMIC_SCORE)
        }));
        features.push(FeatureDef::categorical("rencana_kuliah").with_default_category(DEFAULT_COLLEGE_PLAN));
        features.push(FeatureDef::categorical("kategori_jurusan").with_default_category(DEFAULT_MAJOR_CATEGORY));
        features.push(
            FeatureDef::continuous("tingkat_keyakinan")
                .with_range(0.0, 100.0)
                .with_default_number(DEFAULT_ACADEMIC_SCORE),
        );
        Self::new(features)
    }

    /// Load a schema definition from a JSON file
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        let schema: FeatureSchema = serde_json::from_slice(&data)?;
        schema.validate()?;
        Ok(schema)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureDef> {
        self.features.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureDef> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Indices of categorical features, in schema order
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.features
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind == FeatureKind::Categorical)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(Error::InvalidConfig("schema cannot be empty".into()));
        }

        let mut seen = HashSet::with_capacity(self.features.len());
        for feature in &self.features {
            if feature.name.is_empty() {
                return Err(Error::InvalidConfig("feature name cannot be empty".into()));
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate feature '{}'",
                    feature.name
                )));
            }
            feature.validate()?;
        }

        Ok(())
    }

    /// Resolve a raw record into typed values in schema order.
    ///
    /// Absent features take their declared default; an absent feature with
    /// no default is `InvalidInput`. Numeric values are clamped into the
    /// feature's range.
    pub fn resolve(&self, record: &RawRecord) -> Result<Vec<FieldValue>> {
        self.features
            .iter()
            .map(|feature| feature.resolve(record))
            .collect()
    }
}

/// Feature kind enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// String value mapped to an integer code
    Categorical,
    /// Numeric flag, clamped to [0, 1]
    Ordinal01Score,
    /// Numeric score, optionally clamped to a declared range
    ContinuousScore,
}

/// Value used when a record omits a feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureDefault {
    Number(f64),
    Category(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    #[inline]
    pub fn clamp(&self, x: f64) -> f64 {
        x.max(self.min).min(self.max)
    }
}

/// A single feature of the schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureDef {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FeatureKind,

    /// Fill value for absent input; `None` makes the feature required
    #[serde(default)]
    pub default: Option<FeatureDefault>,

    /// Clamp range for numeric features
    #[serde(default)]
    pub range: Option<ScoreRange>,
}

impl FeatureDef {
    /// Create a required categorical feature
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Categorical,
            default: None,
            range: None,
        }
    }

    /// Create a required 0/1 flag
    pub fn ordinal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::Ordinal01Score,
            default: None,
            range: None,
        }
    }

    /// Create a required continuous score
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FeatureKind::ContinuousScore,
            default: None,
            range: None,
        }
    }

    #[must_use]
    pub fn with_default_number(mut self, value: f64) -> Self {
        self.default = Some(FeatureDefault::Number(value));
        self
    }

    #[must_use]
    pub fn with_default_category(mut self, value: impl Into<String>) -> Self {
        self.default = Some(FeatureDefault::Category(value.into()));
        self
    }

    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(ScoreRange { min, max });
        self
    }

    #[inline]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// Range applied to numeric input. Flags are always bounded to [0, 1].
    pub fn effective_range(&self) -> Option<ScoreRange> {
        match self.kind {
            FeatureKind::Categorical => None,
            FeatureKind::Ordinal01Score => Some(self.range.unwrap_or(ScoreRange { min: 0.0, max: 1.0 })),
            FeatureKind::ContinuousScore => self.range,
        }
    }

    fn validate(&self) -> Result<()> {
        match (&self.kind, &self.default) {
            (FeatureKind::Categorical, Some(FeatureDefault::Number(_))) => {
                return Err(Error::InvalidConfig(format!(
                    "categorical feature '{}' needs a category default",
                    self.name
                )));
            }
            (FeatureKind::Ordinal01Score | FeatureKind::ContinuousScore, Some(FeatureDefault::Category(_))) => {
                return Err(Error::InvalidConfig(format!(
                    "numeric feature '{}' needs a numeric default",
                    self.name
                )));
            }
            (_, Some(FeatureDefault::Number(x))) if !x.is_finite() => {
                return Err(Error::InvalidConfig(format!(
                    "feature '{}' has a non-finite default",
                    self.name
                )));
            }
            _ => {}
        }

        if let Some(range) = self.range {
            if self.kind == FeatureKind::Categorical {
                return Err(Error::InvalidConfig(format!(
                    "categorical feature '{}' cannot declare a range",
                    self.name
                )));
            }
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(Error::InvalidConfig(format!(
                    "feature '{}' has an invalid range [{}, {}]",
                    self.name, range.min, range.max
                )));
            }
        }

        Ok(())
    }

    fn resolve(&self, record: &RawRecord) -> Result<FieldValue> {
        let value = match (record.get(&self.name), &self.default) {
            (Some(raw), _) => match self.kind {
                FeatureKind::Categorical => FieldValue::Category(coerce_category(&self.name, raw)?),
                _ => FieldValue::Number(coerce_number(&self.name, raw)?),
            },
            (None, Some(FeatureDefault::Number(x))) => FieldValue::Number(*x),
            (None, Some(FeatureDefault::Category(c))) => FieldValue::Category(c.clone()),
            (None, None) => {
                return Err(Error::InvalidInput(format!(
                    "missing required field: {}",
                    self.name
                )));
            }
        };

        Ok(match (value, self.effective_range()) {
            (FieldValue::Number(x), Some(range)) => FieldValue::Number(range.clamp(x)),
            (value, _) => value,
        })
    }
}

/// A typed, schema-resolved value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Category(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(x) => Some(*x),
            FieldValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FieldValue::Category(c) => Some(c),
            FieldValue::Number(_) => None,
        }
    }
}
