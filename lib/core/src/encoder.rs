//! Categorical encoding
//!
//! Category strings are assigned integer codes in lexicographic order at fit
//! time. The mapping is closed afterwards: an unseen value encodes to
//! [`FALLBACK_CODE`] and the encoding reports that it fell back.

use crate::schema::{FeatureKind, FeatureSchema, FieldValue};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Code used for values never observed at fit time (the lowest code)
pub const FALLBACK_CODE: u32 = 0;

/// Result of encoding a single category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    pub code: u32,
    /// Set when the value was unseen and `code` is the fallback
    pub fallback: bool,
}

/// Bidirectional mapping between observed strings and codes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryMapping {
    /// Sorted, deduplicated; a value's code is its index
    classes: Vec<String>,
}

impl CategoryMapping {
    pub fn fit<I, S>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut classes: Vec<String> = values.into_iter().map(Into::into).collect();
        classes.sort_unstable();
        classes.dedup();

        if classes.is_empty() {
            return Err(Error::InvalidInput(
                "cannot fit a category mapping on zero values".into(),
            ));
        }

        Ok(Self { classes })
    }

    /// Encode a value, falling back to [`FALLBACK_CODE`] when unseen.
    pub fn transform(&self, value: &str) -> Encoded {
        match self.code_of(value) {
            Some(code) => Encoded {
                code,
                fallback: false,
            },
            None => Encoded {
                code: FALLBACK_CODE,
                fallback: true,
            },
        }
    }

    /// Exact lookup without fallback
    pub fn code_of(&self, value: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|i| i as u32)
    }

    pub fn inverse_transform(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.classes.is_empty() && self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

/// Mapping between major names and class codes.
///
/// Labels are model outputs, so there is no fallback path: decoding an
/// unknown code is a lookup miss, never a guess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelMapping {
    mapping: CategoryMapping,
}

impl LabelMapping {
    pub fn fit<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            mapping: CategoryMapping::fit(labels)?,
        })
    }

    pub fn encode(&self, label: &str) -> Option<u32> {
        self.mapping.code_of(label)
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.mapping.inverse_transform(code)
    }

    pub fn classes(&self) -> &[String] {
        self.mapping.classes()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.mapping.is_well_formed()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct EncodedColumn {
    index: usize,
    name: String,
    mapping: CategoryMapping,
}

/// A resolved record after categorical encoding, before scaling
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRow {
    pub values: Vec<f64>,
    /// Schema indices whose category was unseen at fit time
    pub fallbacks: Vec<usize>,
}

/// Per-feature category mappings for every categorical feature of a schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoricalEncoder {
    columns: Vec<EncodedColumn>,
}

impl CategoricalEncoder {
    /// Learn one mapping per categorical feature from resolved training rows.
    pub fn fit(schema: &FeatureSchema, rows: &[Vec<FieldValue>]) -> Result<Self> {
        let mut columns = Vec::new();

        for index in schema.categorical_indices() {
            let name = schema.features[index].name.clone();
            let values = rows
                .iter()
                .map(|row| match row.get(index) {
                    Some(FieldValue::Category(c)) => Ok(c.as_str()),
                    _ => Err(Error::InvalidInput(format!(
                        "training row has no category for '{}'",
                        name
                    ))),
                })
                .collect::<Result<Vec<_>>>()?;

            let mapping = CategoryMapping::fit(values)?;
            columns.push(EncodedColumn {
                index,
                name,
                mapping,
            });
        }

        Ok(Self { columns })
    }

    /// Encode a resolved row into plain numbers. Never fails on unseen
    /// categories; those are reported in [`EncodedRow::fallbacks`].
    pub fn transform(&self, schema: &FeatureSchema, row: &[FieldValue]) -> Result<EncodedRow> {
        if row.len() != schema.len() {
            return Err(Error::FeatureCountMismatch {
                expected: schema.len(),
                actual: row.len(),
            });
        }

        let mut values = Vec::with_capacity(row.len());
        let mut fallbacks = Vec::new();
        let mut columns = self.columns.iter().peekable();

        for (i, value) in row.iter().enumerate() {
            let column = columns.next_if(|c| c.index == i);
            let encoded = match (column, value) {
                (Some(column), FieldValue::Category(c)) => {
                    let encoded = column.mapping.transform(c);
                    if encoded.fallback {
                        warn!(
                            feature = %column.name,
                            value = %c,
                            "Unseen category, using fallback code {}",
                            FALLBACK_CODE
                        );
                        fallbacks.push(i);
                    }
                    f64::from(encoded.code)
                }
                (None, FieldValue::Number(x)) => *x,
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "value for '{}' does not match its feature kind",
                        schema.features[i].name
                    )));
                }
            };
            values.push(encoded);
        }

        Ok(EncodedRow { values, fallbacks })
    }

    pub fn mapping(&self, feature: &str) -> Option<&CategoryMapping> {
        self.columns
            .iter()
            .find(|c| c.name == feature)
            .map(|c| &c.mapping)
    }

    /// True when the encoder covers exactly the categorical features of `schema`
    pub(crate) fn matches(&self, schema: &FeatureSchema) -> bool {
        let indices = schema.categorical_indices();
        indices.len() == self.columns.len()
            && self.columns.iter().zip(indices).all(|(c, i)| {
                c.index == i
                    && schema.features[i].kind == FeatureKind::Categorical
                    && schema.features[i].name == c.name
                    && c.mapping.is_well_formed()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_lexicographic() {
        let mapping = CategoryMapping::fit(["Perempuan", "Laki-laki", "Perempuan"]).unwrap();
        assert_eq!(mapping.classes(), &["Laki-laki".to_string(), "Perempuan".to_string()]);
        assert_eq!(mapping.transform("Laki-laki"), Encoded { code: 0, fallback: false });
        assert_eq!(mapping.transform("Perempuan"), Encoded { code: 1, fallback: false });
    }

    #[test]
    fn test_unseen_value_falls_back() {
        let mapping = CategoryMapping::fit(["Perempuan", "Laki-laki"]).unwrap();
        for _ in 0..3 {
            assert_eq!(
                mapping.transform("L"),
                Encoded {
                    code: FALLBACK_CODE,
                    fallback: true
                }
            );
        }
    }

    #[test]
    fn test_inverse_transform() {
        let labels = LabelMapping::fit(["Kedokteran", "Akuntansi", "Hukum"]).unwrap();
        assert_eq!(labels.encode("Hukum"), Some(1));
        assert_eq!(labels.decode(2), Some("Kedokteran"));
        assert_eq!(labels.decode(3), None);
        assert_eq!(labels.encode("Farmasi"), None);
    }

    #[test]
    fn test_empty_fit_rejected() {
        assert!(CategoryMapping::fit(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_encoder_reports_fallbacks() {
        let schema = FeatureSchema::student_survey();
        let row = |gender: &str| {
            let mut r = vec![FieldValue::Category(gender.to_string())];
            r.extend((1..schema.len()).map(|_| FieldValue::Number(0.5)));
            r
        };

        let encoder = CategoricalEncoder::fit(&schema, &[row("Laki-laki"), row("Perempuan")]).unwrap();
        assert!(encoder.matches(&schema));

        let seen = encoder.transform(&schema, &row("Perempuan")).unwrap();
        assert_eq!(seen.values[0], 1.0);
        assert!(seen.fallbacks.is_empty());

        let unseen = encoder.transform(&schema, &row("X")).unwrap();
        assert_eq!(unseen.values[0], 0.0);
        assert_eq!(unseen.fallbacks, vec![0]);
        assert_eq!(unseen.values[5], 0.5);
    }
}
