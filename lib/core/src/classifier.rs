//! k-nearest-neighbor classifier
//!
//! [`KnnClassifier`] holds a schema and configuration and produces an
//! immutable [`TrainedModel`] from labelled examples. Prediction runs
//! resolve → encode → scale → query → vote, with uniform neighbor weights:
//! the probability of a class is its share of the `k` neighbor votes.

use crate::config::{PredictorConfig, VectorPolicy};
use crate::encoder::{CategoricalEncoder, LabelMapping};
use crate::index::{NeighborIndex, Neighbors};
use crate::record::{RawRecord, TrainingExample};
use crate::scaler::FeatureScaler;
use crate::schema::FeatureSchema;
use crate::vector::FeatureVector;
use crate::{Error, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Untrained classifier
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    schema: FeatureSchema,
    config: PredictorConfig,
}

impl KnnClassifier {
    pub fn new(schema: FeatureSchema, config: PredictorConfig) -> Result<Self> {
        schema.validate()?;
        config.validate()?;
        Ok(Self { schema, config })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Fit encoder, scaler, label mapping and index on `examples`.
    ///
    /// Fails with `NotEnoughData` when fewer than `k` examples are supplied.
    pub fn fit(&self, examples: &[TrainingExample]) -> Result<TrainedModel> {
        let k = self.config.k;
        if examples.len() < k {
            return Err(Error::NotEnoughData {
                k,
                available: examples.len(),
            });
        }

        let rows = examples
            .iter()
            .enumerate()
            .map(|(i, example)| {
                if example.label.is_empty() {
                    return Err(Error::InvalidInput(format!(
                        "training example {} has an empty label",
                        i
                    )));
                }
                self.schema.resolve(&example.record).map_err(|e| match e {
                    Error::InvalidInput(msg) => {
                        Error::InvalidInput(format!("training example {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let encoder = CategoricalEncoder::fit(&self.schema, &rows)?;
        let encoded = rows
            .iter()
            .map(|row| encoder.transform(&self.schema, row).map(|e| e.values))
            .collect::<Result<Vec<_>>>()?;

        let scaler = FeatureScaler::fit(&encoded)?;
        let vectors = encoded
            .iter()
            .map(|row| scaler.transform(row).map(FeatureVector::new))
            .collect::<Result<Vec<_>>>()?;

        let labels = LabelMapping::fit(examples.iter().map(|e| e.label.as_str()))?;
        let codes = examples
            .iter()
            .map(|e| {
                labels
                    .encode(&e.label)
                    .ok_or_else(|| Error::InvalidInput(format!("unknown label '{}'", e.label)))
            })
            .collect::<Result<Vec<_>>>()?;

        let index = NeighborIndex::fit(vectors, codes, k)?;

        info!(
            "Fitted k-NN model: {} examples, {} features, {} classes, k = {}",
            index.len(),
            self.schema.len(),
            labels.len(),
            k
        );

        Ok(TrainedModel {
            parts: ModelParts {
                schema: self.schema.clone(),
                encoder,
                scaler,
                labels,
                index,
            },
        })
    }
}

/// Every fitted parameter needed to reproduce predictions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParts {
    pub schema: FeatureSchema,
    pub encoder: CategoricalEncoder,
    pub scaler: FeatureScaler,
    pub labels: LabelMapping,
    pub index: NeighborIndex,
}

/// A fitted, immutable model
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    parts: ModelParts,
}

impl TrainedModel {
    /// Rebuild a model from stored parts, checking they fit together.
    pub fn from_parts(parts: ModelParts) -> Result<Self> {
        let corrupt = |what: &str| Err(Error::CorruptModel(what.to_string()));

        if parts.schema.validate().is_err() {
            return corrupt("invalid schema");
        }
        if !parts.encoder.matches(&parts.schema) {
            return corrupt("category mappings do not match the schema");
        }
        if !parts.scaler.is_well_formed() || parts.scaler.dim() != parts.schema.len() {
            return corrupt("scaler parameters do not match the schema");
        }
        if !parts.labels.is_well_formed() {
            return corrupt("invalid label mapping");
        }
        if parts.index.dim() != parts.schema.len() || !parts.index.is_well_formed(parts.labels.len()) {
            return corrupt("neighbor index does not match the schema or labels");
        }

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &ModelParts {
        &self.parts
    }

    pub fn into_parts(self) -> ModelParts {
        self.parts
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.parts.schema
    }

    pub fn labels(&self) -> &LabelMapping {
        &self.parts.labels
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.parts.encoder
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.parts.scaler
    }

    pub fn index(&self) -> &NeighborIndex {
        &self.parts.index
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.parts.index.k()
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            features: self.schema().names().into_iter().map(String::from).collect(),
            k: self.k(),
            classes: self.labels().classes().to_vec(),
            n_samples: self.index().len(),
        }
    }

    /// Predict the major for a raw record.
    pub fn predict(&self, record: &RawRecord, top_n: usize) -> Result<Prediction> {
        let schema = self.schema();
        let row = schema.resolve(record)?;
        let encoded = self.parts.encoder.transform(schema, &row)?;
        let fallback_features = encoded
            .fallbacks
            .iter()
            .map(|&i| schema.features[i].name.clone())
            .collect();

        self.predict_encoded(&encoded.values, fallback_features, top_n)
    }

    /// Predict from an already-encoded, unscaled vector.
    ///
    /// A length mismatch is handled by `policy`: `Strict` rejects it,
    /// `Pad` fills missing trailing entries and drops excess ones.
    pub fn predict_vector(&self, values: &[f64], policy: VectorPolicy, top_n: usize) -> Result<Prediction> {
        let expected = self.schema().len();
        let values = match policy {
            _ if values.len() == expected => values.to_vec(),
            VectorPolicy::Strict => {
                return Err(Error::FeatureCountMismatch {
                    expected,
                    actual: values.len(),
                });
            }
            VectorPolicy::Pad { fill } => {
                warn!(
                    "Feature count mismatch: got {}, expected {}; padding with {}",
                    values.len(),
                    expected,
                    fill
                );
                let mut padded: Vec<f64> = values.iter().copied().take(expected).collect();
                padded.resize(expected, fill);
                padded
            }
        };

        self.predict_encoded(&values, Vec::new(), top_n)
    }

    fn predict_encoded(&self, values: &[f64], fallback_features: Vec<String>, top_n: usize) -> Result<Prediction> {
        if top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be at least 1".into()));
        }

        let k = self.k();
        let scaled = self.parts.scaler.transform(values)?;
        let neighbors = self.parts.index.query(&scaled, k)?;
        debug!(
            "Nearest neighbors: {:?}",
            neighbors.iter().map(|n| (n.index, n.distance)).collect::<Vec<_>>()
        );

        let distribution = vote(&neighbors, k)
            .into_iter()
            .enumerate()
            .map(|(i, (code, count))| {
                let label = self
                    .parts
                    .labels
                    .decode(code)
                    .ok_or_else(|| Error::CorruptModel(format!("label code {} out of range", code)))?;
                Ok(RankedClass {
                    rank: i + 1,
                    label: label.to_string(),
                    code,
                    probability: count as f64 / k as f64,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let winner = &distribution[0];
        debug!(
            "Predicted '{}' with {}/{} votes",
            winner.label,
            (winner.probability * k as f64).round(),
            k
        );

        Ok(Prediction {
            predicted_label: winner.label.clone(),
            confidence: winner.confidence(),
            distribution,
            top_n,
            k,
            neighbors,
            fallback_features,
        })
    }
}

/// Count votes per label code, ordered by count descending then code ascending.
fn vote(neighbors: &Neighbors, k: usize) -> Vec<(u32, usize)> {
    let mut counts: AHashMap<u32, usize> = AHashMap::with_capacity(k);
    for n in neighbors {
        *counts.entry(n.label).or_insert(0) += 1;
    }

    let mut tally: Vec<(u32, usize)> = counts.into_iter().collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    tally
}

/// A class with its vote share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedClass {
    pub rank: usize,
    pub label: String,
    pub code: u32,
    /// Vote fraction in [0, 1]
    pub probability: f64,
}

impl RankedClass {
    /// Vote fraction as a percentage
    #[inline]
    pub fn confidence(&self) -> f64 {
        self.probability * 100.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub predicted_label: String,
    /// Winning vote share, 0-100
    pub confidence: f64,
    /// Every class present among the neighbors, best first
    pub distribution: Vec<RankedClass>,
    pub top_n: usize,
    pub k: usize,
    pub neighbors: Neighbors,
    /// Categorical features whose value was unseen at fit time
    pub fallback_features: Vec<String>,
}

impl Prediction {
    /// The ranked alternatives, truncated to `top_n`
    pub fn top_predictions(&self) -> &[RankedClass] {
        let n = self.top_n.min(self.distribution.len());
        &self.distribution[..n]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub features: Vec<String>,
    pub k: usize,
    pub classes: Vec<String>,
    pub n_samples: usize,
}

/// Untrained / Trained state boundary
#[derive(Debug, Clone, Default)]
pub enum Classifier {
    #[default]
    Untrained,
    Trained(Arc<TrainedModel>),
}

impl Classifier {
    pub fn is_trained(&self) -> bool {
        matches!(self, Classifier::Trained(_))
    }

    pub fn model(&self) -> Result<&Arc<TrainedModel>> {
        match self {
            Classifier::Trained(model) => Ok(model),
            Classifier::Untrained => Err(Error::NotTrained),
        }
    }

    pub fn predict(&self, record: &RawRecord, top_n: usize) -> Result<Prediction> {
        self.model()?.predict(record, top_n)
    }
}

impl From<TrainedModel> for Classifier {
    fn from(model: TrainedModel) -> Self {
        Classifier::Trained(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FeatureDef;
    use serde_json::json;

    fn example(gender: &str, ipa: f64, ips: f64, label: &str) -> TrainingExample {
        let record = RawRecord::from_value(json!({
            "jenis_kelamin": gender,
            "matematika": if ipa > 0.5 { 1 } else { 0 },
            "sejarah": if ips > 0.5 { 1 } else { 0 },
            "minat_ipa": ipa,
            "minat_ips": ips,
        }))
        .unwrap();
        TrainingExample::new(record, label)
    }

    fn survey_examples() -> Vec<TrainingExample> {
        vec![
            example("Laki-laki", 0.9, 0.1, "Teknik Informatika"),
            example("Perempuan", 0.8, 0.2, "Kedokteran"),
            example("Laki-laki", 0.85, 0.15, "Teknik Informatika"),
            example("Perempuan", 0.2, 0.9, "Hukum"),
            example("Laki-laki", 0.1, 0.8, "Manajemen"),
            example("Perempuan", 0.15, 0.85, "Hukum"),
        ]
    }

    fn fit(k: usize, examples: &[TrainingExample]) -> TrainedModel {
        KnnClassifier::new(FeatureSchema::student_survey(), PredictorConfig::default().with_k(k))
            .unwrap()
            .fit(examples)
            .unwrap()
    }

    fn line_schema() -> FeatureSchema {
        FeatureSchema::new(vec![FeatureDef::continuous("x")])
    }

    fn point(x: f64, label: &str) -> TrainingExample {
        TrainingExample::new(RawRecord::from_value(json!({ "x": x })).unwrap(), label)
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let model = fit(3, &survey_examples());
        let record = RawRecord::from_value(json!({"jenis_kelamin": "Laki-laki", "minat_ipa": 0.5})).unwrap();
        let prediction = model.predict(&record, 5).unwrap();

        let total: f64 = prediction.distribution.iter().map(|c| c.probability).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(prediction.neighbors.len(), 3);
        assert!(prediction
            .distribution
            .windows(2)
            .all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_identical_example_with_k1() {
        let examples = survey_examples();
        let model = fit(1, &examples);

        for example in &examples {
            let prediction = model.predict(&example.record, 5).unwrap();
            assert_eq!(prediction.predicted_label, example.label);
            assert_eq!(prediction.distribution[0].probability, 1.0);
            assert_eq!(prediction.confidence, 100.0);
            assert_eq!(prediction.neighbors[0].distance, 0.0);
        }
    }

    #[test]
    fn test_vote_counts_with_tied_distances() {
        // Query at 0: "A" at -1 and +1 tie at distance 1, "B" at 2 is third.
        let examples = vec![point(-1.0, "A"), point(1.0, "A"), point(2.0, "B"), point(10.0, "B")];
        let model = KnnClassifier::new(line_schema(), PredictorConfig::default().with_k(3))
            .unwrap()
            .fit(&examples)
            .unwrap();

        let record = RawRecord::from_value(json!({"x": 0.0})).unwrap();
        let prediction = model.predict(&record, 5).unwrap();

        assert_eq!(prediction.predicted_label, "A");
        assert_eq!(prediction.distribution.len(), 2);
        assert!((prediction.distribution[0].probability - 2.0 / 3.0).abs() < 1e-12);
        assert!((prediction.distribution[1].probability - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(prediction.distribution[1].label, "B");
    }

    #[test]
    fn test_vote_tie_prefers_smaller_label_code() {
        let examples = vec![point(1.0, "Zoologi"), point(-1.0, "Arsitektur")];
        let model = KnnClassifier::new(line_schema(), PredictorConfig::default().with_k(2))
            .unwrap()
            .fit(&examples)
            .unwrap();

        let record = RawRecord::from_value(json!({"x": 0.0})).unwrap();
        let prediction = model.predict(&record, 5).unwrap();
        assert_eq!(prediction.predicted_label, "Arsitektur");
        assert_eq!(prediction.confidence, 50.0);
    }

    #[test]
    fn test_missing_indicators_use_defaults() {
        let model = fit(3, &survey_examples());
        let record = RawRecord::from_value(json!({"jenis_kelamin": "Perempuan"})).unwrap();
        let prediction = model.predict(&record, 5).unwrap();

        assert!(!prediction.top_predictions().is_empty());
        assert!(prediction.fallback_features.is_empty());
    }

    #[test]
    fn test_unseen_category_is_reported() {
        let model = fit(3, &survey_examples());
        let record = RawRecord::from_value(json!({"jenis_kelamin": "L", "minat_ipa": 0.9})).unwrap();

        let first = model.predict(&record, 5).unwrap();
        let second = model.predict(&record, 5).unwrap();
        assert_eq!(first.fallback_features, vec!["jenis_kelamin".to_string()]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_top_n_truncates() {
        let model = fit(5, &survey_examples());
        let record = RawRecord::from_value(json!({"jenis_kelamin": "Perempuan", "minat_ipa": 0.5, "minat_ips": 0.5})).unwrap();
        let prediction = model.predict(&record, 1).unwrap();
        assert_eq!(prediction.top_predictions().len(), 1);
        assert!(prediction.distribution.len() >= 1);
        assert!(model.predict(&record, 0).is_err());
    }

    #[test]
    fn test_not_enough_data() {
        let classifier = KnnClassifier::new(FeatureSchema::student_survey(), PredictorConfig::default().with_k(7)).unwrap();
        assert!(matches!(
            classifier.fit(&survey_examples()),
            Err(Error::NotEnoughData { k: 7, available: 6 })
        ));
    }

    #[test]
    fn test_untrained_classifier() {
        let classifier = Classifier::default();
        assert!(!classifier.is_trained());
        let record = RawRecord::from_value(json!({"jenis_kelamin": "Perempuan"})).unwrap();
        assert!(matches!(classifier.predict(&record, 5), Err(Error::NotTrained)));

        let trained = Classifier::from(fit(3, &survey_examples()));
        assert!(trained.predict(&record, 5).is_ok());
    }

    #[test]
    fn test_vector_policy() {
        let model = fit(3, &survey_examples());
        let short = vec![0.0; 10];

        assert!(matches!(
            model.predict_vector(&short, VectorPolicy::Strict, 5),
            Err(Error::FeatureCountMismatch { expected: 15, actual: 10 })
        ));

        let padded = model.predict_vector(&short, VectorPolicy::Pad { fill: 0.0 }, 5).unwrap();
        let exact = model.predict_vector(&[0.0; 15], VectorPolicy::Strict, 5).unwrap();
        assert_eq!(padded.distribution, exact.distribution);

        let long = vec![0.0; 20];
        let truncated = model.predict_vector(&long, VectorPolicy::Pad { fill: 9.0 }, 5).unwrap();
        assert_eq!(truncated.distribution, exact.distribution);
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_parts() {
        let model = fit(3, &survey_examples());
        let mut parts = model.clone().into_parts();
        parts.schema = line_schema();
        assert!(matches!(TrainedModel::from_parts(parts), Err(Error::CorruptModel(_))));

        let restored = TrainedModel::from_parts(model.clone().into_parts()).unwrap();
        assert_eq!(restored, model);
    }

    fn edited_parts(model: &TrainedModel, edit: impl FnOnce(&mut serde_json::Value)) -> ModelParts {
        let mut value = serde_json::to_value(model.parts()).unwrap();
        edit(&mut value);
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_parts_rejects_bad_index() {
        let model = fit(3, &survey_examples());

        for k in [0, 7] {
            let parts = edited_parts(&model, |v| v["index"]["k"] = json!(k));
            assert!(
                matches!(TrainedModel::from_parts(parts), Err(Error::CorruptModel(_))),
                "k = {}",
                k
            );
        }

        let n_classes = model.labels().len();
        let parts = edited_parts(&model, |v| v["index"]["labels"][0] = json!(n_classes));
        assert!(matches!(TrainedModel::from_parts(parts), Err(Error::CorruptModel(_))));
    }

    #[test]
    fn test_huge_feature_values_survive_reload() {
        let examples = vec![point(1e200, "A"), point(-1e200, "B"), point(0.0, "C")];
        let model = KnnClassifier::new(line_schema(), PredictorConfig::default().with_k(1))
            .unwrap()
            .fit(&examples)
            .unwrap();

        assert!(model.scaler().std()[0].is_finite());
        let restored = TrainedModel::from_parts(model.clone().into_parts()).unwrap();
        assert_eq!(restored, model);

        let query = RawRecord::from_value(json!({"x": -9e199})).unwrap();
        assert_eq!(restored.predict(&query, 3).unwrap().predicted_label, "B");
    }
}
