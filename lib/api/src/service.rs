use crate::analysis::analyze;
use crate::request::normalize_request;
use crate::response::{PredictionResponse, PredictionSuccess};
use jurusan_core::record::coerce_number;
use jurusan_core::{Classifier, Error, ModelSummary, PredictorConfig, Result, TrainedModel, VectorPolicy};
use jurusan_storage::{ArtifactMetadata, ModelStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Description of the model currently being served
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub path: String,
    #[serde(flatten)]
    pub summary: ModelSummary,
    /// Absent when the model was installed without going through the store
    #[serde(default)]
    pub metadata: Option<ArtifactMetadata>,
}

/// Per-request knobs taken from [`PredictorConfig`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictOptions {
    pub top_n: usize,
    /// Applied when the body is a pre-encoded feature array
    pub vector_policy: VectorPolicy,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self::from(&PredictorConfig::default())
    }
}

impl From<&PredictorConfig> for PredictOptions {
    fn from(config: &PredictorConfig) -> Self {
        Self {
            top_n: config.top_n,
            vector_policy: config.vector_policy,
        }
    }
}

struct Loaded {
    classifier: Classifier,
    metadata: Option<ArtifactMetadata>,
}

/// Serves predictions from one model artifact.
///
/// The model is swapped as a whole behind an `Arc`, so in-flight
/// predictions keep the model they started with while a reload happens.
pub struct PredictionService {
    store: ModelStore,
    state: RwLock<Loaded>,
    options: PredictOptions,
}

impl PredictionService {
    /// Create an untrained service backed by `store`.
    pub fn new(store: ModelStore, options: PredictOptions) -> Self {
        Self {
            store,
            state: RwLock::new(Loaded {
                classifier: Classifier::Untrained,
                metadata: None,
            }),
            options,
        }
    }

    /// Create the service and try to load the artifact.
    ///
    /// A missing or unreadable artifact leaves the service untrained.
    pub fn open(store: ModelStore, options: PredictOptions) -> Self {
        let service = Self::new(store, options);
        match service.reload() {
            Ok(info) => info!(
                "Serving model from {}: {} classes, k = {}",
                info.path,
                info.summary.classes.len(),
                info.summary.k
            ),
            Err(Error::ModelFileNotFound(path)) => {
                info!("No model at {:?}, starting untrained", path)
            }
            Err(e) => warn!("Failed to load model from {:?}, starting untrained: {}", service.store.path(), e),
        }
        service
    }

    /// Install an already trained model.
    pub fn with_model(store: ModelStore, model: TrainedModel, options: PredictOptions) -> Self {
        let service = Self::new(store, options);
        service.state.write().classifier = Classifier::from(model);
        service
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn options(&self) -> PredictOptions {
        self.options
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().classifier.is_trained()
    }

    /// Re-read the artifact. On failure the current model stays in place.
    pub fn reload(&self) -> Result<ModelInfo> {
        let (model, metadata) = self.store.load_with_metadata()?;
        let summary = model.summary();

        let mut state = self.state.write();
        state.classifier = Classifier::from(model);
        state.metadata = Some(metadata.clone());

        Ok(ModelInfo {
            path: self.store.path().display().to_string(),
            summary,
            metadata: Some(metadata),
        })
    }

    pub fn info(&self) -> Result<ModelInfo> {
        let state = self.state.read();
        let model = state.classifier.model()?;
        Ok(ModelInfo {
            path: self.store.path().display().to_string(),
            summary: model.summary(),
            metadata: state.metadata.clone(),
        })
    }

    pub fn predict(&self, body: Value) -> Result<PredictionSuccess> {
        let model = Arc::clone(self.state.read().classifier.model()?);
        predict_with(&model, body, self.options)
    }

    /// Like [`predict`](Self::predict), with errors folded into the result document.
    pub fn respond(&self, body: Value) -> PredictionResponse {
        PredictionResponse::from(self.predict(body))
    }
}

/// Run one request body through `model`.
///
/// An object is treated as a raw record. An array is a feature vector
/// already in schema order and goes through the vector policy.
pub fn predict_with(model: &TrainedModel, body: Value, options: PredictOptions) -> Result<PredictionSuccess> {
    if let Value::Array(items) = body {
        let values = items
            .iter()
            .enumerate()
            .map(|(i, v)| coerce_number(&format!("[{}]", i), v))
            .collect::<Result<Vec<f64>>>()?;
        let prediction = model.predict_vector(&values, options.vector_policy, options.top_n)?;
        return Ok(PredictionSuccess::from_prediction(&prediction, None));
    }

    let record = normalize_request(model.schema(), body)?;
    let prediction = model.predict(&record, options.top_n)?;
    let analysis = analyze(model.schema(), &record)?;
    Ok(PredictionSuccess::from_prediction(&prediction, analysis))
}

/// Load the artifact, predict once and report the outcome as a document.
pub fn predict_once(store: &ModelStore, body: Value, options: PredictOptions) -> PredictionResponse {
    PredictionResponse::from(store.load().and_then(|model| predict_with(&model, body, options)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jurusan_core::{FeatureSchema, KnnClassifier, PredictorConfig, RawRecord, TrainingExample};
    use serde_json::json;
    use tempfile::TempDir;

    fn model() -> TrainedModel {
        let examples: Vec<TrainingExample> = [
            ("Laki-laki", 0.9, 0.1, "Teknik Informatika"),
            ("Laki-laki", 0.8, 0.2, "Teknik Informatika"),
            ("Perempuan", 0.7, 0.3, "Kedokteran"),
            ("Perempuan", 0.1, 0.9, "Hukum"),
            ("Laki-laki", 0.2, 0.8, "Manajemen"),
        ]
        .iter()
        .map(|(gender, ipa, ips, label)| {
            let record = RawRecord::from_value(json!({
                "jenis_kelamin": gender,
                "minat_ipa": ipa,
                "minat_ips": ips,
            }))
            .unwrap();
            TrainingExample::new(record, *label)
        })
        .collect();

        KnnClassifier::new(FeatureSchema::student_survey(), PredictorConfig::default())
            .unwrap()
            .fit(&examples)
            .unwrap()
    }

    #[test]
    fn test_open_without_artifact_is_untrained() {
        let dir = TempDir::new().unwrap();
        let service = PredictionService::open(ModelStore::new(dir.path().join("model.bin")), PredictOptions::default());
        assert!(!service.is_trained());

        let response = service.respond(json!({"jenis_kelamin": "Laki-laki"}));
        match response {
            PredictionResponse::Failure(f) => assert_eq!(f.error_kind, "not_trained"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_open_loads_saved_model() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("model.bin"));
        store.save(&model()).unwrap();

        let service = PredictionService::open(store, PredictOptions::default());
        assert!(service.is_trained());
        let info = service.info().unwrap();
        assert_eq!(info.summary.k, 3);
        assert!(info.metadata.is_some());

        let success = service
            .predict(json!({"jenis_kelamin": "Laki-laki", "minat_ipa": 0.85, "minat_ips": 0.15}))
            .unwrap();
        assert_eq!(success.predicted_major, "Teknik Informatika");
        assert_eq!(success.k_value, 3);
        assert_eq!(success.nearest_neighbors_count, 3);
        assert!(success.academic_analysis.is_none());
    }

    #[test]
    fn test_failed_reload_keeps_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let store = ModelStore::new(&path);
        store.save(&model()).unwrap();

        let service = PredictionService::open(store, PredictOptions::default());
        std::fs::write(&path, b"not a model").unwrap();

        let err = service.reload().unwrap_err();
        assert_eq!(err.kind(), "corrupt_model");
        assert!(service.is_trained());
        assert!(service.predict(json!({"jenis_kelamin": "Perempuan"})).is_ok());
    }

    #[test]
    fn test_predict_once_missing_model() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("absent.bin"));
        match predict_once(&store, json!({"jenis_kelamin": "Laki-laki"}), PredictOptions::default()) {
            PredictionResponse::Failure(f) => {
                assert!(!f.success);
                assert_eq!(f.error_kind, "model_file_not_found");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_body() {
        let dir = TempDir::new().unwrap();
        let service =
            PredictionService::with_model(ModelStore::new(dir.path().join("m.bin")), model(), PredictOptions::default());
        assert_eq!(service.predict(json!("a string")).unwrap_err().kind(), "invalid_input");
        assert_eq!(service.predict(json!(["x", "y"])).unwrap_err().kind(), "invalid_input");
    }

    #[test]
    fn test_vector_body_follows_policy() {
        let dir = TempDir::new().unwrap();
        let short = json!([0, 1, 0]);

        let strict =
            PredictionService::with_model(ModelStore::new(dir.path().join("m.bin")), model(), PredictOptions::default());
        assert_eq!(strict.predict(short.clone()).unwrap_err().kind(), "feature_count_mismatch");

        let padded = PredictionService::with_model(
            ModelStore::new(dir.path().join("m.bin")),
            model(),
            PredictOptions {
                top_n: 5,
                vector_policy: VectorPolicy::Pad { fill: 0.0 },
            },
        );
        let success = padded.predict(short).unwrap();
        assert_eq!(success.k_value, 3);
        assert!(success.academic_analysis.is_none());
    }
}
