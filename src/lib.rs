//! # jurusan
//!
//! University major recommendation with k-nearest neighbors.
//!
//! A student profile (gender, mastered subjects, interests, or a full set of
//! report-card scores) is encoded, standardized and compared against labeled
//! profiles of students whose chosen major is known. The `k` closest
//! profiles vote, and the vote shares become a ranked list of majors.
//!
//! ## Quick Start
//!
//! ### From the command line
//!
//! ```bash
//! jurusan train --data students.json --model ./data/model.bin --select-k
//! jurusan predict --model ./data/model.bin '{"jenis_kelamin": "Perempuan", "minat_ipa": 0.9}'
//! jurusan serve --model ./data/model.bin --port 8000
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use jurusan::prelude::*;
//!
//! let examples = load_examples("students.json", DEFAULT_LABEL_FIELD).unwrap();
//! let classifier = KnnClassifier::new(FeatureSchema::student_survey(), PredictorConfig::default()).unwrap();
//! let model = classifier.fit(&examples).unwrap();
//!
//! let store = ModelStore::new("./data/model.bin");
//! store.save(&model).unwrap();
//!
//! let record = RawRecord::from_json_str(r#"{"jenis_kelamin": "Laki-laki", "matematika": 1}"#).unwrap();
//! let prediction = model.predict(&record, 5).unwrap();
//! println!("{} ({:.1}%)", prediction.predicted_label, prediction.confidence);
//! ```
//!
//! ## Crate Structure
//!
//! - `jurusan-core` - schema, encoders, scaler, neighbor index and classifier
//! - `jurusan-storage` - model artifacts and training data files
//! - `jurusan-api` - result documents, request normalization and the REST API

// Re-export core types
pub use jurusan_core::{
    Classifier, KnnClassifier, TrainedModel, Prediction, RankedClass, ModelSummary,
    FeatureSchema, FeatureDef, FeatureKind, RawRecord, TrainingExample,
    PredictorConfig, VectorPolicy, TrainingReport,
    select_k, fit_and_evaluate,
    Error, Result,
};

// Re-export storage
pub use jurusan_storage::{load_examples, ModelStore, DEFAULT_LABEL_FIELD};

// Re-export API
pub use jurusan_api::{PredictionResponse, PredictionService, PredictOptions, RestApi};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Classifier, KnnClassifier, TrainedModel, Prediction, RankedClass, ModelSummary,
        FeatureSchema, FeatureDef, FeatureKind, RawRecord, TrainingExample,
        PredictorConfig, VectorPolicy, TrainingReport,
        select_k, fit_and_evaluate,
        Error, Result,
        load_examples, ModelStore, DEFAULT_LABEL_FIELD,
        PredictionResponse, PredictionService, PredictOptions, RestApi,
    };
}
