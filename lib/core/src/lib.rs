//! # jurusan Core
//!
//! Core library for the jurusan major recommender.
//!
//! This crate provides the k-nearest-neighbor pipeline:
//!
//! - [`FeatureSchema`] - Ordered feature contract between records and vectors
//! - [`CategoricalEncoder`] - Category strings to stable integer codes
//! - [`FeatureScaler`] - Per-dimension standardization
//! - [`NeighborIndex`] - Brute-force Euclidean k-nearest search
//! - [`KnnClassifier`] / [`TrainedModel`] - Fit and unweighted-vote prediction
//!
//! ## Example
//!
//! ```rust
//! use jurusan_core::{FeatureSchema, KnnClassifier, PredictorConfig, RawRecord, TrainingExample};
//! use serde_json::json;
//!
//! let examples: Vec<TrainingExample> = [
//!     ("Laki-laki", 0.9, "Teknik Informatika"),
//!     ("Perempuan", 0.8, "Kedokteran"),
//!     ("Perempuan", 0.1, "Hukum"),
//! ]
//! .iter()
//! .map(|(gender, ipa, major)| {
//!     let record = RawRecord::from_value(json!({"jenis_kelamin": gender, "minat_ipa": ipa})).unwrap();
//!     TrainingExample::new(record, *major)
//! })
//! .collect();
//!
//! let classifier = KnnClassifier::new(FeatureSchema::student_survey(), PredictorConfig::default().with_k(1)).unwrap();
//! let model = classifier.fit(&examples).unwrap();
//!
//! let query = RawRecord::from_value(json!({"jenis_kelamin": "Laki-laki", "minat_ipa": 0.95})).unwrap();
//! let prediction = model.predict(&query, 5).unwrap();
//! assert_eq!(prediction.predicted_label, "Teknik Informatika");
//! ```

pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod evaluate;
pub mod index;
pub mod record;
pub mod scaler;
pub mod schema;
pub mod vector;

pub use classifier::{Classifier, KnnClassifier, ModelParts, ModelSummary, Prediction, RankedClass, TrainedModel};
pub use config::{PredictorConfig, VectorPolicy};
pub use encoder::{CategoricalEncoder, CategoryMapping, Encoded, EncodedRow, LabelMapping, FALLBACK_CODE};
pub use error::{Error, Result};
pub use evaluate::{evaluate, fit_and_evaluate, select_k, train_test_split, ClassReport, TrainingReport};
pub use index::{Neighbor, NeighborIndex, Neighbors};
pub use record::{RawRecord, TrainingExample};
pub use scaler::FeatureScaler;
pub use schema::{FeatureDef, FeatureDefault, FeatureKind, FeatureSchema, FieldValue, ScoreRange};
pub use vector::FeatureVector;
