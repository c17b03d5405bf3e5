pub mod analysis;
pub mod request;
pub mod response;
pub mod rest;
pub mod service;

pub use analysis::{analyze, AcademicAnalysis};
pub use request::{normalize_request, MASTERED_SUBJECTS_FIELD};
pub use response::{PredictionFailure, PredictionResponse, PredictionSuccess, TopPrediction};
pub use rest::RestApi;
pub use service::{predict_once, predict_with, ModelInfo, PredictOptions, PredictionService};
