//! JSON result documents
//!
//! Every prediction, successful or not, is reported as exactly one JSON
//! object with a `success` flag. Callers branch on that flag, never on the
//! process exit status.

use crate::analysis::AcademicAnalysis;
use jurusan_core::{Error, Prediction, RankedClass, Result};
use serde::{Deserialize, Serialize};

/// One entry of `top_predictions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPrediction {
    pub rank: usize,
    pub jurusan: String,
    /// Vote fraction in [0, 1]
    pub probability: f64,
    /// Same value as a percentage
    pub confidence: f64,
}

impl From<&RankedClass> for TopPrediction {
    fn from(class: &RankedClass) -> Self {
        Self {
            rank: class.rank,
            jurusan: class.label.clone(),
            probability: class.probability,
            confidence: class.confidence(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSuccess {
    pub success: bool,
    pub predicted_major: String,
    pub confidence: f64,
    pub top_predictions: Vec<TopPrediction>,
    pub k_value: usize,
    pub nearest_neighbors_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub academic_analysis: Option<AcademicAnalysis>,
}

impl PredictionSuccess {
    pub fn from_prediction(prediction: &Prediction, academic_analysis: Option<AcademicAnalysis>) -> Self {
        Self {
            success: true,
            predicted_major: prediction.predicted_label.clone(),
            confidence: prediction.confidence,
            top_predictions: prediction.top_predictions().iter().map(TopPrediction::from).collect(),
            k_value: prediction.k,
            nearest_neighbors_count: prediction.neighbors.len(),
            fallback_features: prediction.fallback_features.clone(),
            academic_analysis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub success: bool,
    pub error: String,
    /// Stable machine-readable error category
    pub error_kind: String,
}

impl From<&Error> for PredictionFailure {
    fn from(error: &Error) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            error_kind: error.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Success(PredictionSuccess),
    Failure(PredictionFailure),
}

impl PredictionResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionResponse::Success(_))
    }

    pub fn to_json_string(&self) -> String {
        // Both variants hold only strings, numbers and plain structs
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"success":false,"error":"failed to serialize result: {}","error_kind":"serialization"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

impl From<Result<PredictionSuccess>> for PredictionResponse {
    fn from(result: Result<PredictionSuccess>) -> Self {
        match result {
            Ok(success) => PredictionResponse::Success(success),
            Err(e) => PredictionResponse::Failure(PredictionFailure::from(&e)),
        }
    }
}
