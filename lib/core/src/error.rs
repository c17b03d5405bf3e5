use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model is not trained yet")]
    NotTrained,

    #[error("Model file not found: {}", .0.display())]
    ModelFileNotFound(PathBuf),

    #[error("Corrupt model artifact: {0}")]
    CorruptModel(String),

    #[error("Insufficient data: k = {k} but only {available} vectors are stored")]
    InsufficientData { k: usize, available: usize },

    #[error("Not enough training data: k = {k} but only {available} examples were supplied")]
    NotEnoughData { k: usize, available: usize },

    #[error("Feature count mismatch: expected {expected}, got {actual}")]
    FeatureCountMismatch { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Stable identifier for the failure class, used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::NotTrained => "not_trained",
            Error::ModelFileNotFound(_) => "model_file_not_found",
            Error::CorruptModel(_) => "corrupt_model",
            Error::InsufficientData { .. } => "insufficient_data",
            Error::NotEnoughData { .. } => "not_enough_data",
            Error::FeatureCountMismatch { .. } => "feature_count_mismatch",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
