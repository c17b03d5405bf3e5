use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_K: usize = 3;
pub const DEFAULT_TOP_N: usize = 5;
/// Ranked alternatives shown by the academic-record pipeline
pub const ACADEMIC_TOP_N: usize = 7;
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SPLIT_SEED: u64 = 42;
/// Fill used by the academic pipeline when padding a short vector
pub const DEFAULT_PAD_FILL: f64 = 75.0;

/// How to treat a pre-encoded vector whose length disagrees with the schema
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VectorPolicy {
    /// Reject with `FeatureCountMismatch`
    #[default]
    Strict,
    /// Pad missing trailing features with `fill`, drop excess ones
    Pad { fill: f64 },
}

/// Classifier and pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PredictorConfig {
    /// Number of neighbors that vote
    pub k: usize,
    /// Length of the ranked alternative list
    pub top_n: usize,
    pub vector_policy: VectorPolicy,
    /// Share of examples held out for evaluation when training
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            top_n: DEFAULT_TOP_N,
            vector_policy: VectorPolicy::Strict,
            test_fraction: DEFAULT_TEST_FRACTION,
            split_seed: DEFAULT_SPLIT_SEED,
        }
    }
}

impl PredictorConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        let config: PredictorConfig = serde_json::from_slice(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Academic-record pipeline: seven alternatives, and short feature
    /// vectors padded with the default score instead of rejected.
    pub fn academic() -> Self {
        Self {
            top_n: ACADEMIC_TOP_N,
            vector_policy: VectorPolicy::Pad { fill: DEFAULT_PAD_FILL },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    #[must_use]
    pub fn with_vector_policy(mut self, policy: VectorPolicy) -> Self {
        self.vector_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".into()));
        }
        if self.top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(Error::InvalidConfig(format!(
                "test_fraction must be in [0, 1), got {}",
                self.test_fraction
            )));
        }
        if let VectorPolicy::Pad { fill } = self.vector_policy {
            if !fill.is_finite() {
                return Err(Error::InvalidConfig("pad fill must be finite".into()));
            }
        }
        Ok(())
    }
}
