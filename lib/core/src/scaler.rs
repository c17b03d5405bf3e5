//! Feature standardization
//!
//! `z = (x - mean) / std` per dimension, with population statistics learned
//! from training data. A zero-variance dimension divides by 1.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Learned per-dimension mean and standard deviation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl FeatureScaler {
    /// Compute statistics over `rows`. All rows must share one dimension.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let first = rows.first().ok_or_else(|| {
            Error::InvalidInput("cannot fit scaler on an empty matrix".into())
        })?;
        let dim = first.len();

        if let Some(row) = rows.iter().find(|r| r.len() != dim) {
            return Err(Error::FeatureCountMismatch {
                expected: dim,
                actual: row.len(),
            });
        }

        let n = rows.len() as f64;
        let mut mean = Vec::with_capacity(dim);
        let mut std = Vec::with_capacity(dim);

        for j in 0..dim {
            let head = first[j];
            // Constant columns get exact statistics so rounding in the
            // running sum cannot produce a tiny non-zero variance.
            if rows.iter().all(|r| r[j] == head) {
                mean.push(head);
                std.push(0.0);
                continue;
            }

            // Statistics are taken on the column divided by its largest
            // magnitude, so squaring cannot overflow for large finite inputs.
            let c = rows.iter().map(|r| r[j].abs()).fold(0.0, f64::max);
            let m = rows.iter().map(|r| r[j] / c).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] / c - m) * (r[j] / c - m)).sum::<f64>() / n;
            mean.push(m * c);
            std.push(var.sqrt() * c);
        }

        let scaler = Self { mean, std };
        if !scaler.is_well_formed() {
            return Err(Error::InvalidInput(
                "feature values are too large to standardize".into(),
            ));
        }
        Ok(scaler)
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Raw standard deviations, zeros included
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Divisor actually applied to dimension `j`
    #[inline]
    pub fn scale(&self, j: usize) -> f64 {
        let s = self.std[j];
        if s > 0.0 {
            s
        } else {
            1.0
        }
    }

    pub fn transform(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.dim() {
            return Err(Error::FeatureCountMismatch {
                expected: self.dim(),
                actual: x.len(),
            });
        }

        Ok(x
            .iter()
            .enumerate()
            .map(|(j, v)| (v - self.mean[j]) / self.scale(j))
            .collect())
    }

    pub fn inverse_transform(&self, z: &[f64]) -> Result<Vec<f64>> {
        if z.len() != self.dim() {
            return Err(Error::FeatureCountMismatch {
                expected: self.dim(),
                actual: z.len(),
            });
        }

        Ok(z
            .iter()
            .enumerate()
            .map(|(j, v)| v * self.scale(j) + self.mean[j])
            .collect())
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.mean.len() == self.std.len()
            && self.mean.iter().all(|m| m.is_finite())
            && self.std.iter().all(|s| s.is_finite() && *s >= 0.0)
    }
}
