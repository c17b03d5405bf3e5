use serde::{Deserialize, Serialize};

/// A dense, post-encoding feature vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureVector {
    data: Vec<f64>,
}

impl FeatureVector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f64]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Squared Euclidean distance
    #[inline]
    pub fn squared_l2_distance(&self, other: &[f64]) -> f64 {
        if self.dim() != other.len() {
            return f64::INFINITY;
        }

        self.data
            .iter()
            .zip(other.iter())
            .map(|(a, b)| {
                let d = a - b;
                d * d
            })
            .sum()
    }

    /// Compute L2 (Euclidean) distance
    #[inline]
    pub fn l2_distance(&self, other: &[f64]) -> f64 {
        self.squared_l2_distance(other).sqrt()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.data
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(data: Vec<f64>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_distance() {
        let v1 = FeatureVector::new(vec![0.0, 0.0]);
        assert!((v1.l2_distance(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(v1.l2_distance(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_is_infinite() {
        let v1 = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        assert!(v1.l2_distance(&[1.0]).is_infinite());
    }
}
