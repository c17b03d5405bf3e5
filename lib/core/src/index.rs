//! Brute-force nearest neighbor index
//!
//! Stores scaled training vectors with their label codes and answers
//! k-nearest queries by a full Euclidean scan. Distances are computed in
//! parallel; selection is sequential and ordered by `(distance, insertion
//! index)`, so equal distances always resolve to the earlier example.

use crate::vector::FeatureVector;
use crate::{Error, Result};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BinaryHeap;

/// Typical k values fit inline
pub type Neighbors = SmallVec<[Neighbor; 8]>;

/// One result of a k-nearest query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Insertion index of the stored example
    pub index: usize,
    /// Label code of the stored example
    pub label: u32,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NeighborIndex {
    dim: usize,
    k: usize,
    vectors: Vec<FeatureVector>,
    labels: Vec<u32>,
}

impl NeighborIndex {
    /// Store vectors and labels verbatim.
    ///
    /// Fails with `InsufficientData` if fewer than `k` vectors are given.
    pub fn fit(vectors: Vec<FeatureVector>, labels: Vec<u32>, k: usize) -> Result<Self> {
        if vectors.len() != labels.len() {
            return Err(Error::InvalidInput(format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }

        if k == 0 || k > vectors.len() {
            return Err(Error::InsufficientData {
                k,
                available: vectors.len(),
            });
        }

        let dim = vectors[0].dim();
        if let Some(v) = vectors.iter().find(|v| v.dim() != dim) {
            return Err(Error::FeatureCountMismatch {
                expected: dim,
                actual: v.dim(),
            });
        }

        if !vectors.iter().all(FeatureVector::is_finite) {
            return Err(Error::InvalidInput(
                "training vectors must be finite".into(),
            ));
        }

        Ok(Self {
            dim,
            k,
            vectors,
            labels,
        })
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// k the index was fitted with
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn vectors(&self) -> &[FeatureVector] {
        &self.vectors
    }

    /// The `k` nearest stored examples in ascending distance order.
    pub fn query(&self, vector: &[f64], k: usize) -> Result<Neighbors> {
        if vector.len() != self.dim {
            return Err(Error::FeatureCountMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        if k == 0 || k > self.len() {
            return Err(Error::InsufficientData {
                k,
                available: self.len(),
            });
        }

        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidInput("query vector must be finite".into()));
        }

        let distances: Vec<f64> = self
            .vectors
            .par_iter()
            .map(|v| v.l2_distance(vector))
            .collect();

        // Max-heap of the k best so far; the root is the current worst.
        let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::with_capacity(k + 1);
        for (index, &d) in distances.iter().enumerate() {
            let candidate = (OrderedFloat(d), index);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|(d, index)| Neighbor {
                index,
                label: self.labels[index],
                distance: d.into_inner(),
            })
            .collect())
    }

    pub(crate) fn is_well_formed(&self, n_classes: usize) -> bool {
        !self.vectors.is_empty()
            && self.vectors.len() == self.labels.len()
            && self.k >= 1
            && self.k <= self.vectors.len()
            && self.vectors.iter().all(|v| v.dim() == self.dim && v.is_finite())
            && self.labels.iter().all(|&l| (l as usize) < n_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(points: &[[f64; 2]], labels: &[u32], k: usize) -> NeighborIndex {
        NeighborIndex::fit(
            points.iter().map(|p| FeatureVector::from_slice(p)).collect(),
            labels.to_vec(),
            k,
        )
        .unwrap()
    }

    #[test]
    fn test_query_orders_by_distance() {
        let idx = index(&[[0.0, 0.0], [5.0, 5.0], [1.0, 0.0], [2.0, 0.0]], &[0, 1, 0, 1], 3);
        let result = idx.query(&[0.1, 0.0], 3).unwrap();

        let order: Vec<usize> = result.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![0, 2, 3]);
        assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(result[2].label, 1);
    }

    #[test]
    fn test_ties_prefer_lower_insertion_index() {
        // Four points all at distance 1 from the origin.
        let idx = index(&[[0.0, 1.0], [1.0, 0.0], [0.0, -1.0], [-1.0, 0.0]], &[3, 2, 1, 0], 2);
        for _ in 0..5 {
            let result = idx.query(&[0.0, 0.0], 2).unwrap();
            let order: Vec<usize> = result.iter().map(|n| n.index).collect();
            assert_eq!(order, vec![0, 1]);
        }
    }

    #[test]
    fn test_exact_match_distance_zero() {
        let idx = index(&[[0.3, 0.7], [0.9, 0.1]], &[0, 1], 1);
        let result = idx.query(&[0.9, 0.1], 1).unwrap();
        assert_eq!(result[0].index, 1);
        assert_eq!(result[0].distance, 0.0);
    }

    #[test]
    fn test_fit_requires_k_vectors() {
        let vectors = vec![FeatureVector::new(vec![1.0]), FeatureVector::new(vec![2.0])];
        assert!(matches!(
            NeighborIndex::fit(vectors.clone(), vec![0, 1], 3),
            Err(Error::InsufficientData { k: 3, available: 2 })
        ));
        assert!(NeighborIndex::fit(vectors, vec![0, 1], 0).is_err());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let idx = index(&[[0.0, 0.0], [1.0, 1.0]], &[0, 1], 1);
        assert!(matches!(
            idx.query(&[0.0, 0.0, 0.0], 1),
            Err(Error::FeatureCountMismatch { expected: 2, actual: 3 })
        ));
        assert!(idx.query(&[f64::NAN, 0.0], 1).is_err());
    }
}
