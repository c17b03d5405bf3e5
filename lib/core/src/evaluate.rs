//! Holdout evaluation and k selection
//!
//! The split is a seeded shuffle, so the same examples, fraction and seed
//! always produce the same partition and therefore the same model.

use crate::classifier::{KnnClassifier, TrainedModel};
use crate::config::PredictorConfig;
use crate::record::TrainingExample;
use crate::schema::FeatureSchema;
use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// k values tried by [`select_k`] when none are given
pub const DEFAULT_K_CANDIDATES: [usize; 3] = [3, 5, 7];

/// Per-class precision and recall on the holdout set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub k: usize,
    /// `None` when nothing was held out
    pub accuracy: Option<f64>,
    pub n_training_samples: usize,
    pub n_test_samples: usize,
    pub per_class: Vec<ClassReport>,
}

/// Split into `(train, test)`. The test side gets `ceil(n * fraction)`
/// examples, and both sides are non-empty whenever `fraction > 0` and
/// there are at least two examples.
pub fn train_test_split(
    examples: &[TrainingExample],
    test_fraction: f64,
    seed: u64,
) -> (Vec<TrainingExample>, Vec<TrainingExample>) {
    let n = examples.len();
    let n_test = if test_fraction <= 0.0 || n < 2 {
        0
    } else {
        ((n as f64 * test_fraction).ceil() as usize).clamp(1, n - 1)
    };

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let test = order[..n_test].iter().map(|&i| examples[i].clone()).collect();
    let train = order[n_test..].iter().map(|&i| examples[i].clone()).collect();
    (train, test)
}

/// Score `model` on held-out examples.
pub fn evaluate(model: &TrainedModel, test: &[TrainingExample], n_training_samples: usize) -> Result<TrainingReport> {
    let predictions = test
        .iter()
        .map(|e| model.predict(&e.record, 1).map(|p| p.predicted_label))
        .collect::<Result<Vec<_>>>()?;

    // label -> (true positives, predicted count, support)
    let mut tally: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    let mut correct = 0usize;

    for (example, predicted) in test.iter().zip(predictions.iter()) {
        tally.entry(example.label.as_str()).or_default().2 += 1;
        tally.entry(predicted.as_str()).or_default().1 += 1;
        if *predicted == example.label {
            correct += 1;
            tally.entry(predicted.as_str()).or_default().0 += 1;
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let per_class = tally
        .into_iter()
        .map(|(label, (tp, predicted, support))| ClassReport {
            label: label.to_string(),
            precision: ratio(tp, predicted),
            recall: ratio(tp, support),
            support,
        })
        .collect();

    Ok(TrainingReport {
        k: model.k(),
        accuracy: if test.is_empty() {
            None
        } else {
            Some(ratio(correct, test.len()))
        },
        n_training_samples,
        n_test_samples: test.len(),
        per_class,
    })
}

/// Split, fit on the training side and score on the holdout side.
pub fn fit_and_evaluate(
    schema: &FeatureSchema,
    config: &PredictorConfig,
    examples: &[TrainingExample],
) -> Result<(TrainedModel, TrainingReport)> {
    let (train, test) = train_test_split(examples, config.test_fraction, config.split_seed);
    let model = KnnClassifier::new(schema.clone(), config.clone())?.fit(&train)?;
    let report = evaluate(&model, &test, train.len())?;

    if let Some(accuracy) = report.accuracy {
        info!("k = {}: accuracy {:.4} on {} held-out examples", model.k(), accuracy, test.len());
    }
    Ok((model, report))
}

/// Try each candidate k on one fixed split and keep the most accurate
/// (the earliest candidate on ties).
pub fn select_k(
    schema: &FeatureSchema,
    config: &PredictorConfig,
    examples: &[TrainingExample],
    candidates: &[usize],
) -> Result<(TrainedModel, TrainingReport)> {
    if candidates.is_empty() {
        return Err(Error::InvalidConfig("no k candidates given".into()));
    }

    let (train, test) = train_test_split(examples, config.test_fraction, config.split_seed);
    let mut best: Option<(TrainedModel, TrainingReport)> = None;

    for &k in candidates {
        if k == 0 || k > train.len() {
            warn!("Skipping k = {}: only {} training examples", k, train.len());
            continue;
        }

        let candidate_config = config.clone().with_k(k);
        let model = KnnClassifier::new(schema.clone(), candidate_config)?.fit(&train)?;
        let report = evaluate(&model, &test, train.len())?;
        info!("k = {}: accuracy {:?}", k, report.accuracy);

        let better = match &best {
            None => true,
            Some((_, current)) => report.accuracy.unwrap_or(0.0) > current.accuracy.unwrap_or(0.0),
        };
        if better {
            best = Some((model, report));
        }
    }

    best.ok_or_else(|| Error::NotEnoughData {
        k: candidates.iter().copied().min().unwrap_or(1),
        available: train.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRecord;
    use crate::schema::FeatureDef;
    use serde_json::json;

    fn clustered(n: usize) -> Vec<TrainingExample> {
        (0..n)
            .map(|i| {
                let (x, label) = if i % 2 == 0 {
                    (i as f64 * 0.01, "Saintek")
                } else {
                    (10.0 + i as f64 * 0.01, "Soshum")
                };
                TrainingExample::new(RawRecord::from_value(json!({ "x": x })).unwrap(), label)
            })
            .collect()
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec![FeatureDef::continuous("x")])
    }

    #[test]
    fn test_split_is_deterministic_and_disjoint() {
        let examples = clustered(10);
        let (train_a, test_a) = train_test_split(&examples, 0.2, 42);
        let (train_b, test_b) = train_test_split(&examples, 0.2, 42);

        assert_eq!(test_a.len(), 2);
        assert_eq!(train_a.len(), 8);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert!(test_a.iter().all(|t| !train_a.contains(t)));
    }

    #[test]
    fn test_split_edge_cases() {
        let examples = clustered(3);
        let (train, test) = train_test_split(&examples, 0.0, 1);
        assert_eq!((train.len(), test.len()), (3, 0));

        let (train, test) = train_test_split(&examples, 0.9, 1);
        assert_eq!((train.len(), test.len()), (1, 2));

        let (train, test) = train_test_split(&examples[..1], 0.5, 1);
        assert_eq!((train.len(), test.len()), (1, 0));
    }

    #[test]
    fn test_fit_and_evaluate_separable_data() {
        let config = PredictorConfig::default();
        let (model, report) = fit_and_evaluate(&schema(), &config, &clustered(20)).unwrap();

        assert_eq!(report.n_training_samples, 16);
        assert_eq!(report.n_test_samples, 4);
        assert_eq!(report.accuracy, Some(1.0));
        assert_eq!(model.index().len(), 16);
        assert!(report.per_class.iter().all(|c| c.precision == 1.0 && c.recall == 1.0));
    }

    #[test]
    fn test_select_k_skips_oversized_candidates() {
        let config = PredictorConfig::default();
        let (model, report) = select_k(&schema(), &config, &clustered(6), &[3, 5, 7]).unwrap();
        // 6 examples -> 4 train, 2 test: only k = 3 fits.
        assert_eq!(model.k(), 3);
        assert_eq!(report.k, 3);

        assert!(matches!(
            select_k(&schema(), &config, &clustered(6), &[9]),
            Err(Error::NotEnoughData { k: 9, available: 4 })
        ));
        assert!(select_k(&schema(), &config, &clustered(6), &[]).is_err());
    }
}
