//! Histogram Gradient Boosting
//!
//! Fits a [`GradientBoostedModel`] under logistic loss. Each feature is
//! bucketed once into quantile bins; every tree is then grown depth-first
//! by scanning per-node gradient histograms for the split with the best
//! second-order gain.

use crate::TrainError;
use inference_engine::{GradientBoostedModel, RegressionTree, TreeNode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Boosting hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting rounds
    pub n_trees: usize,
    /// Shrinkage applied to every leaf value
    pub learning_rate: f64,
    /// Maximum depth of each tree; 0 grows single-leaf trees
    pub max_depth: usize,
    /// L2 regularisation on leaf values
    pub lambda: f64,
    /// Minimum gain required to keep a split
    pub gamma: f64,
    /// Minimum hessian sum in each child
    pub min_child_weight: f64,
    /// Maximum number of bins per feature
    pub max_bins: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            learning_rate: 0.3,
            max_depth: 6,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
            max_bins: 256,
        }
    }
}

impl BoostingParams {
    pub fn check(&self) -> Result<(), TrainError> {
        let invalid = |msg: &str| Err(TrainError::InvalidParameter(msg.to_string()));
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid("boosting.learning_rate must be positive");
        }
        if !(self.lambda >= 0.0 && self.lambda.is_finite()) {
            return invalid("boosting.lambda must be non-negative");
        }
        if !(self.gamma >= 0.0 && self.gamma.is_finite()) {
            return invalid("boosting.gamma must be non-negative");
        }
        if !(self.min_child_weight >= 0.0 && self.min_child_weight.is_finite()) {
            return invalid("boosting.min_child_weight must be non-negative");
        }
        if !(2..=u16::MAX as usize).contains(&self.max_bins) {
            return invalid("boosting.max_bins must be between 2 and 65535");
        }
        Ok(())
    }
}

/// Features bucketed by per-feature cut points.
///
/// A value falls in bin `b` when `cuts[b - 1] <= x < cuts[b]`, so splitting
/// after bin `c` is the same as `x < cuts[c]`.
#[derive(Debug)]
struct BinnedMatrix {
    cuts: Vec<Vec<f64>>,
    /// Column-major bin indices
    bins: Vec<Vec<u16>>,
}

impl BinnedMatrix {
    fn build(rows: &[Vec<f64>], n_features: usize, max_bins: usize) -> Self {
        let mut cuts = Vec::with_capacity(n_features);
        let mut bins = Vec::with_capacity(n_features);
        for feature in 0..n_features {
            let mut values: Vec<f64> = rows.iter().map(|row| row[feature]).collect();
            let feature_cuts = feature_cuts(&mut values, max_bins);
            let column = rows
                .iter()
                .map(|row| feature_cuts.partition_point(|&c| c <= row[feature]) as u16)
                .collect();
            cuts.push(feature_cuts);
            bins.push(column);
        }
        Self { cuts, bins }
    }

    fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }
}

/// Candidate thresholds for one feature, strictly increasing
fn feature_cuts(values: &mut Vec<f64>, max_bins: usize) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    if values.len() <= max_bins {
        values.windows(2).map(|w| w[0] + (w[1] - w[0]) / 2.0).collect()
    } else {
        (1..max_bins)
            .map(|k| values[k * values.len() / max_bins])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GradientPair {
    grad: f64,
    hess: f64,
}

impl GradientPair {
    fn add(&mut self, other: GradientPair) {
        self.grad += other.grad;
        self.hess += other.hess;
    }

    fn sub(self, other: GradientPair) -> GradientPair {
        GradientPair {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    /// Last bin going left
    bin: usize,
    gain: f64,
}

/// Grows trees against one binned training matrix
struct TreeGrower<'a> {
    params: &'a BoostingParams,
    matrix: &'a BinnedMatrix,
    gradients: &'a [GradientPair],
}

impl TreeGrower<'_> {
    fn grow(&self, rows: Vec<usize>) -> Result<RegressionTree, TrainError> {
        let mut nodes = Vec::new();
        self.grow_node(&mut nodes, rows, 0);
        Ok(RegressionTree::new(nodes)?)
    }

    /// Append the subtree for `rows`; children always land after their parent
    fn grow_node(&self, nodes: &mut Vec<TreeNode>, rows: Vec<usize>, depth: usize) -> usize {
        let index = nodes.len();
        let total = self.sum(&rows);
        nodes.push(TreeNode::Leaf {
            value: self.leaf_value(total),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return index;
        }
        let Some(split) = self.best_split(&rows, total) else {
            return index;
        };

        let column = &self.matrix.bins[split.feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| column[r] as usize <= split.bin);

        let left = self.grow_node(nodes, left_rows, depth + 1);
        let right = self.grow_node(nodes, right_rows, depth + 1);
        nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: self.matrix.cuts[split.feature][split.bin],
            left,
            right,
        };
        index
    }

    fn sum(&self, rows: &[usize]) -> GradientPair {
        let mut total = GradientPair::default();
        for &r in rows {
            total.add(self.gradients[r]);
        }
        total
    }

    fn score(&self, pair: GradientPair) -> f64 {
        let denom = pair.hess + self.params.lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        pair.grad * pair.grad / denom
    }

    fn leaf_value(&self, pair: GradientPair) -> f64 {
        let denom = pair.hess + self.params.lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        let value = -pair.grad / denom * self.params.learning_rate;
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    fn best_split(&self, rows: &[usize], total: GradientPair) -> Option<SplitCandidate> {
        let parent = self.score(total);
        let mut best: Option<SplitCandidate> = None;

        for feature in 0..self.matrix.cuts.len() {
            let n_bins = self.matrix.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let column = &self.matrix.bins[feature];
            let mut histogram = vec![GradientPair::default(); n_bins];
            for &r in rows {
                histogram[column[r] as usize].add(self.gradients[r]);
            }

            let mut left = GradientPair::default();
            for (bin, pair) in histogram.iter().enumerate().take(n_bins - 1) {
                left.add(*pair);
                let right = total.sub(left);
                if left.hess < self.params.min_child_weight
                    || right.hess < self.params.min_child_weight
                {
                    continue;
                }
                let gain =
                    0.5 * (self.score(left) + self.score(right) - parent) - self.params.gamma;
                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate { feature, bin, gain });
                }
            }
        }
        best
    }
}

/// Gradient-boosted tree trainer under logistic loss
#[derive(Debug, Clone, Default)]
pub struct GradientBoostingTrainer {
    params: BoostingParams,
}

impl GradientBoostingTrainer {
    pub fn new(params: BoostingParams) -> Result<Self, TrainError> {
        params.check()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Fit a model to aligned feature rows and 0/1 labels
    pub fn fit(&self, rows: &[Vec<f64>], labels: &[u8]) -> Result<GradientBoostedModel, TrainError> {
        if rows.is_empty() {
            return Err(TrainError::DegenerateTraining(
                "no training rows".to_string(),
            ));
        }
        if rows.len() != labels.len() {
            return Err(TrainError::InvalidParameter(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        let n_features = rows[0].len();
        if n_features == 0 || rows.iter().any(|row| row.len() != n_features) {
            return Err(TrainError::DegenerateTraining(
                "training rows have inconsistent or zero width".to_string(),
            ));
        }
        if let Some(bad) = labels.iter().find(|&&y| y > 1) {
            return Err(TrainError::InvalidParameter(format!(
                "label {} is not 0 or 1",
                bad
            )));
        }

        let positives = labels.iter().filter(|&&y| y == 1).count();
        if positives == 0 || positives == labels.len() {
            return Err(TrainError::DegenerateTraining(format!(
                "all {} training labels belong to one class",
                labels.len()
            )));
        }
        let prior = positives as f64 / labels.len() as f64;
        let base_margin = (prior / (1.0 - prior)).ln();

        let matrix = BinnedMatrix::build(rows, n_features, self.params.max_bins);
        debug!(
            features = n_features,
            bins = matrix.cuts.iter().map(|c| c.len() + 1).sum::<usize>(),
            "Features binned"
        );

        let mut margins = vec![base_margin; rows.len()];
        let mut gradients = vec![GradientPair::default(); rows.len()];
        let mut trees = Vec::with_capacity(self.params.n_trees);

        for round in 0..self.params.n_trees {
            for ((pair, &margin), &y) in gradients.iter_mut().zip(&margins).zip(labels) {
                let p = sigmoid(margin);
                *pair = GradientPair {
                    grad: p - f64::from(y),
                    hess: (p * (1.0 - p)).max(1e-16),
                };
            }

            let grower = TreeGrower {
                params: &self.params,
                matrix: &matrix,
                gradients: &gradients,
            };
            let tree = grower.grow((0..rows.len()).collect())?;
            for (margin, row) in margins.iter_mut().zip(rows) {
                *margin += tree.predict(row);
            }
            trees.push(tree);

            if (round + 1) % 10 == 0 || round + 1 == self.params.n_trees {
                debug!(
                    round = round + 1,
                    log_loss = log_loss(&margins, labels),
                    "Boosting progress"
                );
            }
        }

        info!(
            trees = trees.len(),
            features = n_features,
            base_margin,
            log_loss = log_loss(&margins, labels),
            "Gradient boosting finished"
        );
        Ok(GradientBoostedModel::new(n_features, base_margin, trees)?)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Mean logistic loss of margins against labels
pub fn log_loss(margins: &[f64], labels: &[u8]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    let total: f64 = margins
        .iter()
        .zip(labels)
        .map(|(&m, &y)| {
            let p = sigmoid(m).clamp(1e-15, 1.0 - 1e-15);
            if y == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / margins.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_engine::Classifier;
    use proptest::prelude::*;

    /// Fraud when feature 0 is large, feature 1 is noise
    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let rows: Vec<Vec<f64>> = (0..200)
            .map(|i| vec![i as f64, (i * 7 % 13) as f64])
            .collect();
        let labels = (0..200).map(|i| u8::from(i >= 150)).collect();
        (rows, labels)
    }

    #[test]
    fn test_learns_threshold() {
        let (rows, labels) = separable();
        let trainer = GradientBoostingTrainer::new(BoostingParams {
            n_trees: 20,
            ..BoostingParams::default()
        })
        .unwrap();
        let model = trainer.fit(&rows, &labels).unwrap();

        assert_eq!(model.predict_label(&[10.0, 3.0]).unwrap(), 0);
        assert_eq!(model.predict_label(&[190.0, 3.0]).unwrap(), 1);
        let first = &model.trees()[0];
        assert!(matches!(
            first.nodes()[0],
            TreeNode::Split { feature: 0, threshold, .. } if threshold > 149.0 && threshold < 150.0
        ));
    }

    #[test]
    fn test_base_margin_is_prior_log_odds() {
        let (rows, labels) = separable();
        let trainer = GradientBoostingTrainer::new(BoostingParams {
            n_trees: 0,
            ..BoostingParams::default()
        })
        .unwrap();
        let model = trainer.fit(&rows, &labels).unwrap();
        assert!((model.base_margin() - (0.25f64 / 0.75).ln()).abs() < 1e-12);
        assert!(model.trees().is_empty());
    }

    #[test]
    fn test_single_class_is_degenerate() {
        let rows = vec![vec![1.0], vec![2.0]];
        let err = GradientBoostingTrainer::default()
            .fit(&rows, &[0, 0])
            .unwrap_err();
        assert!(matches!(err, TrainError::DegenerateTraining(_)));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![2.0]];
        assert!(GradientBoostingTrainer::default().fit(&rows, &[0, 1]).is_err());
    }

    #[test]
    fn test_depth_limit() {
        let (rows, labels) = separable();
        let trainer = GradientBoostingTrainer::new(BoostingParams {
            n_trees: 5,
            max_depth: 1,
            ..BoostingParams::default()
        })
        .unwrap();
        let model = trainer.fit(&rows, &labels).unwrap();
        assert!(model.trees().iter().all(|t| t.nodes().len() <= 3));
    }

    #[test]
    fn test_loss_decreases() {
        let (rows, labels) = separable();
        let short = GradientBoostingTrainer::new(BoostingParams {
            n_trees: 2,
            ..BoostingParams::default()
        })
        .unwrap()
        .fit(&rows, &labels)
        .unwrap();
        let long = GradientBoostingTrainer::new(BoostingParams {
            n_trees: 30,
            ..BoostingParams::default()
        })
        .unwrap()
        .fit(&rows, &labels)
        .unwrap();

        let margins = |m: &GradientBoostedModel| {
            rows.iter().map(|r| m.margin(r).unwrap()).collect::<Vec<_>>()
        };
        assert!(log_loss(&margins(&long), &labels) < log_loss(&margins(&short), &labels));
    }

    #[test]
    fn test_invalid_params() {
        let bad = BoostingParams {
            learning_rate: 0.0,
            ..BoostingParams::default()
        };
        assert!(GradientBoostingTrainer::new(bad).is_err());
        let bad = BoostingParams {
            max_bins: 1,
            ..BoostingParams::default()
        };
        assert!(GradientBoostingTrainer::new(bad).is_err());
    }

    proptest! {
        #[test]
        fn prop_cuts_strictly_increasing(
            mut values in prop::collection::vec(-1e6f64..1e6, 1..300),
            max_bins in 2usize..64,
        ) {
            let cuts = feature_cuts(&mut values, max_bins);
            prop_assert!(cuts.len() < max_bins);
            prop_assert!(cuts.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
