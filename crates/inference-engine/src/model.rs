//! Gradient-Boosted Tree Classifier

use crate::InferenceError;
use serde::{Deserialize, Serialize};

/// Probability at or above which a transaction is labelled fraud
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary classifier over aligned feature vectors
pub trait Classifier: Send + Sync {
    /// Number of features expected in each vector
    fn n_features(&self) -> usize;

    /// Probability of fraud in [0, 1]
    fn predict_probability(&self, features: &[f64]) -> Result<f64, InferenceError>;

    /// 1 for fraud, 0 for legitimate
    fn predict_label(&self, features: &[f64]) -> Result<u8, InferenceError> {
        let probability = self.predict_probability(features)?;
        Ok(u8::from(probability >= DECISION_THRESHOLD))
    }
}

/// Node of a regression tree; children are addressed by index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go left when `features[feature] < threshold`, right otherwise
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Margin contribution, learning rate already applied
    Leaf { value: f64 },
}

/// Regression tree with its root at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TreeNode>", into = "Vec<TreeNode>")]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Build a tree, checking that every child index points forward and in range
    pub fn new(nodes: Vec<TreeNode>) -> Result<Self, InferenceError> {
        if nodes.is_empty() {
            return Err(InferenceError::InvalidModel("tree has no nodes".to_string()));
        }
        for (i, node) in nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *left <= i || *right <= i || *left >= nodes.len() || *right >= nodes.len() {
                        return Err(InferenceError::InvalidModel(format!(
                            "node {} has children ({}, {}) outside ({}, {})",
                            i,
                            left,
                            right,
                            i,
                            nodes.len()
                        )));
                    }
                    if threshold.is_nan() {
                        return Err(InferenceError::InvalidModel(format!(
                            "node {} has a NaN threshold",
                            i
                        )));
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(InferenceError::InvalidModel(format!(
                            "leaf {} has non-finite value",
                            i
                        )));
                    }
                }
            }
        }
        Ok(Self { nodes })
    }

    /// Single leaf tree
    pub fn leaf(value: f64) -> Result<Self, InferenceError> {
        Self::new(vec![TreeNode::Leaf { value }])
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Largest feature index used by any split
    pub fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                TreeNode::Split { feature, .. } => Some(*feature),
                TreeNode::Leaf { .. } => None,
            })
            .max()
    }

    /// Leaf value reached by a feature vector
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).copied().unwrap_or(0.0);
                    index = if x < *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl TryFrom<Vec<TreeNode>> for RegressionTree {
    type Error = InferenceError;

    fn try_from(nodes: Vec<TreeNode>) -> Result<Self, Self::Error> {
        Self::new(nodes)
    }
}

impl From<RegressionTree> for Vec<TreeNode> {
    fn from(tree: RegressionTree) -> Self {
        tree.nodes
    }
}

/// Additive tree ensemble over the logistic margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedModel {
    n_features: usize,
    /// Initial log-odds before any tree
    base_margin: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedModel {
    /// Assemble a model, checking tree feature indices against `n_features`
    pub fn new(
        n_features: usize,
        base_margin: f64,
        trees: Vec<RegressionTree>,
    ) -> Result<Self, InferenceError> {
        let model = Self {
            n_features,
            base_margin,
            trees,
        };
        model.check()?;
        Ok(model)
    }

    /// Structural checks, also run after deserializing a model
    pub fn check(&self) -> Result<(), InferenceError> {
        if self.n_features == 0 {
            return Err(InferenceError::InvalidModel(
                "model expects zero features".to_string(),
            ));
        }
        if !self.base_margin.is_finite() {
            return Err(InferenceError::InvalidModel(
                "base margin is not finite".to_string(),
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if let Some(feature) = tree.max_feature() {
                if feature >= self.n_features {
                    return Err(InferenceError::InvalidModel(format!(
                        "tree {} splits on feature {} of {}",
                        i, feature, self.n_features
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn base_margin(&self) -> f64 {
        self.base_margin
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    /// Raw log-odds for a feature vector
    pub fn margin(&self, features: &[f64]) -> Result<f64, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        Ok(self.base_margin + self.trees.iter().map(|t| t.predict(features)).sum::<f64>())
    }
}

impl Classifier for GradientBoostedModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, InferenceError> {
        Ok(sigmoid(self.margin(features)?))
    }
}

/// Logistic function
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
