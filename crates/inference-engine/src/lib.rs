//! Fraud Inference Engine
//!
//! Holds the trained gradient-boosted classifier together with the fitted
//! feature pipeline, and scores raw transactions against them.

mod engine;
mod model;

pub use engine::{InferenceEngine, InferenceResult, Score, ServingContext};
pub use model::{Classifier, GradientBoostedModel, RegressionTree, TreeNode, DECISION_THRESHOLD};

use data_validator::ValidationError;
use feature_engine::FeatureError;
use serde::Serialize;
use storage::StorageError;
use thiserror::Error;

/// Category of a scoring failure reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ArtifactMissing,
    InputValidation,
    SchemaMismatch,
    DegenerateTraining,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ArtifactMissing => "artifact_missing",
            ErrorKind::InputValidation => "input_validation",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::DegenerateTraining => "degenerate_training",
        }
    }
}

/// Errors during model loading and inference
#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("Model artifacts unavailable: {0}")]
    ArtifactMissing(String),
    #[error("Invalid transaction: {0}")]
    InputValidation(#[from] ValidationError),
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("Invalid input shape: expected {expected} features, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Degenerate training data: {0}")]
    DegenerateTraining(String),
}

impl InferenceError {
    /// Caller-facing category
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::ArtifactMissing(_) | InferenceError::InvalidModel(_) => {
                ErrorKind::ArtifactMissing
            }
            InferenceError::InputValidation(_) => ErrorKind::InputValidation,
            InferenceError::SchemaMismatch(_) | InferenceError::InvalidInputShape { .. } => {
                ErrorKind::SchemaMismatch
            }
            InferenceError::DegenerateTraining(_) => ErrorKind::DegenerateTraining,
        }
    }
}

impl From<FeatureError> for InferenceError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::InvalidHour(hour) => {
                InferenceError::InputValidation(ValidationError::OutOfRange {
                    field: "hour",
                    value: hour as f64,
                    min: 0.0,
                    max: 23.0,
                })
            }
            FeatureError::UnseenCategory { column, value } => {
                InferenceError::InputValidation(ValidationError::InvalidValue {
                    field: column,
                    reason: format!("value {:?} was not seen in training", value),
                })
            }
            FeatureError::DegenerateTraining(msg) => InferenceError::DegenerateTraining(msg),
            FeatureError::SchemaMismatch(msg) => InferenceError::SchemaMismatch(msg),
            FeatureError::NotCategorical(column) => InferenceError::SchemaMismatch(format!(
                "column {} is not categorical",
                column
            )),
        }
    }
}

impl From<StorageError> for InferenceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RunMismatch { .. } => InferenceError::SchemaMismatch(err.to_string()),
            other => InferenceError::ArtifactMissing(other.to_string()),
        }
    }
}
