//! Feature Engine Error Types

use thiserror::Error;

/// Errors while deriving, encoding, scaling or aligning features
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Hour outside [0, 23]
    #[error("hour {0} is outside [0, 23]")]
    InvalidHour(i64),

    /// Training data cannot produce a usable fitted state
    #[error("Degenerate training data: {0}")]
    DegenerateTraining(String),

    /// Encoded features cannot be reconciled with the feature schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Category value not seen at fit time under the `error` policy
    #[error("Unseen value {value:?} for categorical column {column}")]
    UnseenCategory { column: &'static str, value: String },

    /// Numeric column configured where a categorical one is required
    #[error("Column {0} is not categorical")]
    NotCategorical(&'static str),
}
