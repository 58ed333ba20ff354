//! Validation Error Types

use thiserror::Error;

/// Errors during transaction validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value present but not acceptable for the field
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { field, .. } => field,
            ValidationError::InvalidValue { field, .. } => field,
            ValidationError::MissingField(field) => field,
        }
    }
}
