//! Standard Scaler for `amt`

use crate::columns::InputColumn;
use crate::encoder::EncodedRow;
use crate::error::FeatureError;
use crate::statistics::ColumnStatistics;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Scaler configuration: which numeric column to standardize
#[derive(Debug, Clone, Copy)]
pub struct StandardScaler {
    column: InputColumn,
}

impl StandardScaler {
    /// Create a scaler for a numeric column
    pub fn new(column: InputColumn) -> Result<Self, FeatureError> {
        if column.is_categorical() {
            return Err(FeatureError::SchemaMismatch(format!(
                "cannot scale categorical column {}",
                column.name()
            )));
        }
        Ok(Self { column })
    }

    /// Column this scaler standardizes
    pub fn column(&self) -> InputColumn {
        self.column
    }

    /// Learn mean and standard deviation from training values
    pub fn fit(&self, values: &[f64]) -> Result<FittedScalingState, FeatureError> {
        if values.is_empty() {
            return Err(FeatureError::DegenerateTraining(format!(
                "cannot fit scaler for {} on zero values",
                self.column.name()
            )));
        }

        let stats = ColumnStatistics::compute(values);
        if !stats.mean.is_finite() || !stats.std_dev.is_finite() {
            return Err(FeatureError::DegenerateTraining(format!(
                "{} statistics are not finite",
                self.column.name()
            )));
        }
        if stats.std_dev == 0.0 {
            return Err(FeatureError::DegenerateTraining(format!(
                "{} has zero variance across {} training rows",
                self.column.name(),
                stats.count
            )));
        }

        info!(
            column = self.column.name(),
            mean = stats.mean,
            std_dev = stats.std_dev,
            min = stats.min,
            max = stats.max,
            rows = stats.count,
            "Standard scaler fitted"
        );

        Ok(FittedScalingState {
            column: self.column,
            mean: stats.mean,
            std_dev: stats.std_dev,
        })
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self {
            column: InputColumn::Amt,
        }
    }
}

/// Fitted scaler state, persisted with the training run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedScalingState {
    pub column: InputColumn,
    pub mean: f64,
    pub std_dev: f64,
}

impl FittedScalingState {
    /// Standardize a value. A zero deviation is applied as the identity.
    pub fn transform(&self, value: f64) -> f64 {
        if self.std_dev == 0.0 {
            return value;
        }
        (value - self.mean) / self.std_dev
    }

    /// Undo [`FittedScalingState::transform`]
    pub fn inverse_transform(&self, scaled: f64) -> f64 {
        if self.std_dev == 0.0 {
            return scaled;
        }
        scaled * self.std_dev + self.mean
    }

    /// Scale the configured column of an encoded row in place
    pub fn transform_row(&self, row: &mut EncodedRow) -> Result<(), FeatureError> {
        let name = self.column.name();
        let value = row.get(name).ok_or_else(|| {
            FeatureError::SchemaMismatch(format!("encoded row has no {} column", name))
        })?;
        if self.std_dev == 0.0 {
            warn!(column = name, "Scaling state has zero deviation, leaving value unscaled");
        }
        row.set(name, self.transform(value));
        Ok(())
    }
}
