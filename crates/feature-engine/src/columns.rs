//! Input Column Layout

use serde::{Deserialize, Serialize};

/// Column of the derived feature frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputColumn {
    Merchant,
    Category,
    Amt,
    Gender,
    State,
    Job,
    Hour,
    Age,
    HourCategory,
}

/// Frame order used by training; encoded columns keep this order.
pub const INPUT_COLUMNS: [InputColumn; 9] = [
    InputColumn::Merchant,
    InputColumn::Category,
    InputColumn::Amt,
    InputColumn::Gender,
    InputColumn::State,
    InputColumn::Job,
    InputColumn::Hour,
    InputColumn::Age,
    InputColumn::HourCategory,
];

/// Columns binary-encoded by default
pub const CATEGORICAL_COLUMNS: [InputColumn; 6] = [
    InputColumn::Merchant,
    InputColumn::Category,
    InputColumn::Gender,
    InputColumn::State,
    InputColumn::Job,
    InputColumn::HourCategory,
];

impl InputColumn {
    /// Column name as it appears in training data and feature names
    pub fn name(&self) -> &'static str {
        match self {
            InputColumn::Merchant => "merchant",
            InputColumn::Category => "category",
            InputColumn::Amt => "amt",
            InputColumn::Gender => "gender",
            InputColumn::State => "state",
            InputColumn::Job => "job",
            InputColumn::Hour => "hour",
            InputColumn::Age => "age",
            InputColumn::HourCategory => "Hour_Category",
        }
    }

    /// Whether the column holds text values
    pub fn is_categorical(&self) -> bool {
        CATEGORICAL_COLUMNS.contains(self)
    }
}
