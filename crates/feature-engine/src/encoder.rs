//! Binary Categorical Encoder
//!
//! Each distinct value of a column gets an ordinal in order of first
//! appearance, starting at 1. The ordinal is written as binary digits, most
//! significant first, across `ceil(log2(distinct + 1))` columns named
//! `<column>_0`, `<column>_1`, ... Ordinal 0 (all bits clear) is never
//! assigned, so it is free to stand for values unseen at fit time.

use crate::columns::{InputColumn, CATEGORICAL_COLUMNS, INPUT_COLUMNS};
use crate::derive::DerivedFeatures;
use crate::error::FeatureError;
use crate::STATE_FORMAT_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// What to do with a category value not seen at fit time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Encode as the all-zero bit pattern
    #[default]
    Zeros,
    /// Reject the row
    Error,
}

/// Encoded feature row: column names with values, in frame order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedRow {
    columns: Vec<(String, f64)>,
}

impl EncodedRow {
    /// Build a row from name/value pairs
    pub fn from_pairs(columns: Vec<(String, f64)>) -> Self {
        Self { columns }
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| *value)
    }

    /// Overwrite a named column, returning false if it is absent
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self.columns.iter_mut().find(|(column, _)| column == name) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Column names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Name/value pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Learned value ordering for one categorical column
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ColumnMappingRepr")]
pub struct ColumnMapping {
    column: InputColumn,
    /// Values in ordinal order; ordinal = index + 1
    values: Vec<String>,
    #[serde(skip_serializing)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct ColumnMappingRepr {
    column: InputColumn,
    values: Vec<String>,
}

impl From<ColumnMappingRepr> for ColumnMapping {
    fn from(repr: ColumnMappingRepr) -> Self {
        Self::new(repr.column, repr.values)
    }
}

impl PartialEq for ColumnMapping {
    fn eq(&self, other: &Self) -> bool {
        self.column == other.column && self.values == other.values
    }
}

impl ColumnMapping {
    /// Build a mapping from values in ordinal order
    pub fn new(column: InputColumn, values: Vec<String>) -> Self {
        let index = values
            .iter()
            .enumerate()
            .map(|(i, value)| (value.clone(), i + 1))
            .collect();
        Self {
            column,
            values,
            index,
        }
    }

    /// Encoded column
    pub fn column(&self) -> InputColumn {
        self.column
    }

    /// Values in ordinal order
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Number of bit columns
    pub fn width(&self) -> usize {
        bit_width(self.values.len())
    }

    /// Ordinal of a value, `None` if unseen
    pub fn ordinal(&self, value: &str) -> Option<usize> {
        self.index.get(value).copied()
    }

    /// Names of the bit columns
    pub fn output_columns(&self) -> Vec<String> {
        (0..self.width())
            .map(|bit| format!("{}_{}", self.column.name(), bit))
            .collect()
    }

    fn push_bits(&self, ordinal: usize, out: &mut Vec<(String, f64)>) {
        let width = self.width();
        for (bit, name) in self.output_columns().into_iter().enumerate() {
            let shift = width - 1 - bit;
            out.push((name, ((ordinal >> shift) & 1) as f64));
        }
    }
}

/// Bits needed to write ordinals 1..=distinct, i.e. ceil(log2(distinct + 1))
fn bit_width(distinct: usize) -> usize {
    (usize::BITS - distinct.leading_zeros()) as usize
}

/// Fitted encoder state, persisted with the training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncodingState {
    pub version: u32,
    pub handle_unknown: HandleUnknown,
    pub mappings: Vec<ColumnMapping>,
}

impl FittedEncodingState {
    /// Encode one row without re-learning
    pub fn transform_one(&self, row: &DerivedFeatures) -> Result<EncodedRow, FeatureError> {
        let mut columns = Vec::new();

        for column in INPUT_COLUMNS {
            if let Some(value) = row.numeric(column) {
                columns.push((column.name().to_string(), value));
                continue;
            }

            let Some(mapping) = self.mapping(column) else {
                continue;
            };
            let value = row.categorical(column).unwrap_or_default();

            match mapping.ordinal(value) {
                Some(ordinal) => mapping.push_bits(ordinal, &mut columns),
                None => match self.handle_unknown {
                    HandleUnknown::Zeros => {
                        debug!(column = column.name(), value, "Unseen category, encoding as zeros");
                        mapping.push_bits(0, &mut columns);
                    }
                    HandleUnknown::Error => {
                        return Err(FeatureError::UnseenCategory {
                            column: column.name(),
                            value: value.to_string(),
                        });
                    }
                },
            }
        }

        Ok(EncodedRow { columns })
    }

    /// Encode rows without re-learning
    pub fn transform(&self, rows: &[DerivedFeatures]) -> Result<Vec<EncodedRow>, FeatureError> {
        rows.iter().map(|row| self.transform_one(row)).collect()
    }

    /// Mapping for a column, if it is encoded
    pub fn mapping(&self, column: InputColumn) -> Option<&ColumnMapping> {
        self.mappings.iter().find(|m| m.column == column)
    }

    /// Names of every encoded-row column in frame order
    pub fn output_columns(&self) -> Vec<String> {
        let mut names = Vec::new();
        for column in INPUT_COLUMNS {
            if !column.is_categorical() {
                names.push(column.name().to_string());
            } else if let Some(mapping) = self.mapping(column) {
                names.extend(mapping.output_columns());
            }
        }
        names
    }
}

/// Binary encoder configuration
#[derive(Debug, Clone)]
pub struct BinaryEncoder {
    columns: Vec<InputColumn>,
    handle_unknown: HandleUnknown,
}

impl BinaryEncoder {
    /// Create an encoder for the given categorical columns
    pub fn new(columns: &[InputColumn], handle_unknown: HandleUnknown) -> Result<Self, FeatureError> {
        if let Some(column) = columns.iter().find(|c| !c.is_categorical()) {
            return Err(FeatureError::NotCategorical(column.name()));
        }
        Ok(Self {
            columns: columns.to_vec(),
            handle_unknown,
        })
    }

    /// Columns this encoder will fit
    pub fn columns(&self) -> &[InputColumn] {
        &self.columns
    }

    /// Learn value ordinals from the training rows
    pub fn fit(&self, rows: &[DerivedFeatures]) -> Result<FittedEncodingState, FeatureError> {
        if rows.is_empty() {
            return Err(FeatureError::DegenerateTraining(
                "cannot fit encoder on zero rows".to_string(),
            ));
        }

        // Frame order, so output layout does not depend on configuration order.
        let mappings = INPUT_COLUMNS
            .into_iter()
            .filter(|column| self.columns.contains(column))
            .map(|column| {
                let mut seen = HashSet::new();
                let mut values = Vec::new();
                for row in rows {
                    let value = row.categorical(column).unwrap_or_default();
                    if seen.insert(value) {
                        values.push(value.to_string());
                    }
                }
                debug!(
                    column = column.name(),
                    distinct = values.len(),
                    width = bit_width(values.len()),
                    "Fitted column mapping"
                );
                ColumnMapping::new(column, values)
            })
            .collect::<Vec<_>>();

        info!(rows = rows.len(), columns = mappings.len(), "Binary encoder fitted");

        Ok(FittedEncodingState {
            version: STATE_FORMAT_VERSION,
            handle_unknown: self.handle_unknown,
            mappings,
        })
    }

    /// Fit on the rows and encode them with the fitted state
    pub fn fit_transform(
        &self,
        rows: &[DerivedFeatures],
    ) -> Result<(FittedEncodingState, Vec<EncodedRow>), FeatureError> {
        let state = self.fit(rows)?;
        let encoded = state.transform(rows)?;
        Ok((state, encoded))
    }
}

impl Default for BinaryEncoder {
    fn default() -> Self {
        Self {
            columns: CATEGORICAL_COLUMNS.to_vec(),
            handle_unknown: HandleUnknown::Zeros,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::{Gender, HourCategory};

    fn row(category: &str, state: &str, hour: u8) -> DerivedFeatures {
        DerivedFeatures {
            merchant: "dummy_merchant".to_string(),
            category: category.to_string(),
            amt: 10.0 * hour as f64 + 1.0,
            gender: if hour % 2 == 0 { Gender::Male } else { Gender::Female },
            state: state.to_string(),
            job: "Engineer".to_string(),
            hour,
            age: 30 + hour as u32,
            hour_category: crate::derive::categorize_hour(hour as i64).unwrap(),
        }
    }

    fn training_rows() -> Vec<DerivedFeatures> {
        vec![
            row("travel", "CA", 2),
            row("grocery_pos", "NY", 9),
            row("home", "TX", 14),
            row("travel", "FL", 20),
            row("misc_net", "CA", 3),
        ]
    }

    #[test]
    fn test_bit_width() {
        assert_eq!(bit_width(0), 0);
        assert_eq!(bit_width(1), 1);
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(3), 2);
        assert_eq!(bit_width(4), 3);
        assert_eq!(bit_width(7), 3);
        assert_eq!(bit_width(8), 4);
    }

    #[test]
    fn test_output_layout() {
        let (state, encoded) = BinaryEncoder::default().fit_transform(&training_rows()).unwrap();

        // merchant: 1 value -> 1 bit; category: 4 -> 3; gender: 2 -> 2;
        // state: 4 -> 3; job: 1 -> 1; Hour_Category: 4 -> 3
        let expected = vec![
            "merchant_0",
            "category_0",
            "category_1",
            "category_2",
            "amt",
            "gender_0",
            "gender_1",
            "state_0",
            "state_1",
            "state_2",
            "job_0",
            "hour",
            "age",
            "Hour_Category_0",
            "Hour_Category_1",
            "Hour_Category_2",
        ];
        assert_eq!(state.output_columns(), expected);
        for row in &encoded {
            assert_eq!(row.names().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn test_ordinals_follow_first_appearance() {
        let (state, encoded) = BinaryEncoder::default().fit_transform(&training_rows()).unwrap();
        let category = state.mapping(InputColumn::Category).unwrap();
        assert_eq!(category.ordinal("travel"), Some(1));
        assert_eq!(category.ordinal("grocery_pos"), Some(2));
        assert_eq!(category.ordinal("home"), Some(3));
        assert_eq!(category.ordinal("misc_net"), Some(4));

        // "home" = 3 = 0b011
        assert_eq!(encoded[2].get("category_0"), Some(0.0));
        assert_eq!(encoded[2].get("category_1"), Some(1.0));
        assert_eq!(encoded[2].get("category_2"), Some(1.0));
        // "misc_net" = 4 = 0b100
        assert_eq!(encoded[4].get("category_0"), Some(1.0));
        assert_eq!(encoded[4].get("category_2"), Some(0.0));
    }

    #[test]
    fn test_numeric_columns_pass_through() {
        let rows = training_rows();
        let (_, encoded) = BinaryEncoder::default().fit_transform(&rows).unwrap();
        assert_eq!(encoded[1].get("amt"), Some(rows[1].amt));
        assert_eq!(encoded[1].get("hour"), Some(9.0));
        assert_eq!(encoded[1].get("age"), Some(39.0));
    }

    #[test]
    fn test_fit_is_deterministic() {
        let encoder = BinaryEncoder::default();
        let first = encoder.fit_transform(&training_rows()).unwrap();
        let second = encoder.fit_transform(&training_rows()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transform_matches_fit_transform() {
        let rows = training_rows();
        let (state, encoded) = BinaryEncoder::default().fit_transform(&rows).unwrap();
        for (row, expected) in rows.iter().zip(&encoded) {
            assert_eq!(&state.transform_one(row).unwrap(), expected);
        }
    }

    #[test]
    fn test_unseen_value_encodes_as_zeros() {
        let (state, _) = BinaryEncoder::default().fit_transform(&training_rows()).unwrap();
        let unseen = row("unknown_category_xyz", "CA", 2);
        let encoded = state.transform_one(&unseen).unwrap();
        for name in ["category_0", "category_1", "category_2"] {
            assert_eq!(encoded.get(name), Some(0.0));
        }
        assert_eq!(encoded.len(), state.output_columns().len());
    }

    #[test]
    fn test_unseen_value_error_policy() {
        let encoder =
            BinaryEncoder::new(&CATEGORICAL_COLUMNS, HandleUnknown::Error).unwrap();
        let state = encoder.fit(&training_rows()).unwrap();
        let err = state.transform_one(&row("unknown", "CA", 2)).unwrap_err();
        assert!(matches!(err, FeatureError::UnseenCategory { column: "category", .. }));
    }

    #[test]
    fn test_subset_of_columns() {
        let encoder = BinaryEncoder::new(
            &[InputColumn::HourCategory, InputColumn::Gender],
            HandleUnknown::Zeros,
        )
        .unwrap();
        let state = encoder.fit(&training_rows()).unwrap();
        assert_eq!(
            state.output_columns(),
            vec!["amt", "gender_0", "gender_1", "hour", "age", "Hour_Category_0", "Hour_Category_1", "Hour_Category_2"]
        );
    }

    #[test]
    fn test_numeric_column_rejected() {
        let err = BinaryEncoder::new(&[InputColumn::Amt], HandleUnknown::Zeros).unwrap_err();
        assert_eq!(err, FeatureError::NotCategorical("amt"));
    }

    #[test]
    fn test_fit_empty_is_degenerate() {
        let err = BinaryEncoder::default().fit(&[]).unwrap_err();
        assert!(matches!(err, FeatureError::DegenerateTraining(_)));
    }

    #[test]
    fn test_state_serialization_rebuilds_index() {
        let (state, _) = BinaryEncoder::default().fit_transform(&training_rows()).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let restored: FittedEncodingState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
        assert_eq!(
            restored.mapping(InputColumn::State).unwrap().ordinal("TX"),
            Some(3)
        );
        let hour_category = restored.mapping(InputColumn::HourCategory).unwrap();
        assert_eq!(hour_category.ordinal(HourCategory::EarlyMorning.as_str()), Some(1));
    }
}
