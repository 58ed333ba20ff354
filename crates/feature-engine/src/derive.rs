//! Derived Feature Computation

use crate::columns::InputColumn;
use crate::error::FeatureError;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use data_validator::{Gender, HourCategory, Transaction, DEFAULT_MERCHANT};

/// Transaction with every model input column resolved
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub merchant: String,
    pub category: String,
    pub amt: f64,
    pub gender: Gender,
    pub state: String,
    pub job: String,
    pub hour: u8,
    pub age: u32,
    pub hour_category: HourCategory,
}

impl DerivedFeatures {
    /// Text value of a categorical column, `None` for numeric columns
    pub fn categorical(&self, column: InputColumn) -> Option<&str> {
        match column {
            InputColumn::Merchant => Some(&self.merchant),
            InputColumn::Category => Some(&self.category),
            InputColumn::Gender => Some(self.gender.as_str()),
            InputColumn::State => Some(&self.state),
            InputColumn::Job => Some(&self.job),
            InputColumn::HourCategory => Some(self.hour_category.as_str()),
            InputColumn::Amt | InputColumn::Hour | InputColumn::Age => None,
        }
    }

    /// Value of a numeric column, `None` for categorical columns
    pub fn numeric(&self, column: InputColumn) -> Option<f64> {
        match column {
            InputColumn::Amt => Some(self.amt),
            InputColumn::Hour => Some(self.hour as f64),
            InputColumn::Age => Some(self.age as f64),
            _ => None,
        }
    }
}

/// Bucket an hour of day into its time-of-day category.
///
/// Half-open intervals: [0,6), [6,12), [12,18), [18,24).
pub fn categorize_hour(hour: i64) -> Result<HourCategory, FeatureError> {
    u8::try_from(hour)
        .ok()
        .and_then(HourCategory::for_hour)
        .ok_or(FeatureError::InvalidHour(hour))
}

/// Resolve the optional columns of a validated transaction.
///
/// `Hour_Category` is always recomputed from `hour`, as in training.
pub fn derive(tx: &Transaction) -> Result<DerivedFeatures, FeatureError> {
    let hour_category = categorize_hour(tx.hour as i64)?;

    Ok(DerivedFeatures {
        merchant: tx
            .merchant
            .clone()
            .unwrap_or_else(|| DEFAULT_MERCHANT.to_string()),
        category: tx.category.clone(),
        amt: tx.amt,
        gender: tx.gender,
        state: tx.state.clone(),
        job: tx.job.clone(),
        hour: tx.hour,
        age: tx.age,
        hour_category,
    })
}

/// Hour of day and age in whole years at the time of a transaction.
///
/// Age counts elapsed days divided by 365, rounded down.
pub fn hour_and_age(transaction_time: NaiveDateTime, date_of_birth: NaiveDate) -> (u8, i64) {
    let hour = transaction_time.hour() as u8;
    let born = date_of_birth.and_hms_opt(0, 0, 0).unwrap_or_default();
    let days = (transaction_time - born).num_days();
    (hour, days.div_euclid(365))
}
