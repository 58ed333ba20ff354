//! Training Dataset Preparation

use crate::TrainError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use data_validator::{RawTransaction, Transaction, Validator};
use feature_engine::hour_and_age;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// One row of a labelled transaction CSV.
///
/// Only the columns used for training are read; the rest are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionRecord {
    pub trans_date_trans_time: String,
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub amt: Option<f64>,
    pub gender: Option<String>,
    pub state: Option<String>,
    pub job: Option<String>,
    pub dob: String,
    pub is_fraud: u8,
}

/// Validated transaction with its label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTransaction {
    pub transaction: Transaction,
    pub is_fraud: u8,
}

/// Rows that survived conversion and validation
#[derive(Debug, Clone, Default)]
pub struct PreparedData {
    pub rows: Vec<LabeledTransaction>,
    pub skipped: usize,
}

/// Read every record of a CSV file
pub fn read_records(path: &Path) -> Result<Vec<TransactionRecord>, TrainError> {
    let csv_error = |source| TrainError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_error)?;
    let records = reader
        .deserialize()
        .collect::<Result<Vec<TransactionRecord>, _>>()
        .map_err(csv_error)?;

    info!(path = %path.display(), rows = records.len(), "Transactions loaded");
    Ok(records)
}

/// Parse a transaction timestamp, with or without fractional seconds
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| parse_date(value).map(|d| d.and_time(NaiveTime::MIN)))
}

/// Parse a date of birth, accepting a bare date or a full timestamp
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().or_else(|| {
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|t| t.date())
    })
}

impl TransactionRecord {
    /// Derive hour and age from the timestamps and run the serving validator
    pub fn to_labeled(&self, validator: &Validator) -> Result<LabeledTransaction, String> {
        let timestamp = parse_timestamp(&self.trans_date_trans_time).ok_or_else(|| {
            format!("unparseable timestamp {:?}", self.trans_date_trans_time)
        })?;
        let dob = parse_date(&self.dob)
            .ok_or_else(|| format!("unparseable date of birth {:?}", self.dob))?;
        if self.is_fraud > 1 {
            return Err(format!("label {} is not 0 or 1", self.is_fraud));
        }

        let (hour, age) = hour_and_age(timestamp, dob);
        let raw = RawTransaction {
            amt: self.amt,
            category: self.category.clone(),
            gender: self.gender.clone(),
            state: self.state.clone(),
            job: self.job.clone(),
            age: Some(age as f64),
            hour: Some(f64::from(hour)),
            merchant: self.merchant.clone(),
            hour_category: None,
        };
        let transaction = validator.validate(&raw).map_err(|e| e.to_string())?;
        Ok(LabeledTransaction {
            transaction,
            is_fraud: self.is_fraud,
        })
    }
}

/// Convert records, skipping and counting those that fail validation
pub fn prepare(records: &[TransactionRecord], validator: &Validator) -> PreparedData {
    let mut prepared = PreparedData::default();
    for (line, record) in records.iter().enumerate() {
        match record.to_labeled(validator) {
            Ok(row) => prepared.rows.push(row),
            Err(reason) => {
                debug!(row = line, %reason, "Skipping invalid training row");
                prepared.skipped += 1;
            }
        }
    }
    if prepared.skipped > 0 {
        warn!(
            skipped = prepared.skipped,
            kept = prepared.rows.len(),
            "Some training rows failed validation"
        );
    }
    prepared
}

/// Keep every fraud row and sample legitimate rows up to `target_rows`.
///
/// The result holds the sampled legitimate rows first, then the fraud rows.
pub fn balance(
    rows: Vec<LabeledTransaction>,
    target_rows: usize,
    seed: u64,
) -> Vec<LabeledTransaction> {
    let (fraud, legitimate): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| r.is_fraud == 1);
    let wanted = target_rows.saturating_sub(fraud.len());

    let mut balanced = if legitimate.len() < wanted {
        warn!(
            available = legitimate.len(),
            wanted,
            "Not enough legitimate rows to reach the balancing target, using all of them"
        );
        legitimate
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        let picks = rand::seq::index::sample(&mut rng, legitimate.len(), wanted);
        let mut slots: Vec<Option<LabeledTransaction>> = legitimate.into_iter().map(Some).collect();
        picks.iter().filter_map(|i| slots[i].take()).collect()
    };

    info!(
        legitimate = balanced.len(),
        fraud = fraud.len(),
        "Dataset balanced"
    );
    balanced.extend(fraud);
    balanced
}

/// Shuffled train/test index split; the test side gets `ceil(n * fraction)` rows
pub fn split_indices(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), TrainError> {
    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TrainError::DegenerateTraining(format!(
            "cannot hold out {} of {} rows",
            n_test, n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = indices.split_off(n_test);
    Ok((train, indices))
}
