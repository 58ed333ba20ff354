//! Synthetic Transaction Data
//!
//! Produces labelled CSVs with the full column set of the card-transaction
//! dataset, for smoke-testing the training run without real data.

use crate::config::SyntheticConfig;
use crate::TrainError;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use data_validator::KNOWN_CATEGORIES;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const STATES: [&str; 5] = ["NY", "CA", "TX", "FL", "IL"];
const JOBS: [&str; 5] = ["Engineer", "Doctor", "Teacher", "Artist", "Manager"];
const GENDERS: [&str; 2] = ["M", "F"];

/// Output file names inside the synthetic output directory
pub const TRAIN_FILE: &str = "train_data.csv";
pub const TEST_FILE: &str = "test_data.csv";

/// One generated CSV row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheticRecord {
    pub trans_date_trans_time: String,
    pub cc_num: u64,
    pub merchant: String,
    pub category: String,
    pub amt: f64,
    pub first: String,
    pub last: String,
    pub gender: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: u32,
    pub lat: f64,
    pub long: f64,
    pub city_pop: u32,
    pub job: String,
    pub dob: String,
    pub trans_num: String,
    pub unix_time: i64,
    pub merch_lat: f64,
    pub merch_long: f64,
    pub is_fraud: u8,
}

/// Seeded generator; row `i` is dated `i` days before `now`
pub struct SyntheticGenerator {
    rng: StdRng,
    now: NaiveDateTime,
}

impl SyntheticGenerator {
    pub fn new(seed: u64, now: NaiveDateTime) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            now,
        }
    }

    fn pick(&mut self, choices: &[&str]) -> String {
        choices.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }

    pub fn generate(&mut self, rows: usize) -> Vec<SyntheticRecord> {
        let dob_origin = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or(NaiveDate::MIN);
        let unix_time = self.now.and_utc().timestamp();

        (0..rows)
            .map(|i| {
                let timestamp = self.now - Duration::days(i as i64);
                let dob = dob_origin + Duration::days(self.rng.gen_range(0..=10_000));
                SyntheticRecord {
                    trans_date_trans_time: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    cc_num: self.rng.gen_range(1_000_000_000_000_000..=9_999_999_999_999_999),
                    merchant: format!("merchant_{}", i),
                    category: self.pick(&KNOWN_CATEGORIES),
                    amt: self.rng.gen_range(1.0..1000.0),
                    first: format!("first_{}", i),
                    last: format!("last_{}", i),
                    gender: self.pick(&GENDERS),
                    street: format!("street_{}", i),
                    city: format!("city_{}", i),
                    state: self.pick(&STATES),
                    zip: self.rng.gen_range(10_000..=99_999),
                    lat: self.rng.gen_range(30.0..45.0),
                    long: self.rng.gen_range(-120.0..-70.0),
                    city_pop: self.rng.gen_range(1_000..=1_000_000),
                    job: self.pick(&JOBS),
                    dob: dob.format("%Y-%m-%d").to_string(),
                    trans_num: format!("trans_{}", i),
                    unix_time,
                    merch_lat: self.rng.gen_range(30.0..45.0),
                    merch_long: self.rng.gen_range(-120.0..-70.0),
                    is_fraud: self.rng.gen_range(0..=1),
                }
            })
            .collect()
    }
}

/// Write records as CSV with a header row
pub fn write_csv(path: &Path, records: &[SyntheticRecord]) -> Result<(), TrainError> {
    let csv_error = |source| TrainError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| TrainError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Generate the train and test files, returning their paths
pub fn generate_datasets(
    config: &SyntheticConfig,
    now: NaiveDateTime,
) -> Result<(PathBuf, PathBuf), TrainError> {
    fs::create_dir_all(&config.output_dir).map_err(|source| TrainError::Io {
        path: config.output_dir.clone(),
        source,
    })?;

    let mut generator = SyntheticGenerator::new(config.seed, now);
    let train_path = config.output_dir.join(TRAIN_FILE);
    let test_path = config.output_dir.join(TEST_FILE);

    write_csv(&train_path, &generator.generate(config.train_rows))?;
    write_csv(&test_path, &generator.generate(config.test_rows))?;

    info!(
        train = %train_path.display(),
        train_rows = config.train_rows,
        test = %test_path.display(),
        test_rows = config.test_rows,
        "Synthetic data generated"
    );
    Ok((train_path, test_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{prepare, read_records};
    use data_validator::Validator;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_generation_is_seeded() {
        let a = SyntheticGenerator::new(7, now()).generate(20);
        let b = SyntheticGenerator::new(7, now()).generate(20);
        let c = SyntheticGenerator::new(8, now()).generate(20);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_value_ranges() {
        let rows = SyntheticGenerator::new(1, now()).generate(200);
        assert_eq!(rows[0].trans_date_trans_time, "2024-06-01 14:00:00");
        assert_eq!(rows[1].trans_date_trans_time, "2024-05-31 14:00:00");
        for row in &rows {
            assert!((1.0..1000.0).contains(&row.amt));
            assert!(KNOWN_CATEGORIES.contains(&row.category.as_str()));
            assert!(STATES.contains(&row.state.as_str()));
            assert!(row.is_fraud <= 1);
            assert_eq!(row.cc_num.to_string().len(), 16);
        }
        assert!(rows.iter().any(|r| r.is_fraud == 1));
        assert!(rows.iter().any(|r| r.is_fraud == 0));
    }

    #[test]
    fn test_written_files_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyntheticConfig {
            train_rows: 50,
            test_rows: 10,
            seed: 3,
            output_dir: dir.path().join("data"),
        };
        let (train, test) = generate_datasets(&config, now()).unwrap();

        let records = read_records(&train).unwrap();
        assert_eq!(records.len(), 50);
        assert_eq!(read_records(&test).unwrap().len(), 10);

        // Birth dates span 1980-2007, so only some rows are under age.
        let prepared = prepare(&records, &Validator::default());
        assert_eq!(prepared.rows.len() + prepared.skipped, 50);
        assert!(!prepared.rows.is_empty());
    }
}
