//! Trainer configuration
//!
//! Read from an optional TOML file, then overridden by `FRAUD_`-prefixed
//! environment variables (`FRAUD_BOOSTING__N_TREES=200`).

use crate::boosting::BoostingParams;
use crate::TrainError;
use ::config::{Config, Environment, File};
use data_validator::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storage::ArtifactFormat;

/// Environment variable prefix shared by the trainer and the API server
pub const ENV_PREFIX: &str = "FRAUD";

/// Full trainer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub data: DataConfig,
    pub balance: BalanceConfig,
    pub split: SplitConfig,
    pub boosting: BoostingParams,
    pub synthetic: SyntheticConfig,
    pub artifacts: ArtifactsConfig,
    pub validation: ValidationConfig,
    pub logging: LoggingConfig,
}

/// Labelled CSV inputs; both files are concatenated before balancing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("train_data.csv"),
            test_path: PathBuf::from("test_data.csv"),
        }
    }
}

/// Class balancing by down-sampling legitimate rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Total rows wanted after balancing (fraud rows plus sampled legitimate rows)
    pub target_rows: usize,
    pub seed: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            target_rows: 100_000,
            seed: 42,
        }
    }
}

/// Held-out evaluation split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of rows held out, in (0, 1)
    pub test_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Synthetic dataset generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    /// Directory receiving `train_data.csv` and `test_data.csv`
    pub output_dir: PathBuf,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            train_rows: 1000,
            test_rows: 200,
            seed: 7,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Where the run's artifacts are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    pub format: ArtifactFormat,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            format: ArtifactFormat::Json,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl TrainerConfig {
    /// Load configuration, layering the environment over an optional file
    pub fn load(path: Option<&Path>) -> Result<Self, TrainError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.check()?;
        Ok(loaded)
    }

    /// Reject parameter values the training run cannot work with
    pub fn check(&self) -> Result<(), TrainError> {
        if !(self.split.test_fraction > 0.0 && self.split.test_fraction < 1.0) {
            return Err(TrainError::InvalidParameter(format!(
                "split.test_fraction must be in (0, 1), got {}",
                self.split.test_fraction
            )));
        }
        if self.balance.target_rows == 0 {
            return Err(TrainError::InvalidParameter(
                "balance.target_rows must be positive".to_string(),
            ));
        }
        self.boosting.check()
    }
}
