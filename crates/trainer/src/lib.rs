//! Fraud Model Training
//!
//! Offline driver that turns labelled transaction CSVs into one matched set
//! of serving artifacts: encoder state, scaler state, feature schema and
//! gradient-boosted model. Nothing is written unless every step succeeds.

pub mod boosting;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod synthetic;

use crate::boosting::GradientBoostingTrainer;
use crate::config::{ArtifactsConfig, TrainerConfig};
use crate::dataset::{balance, prepare, read_records, split_indices};
use crate::evaluation::ClassificationReport;
use data_validator::{Transaction, Validator};
use feature_engine::{BinaryEncoder, FeatureError, FeaturePipeline, StandardScaler};
use inference_engine::{Classifier, InferenceError, ServingContext};
use std::path::PathBuf;
use storage::{ArtifactKind, ArtifactStore, StorageError};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Training errors
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Degenerate training data: {0}")]
    DegenerateTraining(String),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Model(#[from] InferenceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TrainError {
    /// True when the data itself cannot produce a model
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            TrainError::DegenerateTraining(_)
                | TrainError::Feature(FeatureError::DegenerateTraining(_))
                | TrainError::Model(InferenceError::DegenerateTraining(_))
        )
    }
}

/// Outcome of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub run_id: Uuid,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub rows_balanced: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub n_features: usize,
    pub report: ClassificationReport,
}

/// Load, balance, fit, evaluate and persist one training run
pub fn train(config: &TrainerConfig) -> Result<TrainingSummary, TrainError> {
    config.check()?;
    let validator = Validator::new(config.validation.clone());

    let mut records = read_records(&config.data.train_path)?;
    records.extend(read_records(&config.data.test_path)?);
    let rows_loaded = records.len();

    let prepared = prepare(&records, &validator);
    let balanced = balance(prepared.rows, config.balance.target_rows, config.balance.seed);
    let rows_balanced = balanced.len();
    let (transactions, labels): (Vec<Transaction>, Vec<u8>) = balanced
        .into_iter()
        .map(|row| (row.transaction, row.is_fraud))
        .unzip();

    let (pipeline, matrix) = FeaturePipeline::fit(
        &transactions,
        &BinaryEncoder::default(),
        &StandardScaler::default(),
    )?;

    let (train_idx, test_idx) =
        split_indices(matrix.len(), config.split.test_fraction, config.split.seed)?;
    let gather = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<u8>) {
        idx.iter().map(|&i| (matrix[i].clone(), labels[i])).unzip()
    };
    let (x_train, y_train) = gather(&train_idx);
    let (x_test, y_test) = gather(&test_idx);

    let model = GradientBoostingTrainer::new(config.boosting.clone())?.fit(&x_train, &y_train)?;

    let predicted = x_test
        .iter()
        .map(|row| model.predict_label(row))
        .collect::<Result<Vec<_>, _>>()?;
    let report = ClassificationReport::compute(&y_test, &predicted);
    info!(
        accuracy = report.accuracy,
        fraud_precision = report.fraud().precision,
        fraud_recall = report.fraud().recall,
        "Held-out evaluation"
    );

    let context = ServingContext::new(validator, pipeline, model)?;
    let run_id = persist(&context, &config.artifacts)?;

    Ok(TrainingSummary {
        run_id,
        rows_loaded,
        rows_skipped: prepared.skipped,
        rows_balanced,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
        n_features: context.n_features(),
        report,
    })
}

/// Write every artifact of a serving context as one run
pub fn persist(context: &ServingContext, config: &ArtifactsConfig) -> Result<Uuid, TrainError> {
    let store = ArtifactStore::new(&config.dir);
    let mut writer = store.begin_run(config.format)?;
    let pipeline = context.pipeline();

    writer.save(ArtifactKind::Encoder, pipeline.encoding())?;
    writer.save(ArtifactKind::Scaler, pipeline.scaling())?;
    writer.save(ArtifactKind::FeatureSchema, pipeline.schema())?;
    writer.save(ArtifactKind::Model, context.model())?;
    let manifest = writer.commit()?;

    info!(
        run_id = %manifest.run_id,
        dir = %config.dir.display(),
        format = ?config.format,
        "Training artifacts persisted"
    );
    Ok(manifest.run_id)
}
