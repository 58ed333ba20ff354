//! Scoring Context and Engine

use crate::model::{Classifier, GradientBoostedModel, DECISION_THRESHOLD};
use crate::InferenceError;
use data_validator::{RawTransaction, Validator};
use feature_engine::{FeaturePipeline, FeatureSchema, FittedEncodingState, FittedScalingState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use storage::{ArtifactKind, ArtifactStore};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Fraud verdict for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// 1 for fraud, 0 for legitimate
    pub label: u8,
    /// Probability of fraud in [0, 1]
    pub probability: f64,
}

/// Result of a scoring call
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// The verdict
    pub score: Score,
    /// Scoring latency in microseconds
    pub latency_us: u64,
}

/// Immutable serving state: validator, fitted pipeline and model from one run
#[derive(Debug, Clone)]
pub struct ServingContext {
    validator: Validator,
    pipeline: FeaturePipeline,
    model: GradientBoostedModel,
    run_id: Option<Uuid>,
}

impl ServingContext {
    /// Assemble a context, checking that the schema and model agree on width
    pub fn new(
        validator: Validator,
        pipeline: FeaturePipeline,
        model: GradientBoostedModel,
    ) -> Result<Self, InferenceError> {
        model.check()?;
        if pipeline.schema().len() != model.n_features() {
            return Err(InferenceError::SchemaMismatch(format!(
                "feature schema has {} columns but the model expects {}",
                pipeline.schema().len(),
                model.n_features()
            )));
        }
        Ok(Self {
            validator,
            pipeline,
            model,
            run_id: None,
        })
    }

    /// Load the matched artifact set of the store's current run
    pub fn from_store(store: &ArtifactStore, validator: Validator) -> Result<Self, InferenceError> {
        let manifest = store.manifest()?;
        let missing = manifest.missing();
        if !missing.is_empty() {
            return Err(InferenceError::ArtifactMissing(format!(
                "run {} lacks {:?}",
                manifest.run_id, missing
            )));
        }

        let encoding: FittedEncodingState = store.load(&manifest, ArtifactKind::Encoder)?;
        let scaling: FittedScalingState = store.load(&manifest, ArtifactKind::Scaler)?;
        let schema: FeatureSchema = store.load(&manifest, ArtifactKind::FeatureSchema)?;
        let model: GradientBoostedModel = store.load(&manifest, ArtifactKind::Model)?;

        if encoding.version != feature_engine::STATE_FORMAT_VERSION {
            return Err(InferenceError::ArtifactMissing(format!(
                "encoder state version {} is not supported",
                encoding.version
            )));
        }

        let pipeline = FeaturePipeline::new(encoding, scaling, schema)?;
        let mut context = Self::new(validator, pipeline, model)?;
        context.run_id = Some(manifest.run_id);

        info!(
            run_id = %manifest.run_id,
            features = context.n_features(),
            trees = context.model.trees().len(),
            "Serving context loaded"
        );
        Ok(context)
    }

    /// Aligned feature vector for a raw transaction
    pub fn features(&self, raw: &RawTransaction) -> Result<Vec<f64>, InferenceError> {
        let tx = self.validator.validate(raw)?;
        Ok(self.pipeline.transform(&tx)?)
    }

    /// Validate, transform and classify a raw transaction
    pub fn score(&self, raw: &RawTransaction) -> Result<Score, InferenceError> {
        let features = self.features(raw)?;
        let probability = self.model.predict_probability(&features)?;
        Ok(Score {
            label: u8::from(probability >= DECISION_THRESHOLD),
            probability,
        })
    }

    /// Training run the artifacts came from, if loaded from a store
    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Width of the feature vector
    pub fn n_features(&self) -> usize {
        self.model.n_features()
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn model(&self) -> &GradientBoostedModel {
        &self.model
    }
}

#[derive(Debug)]
enum EngineState {
    Ready(Arc<ServingContext>),
    Unavailable(InferenceError),
}

/// Scoring engine built once at startup.
///
/// Either ready with a loaded context, or permanently unavailable with the
/// load error; an unavailable engine never attempts partial computation.
#[derive(Debug)]
pub struct InferenceEngine {
    state: EngineState,
}

impl InferenceEngine {
    /// Engine over an already assembled context
    pub fn ready(context: ServingContext) -> Self {
        Self {
            state: EngineState::Ready(Arc::new(context)),
        }
    }

    /// Load artifacts from a store; failures leave the engine unavailable
    pub fn load(store: &ArtifactStore, validator: Validator) -> Self {
        info!(root = %store.root().display(), "Loading model artifacts");
        match ServingContext::from_store(store, validator) {
            Ok(context) => Self::ready(context),
            Err(e) => {
                error!(error = %e, kind = ?e.kind(), "Model artifacts could not be loaded, scoring disabled");
                Self {
                    state: EngineState::Unavailable(e),
                }
            }
        }
    }

    /// Whether scoring is possible
    pub fn is_ready(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// Loaded context, if ready
    pub fn context(&self) -> Option<&Arc<ServingContext>> {
        match &self.state {
            EngineState::Ready(context) => Some(context),
            EngineState::Unavailable(_) => None,
        }
    }

    /// Why the engine is unavailable, if it is
    pub fn unavailable_reason(&self) -> Option<&InferenceError> {
        match &self.state {
            EngineState::Ready(_) => None,
            EngineState::Unavailable(err) => Some(err),
        }
    }

    /// Score a raw transaction
    pub fn score(&self, raw: &RawTransaction) -> Result<InferenceResult, InferenceError> {
        let start = Instant::now();

        let context = match &self.state {
            EngineState::Ready(context) => context,
            EngineState::Unavailable(InferenceError::ArtifactMissing(msg)) => {
                return Err(InferenceError::ArtifactMissing(msg.clone()))
            }
            EngineState::Unavailable(err) => {
                return Err(InferenceError::ArtifactMissing(format!(
                    "model failed to load: {}",
                    err
                )))
            }
        };

        let score = context.score(raw)?;
        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            label = score.label,
            probability = score.probability,
            latency_us,
            "Transaction scored"
        );

        Ok(InferenceResult { score, latency_us })
    }
}
