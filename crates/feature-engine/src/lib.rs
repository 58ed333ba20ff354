//! Feature Engineering Engine
//!
//! Turns a validated transaction into the exact numeric vector the classifier
//! was trained on: derive, binary-encode, scale `amt`, align to the schema.
//! Training fits the encoder and scaler; serving only applies fitted state.

mod columns;
mod derive;
mod encoder;
mod error;
mod pipeline;
mod scaler;
mod schema;
mod statistics;

pub use columns::{InputColumn, CATEGORICAL_COLUMNS, INPUT_COLUMNS};
pub use derive::{categorize_hour, derive, hour_and_age, DerivedFeatures};
pub use encoder::{BinaryEncoder, ColumnMapping, EncodedRow, FittedEncodingState, HandleUnknown};
pub use error::FeatureError;
pub use pipeline::FeaturePipeline;
pub use scaler::{FittedScalingState, StandardScaler};
pub use schema::FeatureSchema;
pub use statistics::ColumnStatistics;

/// Version of the fitted-state serialization layout
pub const STATE_FORMAT_VERSION: u32 = 1;
