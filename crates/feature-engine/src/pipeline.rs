//! Feature Pipeline Assembly

use crate::derive::{derive, DerivedFeatures};
use crate::encoder::{BinaryEncoder, FittedEncodingState};
use crate::error::FeatureError;
use crate::scaler::{FittedScalingState, StandardScaler};
use crate::schema::FeatureSchema;
use data_validator::Transaction;
use tracing::{debug, info};

/// Fitted encoder, scaler and schema from one training run.
///
/// Applies derive -> encode -> scale -> align to produce classifier input.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePipeline {
    encoding: FittedEncodingState,
    scaling: FittedScalingState,
    schema: FeatureSchema,
}

impl FeaturePipeline {
    /// Assemble a pipeline from previously fitted parts
    pub fn new(
        encoding: FittedEncodingState,
        scaling: FittedScalingState,
        schema: FeatureSchema,
    ) -> Result<Self, FeatureError> {
        let scaled = scaling.column.name();
        if schema.index_of(scaled).is_none() {
            return Err(FeatureError::SchemaMismatch(format!(
                "scaled column {} is not part of the feature schema",
                scaled
            )));
        }
        Ok(Self {
            encoding,
            scaling,
            schema,
        })
    }

    /// Fit encoder and scaler on training transactions.
    ///
    /// Returns the pipeline and the aligned feature matrix for the same rows.
    pub fn fit(
        transactions: &[Transaction],
        encoder: &BinaryEncoder,
        scaler: &StandardScaler,
    ) -> Result<(Self, Vec<Vec<f64>>), FeatureError> {
        let derived = transactions
            .iter()
            .map(derive)
            .collect::<Result<Vec<DerivedFeatures>, _>>()?;

        let (encoding, mut encoded) = encoder.fit_transform(&derived)?;

        let column = scaler_column(scaler, &encoding)?;
        let raw_values = encoded
            .iter()
            .map(|row| row.get(&column).unwrap_or_default())
            .collect::<Vec<_>>();
        let scaling = scaler.fit(&raw_values)?;
        for row in &mut encoded {
            scaling.transform_row(row)?;
        }

        let schema = FeatureSchema::new(encoding.output_columns())?;
        let matrix = encoded
            .iter()
            .map(|row| schema.align(row))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            rows = matrix.len(),
            features = schema.len(),
            "Feature pipeline fitted"
        );

        Ok((Self::new(encoding, scaling, schema)?, matrix))
    }

    /// Produce the classifier input vector for one transaction
    pub fn transform(&self, tx: &Transaction) -> Result<Vec<f64>, FeatureError> {
        let derived = derive(tx)?;
        let mut encoded = self.encoding.transform_one(&derived)?;
        self.scaling.transform_row(&mut encoded)?;
        let aligned = self.schema.align(&encoded)?;
        debug!(features = aligned.len(), "Transaction transformed");
        Ok(aligned)
    }

    pub fn encoding(&self) -> &FittedEncodingState {
        &self.encoding
    }

    pub fn scaling(&self) -> &FittedScalingState {
        &self.scaling
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Split back into the persisted parts
    pub fn into_parts(self) -> (FittedEncodingState, FittedScalingState, FeatureSchema) {
        (self.encoding, self.scaling, self.schema)
    }
}

fn scaler_column(
    scaler: &StandardScaler,
    encoding: &FittedEncodingState,
) -> Result<String, FeatureError> {
    let column = scaler.column().name().to_string();
    if !encoding.output_columns().contains(&column) {
        return Err(FeatureError::SchemaMismatch(format!(
            "encoder output has no {} column to scale",
            column
        )));
    }
    Ok(column)
}
