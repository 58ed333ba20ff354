//! Run Manifest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Manifest file name inside an artifacts directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Artifact kinds produced by a training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Encoder,
    Scaler,
    FeatureSchema,
    Model,
}

impl ArtifactKind {
    /// Every artifact a complete run must contain
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Encoder,
        ArtifactKind::Scaler,
        ArtifactKind::FeatureSchema,
        ArtifactKind::Model,
    ];

    /// Stable artifact identifier, used as the file stem
    pub fn id(&self) -> &'static str {
        match self {
            ArtifactKind::Encoder => "encoder",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::FeatureSchema => "feature_schema",
            ArtifactKind::Model => "model",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Serialization used for artifact envelopes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Human-readable JSON
    #[default]
    Json,
    /// Compact binary via postcard
    Postcard,
}

impl ArtifactFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Postcard => "bin",
        }
    }

    /// File name of an artifact in this format
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!("{}.{}", kind.id(), self.extension())
    }
}

/// Description of one complete training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub format: ArtifactFormat,
    pub artifacts: Vec<ArtifactKind>,
}

impl Manifest {
    /// Whether the run includes an artifact
    pub fn contains(&self, kind: ArtifactKind) -> bool {
        self.artifacts.contains(&kind)
    }

    /// Artifacts a complete run needs but this one lacks
    pub fn missing(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|kind| !self.contains(*kind))
            .collect()
    }
}
