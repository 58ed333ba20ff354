//! Artifact Storage
//!
//! Persists the artifacts of one training run (encoder, scaler, feature
//! schema, model) as versioned envelopes tagged with the run id, plus a
//! manifest written last. Loading verifies every envelope against the
//! manifest so artifacts from different runs are never mixed.

mod artifacts;
mod manifest;

pub use artifacts::{ArtifactStore, ArtifactWriter};
pub use manifest::{ArtifactFormat, ArtifactKind, Manifest, MANIFEST_FILE};

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Version of the envelope and manifest layout
pub const FORMAT_VERSION: u32 = 1;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact {artifact} not found at {}", path.display())]
    NotFound { artifact: String, path: PathBuf },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Artifact {artifact} has format version {found}, expected {expected}")]
    UnsupportedVersion {
        artifact: String,
        found: u32,
        expected: u32,
    },
    #[error("Artifact {artifact} belongs to run {found}, manifest names run {expected}")]
    RunMismatch {
        artifact: String,
        found: Uuid,
        expected: Uuid,
    },
    #[error("Artifact {0} is not listed in the manifest")]
    NotInManifest(String),
}
