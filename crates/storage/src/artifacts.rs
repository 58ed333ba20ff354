//! Artifact Store Implementation

use crate::manifest::{ArtifactFormat, ArtifactKind, Manifest, MANIFEST_FILE};
use crate::{StorageError, FORMAT_VERSION};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Envelope written around every artifact payload
#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    run_id: Uuid,
    kind: ArtifactKind,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    format_version: u32,
    run_id: Uuid,
    kind: ArtifactKind,
    payload: T,
}

/// Directory holding the artifacts of the latest training run
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at a directory (it need not exist yet)
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start writing a new run.
    ///
    /// Any previous manifest is removed first, so the directory holds no
    /// complete run until [`ArtifactWriter::commit`] succeeds.
    pub fn begin_run(&self, format: ArtifactFormat) -> Result<ArtifactWriter, StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;

        let manifest_path = self.root.join(MANIFEST_FILE);
        match fs::remove_file(&manifest_path) {
            Ok(()) => debug!(path = %manifest_path.display(), "Removed previous manifest"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StorageError::Io {
                    path: manifest_path,
                    source,
                })
            }
        }

        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, root = %self.root.display(), ?format, "Starting artifact run");

        Ok(ArtifactWriter {
            root: self.root.clone(),
            run_id,
            format,
            written: Vec::new(),
        })
    }

    /// Read the manifest of the current run
    pub fn manifest(&self) -> Result<Manifest, StorageError> {
        let path = self.root.join(MANIFEST_FILE);
        let bytes = read_file("manifest", &path)?;
        let manifest: Manifest = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::SerializationError(format!("manifest: {}", e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                artifact: "manifest".to_string(),
                found: manifest.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(manifest)
    }

    /// Load one artifact of the run described by `manifest`
    pub fn load<T: DeserializeOwned>(
        &self,
        manifest: &Manifest,
        kind: ArtifactKind,
    ) -> Result<T, StorageError> {
        if !manifest.contains(kind) {
            return Err(StorageError::NotInManifest(kind.to_string()));
        }

        let path = self.root.join(manifest.format.file_name(kind));
        let bytes = read_file(kind.id(), &path)?;
        let envelope: Envelope<T> = decode(manifest.format, kind, &bytes)?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion {
                artifact: kind.to_string(),
                found: envelope.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if envelope.run_id != manifest.run_id {
            return Err(StorageError::RunMismatch {
                artifact: kind.to_string(),
                found: envelope.run_id,
                expected: manifest.run_id,
            });
        }
        if envelope.kind != kind {
            return Err(StorageError::SerializationError(format!(
                "{} holds a {} artifact",
                path.display(),
                envelope.kind
            )));
        }

        debug!(artifact = %kind, run_id = %manifest.run_id, "Artifact loaded");
        Ok(envelope.payload)
    }
}

/// Writer for the artifacts of one run
#[derive(Debug)]
pub struct ArtifactWriter {
    root: PathBuf,
    run_id: Uuid,
    format: ArtifactFormat,
    written: Vec<ArtifactKind>,
}

impl ArtifactWriter {
    /// Identifier shared by every artifact of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Serialize one artifact
    pub fn save<T: Serialize>(&mut self, kind: ArtifactKind, payload: &T) -> Result<(), StorageError> {
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            run_id: self.run_id,
            kind,
            payload,
        };
        let bytes = match self.format {
            ArtifactFormat::Json => serde_json::to_vec_pretty(&envelope)
                .map_err(|e| StorageError::SerializationError(format!("{}: {}", kind, e)))?,
            ArtifactFormat::Postcard => postcard::to_allocvec(&envelope)
                .map_err(|e| StorageError::SerializationError(format!("{}: {}", kind, e)))?,
        };

        let path = self.root.join(self.format.file_name(kind));
        write_atomic(&path, &bytes)?;
        debug!(artifact = %kind, bytes = bytes.len(), path = %path.display(), "Artifact written");

        if !self.written.contains(&kind) {
            self.written.push(kind);
        }
        Ok(())
    }

    /// Write the manifest, making the run visible to loaders
    pub fn commit(self) -> Result<Manifest, StorageError> {
        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            run_id: self.run_id,
            created_at: Utc::now(),
            format: self.format,
            artifacts: self.written,
        };
        let bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StorageError::SerializationError(format!("manifest: {}", e)))?;
        write_atomic(&self.root.join(MANIFEST_FILE), &bytes)?;

        info!(
            run_id = %manifest.run_id,
            artifacts = manifest.artifacts.len(),
            "Artifact run committed"
        );
        Ok(manifest)
    }
}

fn decode<T: DeserializeOwned>(
    format: ArtifactFormat,
    kind: ArtifactKind,
    bytes: &[u8],
) -> Result<Envelope<T>, StorageError> {
    match format {
        ArtifactFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| StorageError::SerializationError(format!("{}: {}", kind, e))),
        ArtifactFormat::Postcard => postcard::from_bytes(bytes)
            .map_err(|e| StorageError::SerializationError(format!("{}: {}", kind, e))),
    }
}

fn read_file(artifact: &str, path: &Path) -> Result<Vec<u8>, StorageError> {
    fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            StorageError::NotFound {
                artifact: artifact.to_string(),
                path: path.to_path_buf(),
            }
        } else {
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|source| StorageError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}
