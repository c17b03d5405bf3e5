//! Model artifact persistence
//!
//! An artifact file is a fixed header followed by a bincode payload:
//!
//! ```text
//! +----------+-------------+------------------+-----------------+
//! | magic(8) | version(4)  | sha256(32)       | payload         |
//! +----------+-------------+------------------+-----------------+
//! ```
//!
//! Saves publish through a temporary file and an atomic rename, so a reader
//! never observes a half-written model and a failed save leaves the
//! previous artifact untouched.

use atomicwrites::{AtomicFile, OverwriteBehavior};
use bincode::Options;
use chrono::{DateTime, Utc};
use jurusan_core::{Error, ModelParts, Result, TrainedModel};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MAGIC: &[u8; 8] = b"JRSNKNN\0";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + 4 + 32;
/// Upper bound on a decoded payload, guards against hostile length prefixes
const MAX_PAYLOAD_BYTES: u64 = 1 << 30;

/// Descriptive data stored alongside the model; never affects predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub created_at: DateTime<Utc>,
    pub crate_version: String,
}

impl ArtifactMetadata {
    fn now() -> Self {
        Self {
            created_at: Utc::now(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    metadata: &'a ArtifactMetadata,
    parts: &'a ModelParts,
}

#[derive(Deserialize)]
struct Artifact {
    metadata: ArtifactMetadata,
    parts: ModelParts,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_PAYLOAD_BYTES)
}

/// Serialize a model into artifact bytes
pub fn encode_artifact(model: &TrainedModel, metadata: &ArtifactMetadata) -> Result<Vec<u8>> {
    encode_parts(model.parts(), metadata)
}

fn encode_parts(parts: &ModelParts, metadata: &ArtifactMetadata) -> Result<Vec<u8>> {
    let payload = codec()
        .serialize(&ArtifactRef { metadata, parts })
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&Sha256::digest(&payload));
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Rebuild a model from artifact bytes. Any structural problem is `CorruptModel`.
pub fn decode_artifact(bytes: &[u8]) -> Result<(TrainedModel, ArtifactMetadata)> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::CorruptModel(format!(
            "file is {} bytes, shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }

    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(Error::CorruptModel("not a jurusan model file".into()));
    }

    let (version, rest) = rest.split_at(4);
    let version = u32::from_le_bytes([version[0], version[1], version[2], version[3]]);
    if version != FORMAT_VERSION {
        return Err(Error::CorruptModel(format!(
            "unsupported format version {}",
            version
        )));
    }

    let (checksum, payload) = rest.split_at(32);
    if Sha256::digest(payload).as_slice() != checksum {
        return Err(Error::CorruptModel("checksum mismatch".into()));
    }

    let artifact: Artifact = codec()
        .deserialize(payload)
        .map_err(|e| Error::CorruptModel(format!("cannot decode payload: {}", e)))?;

    let model = TrainedModel::from_parts(artifact.parts)?;
    Ok((model, artifact.metadata))
}

/// Reads and atomically writes one model artifact file
pub struct ModelStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ModelStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Serialize and publish `model`, replacing any previous artifact.
    pub fn save(&self, model: &TrainedModel) -> Result<ArtifactMetadata> {
        let metadata = ArtifactMetadata::now();
        let bytes = encode_artifact(model, &metadata)?;

        let _guard = self.write_lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .map_err(|e| match e {
                atomicwrites::Error::Internal(e) | atomicwrites::Error::User(e) => Error::Io(e),
            })?;

        info!("Model saved to {:?} ({} bytes)", self.path, bytes.len());
        Ok(metadata)
    }

    /// Load the artifact into a trained model.
    pub fn load(&self) -> Result<TrainedModel> {
        self.load_with_metadata().map(|(model, _)| model)
    }

    pub fn load_with_metadata(&self) -> Result<(TrainedModel, ArtifactMetadata)> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::ModelFileNotFound(self.path.clone()));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let (model, metadata) = decode_artifact(&bytes)?;
        debug!(
            "Model loaded from {:?}: {} samples, k = {}, saved {}",
            self.path,
            model.index().len(),
            model.k(),
            metadata.created_at.to_rfc3339()
        );
        Ok((model, metadata))
    }
}
