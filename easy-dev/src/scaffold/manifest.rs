//! Record of every file easy-dev generated
//!
//! The manifest maps each generated path to its kind, entity and the SHA-256 of
//! the bytes last written. Comparing that hash with the file on disk tells the
//! generator and the synchronizer whether a file was edited by hand.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::schema::EntityName;
use crate::error::{ConflictReason, EasyDevError, Result};
use crate::state::{write_atomic, StateLock};

const MANIFEST_VERSION: u32 = 1;

/// Kind of generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Data model with the managed relation block
    Model,
    /// CRUD controller
    Controller,
    /// Table creation migration
    Migration,
    /// Input validation rules
    Validator,
}

impl ArtifactKind {
    /// Every kind, in generation order
    pub const ALL: [Self; 4] = [Self::Model, Self::Controller, Self::Migration, Self::Validator];

    /// Template key used to render this kind
    #[must_use]
    pub const fn template_key(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Controller => "controller",
            Self::Migration => "migration",
            Self::Validator => "validator",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.template_key())
    }
}

/// A file produced by the generator or rewritten by the synchronizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    /// Project relative path
    pub path: PathBuf,
    /// What the file is
    pub kind: ArtifactKind,
    /// Entity it was generated for
    pub entity: EntityName,
    /// Hex SHA-256 of the content last written
    pub content_hash: String,
}

/// Hex encoded SHA-256 of `bytes`
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    #[serde(default)]
    artifacts: Vec<GeneratedArtifact>,
}

/// Every artifact easy-dev knows about, keyed by project relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactManifest {
    artifacts: BTreeMap<PathBuf, GeneratedArtifact>,
}

impl ArtifactManifest {
    /// Load the manifest; a missing file is an empty manifest
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::CorruptState`] if the file cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(EasyDevError::io(path, err)),
        };

        let file: ManifestFile =
            serde_json::from_str(&contents).map_err(|err| EasyDevError::CorruptState {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            artifacts: file
                .artifacts
                .into_iter()
                .map(|artifact| (artifact.path.clone(), artifact))
                .collect(),
        })
    }

    /// Atomically rewrite the manifest; requires the state lock
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&self, path: &Path, _lock: &StateLock) -> Result<()> {
        let file = ManifestFile {
            version: MANIFEST_VERSION,
            artifacts: self.artifacts.values().cloned().collect(),
        };
        let mut contents =
            serde_json::to_string_pretty(&file).map_err(|err| EasyDevError::CorruptState {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        contents.push('\n');
        write_atomic(path, contents.as_bytes())
    }

    /// Add or replace an artifact
    pub fn record(&mut self, artifact: GeneratedArtifact) {
        self.artifacts.insert(artifact.path.clone(), artifact);
    }

    /// Artifact at `path`
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&GeneratedArtifact> {
        self.artifacts.get(path)
    }

    /// Artifact of `kind` generated for `entity`
    #[must_use]
    pub fn find(&self, entity: &EntityName, kind: ArtifactKind) -> Option<&GeneratedArtifact> {
        self.artifacts
            .values()
            .find(|artifact| &artifact.entity == entity && artifact.kind == kind)
    }

    /// Every model artifact
    pub fn models(&self) -> impl Iterator<Item = &GeneratedArtifact> {
        self.artifacts
            .values()
            .filter(|artifact| artifact.kind == ArtifactKind::Model)
    }

    /// Every entity with at least one artifact
    #[must_use]
    pub fn entities(&self) -> BTreeSet<EntityName> {
        self.artifacts
            .values()
            .map(|artifact| artifact.entity.clone())
            .collect()
    }

    /// All artifacts, ordered by path
    pub fn iter(&self) -> impl Iterator<Item = &GeneratedArtifact> {
        self.artifacts.values()
    }

    /// Number of artifacts
    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether nothing was generated yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Why writing to `path` would clobber something, if it would
    ///
    /// `root` is the project root; `path` is project relative.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the existing file cannot be read.
    pub fn conflict_for(&self, root: &Path, path: &Path) -> Result<Option<ConflictReason>> {
        let full_path = root.join(path);
        let bytes = match fs::read(&full_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(EasyDevError::io(full_path, err)),
        };

        let reason = match self.get(path) {
            Some(artifact) if artifact.content_hash == content_hash(&bytes) => {
                ConflictReason::Unchanged
            }
            Some(_) => ConflictReason::Modified,
            None => ConflictReason::Untracked,
        };
        Ok(Some(reason))
    }
}
