//! Configuration management for easy-dev
//!
//! Configuration is layered with figment, lowest to highest precedence:
//!
//! 1. Built-in defaults
//! 2. `<project>/easy-dev.toml`, or the file given with `--config`
//! 3. Environment variables (`EASY_DEV_` prefix, `__` for nesting)
//!
//! Environment variable format: `EASY_DEV_SECTION__FIELD_NAME`
//! - Example: `EASY_DEV_LOCK_TIMEOUT_MS=10000`
//! - Example: `EASY_DEV_OUTPUT_PATHS__MODEL=app/models`
//!
//! # Example Configuration
//!
//! ```toml
//! # easy-dev.toml
//! templates_path = "templates/easy-dev"
//! field_types = ["string", "text", "integer", "boolean"]
//! state_dir = ".easy-dev"
//! lock_timeout_ms = 5000
//!
//! [output_paths]
//! model = "src/models"
//! controller = "src/controllers"
//! migration = "migrations"
//! validator = "src/validators"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ConflictReason, EasyDevError, FileConflict, FileConflictError, Result};
use crate::scaffold::{ArtifactKind, PrimitiveType};

/// Project configuration file name
pub const CONFIG_FILE: &str = "easy-dev.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EASY_DEV_";

/// Where each artifact kind is written, relative to the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    /// Model directory
    pub model: PathBuf,
    /// Controller directory
    pub controller: PathBuf,
    /// Migration directory
    pub migration: PathBuf,
    /// Validator directory
    pub validator: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("src/models"),
            controller: PathBuf::from("src/controllers"),
            migration: PathBuf::from("migrations"),
            validator: PathBuf::from("src/validators"),
        }
    }
}

impl OutputPaths {
    /// Directory for `kind`
    #[must_use]
    pub fn for_kind(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Model => &self.model,
            ArtifactKind::Controller => &self.controller,
            ArtifactKind::Migration => &self.migration,
            ArtifactKind::Validator => &self.validator,
        }
    }
}

/// easy-dev configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EasyDevConfig {
    /// Directory holding `<key>.jinja` template overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_path: Option<PathBuf>,

    /// Field types `make:crud` accepts
    pub field_types: Vec<String>,

    /// Directory holding the relation graph, manifest and lock
    pub state_dir: PathBuf,

    /// How long to wait for the state lock
    pub lock_timeout_ms: u64,

    /// Destination directories per artifact kind
    pub output_paths: OutputPaths,
}

impl Default for EasyDevConfig {
    fn default() -> Self {
        Self {
            templates_path: None,
            field_types: PrimitiveType::ALL
                .iter()
                .map(|t| t.name().to_string())
                .collect(),
            state_dir: PathBuf::from(".easy-dev"),
            lock_timeout_ms: 5000,
            output_paths: OutputPaths::default(),
        }
    }
}

impl EasyDevConfig {
    /// Load configuration for the project at `project_root`
    ///
    /// `config_file` replaces `<project_root>/easy-dev.toml`; a relative path is
    /// resolved against the project root.
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::Config`] if an explicit config file is missing,
    /// a source cannot be parsed, or the result fails validation.
    pub fn load(project_root: &Path, config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => {
                let path = project_root.join(path);
                if !path.is_file() {
                    return Err(EasyDevError::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                path
            }
            None => project_root.join(CONFIG_FILE),
        };

        let defaults = toml::to_string(&Self::default())
            .map_err(|e| EasyDevError::Config(e.to_string()))?;

        let config: Self = Figment::new()
            .merge(Toml::string(&defaults))
            .merge(Toml::file(&file))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;

        config.validate()?;
        tracing::debug!(file = %file.display(), "configuration loaded");
        Ok(config)
    }

    /// Check values that the type system does not
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        self.allowed_types()?;
        if self.state_dir.as_os_str().is_empty() {
            return Err(EasyDevError::Config("state_dir cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Configured field types
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::Config`] if the list is empty or names an
    /// unknown type.
    pub fn allowed_types(&self) -> Result<Vec<PrimitiveType>> {
        if self.field_types.is_empty() {
            return Err(EasyDevError::Config("field_types cannot be empty".to_string()));
        }
        self.field_types
            .iter()
            .map(|name| {
                PrimitiveType::from_str(name).map_err(|()| {
                    EasyDevError::Config(format!("field_types: unknown type '{name}'"))
                })
            })
            .collect()
    }

    /// Template override directory, resolved against `project_root`
    #[must_use]
    pub fn templates_dir(&self, project_root: &Path) -> Option<PathBuf> {
        self.templates_path.as_ref().map(|p| project_root.join(p))
    }

    /// Write this configuration to `<project_root>/easy-dev.toml`
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::FileConflict`] if the file exists and `force`
    /// is not set, or an I/O error if it cannot be written.
    pub fn publish(&self, project_root: &Path, force: bool) -> Result<PathBuf> {
        let path = project_root.join(CONFIG_FILE);
        let contents =
            toml::to_string_pretty(self).map_err(|e| EasyDevError::Config(e.to_string()))?;

        if !force {
            match fs::read_to_string(&path) {
                Ok(existing) => {
                    let reason = if existing == contents {
                        ConflictReason::Unchanged
                    } else {
                        ConflictReason::Modified
                    };
                    return Err(FileConflictError {
                        conflicts: vec![FileConflict {
                            path: PathBuf::from(CONFIG_FILE),
                            reason,
                        }],
                    }
                    .into());
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(EasyDevError::io(&path, err)),
            }
        }

        fs::write(&path, contents).map_err(|e| EasyDevError::io(&path, e))?;
        tracing::info!(path = %path.display(), "published configuration");
        Ok(path)
    }
}
