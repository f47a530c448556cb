//! CLI command implementations
//!
//! Each command is a plain struct with an `execute` method. Commands report
//! progress on stdout and return `anyhow` errors whose chain carries the typed
//! error the exit code is derived from.

pub mod crud;
pub mod list;
pub mod publish;
pub mod relation;
pub mod sync;

use std::path::{Path, PathBuf};

use crate::config::EasyDevConfig;
use crate::error::Result;
use crate::relations::RelationStore;
use crate::scaffold::ArtifactManifest;
use crate::state::ProjectState;
use crate::templates::TemplateRenderer;

pub use crud::MakeCrudCommand;
pub use list::RelationsListCommand;
pub use publish::{ConfigPublishCommand, TemplatesPublishCommand};
pub use relation::MakeModelRelationCommand;
pub use sync::SyncModelRelationsCommand;

/// A project directory with its configuration and state locations
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: EasyDevConfig,
    state: ProjectState,
}

impl Project {
    /// Open the project at `root`, loading its configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration cannot be loaded.
    pub fn open(root: impl Into<PathBuf>, config_file: Option<&Path>) -> Result<Self> {
        let root = root.into();
        let config = EasyDevConfig::load(&root, config_file)?;
        Ok(Self::with_config(root, config))
    }

    /// Project at `root` with an already loaded configuration
    #[must_use]
    pub fn with_config(root: impl Into<PathBuf>, config: EasyDevConfig) -> Self {
        let root = root.into();
        let state = ProjectState::new(root.clone(), &config);
        Self {
            root,
            config,
            state,
        }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Effective configuration
    #[must_use]
    pub const fn config(&self) -> &EasyDevConfig {
        &self.config
    }

    /// Persisted state locations
    #[must_use]
    pub const fn state(&self) -> &ProjectState {
        &self.state
    }

    /// Store holding the relation graph
    #[must_use]
    pub fn relation_store(&self) -> RelationStore {
        RelationStore::new(self.state.relations_path())
    }

    /// Load the artifact manifest
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest exists but cannot be read.
    pub fn manifest(&self) -> Result<ArtifactManifest> {
        ArtifactManifest::load(&self.state.manifest_path())
    }

    /// Template renderer honoring the configured overrides
    ///
    /// # Errors
    ///
    /// Returns an error if an override directory or template is invalid.
    pub fn renderer(&self) -> Result<TemplateRenderer> {
        TemplateRenderer::with_overrides(self.config.templates_dir(&self.root).as_deref())
    }
}
