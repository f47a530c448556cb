//! `config:publish` and `templates:publish`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;

use super::Project;
use crate::config::EasyDevConfig;
use crate::templates::TemplateRenderer;

/// Where templates are published when neither an argument nor
/// `templates_path` says otherwise
pub const DEFAULT_TEMPLATES_DIR: &str = "templates/easy-dev";

/// Write the default configuration to `easy-dev.toml`
pub struct ConfigPublishCommand {
    force: bool,
}

impl ConfigPublishCommand {
    /// Create a new `ConfigPublishCommand`
    #[must_use]
    pub const fn new(force: bool) -> Self {
        Self { force }
    }

    /// Execute the command
    ///
    /// Does not read the existing configuration, so it also works when that
    /// file is broken (with `force`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and `force` is not set, or if it
    /// cannot be written.
    pub fn execute(&self, project_root: &Path) -> Result<PathBuf> {
        let path = EasyDevConfig::default()
            .publish(project_root, self.force)
            .context("Failed to publish configuration")?;
        println!("{} {}", style("✓ Published").green(), style(path.display()).dim());
        Ok(path)
    }
}

/// Write the embedded templates for customization
pub struct TemplatesPublishCommand {
    dir: Option<PathBuf>,
    force: bool,
}

impl TemplatesPublishCommand {
    /// Create a new `TemplatesPublishCommand`
    #[must_use]
    pub const fn new(dir: Option<PathBuf>, force: bool) -> Self {
        Self { dir, force }
    }

    /// Execute the command
    ///
    /// The target is the given directory, else `templates_path`, else
    /// `templates/easy-dev`, relative to the project root.
    ///
    /// # Errors
    ///
    /// Returns an error if a template file already exists and `force` is not
    /// set, or if a file cannot be written.
    pub fn execute(&self, project: &Project) -> Result<Vec<PathBuf>> {
        let dir = self
            .dir
            .clone()
            .or_else(|| project.config().templates_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATES_DIR));
        let dir = project.root().join(dir);

        let written = TemplateRenderer::publish(&dir, self.force)
            .with_context(|| format!("Failed to publish templates to {}", dir.display()))?;

        for path in &written {
            println!("  {} {}", style("✓").green(), style(path.display()).dim());
        }
        if project.config().templates_path.is_none() {
            println!(
                "\nSet {} in easy-dev.toml to use them.",
                style(format!("templates_path = \"{DEFAULT_TEMPLATES_DIR}\"")).yellow()
            );
        }
        Ok(written)
    }
}
