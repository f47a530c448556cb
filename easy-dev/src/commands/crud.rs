//! `make:crud`: generate the CRUD artifacts of an entity
//!
//! # Example
//!
//! ```bash
//! easy-dev make:crud Post \
//!   title:string:unique \
//!   body:text \
//!   published:boolean:default=false \
//!   published_at:timestamp:nullable
//! ```

use anyhow::{Context, Result};
use console::style;

use super::Project;
use crate::error::EasyDevError;
use crate::scaffold::{CodeGenerator, GeneratedArtifact, SchemaDescriptor, TemplateHelpers};

/// CRUD generation command
pub struct MakeCrudCommand {
    /// Entity name in `PascalCase` (e.g., `Post`, `UserProfile`)
    entity: String,
    /// Field definitions (e.g., `title:string`, `body:text:nullable`)
    fields: Vec<String>,
    /// Overwrite existing files
    force: bool,
}

impl MakeCrudCommand {
    /// Create a new `MakeCrudCommand`
    #[must_use]
    pub const fn new(entity: String, fields: Vec<String>, force: bool) -> Self {
        Self {
            entity,
            fields,
            force,
        }
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entity or a field definition is invalid
    /// - The state lock cannot be acquired
    /// - A template fails to render
    /// - Any destination already exists and `force` is not set (the other
    ///   artifacts are still written)
    pub fn execute(&self, project: &Project) -> Result<Vec<GeneratedArtifact>> {
        println!(
            "\n{} {} {}",
            style("Generating CRUD for").cyan().bold(),
            style(&self.entity).green().bold(),
            style("...").cyan().bold()
        );

        let state = project.state();
        let lock = state.lock().context("Failed to acquire state lock")?;

        let mut manifest = project.manifest().context("Failed to load artifact manifest")?;
        let graph = project
            .relation_store()
            .load()
            .context("Failed to load relation graph")?;
        let allowed = project.config().allowed_types()?;

        let known = manifest.entities();
        let descriptor = SchemaDescriptor::build(&self.entity, &self.fields, &known, &allowed)
            .map_err(EasyDevError::from)
            .with_context(|| format!("Invalid CRUD definition for '{}'", self.entity))?;
        let relations = graph.relations_for(descriptor.entity());
        let descriptor = descriptor.with_relations(relations);

        let renderer = project.renderer()?;
        let generator = CodeGenerator::new(project.root(), &renderer, &project.config().output_paths);
        let report = generator
            .generate(&descriptor, &mut manifest, self.force)
            .with_context(|| format!("Failed to generate CRUD for '{}'", self.entity))?;

        if !report.written.is_empty() {
            manifest
                .save(&state.manifest_path(), &lock)
                .context("Failed to save artifact manifest")?;
        }
        drop(lock);

        for artifact in &report.written {
            println!(
                "  {} {} ({})",
                style("✓").green(),
                style(artifact.path.display()).dim(),
                style(artifact.kind).dim()
            );
        }
        for conflict in &report.conflicts {
            println!(
                "  {} {} ({})",
                style("✗").yellow(),
                style(conflict.path.display()).dim(),
                style(conflict.reason).yellow()
            );
        }

        let written = report
            .into_result()
            .map_err(EasyDevError::from)
            .context("Some files were not generated")?;

        let snake = TemplateHelpers::to_snake_case(descriptor.entity().as_str());
        println!(
            "\n{} CRUD for {} is ready!",
            style("✨").green().bold(),
            style(descriptor.entity()).green().bold()
        );
        println!("\n{}", style("Next steps:").cyan().bold());
        println!("  1. Register the modules:");
        println!("     {}", style(format!("pub mod {snake};")).yellow());
        println!(
            "  2. Declare relations: {}",
            style(format!("easy-dev make:model-relation {} <Other> --type=one-to-many", descriptor.entity())).yellow()
        );

        Ok(written)
    }
}
