//! `sync:model-relations`: rewrite model relation blocks from the graph

use anyhow::{Context, Result};
use console::style;

use super::Project;
use crate::relations::{RelationSynchronizer, SyncOutcome};

/// Relation synchronization command
pub struct SyncModelRelationsCommand {
    /// Rewrite models edited since they were last written
    force: bool,
    /// Show the diffs instead of writing
    dry_run: bool,
}

impl SyncModelRelationsCommand {
    /// Create a new `SyncModelRelationsCommand`
    #[must_use]
    pub const fn new(force: bool, dry_run: bool) -> Self {
        Self { force, dry_run }
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns an error if any model lacks its relation markers, was edited
    /// without `force`, or cannot be written. Nothing is written then.
    pub fn execute(&self, project: &Project) -> Result<SyncOutcome> {
        let state = project.state();
        let lock = state.lock().context("Failed to acquire state lock")?;

        let graph = project
            .relation_store()
            .load()
            .context("Failed to load relation graph")?;
        let mut manifest = project.manifest().context("Failed to load artifact manifest")?;
        let renderer = project.renderer()?;
        let synchronizer = RelationSynchronizer::new(project.root(), &renderer);

        let outcome = if self.dry_run {
            synchronizer.dry_run(&graph, &manifest, self.force)
        } else {
            synchronizer.sync(&graph, &mut manifest, self.force)
        }
        .context("Failed to synchronize model relations")?;

        if !outcome.updated.is_empty() {
            manifest
                .save(&state.manifest_path(), &lock)
                .context("Failed to save artifact manifest")?;
        }
        drop(lock);

        if outcome.is_noop() {
            println!("{} All models are up to date", style("✓").green());
        } else if outcome.dry_run {
            println!(
                "{} {} model(s) would change:\n",
                style("Dry run:").cyan().bold(),
                outcome.planned.len()
            );
            for change in &outcome.planned {
                print!("{}", change.unified_diff());
            }
        } else {
            println!(
                "{} {} model(s):",
                style("Synchronized").green().bold(),
                outcome.updated.len()
            );
            for artifact in &outcome.updated {
                println!("  {} {}", style("✓").green(), style(artifact.path.display()).dim());
            }
        }

        Ok(outcome)
    }
}
