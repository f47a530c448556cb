//! `make:model-relation`: declare or remove a relation between two entities

use anyhow::{Context, Result};
use console::style;

use super::Project;
use crate::error::{EasyDevError, RelationConflictError};
use crate::relations::{RelationKind, RelationSpec};
use crate::scaffold::EntityName;

/// Relation declaration command
pub struct MakeModelRelationCommand {
    /// Declaring entity
    from: String,
    /// Related entity
    to: String,
    /// Relation kind as typed (`one-to-many`, `has-many`, ...)
    kind: String,
    /// Remove instead of declare
    remove: bool,
}

impl MakeModelRelationCommand {
    /// Create a new `MakeModelRelationCommand`
    #[must_use]
    pub const fn new(from: String, to: String, kind: String, remove: bool) -> Self {
        Self {
            from,
            to,
            kind,
            remove,
        }
    }

    fn spec(&self) -> Result<RelationSpec, EasyDevError> {
        let kind: RelationKind = self.kind.parse()?;
        let from = EntityName::parse(&self.from)?;
        let to = EntityName::parse(&self.to)?;
        Ok(RelationSpec::new(from, to, kind)?)
    }

    /// Execute the command
    ///
    /// The graph is loaded, changed and rewritten under the state lock, so
    /// concurrent invocations never lose each other's relations.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The entity names or relation kind are invalid
    /// - The relation duplicates or contradicts a declared one
    /// - `--remove` names a relation that is not declared
    /// - The state lock cannot be acquired or the graph cannot be saved
    pub fn execute(&self, project: &Project) -> Result<RelationSpec> {
        let spec = self.spec().context("Invalid relation")?;

        let store = project.relation_store();
        let lock = project
            .state()
            .lock()
            .context("Failed to acquire state lock")?;
        let mut graph = store.load().context("Failed to load relation graph")?;

        if self.remove {
            if !graph.remove_relation(&spec) {
                return Err(EasyDevError::from(RelationConflictError::NotDeclared(spec)))
                    .context("Failed to remove relation");
            }
        } else {
            graph
                .add_relation(spec.clone())
                .map_err(EasyDevError::from)
                .context("Failed to declare relation")?;
        }

        store
            .save(&graph, &lock)
            .context("Failed to save relation graph")?;
        drop(lock);

        let verb = if self.remove { "Removed" } else { "Declared" };
        println!(
            "{} {} {}",
            style("✓").green(),
            style(verb).green().bold(),
            style(&spec).cyan()
        );
        println!(
            "  Run {} to update the generated models.",
            style("easy-dev sync:model-relations").yellow()
        );

        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_parsing_errors_are_validation_errors() {
        let cmd = MakeModelRelationCommand::new(
            "Post".to_string(),
            "Comment".to_string(),
            "sideways".to_string(),
            false,
        );
        assert!(matches!(cmd.spec(), Err(EasyDevError::Validation(_))));

        let cmd = MakeModelRelationCommand::new(
            "Post".to_string(),
            "Post".to_string(),
            "one-to-many".to_string(),
            false,
        );
        assert!(matches!(cmd.spec(), Err(EasyDevError::Validation(_))));
    }
}
