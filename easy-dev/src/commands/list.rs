//! `relations:list`: print declared relations

use anyhow::{Context, Result};
use console::style;

use super::Project;
use crate::error::EasyDevError;
use crate::relations::RelationSpec;
use crate::scaffold::EntityName;

/// Relation listing command
pub struct RelationsListCommand {
    /// Only relations touching this entity
    entity: Option<String>,
}

impl RelationsListCommand {
    /// Create a new `RelationsListCommand`
    #[must_use]
    pub const fn new(entity: Option<String>) -> Self {
        Self { entity }
    }

    /// Execute the command
    ///
    /// Reads without taking the state lock; writers replace the file
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity name is invalid or the graph cannot be
    /// loaded.
    pub fn execute(&self, project: &Project) -> Result<Vec<RelationSpec>> {
        let graph = project
            .relation_store()
            .load()
            .context("Failed to load relation graph")?;

        let (relations, accessors) = match &self.entity {
            Some(name) => {
                let entity = EntityName::parse(name).map_err(EasyDevError::from)?;
                (graph.relations_for(&entity), graph.accessors_for(&entity))
            }
            None => (graph.relations(), Vec::new()),
        };

        if relations.is_empty() {
            println!("{}", style("No relations declared").dim());
        }
        for relation in &relations {
            println!(
                "  {} {} {}",
                style(relation.from()).green(),
                style(relation.kind()).cyan(),
                style(relation.to()).green()
            );
        }
        if !accessors.is_empty() {
            println!("\n{}", style("Accessors:").cyan().bold());
            for accessor in &accessors {
                println!(
                    "  {}() -> {} ({})",
                    accessor.name,
                    accessor.related,
                    style(&accessor.foreign_key).dim()
                );
            }
        }

        Ok(relations.into_iter().collect())
    }
}
