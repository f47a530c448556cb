//! CRUD code generator
//!
//! This module turns a [`SchemaDescriptor`] into the four CRUD artifacts:
//! - Model (with the managed relation block)
//! - Controller
//! - Migration
//! - Validator
//!
//! Every artifact is rendered before anything is written. Existing files are
//! never overwritten without `force`; each one is reported as a conflict
//! instead while the others are still written.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{json, Value};

use super::field_type::{DefaultValue, FieldSpec, PrimitiveType};
use super::helpers::TemplateHelpers;
use super::manifest::{content_hash, ArtifactKind, ArtifactManifest, GeneratedArtifact};
use super::schema::SchemaDescriptor;
use crate::config::OutputPaths;
use crate::error::{FileConflict, FileConflictError, Result};
use crate::relations::{relation_accessors, render_relation_block, AccessorKind, RelationAccessor};
use crate::state::write_atomic;
use crate::templates::TemplateRenderer;

/// Maximum length checked for `string` fields, matching `VARCHAR(255)`
const STRING_MAX_LENGTH: u32 = 255;

/// Outcome of one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Artifacts written, in generation order
    pub written: Vec<GeneratedArtifact>,
    /// Destinations left untouched
    pub conflicts: Vec<FileConflict>,
}

impl GenerationReport {
    /// Whether any destination was refused
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// The written artifacts, or the conflicts if there were any
    ///
    /// # Errors
    ///
    /// Returns [`FileConflictError`] listing every refused destination.
    pub fn into_result(self) -> Result<Vec<GeneratedArtifact>, FileConflictError> {
        if self.conflicts.is_empty() {
            Ok(self.written)
        } else {
            Err(FileConflictError {
                conflicts: self.conflicts,
            })
        }
    }
}

/// A rendered artifact waiting to be written
struct RenderedArtifact {
    kind: ArtifactKind,
    path: PathBuf,
    content: String,
}

/// CRUD code generator for one project
#[derive(Debug)]
pub struct CodeGenerator<'a> {
    root: &'a Path,
    renderer: &'a TemplateRenderer,
    output_paths: &'a OutputPaths,
}

impl<'a> CodeGenerator<'a> {
    /// Generator writing below `root`
    #[must_use]
    pub const fn new(
        root: &'a Path,
        renderer: &'a TemplateRenderer,
        output_paths: &'a OutputPaths,
    ) -> Self {
        Self {
            root,
            renderer,
            output_paths,
        }
    }

    /// Generate every artifact for `descriptor`
    ///
    /// Written artifacts are recorded in `manifest`; the caller persists it.
    ///
    /// # Errors
    ///
    /// Returns a template error if any artifact fails to render (nothing is
    /// written then), or an I/O error if a write fails. Conflicts are not
    /// errors here; see [`GenerationReport::into_result`].
    pub fn generate(
        &self,
        descriptor: &SchemaDescriptor,
        manifest: &mut ArtifactManifest,
        force: bool,
    ) -> Result<GenerationReport> {
        let metadata = self.metadata(descriptor)?;

        let rendered = ArtifactKind::ALL
            .into_iter()
            .map(|kind| -> Result<RenderedArtifact> {
                let content = self.renderer.render(kind.template_key(), &metadata)?;
                Ok(RenderedArtifact {
                    kind,
                    path: self.artifact_path(descriptor, kind, manifest),
                    content,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut report = GenerationReport::default();
        for artifact in rendered {
            if let Some(reason) = manifest.conflict_for(self.root, &artifact.path)? {
                if !force {
                    tracing::warn!(path = %artifact.path.display(), %reason, "skipping existing file");
                    report.conflicts.push(FileConflict {
                        path: artifact.path,
                        reason,
                    });
                    continue;
                }
                tracing::info!(path = %artifact.path.display(), %reason, "overwriting existing file");
            }

            write_atomic(&self.root.join(&artifact.path), artifact.content.as_bytes())?;
            let generated = GeneratedArtifact {
                path: artifact.path,
                kind: artifact.kind,
                entity: descriptor.entity().clone(),
                content_hash: content_hash(artifact.content.as_bytes()),
            };
            tracing::info!(path = %generated.path.display(), kind = %generated.kind, "generated");
            manifest.record(generated.clone());
            report.written.push(generated);
        }

        Ok(report)
    }

    /// Project relative destination of `kind` for `descriptor`
    ///
    /// Migrations keep the timestamped path recorded in the manifest, so a
    /// second generation targets the same file.
    #[must_use]
    pub fn artifact_path(
        &self,
        descriptor: &SchemaDescriptor,
        kind: ArtifactKind,
        manifest: &ArtifactManifest,
    ) -> PathBuf {
        let entity = descriptor.entity();
        let dir = self.output_paths.for_kind(kind);
        let snake = TemplateHelpers::to_snake_case(entity.as_str());

        match kind {
            ArtifactKind::Migration => manifest
                .find(entity, ArtifactKind::Migration)
                .map_or_else(
                    || {
                        dir.join(format!(
                            "{}_create_{}_table.sql",
                            Utc::now().format("%Y%m%d%H%M%S"),
                            entity.table_name()
                        ))
                    },
                    |artifact| artifact.path.clone(),
                ),
            ArtifactKind::Model | ArtifactKind::Controller | ArtifactKind::Validator => {
                dir.join(format!("{snake}.rs"))
            }
        }
    }

    /// Template bindings for `descriptor`
    ///
    /// # Errors
    ///
    /// Returns a template error if the relation block fails to render.
    pub fn metadata(&self, descriptor: &SchemaDescriptor) -> Result<Value> {
        let entity = descriptor.entity();
        let accessors = relation_accessors(entity, descriptor.relations());
        let relations_block = render_relation_block(self.renderer, entity, &accessors)?;
        let fields: Vec<Value> = descriptor.fields().iter().map(field_metadata).collect();
        let foreign_key_columns = foreign_keys(descriptor.fields(), &accessors);

        Ok(json!({
            "entity": entity.as_str(),
            "entity_snake": TemplateHelpers::to_snake_case(entity.as_str()),
            "table_name": entity.table_name(),
            "route_path": TemplateHelpers::to_route_path(entity.as_str()),
            "title": TemplateHelpers::to_title(entity.as_str()),
            "plural_title": TemplateHelpers::to_plural_title(entity.as_str()),
            "fields": fields,
            "relations": accessors,
            "foreign_keys": foreign_key_columns,
            "relations_block": relations_block,
        }))
    }
}

fn field_metadata(field: &FieldSpec) -> Value {
    json!({
        "name": field.name,
        "column_name": field.name,
        "field_type": field.field_type,
        "rust_type": field.rust_type(),
        "sql_type": field.sql_type(),
        "nullable": field.nullable,
        "unique": field.unique,
        "indexed": field.indexed,
        "default_sql": field.default.as_ref().map(DefaultValue::sql_literal),
        "validations": validations(field),
    })
}

/// Validation rules the validator template knows how to emit
fn validations(field: &FieldSpec) -> Vec<Value> {
    let mut rules = Vec::new();
    let textual = matches!(field.field_type, PrimitiveType::String | PrimitiveType::Text);

    if textual && !field.nullable {
        rules.push(json!({ "rule": "required", "value": null }));
    }
    if field.field_type == PrimitiveType::String {
        rules.push(json!({ "rule": "max_length", "value": STRING_MAX_LENGTH }));
    }
    rules
}

/// Foreign key columns this entity's table carries, one per owning relation
///
/// Columns the user declared explicitly are not repeated.
fn foreign_keys(fields: &[FieldSpec], accessors: &[RelationAccessor]) -> Vec<Value> {
    accessors
        .iter()
        .filter(|accessor| accessor.kind == AccessorKind::BelongsTo)
        .filter(|accessor| fields.iter().all(|f| f.name != accessor.foreign_key))
        .map(|accessor| {
            json!({
                "column_name": accessor.foreign_key,
                "referenced_table": accessor.related_table,
                "related": accessor.related,
            })
        })
        .collect()
}
