//! Relation block synchronization
//!
//! Every generated model carries a managed region:
//!
//! ```text
//!     // <easy-dev:relations>
//!     ...accessors...
//!     // </easy-dev:relations>
//! ```
//!
//! The synchronizer re-renders that region from the relation graph and leaves
//! the rest of the file alone. All targets are planned before anything is
//! written, so a missing marker or a hand-edited file aborts the whole run.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::json;
use similar::TextDiff;

use super::graph::{RelationAccessor, RelationGraph};
use crate::error::{
    ConflictReason, EasyDevError, FileConflict, FileConflictError, MissingMarkerError, Result,
    TemplateError,
};
use crate::scaffold::{content_hash, ArtifactKind, ArtifactManifest, EntityName, GeneratedArtifact};
use crate::state::write_atomic;
use crate::templates::TemplateRenderer;

/// Line opening the managed relation block
pub const MARKER_START: &str = "// <easy-dev:relations>";
/// Line closing the managed relation block
pub const MARKER_END: &str = "// </easy-dev:relations>";

/// Render the accessor block placed between the markers
///
/// The result is empty or ends with a newline.
///
/// # Errors
///
/// Returns a [`TemplateError`] if the `relations` template fails.
pub fn render_relation_block(
    renderer: &TemplateRenderer,
    entity: &EntityName,
    accessors: &[RelationAccessor],
) -> Result<String, TemplateError> {
    let mut block = renderer.render(
        "relations",
        &json!({
            "entity": entity.as_str(),
            "relations": accessors,
        }),
    )?;
    if !block.is_empty() && !block.ends_with('\n') {
        block.push('\n');
    }
    Ok(block)
}

/// Replace the lines between the markers with `block`
fn splice_block(content: &str, block: &str) -> std::result::Result<String, &'static str> {
    let mut start = None;
    let mut end = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        match line.trim() {
            MARKER_START if start.is_some() => return Err("start marker appears more than once"),
            MARKER_START => start = Some(offset + line.len()),
            MARKER_END if end.is_some() => return Err("end marker appears more than once"),
            MARKER_END => end = Some(offset),
            _ => {}
        }
        offset += line.len();
    }

    match (start, end) {
        (None, _) => Err("start marker not found"),
        (Some(_), None) => Err("end marker not found"),
        (Some(start), Some(end)) if end < start => Err("end marker precedes start marker"),
        (Some(start), Some(end)) => Ok(format!("{}{block}{}", &content[..start], &content[end..])),
    }
}

/// A model file whose relation block would change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    /// Entity owning the model
    pub entity: EntityName,
    /// Project relative path
    pub path: PathBuf,
    /// Current file content
    pub before: String,
    /// Content after synchronization
    pub after: String,
}

impl PlannedChange {
    /// Unified diff from the current to the synchronized content
    #[must_use]
    pub fn unified_diff(&self) -> String {
        let path = self.path.display().to_string();
        TextDiff::from_lines(&self.before, &self.after)
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{path}"), &format!("b/{path}"))
            .to_string()
    }
}

/// Result of a synchronization run
#[derive(Debug, Clone, Default)]
pub struct SyncOutcome {
    /// Model files rewritten, with their new hashes
    pub updated: Vec<GeneratedArtifact>,
    /// Changes computed; not applied on a dry run
    pub planned: Vec<PlannedChange>,
    /// Whether files were left untouched
    pub dry_run: bool,
}

impl SyncOutcome {
    /// Whether every model was already in sync
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.planned.is_empty()
    }
}

/// Projects the relation graph into generated model files
#[derive(Debug)]
pub struct RelationSynchronizer<'a> {
    root: &'a Path,
    renderer: &'a TemplateRenderer,
}

impl<'a> RelationSynchronizer<'a> {
    /// Synchronizer for the project at `root`
    #[must_use]
    pub const fn new(root: &'a Path, renderer: &'a TemplateRenderer) -> Self {
        Self { root, renderer }
    }

    /// Compute the changes `sync` would make, without writing
    ///
    /// Every model listed in the manifest is considered. Models of entities
    /// without relations get an empty block; such a model without markers is
    /// skipped rather than reported.
    ///
    /// # Errors
    ///
    /// - [`EasyDevError::MissingMarker`] for the first model with relations
    ///   whose markers are missing or misordered
    /// - [`EasyDevError::FileConflict`] listing every model that would change
    ///   but was edited since it was last written, unless `force` is set
    /// - [`EasyDevError::Template`] if rendering fails
    pub fn plan(
        &self,
        graph: &RelationGraph,
        manifest: &ArtifactManifest,
        force: bool,
    ) -> Result<Vec<PlannedChange>> {
        let mut planned = Vec::new();
        let mut conflicts = Vec::new();

        for artifact in manifest.models() {
            let accessors = graph.accessors_for(&artifact.entity);
            let full_path = self.root.join(&artifact.path);
            let missing_marker = |reason: &str| MissingMarkerError {
                entity: artifact.entity.to_string(),
                path: artifact.path.clone(),
                reason: reason.to_string(),
            };

            let before = match fs::read_to_string(&full_path) {
                Ok(content) => content,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    if accessors.is_empty() {
                        continue;
                    }
                    return Err(missing_marker("model file not found").into());
                }
                Err(err) => return Err(EasyDevError::io(full_path, err)),
            };

            let block = render_relation_block(self.renderer, &artifact.entity, &accessors)?;
            let after = match splice_block(&before, &block) {
                Ok(after) => after,
                Err(_) if accessors.is_empty() => {
                    tracing::debug!(path = %artifact.path.display(), "no relations and no markers, skipping");
                    continue;
                }
                Err(reason) => return Err(missing_marker(reason).into()),
            };

            if after == before {
                tracing::debug!(path = %artifact.path.display(), "relation block up to date");
                continue;
            }

            if !force && content_hash(before.as_bytes()) != artifact.content_hash {
                tracing::warn!(path = %artifact.path.display(), "model modified since last write");
                conflicts.push(FileConflict {
                    path: artifact.path.clone(),
                    reason: ConflictReason::Modified,
                });
                continue;
            }

            planned.push(PlannedChange {
                entity: artifact.entity.clone(),
                path: artifact.path.clone(),
                before,
                after,
            });
        }

        if !conflicts.is_empty() {
            return Err(FileConflictError { conflicts }.into());
        }
        Ok(planned)
    }

    /// Rewrite the relation block of every model that is out of date
    ///
    /// Nothing is written unless every target can be updated. Rewritten
    /// models are recorded in `manifest` with their new hash; the caller
    /// persists the manifest.
    ///
    /// # Errors
    ///
    /// Same as [`plan`](Self::plan), plus I/O errors while writing.
    pub fn sync(
        &self,
        graph: &RelationGraph,
        manifest: &mut ArtifactManifest,
        force: bool,
    ) -> Result<SyncOutcome> {
        let planned = self.plan(graph, manifest, force)?;

        let mut updated = Vec::with_capacity(planned.len());
        for change in &planned {
            write_atomic(&self.root.join(&change.path), change.after.as_bytes())?;
            let artifact = GeneratedArtifact {
                path: change.path.clone(),
                kind: ArtifactKind::Model,
                entity: change.entity.clone(),
                content_hash: content_hash(change.after.as_bytes()),
            };
            tracing::info!(path = %change.path.display(), entity = %change.entity, "synchronized relations");
            manifest.record(artifact.clone());
            updated.push(artifact);
        }

        Ok(SyncOutcome {
            updated,
            planned,
            dry_run: false,
        })
    }

    /// Plan without writing; the outcome carries the diffs to show
    ///
    /// # Errors
    ///
    /// Same as [`plan`](Self::plan).
    pub fn dry_run(
        &self,
        graph: &RelationGraph,
        manifest: &ArtifactManifest,
        force: bool,
    ) -> Result<SyncOutcome> {
        Ok(SyncOutcome {
            updated: Vec::new(),
            planned: self.plan(graph, manifest, force)?,
            dry_run: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::{RelationKind, RelationSpec};
    use tempfile::tempdir;

    const MODEL: &str = "pub struct Post;\n\nimpl Post {\n    // <easy-dev:relations>\n    // </easy-dev:relations>\n}\n";

    fn entity(name: &str) -> EntityName {
        EntityName::parse(name).unwrap()
    }

    fn graph() -> RelationGraph {
        let mut graph = RelationGraph::new();
        graph
            .add_relation(
                RelationSpec::new(entity("Post"), entity("Comment"), RelationKind::OneToMany).unwrap(),
            )
            .unwrap();
        graph
    }

    fn project(model: &str) -> (tempfile::TempDir, ArtifactManifest) {
        let dir = tempdir().unwrap();
        let path = PathBuf::from("src/models/post.rs");
        fs::create_dir_all(dir.path().join("src/models")).unwrap();
        fs::write(dir.path().join(&path), model).unwrap();

        let mut manifest = ArtifactManifest::default();
        manifest.record(GeneratedArtifact {
            path,
            kind: ArtifactKind::Model,
            entity: entity("Post"),
            content_hash: content_hash(model.as_bytes()),
        });
        (dir, manifest)
    }

    #[test]
    fn test_splice_replaces_only_block() {
        let spliced = splice_block(MODEL, "    fn a() {}\n").unwrap();
        assert_eq!(
            spliced,
            "pub struct Post;\n\nimpl Post {\n    // <easy-dev:relations>\n    fn a() {}\n    // </easy-dev:relations>\n}\n"
        );
        assert_eq!(splice_block(&spliced, "").unwrap(), MODEL);
    }

    #[test]
    fn test_splice_marker_errors() {
        assert_eq!(splice_block("fn main() {}\n", ""), Err("start marker not found"));
        assert_eq!(
            splice_block("// <easy-dev:relations>\n", ""),
            Err("end marker not found")
        );
        assert_eq!(
            splice_block("// </easy-dev:relations>\n// <easy-dev:relations>\n", ""),
            Err("end marker precedes start marker")
        );
    }

    #[test]
    fn test_sync_is_idempotent() {
        let (dir, mut manifest) = project(MODEL);
        let renderer = TemplateRenderer::new().unwrap();
        let sync = RelationSynchronizer::new(dir.path(), &renderer);
        let graph = graph();

        let first = sync.sync(&graph, &mut manifest, false).unwrap();
        assert_eq!(first.updated.len(), 1);
        let after_first = fs::read(dir.path().join("src/models/post.rs")).unwrap();
        assert!(String::from_utf8_lossy(&after_first).contains("pub fn comments(&self)"));

        let second = sync.sync(&graph, &mut manifest, false).unwrap();
        assert!(second.is_noop());
        assert!(second.updated.is_empty());
        let after_second = fs::read(dir.path().join("src/models/post.rs")).unwrap();
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_missing_markers_abort() {
        let (dir, mut manifest) = project("pub struct Post;\n");
        let renderer = TemplateRenderer::new().unwrap();
        let sync = RelationSynchronizer::new(dir.path(), &renderer);

        let result = sync.sync(&graph(), &mut manifest, false);
        assert!(matches!(result, Err(EasyDevError::MissingMarker(_))));
        assert_eq!(
            fs::read_to_string(dir.path().join("src/models/post.rs")).unwrap(),
            "pub struct Post;\n"
        );
    }

    #[test]
    fn test_modified_model_needs_force() {
        let (dir, mut manifest) = project(MODEL);
        let path = dir.path().join("src/models/post.rs");
        let edited = MODEL.replace("pub struct Post;", "pub struct Post; // edited");
        fs::write(&path, &edited).unwrap();

        let renderer = TemplateRenderer::new().unwrap();
        let sync = RelationSynchronizer::new(dir.path(), &renderer);

        let result = sync.sync(&graph(), &mut manifest, false);
        assert!(matches!(result, Err(EasyDevError::FileConflict(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), edited);

        let forced = sync.sync(&graph(), &mut manifest, true).unwrap();
        assert_eq!(forced.updated.len(), 1);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("// edited"));
        assert!(content.contains("pub fn comments(&self)"));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (dir, manifest) = project(MODEL);
        let renderer = TemplateRenderer::new().unwrap();
        let sync = RelationSynchronizer::new(dir.path(), &renderer);

        let outcome = sync.dry_run(&graph(), &manifest, false).unwrap();
        assert!(outcome.dry_run);
        assert_eq!(outcome.planned.len(), 1);
        let diff = outcome.planned[0].unified_diff();
        assert!(diff.contains("+    pub fn comments(&self) -> HasMany<Comment> {"));
        assert_eq!(
            fs::read_to_string(dir.path().join("src/models/post.rs")).unwrap(),
            MODEL
        );
    }

    #[test]
    fn test_models_without_relations_and_markers_are_skipped() {
        let (dir, mut manifest) = project("pub struct Post;\n");
        let renderer = TemplateRenderer::new().unwrap();
        let sync = RelationSynchronizer::new(dir.path(), &renderer);

        let outcome = sync.sync(&RelationGraph::new(), &mut manifest, false).unwrap();
        assert!(outcome.is_noop());
    }
}
