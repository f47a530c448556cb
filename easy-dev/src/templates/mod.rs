//! Template rendering for generated artifacts
//!
//! Templates are minijinja sources keyed by artifact kind. The embedded
//! defaults live in [`files`]; a project may override any of them from its
//! `templates_path`. Rendering is strict: a placeholder without a binding is an
//! error, never an empty string.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use serde_json::Value;

use crate::error::{ConflictReason, EasyDevError, FileConflict, FileConflictError, Result, TemplateError};

pub mod files;
pub use files::*;

/// Template keys, in publishing order
pub const TEMPLATE_KEYS: [&str; 5] = ["model", "controller", "migration", "validator", "relations"];

/// File extension of override templates
pub const TEMPLATE_EXTENSION: &str = "jinja";

/// Names the template language provides without a binding
const BUILTIN_NAMES: &[&str] = &[
    "range", "dict", "namespace", "debug", "loop", "self", "super", "lipsum", "cycler", "joiner",
];

/// Embedded source for `key`
#[must_use]
pub fn embedded_template(key: &str) -> Option<&'static str> {
    match key {
        "model" => Some(MODEL_TEMPLATE),
        "controller" => Some(CONTROLLER_TEMPLATE),
        "migration" => Some(MIGRATION_TEMPLATE),
        "validator" => Some(VALIDATOR_TEMPLATE),
        "relations" => Some(RELATIONS_TEMPLATE),
        _ => None,
    }
}

/// Renders artifact templates with named bindings
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

impl TemplateRenderer {
    /// Renderer with the embedded templates only
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Render`] if an embedded template fails to parse.
    pub fn new() -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        // Generated code is not HTML
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        for key in TEMPLATE_KEYS {
            if let Some(source) = embedded_template(key) {
                env.add_template(key, source).map_err(|err| TemplateError::Render {
                    template: key.to_string(),
                    message: err.to_string(),
                })?;
            }
        }

        Ok(Self { env })
    }

    /// Renderer whose templates may be overridden by `<dir>/<key>.jinja`
    ///
    /// Keys without an override file keep the embedded template.
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::Config`] if `dir` does not exist and
    /// [`TemplateError::Render`] if an override fails to parse.
    pub fn with_overrides(dir: Option<&Path>) -> Result<Self> {
        let mut renderer = Self::new()?;
        let Some(dir) = dir else {
            return Ok(renderer);
        };

        if !dir.is_dir() {
            return Err(EasyDevError::Config(format!(
                "templates_path {} is not a directory",
                dir.display()
            )));
        }

        for key in TEMPLATE_KEYS {
            let path = override_path(dir, key);
            if !path.is_file() {
                continue;
            }
            let source = fs::read_to_string(&path).map_err(|e| EasyDevError::io(&path, e))?;
            renderer
                .env
                .add_template_owned(key.to_string(), source)
                .map_err(|err| TemplateError::Render {
                    template: key.to_string(),
                    message: err.to_string(),
                })?;
            tracing::debug!(template = key, path = %path.display(), "using template override");
        }

        Ok(renderer)
    }

    /// Render `key` with `bindings`
    ///
    /// Same key and bindings always produce the same output.
    ///
    /// # Errors
    ///
    /// - [`TemplateError::UnknownTemplate`] if no template is registered as `key`
    /// - [`TemplateError::MissingBinding`] if the template references a name
    ///   that `bindings` does not provide
    /// - [`TemplateError::Render`] for any other rendering failure
    pub fn render(&self, key: &str, bindings: &Value) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(key)
            .map_err(|_| TemplateError::UnknownTemplate(key.to_string()))?;

        let bound: BTreeSet<&str> = bindings
            .as_object()
            .map(|map| map.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let unbound: BTreeSet<String> = template
            .undeclared_variables(false)
            .into_iter()
            .filter(|name| !bound.contains(name.as_str()) && !BUILTIN_NAMES.contains(&name.as_str()))
            .collect();
        if let Some(binding) = unbound.into_iter().next() {
            return Err(TemplateError::MissingBinding {
                template: key.to_string(),
                binding,
            });
        }

        template.render(bindings).map_err(|err| {
            if err.kind() == ErrorKind::UndefinedError {
                TemplateError::MissingBinding {
                    template: key.to_string(),
                    binding: err
                        .detail()
                        .map_or_else(|| format!("line {}", err.line().unwrap_or_default()), ToString::to_string),
                }
            } else {
                TemplateError::Render {
                    template: key.to_string(),
                    message: err.to_string(),
                }
            }
        })
    }

    /// Write the embedded templates to `dir` as `<key>.jinja`
    ///
    /// Existing files are left alone unless `force` is set; the remaining
    /// templates are still written.
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::FileConflict`] listing the files that already
    /// existed, or an I/O error if a file cannot be written.
    pub fn publish(dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| EasyDevError::io(dir, e))?;

        let mut written = Vec::new();
        let mut conflicts = Vec::new();
        for key in TEMPLATE_KEYS {
            let Some(source) = embedded_template(key) else {
                continue;
            };
            let path = override_path(dir, key);

            if !force && path.exists() {
                let same = fs::read_to_string(&path).is_ok_and(|existing| existing == source);
                conflicts.push(FileConflict {
                    path,
                    reason: if same { ConflictReason::Unchanged } else { ConflictReason::Modified },
                });
                continue;
            }

            fs::write(&path, source).map_err(|e| EasyDevError::io(&path, e))?;
            tracing::info!(template = key, path = %path.display(), "published template");
            written.push(path);
        }

        if conflicts.is_empty() {
            Ok(written)
        } else {
            Err(FileConflictError { conflicts }.into())
        }
    }
}

fn override_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.{TEMPLATE_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_unknown_template() {
        let renderer = TemplateRenderer::new().unwrap();
        let result = renderer.render("view", &json!({}));
        assert_eq!(result, Err(TemplateError::UnknownTemplate("view".to_string())));
    }

    #[test]
    fn test_missing_binding_is_an_error() {
        let renderer = TemplateRenderer::new().unwrap();
        let result = renderer.render("relations", &json!({ "entity": "Post" }));
        assert_eq!(
            result,
            Err(TemplateError::MissingBinding {
                template: "relations".to_string(),
                binding: "relations".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_relations_render_nothing() {
        let renderer = TemplateRenderer::new().unwrap();
        let block = renderer
            .render("relations", &json!({ "entity": "Post", "relations": [] }))
            .unwrap();
        assert_eq!(block, "");
    }

    #[test]
    fn test_relations_block_shape() {
        let renderer = TemplateRenderer::new().unwrap();
        let bindings = json!({
            "entity": "Post",
            "relations": [
                {
                    "name": "comments",
                    "kind": "has_many",
                    "related": "Comment",
                    "related_table": "comments",
                    "foreign_key": "post_id",
                    "pivot_table": null
                },
                {
                    "name": "tags",
                    "kind": "belongs_to_many",
                    "related": "Tag",
                    "related_table": "tags",
                    "foreign_key": "post_id",
                    "pivot_table": "post_tag"
                }
            ]
        });

        let block = renderer.render("relations", &bindings).unwrap();
        assert!(block.contains("pub fn comments(&self) -> HasMany<Comment> {"));
        assert!(block.contains("HasMany::new(self.id, \"comments\", \"post_id\")"));
        assert!(block.contains("BelongsToMany::through(self.id, \"tags\", \"post_tag\", \"post_id\")"));
        assert!(block.contains("    }\n\n    /// BelongsToMany relation to Tag"));
        assert!(block.ends_with("    }\n"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let renderer = TemplateRenderer::new().unwrap();
        let bindings = json!({ "entity": "Post", "relations": [] });
        assert_eq!(
            renderer.render("relations", &bindings),
            renderer.render("relations", &bindings)
        );
    }

    #[test]
    fn test_override_replaces_embedded_template() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("model.jinja"), "struct {{ entity }};\n").unwrap();

        let renderer = TemplateRenderer::with_overrides(Some(dir.path())).unwrap();
        let rendered = renderer.render("model", &json!({ "entity": "Post" })).unwrap();
        assert_eq!(rendered, "struct Post;\n");

        // Keys without an override keep the default
        let block = renderer
            .render("relations", &json!({ "entity": "Post", "relations": [] }))
            .unwrap();
        assert_eq!(block, "");
    }

    #[test]
    fn test_malformed_override_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("model.jinja"), "{% for x in %}").unwrap();

        let result = TemplateRenderer::with_overrides(Some(dir.path()));
        assert!(matches!(
            result,
            Err(EasyDevError::Template(TemplateError::Render { .. }))
        ));
    }

    #[test]
    fn test_missing_override_dir_is_config_error() {
        let dir = tempdir().unwrap();
        let result = TemplateRenderer::with_overrides(Some(&dir.path().join("nope")));
        assert!(matches!(result, Err(EasyDevError::Config(_))));
    }

    #[test]
    fn test_publish_writes_every_template() {
        let dir = tempdir().unwrap();
        let written = TemplateRenderer::publish(dir.path(), false).unwrap();
        assert_eq!(written.len(), TEMPLATE_KEYS.len());
        assert_eq!(
            fs::read_to_string(dir.path().join("model.jinja")).unwrap(),
            MODEL_TEMPLATE
        );

        let again = TemplateRenderer::publish(dir.path(), false);
        assert!(matches!(again, Err(EasyDevError::FileConflict(_))));

        let forced = TemplateRenderer::publish(dir.path(), true).unwrap();
        assert_eq!(forced.len(), TEMPLATE_KEYS.len());
    }
}
