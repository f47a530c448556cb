//! easy-dev: CRUD scaffolding and model relation synchronization
//!
//! The library behind the `easy-dev` binary. It turns a compact entity
//! definition into model, controller, migration and validator files, keeps a
//! persisted graph of relations between entities, and rewrites the
//! marker-delimited relation block of every generated model from that graph.
//!
//! ```no_run
//! use easy_dev::commands::{MakeCrudCommand, MakeModelRelationCommand, Project};
//!
//! # fn main() -> anyhow::Result<()> {
//! let project = Project::open(".", None)?;
//! MakeCrudCommand::new("Post".into(), vec!["title:string".into()], false).execute(&project)?;
//! MakeModelRelationCommand::new("Post".into(), "Comment".into(), "one-to-many".into(), false)
//!     .execute(&project)?;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod observability;
pub mod relations;
pub mod scaffold;
pub mod state;
pub mod templates;

pub use config::EasyDevConfig;
pub use error::{exit_code_for, EasyDevError, Result};
pub use relations::{RelationGraph, RelationKind, RelationSpec, RelationStore, RelationSynchronizer};
pub use scaffold::{ArtifactManifest, CodeGenerator, EntityName, SchemaDescriptor};
pub use templates::TemplateRenderer;
