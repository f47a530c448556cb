//! CRUD scaffold generator implementation
//!
//! This module turns an entity name and a list of field specifications into a
//! validated [`SchemaDescriptor`], and the descriptor into model, controller,
//! migration and validator files tracked by the [`ArtifactManifest`].

pub mod field_type;
pub mod generator;
pub mod helpers;
pub mod manifest;
pub mod schema;

pub use field_type::{DefaultValue, FieldSpec, PrimitiveType};
pub use generator::{CodeGenerator, GenerationReport};
pub use helpers::TemplateHelpers;
pub use manifest::{content_hash, ArtifactKind, ArtifactManifest, GeneratedArtifact};
pub use schema::{EntityName, SchemaDescriptor};
