//! Error types and exit codes
//!
//! Every component returns a typed error. [`EasyDevError`] aggregates them at the
//! command boundary and maps each kind to a stable process exit code so scripts
//! can branch on the failure.

use std::path::PathBuf;

use thiserror::Error;

use crate::relations::RelationSpec;

/// Invalid user input. Never mutates state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Entity or field name is not a well-formed identifier
    #[error("invalid {what} name '{name}': {reason}")]
    InvalidName {
        /// "entity" or "field"
        what: &'static str,
        /// Offending name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Name collides with a reserved word of the generated code
    #[error("'{name}' is a reserved name and cannot be used as {what} name")]
    ReservedName {
        /// "an entity" or "a field"
        what: &'static str,
        /// Offending name
        name: String,
    },

    /// Field declared twice on the same entity
    #[error("field '{field}' is declared more than once on entity '{entity}'")]
    DuplicateField {
        /// Entity being described
        entity: String,
        /// Repeated field name
        field: String,
    },

    /// Entity maps to the same table as an already generated entity
    #[error("entity '{entity}' collides with already generated entity '{existing}'")]
    DuplicateEntity {
        /// Requested entity
        entity: String,
        /// Entity already present in the manifest
        existing: String,
    },

    /// Field type is not in the allowed set
    #[error("field '{field}' has unsupported type '{field_type}' (allowed: {allowed})")]
    InvalidType {
        /// Field name
        field: String,
        /// Requested type
        field_type: String,
        /// Comma separated list of allowed types
        allowed: String,
    },

    /// Field definition could not be parsed
    #[error("invalid field definition '{input}': {reason}")]
    InvalidFieldSpec {
        /// Raw definition
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Default value does not fit the field type
    #[error("default value '{value}' is not a valid {field_type} for field '{field}'")]
    InvalidDefault {
        /// Field name
        field: String,
        /// Field type
        field_type: String,
        /// Rejected value
        value: String,
    },

    /// No fields were given
    #[error("at least one field must be specified for entity '{entity}'")]
    NoFields {
        /// Entity being described
        entity: String,
    },

    /// Relation kind could not be parsed
    #[error("unknown relation type '{0}' (expected one-to-many, many-to-one, many-to-many or one-to-one)")]
    UnknownRelationKind(String),

    /// An entity cannot be related to itself
    #[error("entity '{0}' cannot declare a relation to itself")]
    SelfRelation(String),
}

/// Declared relation violates the graph invariants. The graph is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationConflictError {
    /// The same relation is already declared
    #[error("relation {0} is already declared")]
    Duplicate(RelationSpec),

    /// A different relation already exists for the same entity pair
    #[error("relation {requested} contradicts existing relation {existing}")]
    Contradiction {
        /// Relation being added
        requested: RelationSpec,
        /// Relation already in the graph
        existing: RelationSpec,
    },

    /// Removal of a relation that was never declared
    #[error("relation {0} is not declared")]
    NotDeclared(RelationSpec),

    /// Loaded graph breaks an invariant
    #[error("relation graph is inconsistent: {0}")]
    Inconsistent(String),
}

/// Why an existing file was not overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// File matches what the tool last wrote
    Unchanged,
    /// File was edited since the tool last wrote it
    Modified,
    /// File exists but was not produced by the tool
    Untracked,
}

impl std::fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "already generated"),
            Self::Modified => write!(f, "modified since last generation"),
            Self::Untracked => write!(f, "not generated by easy-dev"),
        }
    }
}

/// One file that was left untouched because of on-disk drift
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConflict {
    /// Project relative path
    pub path: PathBuf,
    /// Why the write was refused
    pub reason: ConflictReason,
}

/// Generated files were left unchanged; rerun with `--force` to override.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} file(s) left unchanged ({}); use --force to overwrite", conflicts.len(), describe_conflicts(conflicts))]
pub struct FileConflictError {
    /// Every refused file
    pub conflicts: Vec<FileConflict>,
}

fn describe_conflicts(conflicts: &[FileConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("{}: {}", c.path.display(), c.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A model file has no managed relation block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model file {} for entity '{entity}' has no managed relation block: {reason}", path.display())]
pub struct MissingMarkerError {
    /// Entity owning the model
    pub entity: String,
    /// Project relative path
    pub path: PathBuf,
    /// What is wrong with the markers
    pub reason: String,
}

/// The state lock could not be acquired in time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timed out after {waited_ms}ms waiting for lock {}", path.display())]
pub struct LockTimeoutError {
    /// Lock file
    pub path: PathBuf,
    /// How long we waited
    pub waited_ms: u64,
}

/// Template lookup or rendering failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// No template registered under this key
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    /// Template references a placeholder with no binding
    #[error("template '{template}' uses placeholder '{binding}' which has no binding")]
    MissingBinding {
        /// Template key
        template: String,
        /// Unbound placeholder
        binding: String,
    },

    /// Template source is malformed or rendering failed
    #[error("failed to render template '{template}': {message}")]
    Render {
        /// Template key
        template: String,
        /// Engine message
        message: String,
    },
}

/// Top-level error for every easy-dev operation
#[derive(Debug, Error)]
pub enum EasyDevError {
    /// Bad user input
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Relation graph invariant violation
    #[error("relation conflict: {0}")]
    RelationConflict(#[from] RelationConflictError),

    /// On-disk drift from the recorded hash
    #[error("file conflict: {0}")]
    FileConflict(#[from] FileConflictError),

    /// Sync target is not auto-managed
    #[error("missing marker: {0}")]
    MissingMarker(#[from] MissingMarkerError),

    /// State lock contention
    #[error("lock timeout: {0}")]
    LockTimeout(#[from] LockTimeoutError),

    /// Template failure
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// Persisted state could not be parsed
    #[error("corrupted state file {}: {reason}", path.display())]
    CorruptState {
        /// State file
        path: PathBuf,
        /// Parse failure
        reason: String,
    },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl EasyDevError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error kind
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Io { .. } => 1,
            Self::Validation(_) => 2,
            Self::RelationConflict(_) => 3,
            Self::FileConflict(_) => 4,
            Self::MissingMarker(_) => 5,
            Self::LockTimeout(_) => 6,
            Self::Template(_) => 7,
            Self::Config(_) => 8,
            Self::CorruptState { .. } => 9,
        }
    }
}

impl From<figment::Error> for EasyDevError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result alias used across the crate
pub type Result<T, E = EasyDevError> = std::result::Result<T, E>;

/// Exit code for an error surfaced at the CLI boundary
///
/// Walks the `anyhow` context chain looking for a typed error; anything else
/// is an internal failure.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain().find_map(typed_exit_code).unwrap_or(1)
}

fn typed_exit_code(cause: &(dyn std::error::Error + 'static)) -> Option<u8> {
    if let Some(err) = cause.downcast_ref::<EasyDevError>() {
        return Some(err.exit_code());
    }
    if cause.is::<ValidationError>() {
        Some(2)
    } else if cause.is::<RelationConflictError>() {
        Some(3)
    } else if cause.is::<FileConflictError>() {
        Some(4)
    } else if cause.is::<MissingMarkerError>() {
        Some(5)
    } else if cause.is::<LockTimeoutError>() {
        Some(6)
    } else if cause.is::<TemplateError>() {
        Some(7)
    } else {
        None
    }
}
