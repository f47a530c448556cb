//! Model relationships
//!
//! Declared relations live in a [`RelationGraph`], persisted by a
//! [`RelationStore`] and projected into model files by the
//! [`RelationSynchronizer`].

mod graph;
mod store;
mod sync;

pub use graph::{
    relation_accessors, AccessorKind, RelationAccessor, RelationGraph, RelationKind, RelationSpec,
};
pub use store::RelationStore;
pub use sync::{
    render_relation_block, PlannedChange, RelationSynchronizer, SyncOutcome, MARKER_END,
    MARKER_START,
};
