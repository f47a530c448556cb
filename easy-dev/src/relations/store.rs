//! File-backed relation graph
//!
//! One JSON object per line, `{"from":"Post","to":"Comment","kind":"one_to_many"}`,
//! sorted so the file diffs cleanly. Readers ignore fields they do not know, so
//! newer tool versions may add optional fields without breaking older ones.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::graph::{RelationGraph, RelationSpec};
use crate::error::{EasyDevError, Result};
use crate::state::{write_atomic, StateLock};

/// Persisted relation graph at a fixed path
#[derive(Debug, Clone)]
pub struct RelationStore {
    path: PathBuf,
}

impl RelationStore {
    /// Store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the graph; a missing file is an empty graph
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::CorruptState`] for unparseable lines and for
    /// records that break the graph invariants.
    pub fn load(&self) -> Result<RelationGraph> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(RelationGraph::new()),
            Err(err) => return Err(EasyDevError::io(&self.path, err)),
        };

        let records = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<RelationSpec>(line).map_err(|err| EasyDevError::CorruptState {
                    path: self.path.clone(),
                    reason: format!("line {}: {err}", idx + 1),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let graph = RelationGraph::from_records(records).map_err(|err| EasyDevError::CorruptState {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;
        tracing::debug!(path = %self.path.display(), relations = graph.len(), "loaded relation graph");
        Ok(graph)
    }

    /// Atomically rewrite the file from `graph`
    ///
    /// Requires the state lock so concurrent invocations serialize their
    /// read-modify-write cycles.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&self, graph: &RelationGraph, _lock: &StateLock) -> Result<()> {
        let mut contents = String::new();
        for record in graph.relations() {
            let line = serde_json::to_string(&record).map_err(|err| EasyDevError::CorruptState {
                path: self.path.clone(),
                reason: err.to_string(),
            })?;
            contents.push_str(&line);
            contents.push('\n');
        }

        write_atomic(&self.path, contents.as_bytes())?;
        tracing::info!(path = %self.path.display(), relations = graph.len(), "saved relation graph");
        Ok(())
    }
}
