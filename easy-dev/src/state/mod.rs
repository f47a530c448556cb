//! Persisted project state
//!
//! Everything easy-dev remembers between runs lives under one state directory
//! (`.easy-dev/` by default): the relation graph, the artifact manifest and the
//! lock file serializing read-modify-write cycles across processes.

mod lock;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::EasyDevConfig;
use crate::error::{EasyDevError, Result};

pub use lock::StateLock;

/// Relation graph file name
pub const RELATIONS_FILE: &str = "relations.jsonl";
/// Artifact manifest file name
pub const MANIFEST_FILE: &str = "artifacts.json";
/// Lock file name
pub const LOCK_FILE: &str = "state.lock";

/// Locations of the persisted state for one project
#[derive(Debug, Clone)]
pub struct ProjectState {
    root: PathBuf,
    state_dir: PathBuf,
    lock_timeout: Duration,
}

impl ProjectState {
    /// Resolve the state locations for `root` from the configuration
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: &EasyDevConfig) -> Self {
        let root = root.into();
        let state_dir = root.join(&config.state_dir);
        Self {
            root,
            state_dir,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        }
    }

    /// Project root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relation graph file
    #[must_use]
    pub fn relations_path(&self) -> PathBuf {
        self.state_dir.join(RELATIONS_FILE)
    }

    /// Artifact manifest file
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.state_dir.join(MANIFEST_FILE)
    }

    /// Take the exclusive state lock, waiting up to the configured timeout
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::LockTimeout`] if another process holds the lock
    /// for longer than the timeout, or an I/O error if the lock file cannot be
    /// created.
    pub fn lock(&self) -> Result<StateLock> {
        fs::create_dir_all(&self.state_dir).map_err(|e| EasyDevError::io(&self.state_dir, e))?;
        StateLock::acquire(self.state_dir.join(LOCK_FILE), self.lock_timeout)
    }
}

/// Replace `path` with `contents` so readers see either the old or the new file
///
/// The bytes go to a temporary file in the same directory, are flushed to disk,
/// and the temporary file is renamed over `path`. An existing file keeps its
/// permissions; a new one gets the usual `0644` (minus the umask) instead of
/// the private mode temporary files are created with.
///
/// # Errors
///
/// Returns an I/O error naming the path that failed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| EasyDevError::io(dir, e))?;

    let existing = fs::metadata(path).ok().map(|meta| meta.permissions());
    let mut tmp = temp_file_in(dir, existing.is_none()).map_err(|e| EasyDevError::io(dir, e))?;
    if let Some(permissions) = existing {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| EasyDevError::io(tmp.path(), e))?;
    }

    tmp.write_all(contents)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| EasyDevError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| EasyDevError::io(path, e.error))?;
    Ok(())
}

#[cfg(unix)]
fn temp_file_in(dir: &Path, fresh: bool) -> std::io::Result<tempfile::NamedTempFile> {
    use std::os::unix::fs::PermissionsExt;

    if fresh {
        tempfile::Builder::new()
            .permissions(fs::Permissions::from_mode(0o644))
            .tempfile_in(dir)
    } else {
        tempfile::NamedTempFile::new_in(dir)
    }
}

#[cfg(not(unix))]
fn temp_file_in(dir: &Path, _fresh: bool) -> std::io::Result<tempfile::NamedTempFile> {
    tempfile::NamedTempFile::new_in(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("file.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("post.rs");

        write_atomic(&path, b"first").unwrap();
        for mode in [0o644, 0o755, 0o640] {
            fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
            write_atomic(&path, b"next").unwrap();
            assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, mode);
        }
    }

    #[test]
    fn test_state_paths_follow_config() {
        let config = EasyDevConfig {
            state_dir: PathBuf::from("meta"),
            ..EasyDevConfig::default()
        };
        let state = ProjectState::new("/project", &config);
        assert_eq!(state.relations_path(), PathBuf::from("/project/meta/relations.jsonl"));
        assert_eq!(state.manifest_path(), PathBuf::from("/project/meta/artifacts.json"));
    }
}
