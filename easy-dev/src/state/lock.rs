//! Exclusive advisory lock on the state directory

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{EasyDevError, LockTimeoutError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Held exclusive lock; released when dropped, on every exit path
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Acquire the lock at `path`, polling until `timeout` elapses
    ///
    /// # Errors
    ///
    /// Returns [`EasyDevError::LockTimeout`] if the lock stays held by someone
    /// else, or an I/O error if the lock file cannot be opened or locked.
    pub fn acquire(path: PathBuf, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| EasyDevError::io(&path, e))?;

        let started = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => {
                    tracing::debug!(lock = %path.display(), "acquired state lock");
                    return Ok(Self { file, path });
                }
                Err(TryLockError::WouldBlock) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(LockTimeoutError {
                            path,
                            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        }
                        .into());
                    }
                    tracing::trace!(lock = %path.display(), "state lock busy, waiting");
                    thread::sleep(POLL_INTERVAL.min(timeout - waited));
                }
                Err(TryLockError::Error(err)) => return Err(EasyDevError::io(&path, err)),
            }
        }
    }

    /// Lock file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(lock = %self.path.display(), error = %err, "failed to release state lock");
        } else {
            tracing::debug!(lock = %self.path.display(), "released state lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_times_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.lock");

        let _held = StateLock::acquire(path.clone(), Duration::from_millis(100)).unwrap();
        let result = StateLock::acquire(path, Duration::from_millis(60));

        assert!(matches!(result, Err(EasyDevError::LockTimeout(_))));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.lock");

        {
            let _held = StateLock::acquire(path.clone(), Duration::from_millis(100)).unwrap();
        }
        let again = StateLock::acquire(path.clone(), Duration::from_millis(100)).unwrap();
        assert_eq!(again.path(), path.as_path());
    }

    #[test]
    fn test_waiter_gets_lock_after_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.lock");

        let held = StateLock::acquire(path.clone(), Duration::from_millis(100)).unwrap();
        let waiter_path = path.clone();
        let waiter = thread::spawn(move || {
            StateLock::acquire(waiter_path, Duration::from_secs(5)).map(|_| ())
        });

        thread::sleep(Duration::from_millis(100));
        drop(held);

        assert!(waiter.join().unwrap().is_ok());
    }
}
