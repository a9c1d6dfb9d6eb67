//! RAII lock guard implementation.

use crate::error::{JobLockError, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Exclusive OS lock on a table lock file.
///
/// The lock file itself stays on disk between holders; only the lock on the
/// open handle moves. Dropping the guard unlocks it and logs any failure.
/// [`release`](Self::release) does the same but returns the failure.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    file: Option<File>,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf, file: File) -> Self {
        Self {
            path,
            file: Some(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clear the holder metadata and unlock, surfacing errors.
    pub fn release(mut self) -> Result<()> {
        match self.file.take() {
            Some(file) => unlock(&self.path, &file),
            None => Ok(()),
        }
    }
}

fn unlock(path: &Path, file: &File) -> Result<()> {
    file.set_len(0)
        .and_then(|()| FileExt::unlock(file))
        .map_err(|e| {
            JobLockError::LockError(format!(
                "failed to release lock '{}': {}",
                path.display(),
                e
            ))
        })
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take()
            && let Err(e) = unlock(&self.path, &file)
        {
            // Closing the handle below still drops the OS lock.
            tracing::warn!(lock = %self.path.display(), error = %e, "failed to release table lock");
        }
    }
}
