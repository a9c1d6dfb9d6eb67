//! Table lock acquisition.

use super::guard::LockGuard;
use super::metadata::LockMetadata;
use crate::error::{JobLockError, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

const BACKOFF_BASE: Duration = Duration::from_millis(5);
const BACKOFF_MAX: Duration = Duration::from_millis(100);

/// How long a mutation waits for the current holder.
#[derive(Debug, Clone, Copy)]
pub struct TableLockOptions {
    pub wait: Duration,
}

/// Acquire a table lock, waiting up to `options.wait` for the current holder.
///
/// Blocks the calling thread; async callers run it on the blocking pool.
/// The lock is an exclusive OS lock on the open file, so a holder that dies
/// releases it with its handles and no waiter ever deletes or replaces the
/// file.
///
/// # Returns
///
/// * `Ok(LockGuard)` - Lock held until the guard is dropped or released
/// * `Err(JobLockError::LockError)` - Still held when the wait ran out (exit code 4)
pub fn acquire_table_lock(
    lock_path: &Path,
    action: &str,
    options: TableLockOptions,
) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            JobLockError::LockError(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    // No truncate: the current holder's metadata stays readable.
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| {
            JobLockError::LockError(format!(
                "failed to open lock '{}': {}",
                lock_path.display(),
                e
            ))
        })?;

    let started = Instant::now();
    let mut backoff = BACKOFF_BASE;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                record_holder(lock_path, &file, action)?;
                return Ok(LockGuard::new(lock_path.to_path_buf(), file));
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {}
            Err(e) => {
                return Err(JobLockError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                )));
            }
        }

        if started.elapsed() >= options.wait {
            let holder = match LockMetadata::read(lock_path) {
                Some(meta) => format!("\nHolder: {}", meta.describe()),
                None => String::new(),
            };
            return Err(JobLockError::LockError(format!(
                "table lock is held by another process\nLock: {}{}",
                lock_path.display(),
                holder
            )));
        }

        std::thread::sleep(backoff);
        backoff = (backoff * 2).min(BACKOFF_MAX);
    }
}

/// Overwrite the lock file with this process's metadata. `file` is a fresh
/// handle, so its cursor is still at the start.
fn record_holder(lock_path: &Path, mut file: &File, action: &str) -> Result<()> {
    let json = serde_json::to_string(&LockMetadata::current(action)).map_err(|e| {
        JobLockError::LockError(format!("failed to serialize lock metadata: {}", e))
    })?;

    file.set_len(0)
        .and_then(|()| file.write_all(json.as_bytes()))
        .map_err(|e| {
            JobLockError::LockError(format!(
                "failed to write lock metadata to '{}': {}",
                lock_path.display(),
                e
            ))
        })
}
