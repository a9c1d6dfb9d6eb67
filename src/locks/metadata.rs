//! Holder metadata written into the table lock file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Who holds a table lock, and for what.
///
/// Purely informational: exclusion comes from the OS lock on the file, never
/// from this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Holder as `user@HOST`.
    pub owner: String,

    pub pid: u32,

    /// The store operation running under the lock.
    pub action: String,

    pub acquired_at: DateTime<Utc>,
}

impl LockMetadata {
    /// Metadata for the current process performing `action`.
    pub fn current(action: &str) -> Self {
        Self {
            owner: get_owner_string(),
            pid: std::process::id(),
            action: action.to_string(),
            acquired_at: Utc::now(),
        }
    }

    /// Read the holder recorded in `path`.
    ///
    /// `None` when the file is missing, empty (released, or a holder that has
    /// not written yet), or unparseable.
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// One-line description for lock wait errors.
    pub fn describe(&self) -> String {
        let held_ms = Utc::now()
            .signed_duration_since(self.acquired_at)
            .num_milliseconds()
            .max(0);
        format!(
            "{} by {} (pid {}), held for {}",
            self.action,
            self.owner,
            self.pid,
            format_held(held_ms)
        )
    }
}

fn format_held(ms: i64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{}s", ms / 1_000)
    } else {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1_000)
    }
}

/// Get the owner string for lock metadata and job handles.
pub(crate) fn get_owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
