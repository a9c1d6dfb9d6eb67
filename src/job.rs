//! Job records, job definitions, and claimed job handles.

use crate::clock::ClaimToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// A persisted, schedulable unit of work.
///
/// Field names follow the stored document layout (`nextRunAt`, `lockedAt`, ...).
/// An absent `lockedAt` and a null one are the same state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(rename = "_id")]
    pub id: Uuid,

    /// Name of the definition that governs this job.
    pub name: String,

    /// Higher runs first among jobs due at the same instant.
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub next_run_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub locked_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_uuid: Option<ClaimToken>,

    #[serde(default)]
    pub disabled: bool,

    /// Opaque payload for the executor.
    #[serde(default)]
    pub data: Value,
}

impl JobRecord {
    /// Create an unlocked, enabled record due at `next_run_at`.
    pub fn new(name: impl Into<String>, next_run_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            priority: 0,
            next_run_at: Some(next_run_at),
            locked_at: None,
            locked_uuid: None,
            disabled: false,
            data: Value::Null,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_locked_at(mut self, locked_at: DateTime<Utc>) -> Self {
        self.locked_at = Some(locked_at);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Classify the record's lock for display.
    pub fn lock_state(&self, now: DateTime<Utc>, lock_lifetime: Duration) -> LockState {
        if self.disabled {
            return LockState::Disabled;
        }
        match self.locked_at {
            None => LockState::Free,
            Some(locked_at) if locked_at <= lock_deadline(now, lock_lifetime) => LockState::Stale,
            Some(_) => LockState::Locked,
        }
    }
}

/// Lock status of a record relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    Locked,
    Stale,
    Disabled,
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockState::Free => write!(f, "free"),
            LockState::Locked => write!(f, "locked"),
            LockState::Stale => write!(f, "stale"),
            LockState::Disabled => write!(f, "disabled"),
        }
    }
}

/// How a job type is run, as far as locking is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobDefinition {
    /// Locks older than this are considered abandoned.
    pub lock_lifetime: Duration,
}

impl JobDefinition {
    pub fn new(lock_lifetime: Duration) -> Self {
        Self { lock_lifetime }
    }
}

/// `now - lock_lifetime`; locks at or before this instant are stale.
///
/// Lifetimes too large for chrono saturate to the earliest representable time,
/// which makes every existing lock fresh.
pub fn lock_deadline(now: DateTime<Utc>, lock_lifetime: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(lock_lifetime)
        .ok()
        .and_then(|lifetime| now.checked_sub_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// A job claimed by this worker in one lock cycle.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    record: JobRecord,
    claim_token: ClaimToken,
    worker: String,
}

impl Job {
    pub(crate) fn new(record: JobRecord, claim_token: ClaimToken, worker: String) -> Self {
        Self {
            record,
            claim_token,
            worker,
        }
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn claim_token(&self) -> ClaimToken {
        self.claim_token
    }

    /// Identity of the worker that holds the claim (`user@host:pid`).
    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn into_record(self) -> JobRecord {
        self.record
    }
}
