//! Readiness and error events.
//!
//! The locker reports what happens to it through an [`EventBus`]:
//! - `ready` once both indexes exist,
//! - `error` on index provisioning failure, on transient connectivity loss, and
//!   on unrecoverable connectivity loss,
//! - `claim` whenever a claim call locked at least one job.
//!
//! Every event goes to three places: a tokio broadcast channel for in-process
//! subscribers, a `tracing` log line, and optionally an append-only NDJSON
//! journal (one JSON object per line) in `.joblock/events/events.ndjson`.
//!
//! Journal appends happen on a writer task, in emit order, so emitting never
//! touches the filesystem. [`EventBus::flush`] waits until everything emitted
//! so far is on disk.
//!
//! # Event Format
//!
//! - `ts`: RFC3339 timestamp
//! - `kind`: `ready`, `error`, or `claim`
//! - `actor`: The owner string (e.g., `user@HOST`)
//! - `job`: Optional job name for job-specific events
//! - `details`: Freeform object with kind-specific details

use crate::clock::ClaimToken;
use crate::error::{JobLockError, Result};
use crate::locks::get_owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, mpsc, oneshot};

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Indexes exist; locking traffic may begin.
    Ready,
    /// Something went wrong; `details.fatal` says whether polling must stop.
    Error,
    /// A claim call locked one or more jobs.
    Claim,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Ready => write!(f, "ready"),
            EventKind::Error => write!(f, "error"),
            EventKind::Claim => write!(f, "claim"),
        }
    }
}

/// An event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub kind: EventKind,

    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,

    pub details: Value,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            ts: Utc::now(),
            kind,
            actor: get_owner_string(),
            job: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_job(mut self, job: impl Into<String>) -> Self {
        self.job = Some(job.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// `ready(collection)`.
    pub fn ready(collection: &str) -> Self {
        Self::new(EventKind::Ready).with_details(json!({ "collection": collection }))
    }

    /// `error(cause)`.
    pub fn error(cause: &JobLockError) -> Self {
        Self::new(EventKind::Error).with_details(json!({
            "message": cause.to_string(),
            "fatal": cause.is_fatal(),
            "exit_code": cause.exit_code(),
        }))
    }

    pub fn claim(job: &str, count: usize, token: ClaimToken) -> Self {
        Self::new(EventKind::Claim)
            .with_job(job)
            .with_details(json!({ "count": count, "token": token }))
    }

    /// Whether this is an error event that requires a restart.
    pub fn is_fatal(&self) -> bool {
        self.kind == EventKind::Error && self.details["fatal"] == Value::Bool(true)
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            JobLockError::UserError(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

#[derive(Debug)]
enum JournalOp {
    Append(Event),
    Flush(oneshot::Sender<()>),
}

/// Fan-out point for locker events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    journal: Option<mpsc::UnboundedSender<JournalOp>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx, journal: None }
    }

    /// Also append every event to the NDJSON file at `path`.
    ///
    /// Spawns the journal writer, so this must run inside a tokio runtime.
    /// The writer exits once every clone of the bus is dropped.
    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal = Some(spawn_journal_writer(path.into()));
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publish an event. Never fails: a journal write error is logged, and an
    /// event with no subscribers is simply dropped from the channel.
    pub fn emit(&self, event: Event) {
        match event.kind {
            EventKind::Ready => {
                tracing::info!(details = %event.details, "store ready");
            }
            EventKind::Error if event.is_fatal() => {
                tracing::error!(job = ?event.job, details = %event.details, "fatal store error");
            }
            EventKind::Error => {
                tracing::warn!(job = ?event.job, details = %event.details, "store error");
            }
            EventKind::Claim => {
                tracing::debug!(job = ?event.job, details = %event.details, "jobs claimed");
            }
        }

        if let Some(journal) = &self.journal
            && journal.send(JournalOp::Append(event.clone())).is_err()
        {
            tracing::warn!(kind = %event.kind, "event journal writer has stopped");
        }

        let _ = self.tx.send(event);
    }

    /// Wait until every event emitted so far has been appended to the journal.
    pub async fn flush(&self) {
        let Some(journal) = &self.journal else {
            return;
        };
        let (done_tx, done_rx) = oneshot::channel();
        if journal.send(JournalOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

fn spawn_journal_writer(path: PathBuf) -> mpsc::UnboundedSender<JournalOp> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(op) = rx.recv().await {
            match op {
                JournalOp::Append(event) => {
                    let target = path.clone();
                    let written =
                        tokio::task::spawn_blocking(move || append_event(&target, &event)).await;
                    match written {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(
                                journal = %path.display(),
                                error = %e,
                                "failed to journal event"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                journal = %path.display(),
                                error = %e,
                                "journal write task failed"
                            );
                        }
                    }
                }
                JournalOp::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    });

    tx
}

/// Append an event to an NDJSON journal, creating the file and its directory.
pub fn append_event(path: &Path, event: &Event) -> Result<()> {
    let json_line = event.to_ndjson_line()?;

    if let Some(dir) = path.parent()
        && !dir.exists()
    {
        fs::create_dir_all(dir).map_err(|e| {
            JobLockError::UserError(format!(
                "failed to create events directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            JobLockError::UserError(format!(
                "failed to open events file '{}': {}",
                path.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        JobLockError::UserError(format!(
            "failed to write event to '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}

/// Read all events from an NDJSON journal, skipping lines that do not parse.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        JobLockError::UserError(format!(
            "failed to read events file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
