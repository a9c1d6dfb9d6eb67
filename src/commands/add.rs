//! Implementation of the `joblock add` command.
//!
//! Inserts one job record. Without `--in-secs` or `--at` the job is due now.

use super::Session;
use crate::cli::AddArgs;
use crate::error::{JobLockError, Result};
use crate::job::JobRecord;
use crate::store::JobStore;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::path::Path;

/// Execute the `joblock add` command.
pub async fn cmd_add(root: Option<&Path>, args: AddArgs) -> Result<()> {
    let session = Session::open(root)?;
    let record = add_job(&session, &args, Utc::now()).await?;

    println!("Added job {} ({})", record.id, record.name);
    if let Some(next_run_at) = record.next_run_at {
        println!("  Next run:  {}", next_run_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("  Priority:  {}", record.priority);
    if record.disabled {
        println!("  Disabled:  yes (will not be claimed)");
    }

    Ok(())
}

/// Build the record described by `args` and insert it.
pub(super) async fn add_job(
    session: &Session,
    args: &AddArgs,
    now: DateTime<Utc>,
) -> Result<JobRecord> {
    let record = build_record(args, now)?;
    session.store.insert(&record).await?;
    tracing::debug!(job = %record.name, id = %record.id, "job added");
    Ok(record)
}

fn build_record(args: &AddArgs, now: DateTime<Utc>) -> Result<JobRecord> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(JobLockError::UserError(
            "job name must be non-empty".to_string(),
        ));
    }

    let next_run_at = match (&args.at, args.in_secs) {
        (Some(at), _) => DateTime::parse_from_rfc3339(at)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| {
                JobLockError::UserError(format!(
                    "invalid --at '{}': {} (expected RFC3339, e.g. 2024-05-01T12:00:00Z)",
                    at, e
                ))
            })?,
        (None, Some(secs)) => Duration::try_seconds(secs)
            .and_then(|offset| now.checked_add_signed(offset))
            .ok_or_else(|| {
                JobLockError::UserError(format!("--in-secs {} is out of range", secs))
            })?,
        (None, None) => now,
    };

    let data = match &args.data {
        Some(raw) => serde_json::from_str::<Value>(raw).map_err(|e| {
            JobLockError::UserError(format!("--data is not valid JSON: {}", e))
        })?,
        None => Value::Null,
    };

    let mut record = JobRecord::new(name, next_run_at)
        .with_priority(args.priority)
        .with_data(data);
    if args.disabled {
        record = record.disabled();
    }
    Ok(record)
}
