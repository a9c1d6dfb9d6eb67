//! Implementation of the `joblock claim` command.
//!
//! Runs exactly one claim for a job name and prints each claimed job as a JSON
//! line on stdout. The claimed records stay locked; nothing here releases them.

use super::Session;
use crate::cli::ClaimArgs;
use crate::error::{JobLockError, Result};
use crate::job::{Job, JobDefinition};
use std::path::Path;
use std::time::Duration;

/// Execute the `joblock claim` command.
pub async fn cmd_claim(root: Option<&Path>, args: ClaimArgs) -> Result<()> {
    let session = Session::open(root)?;
    let claimed = claim_jobs(&session, &args).await;
    session.locker.events().flush().await;
    let jobs = claimed?;

    if jobs.is_empty() {
        tracing::info!(job = %args.name, "no jobs claimed");
    }
    for job in &jobs {
        println!("{}", job_json_line(job)?);
    }

    Ok(())
}

pub(super) async fn claim_jobs(session: &Session, args: &ClaimArgs) -> Result<Vec<Job>> {
    let definition = match args.lock_lifetime_ms {
        Some(ms) => JobDefinition::new(Duration::from_millis(ms)),
        None => session.config.definition(&args.name),
    };
    session.locker.find_and_lock(&args.name, &definition).await
}

/// Serialize a claimed job as a single JSON line.
pub(super) fn job_json_line(job: &Job) -> Result<String> {
    serde_json::to_string(job).map_err(|e| {
        JobLockError::UserError(format!("failed to serialize job to JSON: {}", e))
    })
}
