//! Implementation of the `joblock jobs` command.
//!
//! Lists job records in claim order together with their lock state, judged
//! against each job name's configured lock lifetime.

use super::Session;
use crate::cli::JobsArgs;
use crate::error::Result;
use crate::job::{JobRecord, LockState};
use crate::store::{Filter, JobStore};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Execute the `joblock jobs` command.
pub async fn cmd_jobs(root: Option<&Path>, args: JobsArgs) -> Result<()> {
    let session = Session::open(root)?;
    let listed = list_jobs(&session, args.name.as_deref(), Utc::now()).await?;

    if listed.is_empty() {
        println!("No jobs.");
        return Ok(());
    }

    println!("Jobs ({}):", listed.len());
    println!();
    for (record, state) in &listed {
        println!("  {} [{}]", record.name, state);
        println!("    Id:         {}", record.id);
        println!("    Next run:   {}", format_time(record.next_run_at));
        println!("    Priority:   {}", record.priority);
        if let Some(locked_at) = record.locked_at {
            println!("    Locked at:  {}", format_time(Some(locked_at)));
        }
        if let Some(token) = record.locked_uuid {
            println!("    Token:      {}", token);
        }
    }
    println!();

    let stale = listed
        .iter()
        .filter(|(_, state)| *state == LockState::Stale)
        .count();
    if stale > 0 {
        println!(
            "Note: {} job(s) hold stale locks and will be reclaimed by the next claim.",
            stale
        );
    }

    Ok(())
}

pub(super) async fn list_jobs(
    session: &Session,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Vec<(JobRecord, LockState)>> {
    let filter = match name {
        Some(name) => Filter::ByName(name.to_string()),
        None => Filter::All,
    };
    let records = session.store.find(&filter, &session.config.sort).await?;

    Ok(records
        .into_iter()
        .map(|record| {
            let lifetime = session.config.definition(&record.name).lock_lifetime;
            let state = record.lock_state(now, lifetime);
            (record, state)
        })
        .collect())
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}
