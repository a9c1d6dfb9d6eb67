//! Implementation of the `joblock poll` command.
//!
//! Provisions the indexes, then claims every configured job name each
//! `process_every_ms`, printing claimed jobs as JSON lines until interrupted.
//! A fatal store error ends the command with its exit code.

use super::claim::job_json_line;
use super::{Session, install_shutdown_handler};
use crate::cli::PollArgs;
use crate::error::{JobLockError, Result};
use crate::job::Job;
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const JOB_CHANNEL_CAPACITY: usize = 64;

/// Execute the `joblock poll` command.
pub async fn cmd_poll(root: Option<&Path>, args: PollArgs) -> Result<()> {
    let session = Session::open(root)?;
    let definitions = session.config.job_definitions();
    if definitions.is_empty() {
        return Err(JobLockError::UserError(format!(
            "no job definitions configured.\n\n\
             Add job names under `definitions:` in {}",
            session.ctx.config_path().display()
        )));
    }

    if let Err(e) = session.locker.provision().await {
        session.locker.events().flush().await;
        return Err(e);
    }

    let (tx, rx) = mpsc::channel(JOB_CHANNEL_CAPACITY);
    let printer = spawn_printer(rx);

    let outcome = if args.once {
        session
            .locker
            .poll_once(&definitions, &tx)
            .await
            .map(|claimed| tracing::info!(claimed, "poll cycle finished"))
    } else {
        tracing::info!(
            definitions = definitions.len(),
            every_ms = session.config.process_every_ms,
            "polling"
        );
        session
            .locker
            .run(definitions, tx.clone(), install_shutdown_handler())
            .await
    };

    drop(tx);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "job printer task failed");
    }
    session.locker.events().flush().await;
    outcome
}

fn spawn_printer(mut rx: mpsc::Receiver<Job>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match job_json_line(&job) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::warn!(job = %job.name(), error = %e, "failed to print job"),
            }
        }
    })
}
