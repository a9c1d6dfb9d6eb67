//! CLI argument parsing for joblock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// joblock: claim scheduled jobs from a shared store without double-running them.
///
/// Job records live in a collection under `.joblock/`. Each claim atomically
/// locks every due, enabled record of one job name; locks older than the job's
/// lifetime are considered abandoned and can be claimed again.
#[derive(Parser, Debug)]
#[command(name = "joblock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding (or to hold) the `.joblock/` state directory.
    ///
    /// Defaults to the nearest ancestor of the current directory that has one.
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for joblock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a joblock root.
    ///
    /// Creates `.joblock/` with a default `config.yaml` (kept if present) and
    /// provisions the collection's indexes. Safe to run repeatedly.
    Init,

    /// Add a job record to the collection.
    Add(AddArgs),

    /// Run one claim for a job name and print the claimed jobs.
    ///
    /// Each claimed job is printed as one JSON object per line.
    Claim(ClaimArgs),

    /// Provision indexes, then claim every configured job name on an interval.
    ///
    /// Claimed jobs are printed as JSON lines until SIGINT/SIGTERM.
    Poll(PollArgs),

    /// List job records with their lock state.
    Jobs(JobsArgs),
}

/// Arguments for the `add` command.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Job name (selects the job definition).
    pub name: String,

    /// Run this many seconds from now (negative values are in the past).
    #[arg(long, allow_hyphen_values = true, conflicts_with = "at")]
    pub in_secs: Option<i64>,

    /// Run at this RFC3339 instant.
    #[arg(long)]
    pub at: Option<String>,

    /// Higher priority jobs are claimed first among equally due jobs.
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    pub priority: i32,

    /// Store the job disabled; it is never claimed.
    #[arg(long)]
    pub disabled: bool,

    /// JSON payload handed to the executor.
    #[arg(long)]
    pub data: Option<String>,
}

/// Arguments for the `claim` command.
#[derive(Args, Debug)]
pub struct ClaimArgs {
    /// Job name to claim.
    pub name: String,

    /// Override the configured lock lifetime for this claim.
    #[arg(long)]
    pub lock_lifetime_ms: Option<u64>,
}

/// Arguments for the `poll` command.
#[derive(Args, Debug)]
pub struct PollArgs {
    /// Run a single polling cycle and exit.
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `jobs` command.
#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Only list jobs with this name.
    #[arg(long)]
    pub name: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
