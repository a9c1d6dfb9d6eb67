//! joblock: claim scheduled jobs from a shared store without double-running them.
//!
//! This is the main entry point for the `joblock` CLI. It installs the log
//! subscriber, parses arguments, dispatches to the appropriate command handler,
//! and maps errors to exit codes.

use joblock::cli::Cli;
use joblock::{commands, exit_codes};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();

    match commands::dispatch(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}
