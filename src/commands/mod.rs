//! Command implementations for joblock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the [`Session`] every command except `init` opens:
//! the resolved root, its config, the file-backed store, and a locker wired
//! to the event journal.

mod add;
mod claim;
mod init;
mod jobs;
mod poll;
mod shutdown;

#[cfg(test)]
mod tests;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::{StoreContext, require_initialized};
use crate::error::Result;
use crate::events::EventBus;
use crate::locker::{JobLocker, LockerSettings};
use crate::store::FileStore;
use std::path::Path;
use std::sync::Arc;

pub use shutdown::install_shutdown_handler;

/// Dispatch a command to its implementation.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let root = cli.root.as_deref();
    match cli.command {
        Command::Init => init::cmd_init(root).await,
        Command::Add(args) => add::cmd_add(root, args).await,
        Command::Claim(args) => claim::cmd_claim(root, args).await,
        Command::Poll(args) => poll::cmd_poll(root, args).await,
        Command::Jobs(args) => jobs::cmd_jobs(root, args).await,
    }
}

/// Everything a command needs to talk to an initialized root.
pub(crate) struct Session {
    pub ctx: StoreContext,
    pub config: Config,
    pub store: FileStore,
    pub locker: JobLocker,
}

impl Session {
    /// Open the session for an initialized root.
    pub(crate) fn open(root: Option<&Path>) -> Result<Self> {
        let ctx = require_initialized(root)?;
        Self::open_context(ctx)
    }

    pub(crate) fn open_context(ctx: StoreContext) -> Result<Self> {
        let config = Config::load(ctx.config_path())?;
        let store = FileStore::open(
            &ctx.collections_dir,
            &config.collection,
            config.file_store_options(),
        );

        let mut events = EventBus::new();
        if config.journal_events {
            events = events.with_journal(ctx.events_file());
        }

        let locker = JobLocker::new(Arc::new(store.clone()), LockerSettings::from(&config))
            .with_events(events);

        tracing::debug!(
            root = %ctx.root.display(),
            collection = %config.collection,
            "opened session"
        );

        Ok(Self {
            ctx,
            config,
            store,
            locker,
        })
    }
}
