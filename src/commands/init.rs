//! Implementation of the `joblock init` command.
//!
//! # What `joblock init` does
//!
//! 1. Creates `.joblock/`, `.joblock/collections/`, and `.joblock/events/`
//! 2. Writes a default `config.yaml` (an existing one is left untouched)
//! 3. Creates the collection's `findAndLockIndex` and `findAndSortIndex`
//!
//! Running it again is harmless: directories and config are kept, and
//! provisioning identical indexes is a no-op.

use super::Session;
use crate::config::Config;
use crate::context::{StoreContext, resolve_context};
use crate::error::{JobLockError, Result};
use crate::fs::atomic_write_file;
use crate::store::JobStore;
use std::fs;
use std::path::Path;

/// Execute the `joblock init` command.
pub async fn cmd_init(root: Option<&Path>) -> Result<()> {
    let ctx = resolve_context(root)?;
    let wrote_config = create_layout(&ctx)?;

    let session = Session::open_context(ctx)?;
    let provisioned = session.locker.provision().await;
    session.locker.events().flush().await;
    provisioned?;
    let indexes = session.store.list_indexes().await?;

    println!("Initialized joblock.");
    println!();
    println!("Root:        {}", session.ctx.root.display());
    println!(
        "Config:      {}{}",
        session.ctx.config_path().display(),
        if wrote_config { " (created)" } else { "" }
    );
    println!("Collection:  {}", session.config.collection);
    println!("Indexes:");
    for index in &indexes {
        let keys: Vec<String> = index.keys.iter().map(ToString::to_string).collect();
        println!("  {} ({})", index.name, keys.join(", "));
    }
    println!();
    println!("You can now add jobs with `joblock add <name>`.");

    Ok(())
}

/// Create the state directories and default config. Returns whether the
/// config file was written.
pub(super) fn create_layout(ctx: &StoreContext) -> Result<bool> {
    for dir in [&ctx.state_dir, &ctx.collections_dir, &ctx.events_dir()] {
        fs::create_dir_all(dir).map_err(|e| {
            JobLockError::UserError(format!(
                "failed to create directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
    }

    let config_path = ctx.config_path();
    if config_path.exists() {
        return Ok(false);
    }
    atomic_write_file(&config_path, &Config::default().to_yaml()?)?;
    Ok(true)
}
