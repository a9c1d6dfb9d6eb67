//! Root directory and layout resolution for joblock.
//!
//! A joblock root is any directory holding a `.joblock/` state directory:
//!
//! ```text
//! .joblock/
//!   config.yaml
//!   collections/<collection>.json   job table
//!   collections/<collection>.lock   table lock (present only during a write)
//!   events/events.ndjson            event journal
//! ```
//!
//! Commands resolve the root by walking up from the working directory (or an
//! explicit `--root`) until a `.joblock/` directory is found, so they work from
//! any subdirectory of a project.

use crate::error::{JobLockError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the state directory inside a root.
pub const STATE_DIR: &str = ".joblock";

/// Resolved paths for a joblock root. All paths are absolute.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub root: PathBuf,

    /// `{root}/.joblock/`
    pub state_dir: PathBuf,

    /// `{root}/.joblock/collections/`
    pub collections_dir: PathBuf,
}

impl StoreContext {
    /// Resolve the context from the current working directory.
    pub fn resolve() -> Result<Self> {
        let cwd = env::current_dir().map_err(|e| {
            JobLockError::UserError(format!("failed to get current working directory: {}", e))
        })?;

        Self::resolve_from(&cwd)
    }

    /// Resolve the context from a specific directory.
    ///
    /// The nearest ancestor (including `start` itself) holding `.joblock/` wins.
    /// If none does, `start` becomes the root, which is what `init` wants.
    pub fn resolve_from<P: AsRef<Path>>(start: P) -> Result<Self> {
        let start = absolute(start.as_ref())?;

        let root = start
            .ancestors()
            .find(|dir| dir.join(STATE_DIR).is_dir())
            .map(Path::to_path_buf)
            .unwrap_or(start);

        let state_dir = root.join(STATE_DIR);
        let collections_dir = state_dir.join("collections");

        Ok(Self {
            root,
            state_dir,
            collections_dir,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.state_dir.is_dir() && self.config_path().is_file()
    }

    /// Ensure the root is initialized, returning an error if not.
    ///
    /// Called by every command except `init`.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(JobLockError::UserError(format!(
                "joblock is not initialized.\n\
                 Expected state directory with config.yaml at: {}\n\n\
                 Run `joblock init` to initialize this directory.",
                self.state_dir.display()
            )));
        }
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }

    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().map_err(|e| {
        JobLockError::UserError(format!("failed to get current working directory: {}", e))
    })?;
    Ok(cwd.join(path))
}

/// Resolve the context (from `root` when given) and require initialization.
pub fn require_initialized(root: Option<&Path>) -> Result<StoreContext> {
    let ctx = resolve_context(root)?;
    ctx.ensure_initialized()?;
    Ok(ctx)
}

/// Resolve the context without requiring initialization.
pub fn resolve_context(root: Option<&Path>) -> Result<StoreContext> {
    match root {
        Some(root) => StoreContext::resolve_from(root),
        None => StoreContext::resolve(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{DirGuard, create_initialized_root};
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_uninitialized_uses_start_dir() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::resolve_from(temp_dir.path()).unwrap();

        assert_eq!(ctx.root, temp_dir.path());
        assert!(ctx.state_dir.ends_with(".joblock"));
        assert!(ctx.collections_dir.ends_with("collections"));
        assert!(!ctx.is_initialized());
    }

    #[test]
    fn test_resolve_from_subdirectory_finds_root() {
        let temp_dir = create_initialized_root();
        let nested = temp_dir.path().join("src").join("nested");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = StoreContext::resolve_from(&nested).unwrap();
        assert_eq!(ctx.root, temp_dir.path());
        assert!(ctx.is_initialized());
    }

    #[test]
    fn test_ensure_initialized_fails_when_not_initialized() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::resolve_from(temp_dir.path()).unwrap();

        let err = ctx.ensure_initialized().unwrap_err();
        assert!(matches!(err, JobLockError::UserError(_)));
        assert!(err.to_string().contains("joblock init"));
    }

    #[test]
    fn test_state_dir_without_config_is_not_initialized() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join(STATE_DIR)).unwrap();

        let ctx = StoreContext::resolve_from(temp_dir.path()).unwrap();
        assert!(ctx.ensure_initialized().is_err());
    }

    #[test]
    fn test_paths() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = StoreContext::resolve_from(temp_dir.path()).unwrap();

        assert!(ctx.config_path().ends_with(".joblock/config.yaml"));
        assert!(ctx.events_file().ends_with("events/events.ndjson"));
    }

    #[test]
    #[serial]
    fn test_resolve_from_cwd() {
        let temp_dir = create_initialized_root();
        let nested = temp_dir.path().join("work");
        std::fs::create_dir_all(&nested).unwrap();
        let _guard = DirGuard::new(&nested);

        let ctx = require_initialized(None).unwrap();
        assert_eq!(
            ctx.root.canonicalize().unwrap(),
            temp_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_relative_root_is_made_absolute() {
        let temp_dir = create_initialized_root();
        let _guard = DirGuard::new(temp_dir.path());

        let ctx = resolve_context(Some(Path::new("."))).unwrap();
        assert!(ctx.root.is_absolute());
        assert!(ctx.is_initialized());
    }
}
