use crate::clock::ManualClock;
use crate::config::Config;
use crate::context::STATE_DIR;
use crate::locker::{JobLocker, LockerSettings};
use crate::store::{JobStore, MemoryStore};
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A temp directory holding `.joblock/config.yaml` with default settings.
pub(crate) fn create_initialized_root() -> TempDir {
    create_root_with_config(&Config::default())
}

pub(crate) fn create_root_with_config(config: &Config) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let state_dir = temp_dir.path().join(STATE_DIR);
    std::fs::create_dir_all(state_dir.join("collections")).unwrap();
    std::fs::write(state_dir.join("config.yaml"), config.to_yaml().unwrap()).unwrap();
    temp_dir
}

/// A fixed, whole-second instant so stored timestamps compare exactly.
pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A locker over a fresh in-memory store, driven by a manual clock.
pub(crate) struct MemoryFixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub locker: JobLocker,
}

pub(crate) fn memory_fixture(settings: LockerSettings) -> MemoryFixture {
    let store = Arc::new(MemoryStore::new("jobs"));
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let locker = JobLocker::new(store.clone() as Arc<dyn JobStore>, settings)
        .with_clock(clock.clone());
    MemoryFixture {
        store,
        clock,
        locker,
    }
}
