//! The job locker: index provisioning, connectivity classification, lock
//! acquisition, and the polling loop that drives them.
//!
//! # Protocol
//!
//! 1. [`JobLocker::provision`] creates the lock-lookup and sort indexes once at
//!    startup and emits `ready` (or `error`).
//! 2. Every polling cycle sets the scan horizon to `now + process_every` and
//!    runs one [`JobLocker::find_and_lock`] per job name, concurrently.
//! 3. Each claim first asks the connectivity guard whether to talk to the store
//!    at all, then claims every eligible record with a single atomic
//!    `update_many` and reads them back by claim token.
//!
//! There is no release or heartbeat: a lock older than its definition's
//! lifetime is stale and any worker may claim the record again.

mod acquire;
mod connectivity;
mod poll;
mod provision;


use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{JobLockError, Result};
use crate::events::EventBus;
use crate::locks::get_owner_string;
use crate::store::{JobStore, SortSpec};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use connectivity::Connectivity;
pub use provision::{LOCK_INDEX_NAME, SORT_INDEX_NAME, lock_index, sort_index};

/// Tunables the locker reads on every claim.
#[derive(Debug, Clone)]
pub struct LockerSettings {
    /// Order of claimed jobs; also the sort index keys.
    pub sort: SortSpec,
    /// Polling interval and scan-ahead window.
    pub process_every: Duration,
    /// Upper bound for each store call.
    pub claim_timeout: Duration,
}

impl Default for LockerSettings {
    fn default() -> Self {
        Self {
            sort: SortSpec::default(),
            process_every: Duration::from_secs(5),
            claim_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Config> for LockerSettings {
    fn from(config: &Config) -> Self {
        Self {
            sort: config.sort.clone(),
            process_every: config.process_every(),
            claim_timeout: config.claim_timeout(),
        }
    }
}

/// Claims jobs from a shared store on behalf of one worker.
///
/// Cheap to clone; clones share the store, clock, event bus, scan horizon,
/// and readiness flag, so concurrent claims for different job names can each
/// hold their own handle.
#[derive(Clone)]
pub struct JobLocker {
    store: Arc<dyn JobStore>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    settings: Arc<LockerSettings>,
    worker: Arc<str>,
    scan_horizon: Arc<Mutex<Option<DateTime<Utc>>>>,
    ready: Arc<AtomicBool>,
}

impl std::fmt::Debug for JobLocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLocker")
            .field("collection", &self.store.collection())
            .field("worker", &self.worker)
            .field("settings", &self.settings)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl JobLocker {
    pub fn new(store: Arc<dyn JobStore>, settings: LockerSettings) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            events: EventBus::new(),
            settings: Arc::new(settings),
            worker: format!("{}:{}", get_owner_string(), std::process::id()).into(),
            scan_horizon: Arc::new(Mutex::new(None)),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn settings(&self) -> &LockerSettings {
        &self.settings
    }

    /// Identity stamped on claimed job handles.
    pub fn worker(&self) -> &str {
        &self.worker
    }

    /// Whether index provisioning has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Set the horizon used by claims until the next cycle moves it.
    pub fn set_scan_horizon(&self, horizon: DateTime<Utc>) {
        *self
            .scan_horizon
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(horizon);
    }

    /// The current cycle's horizon, or `now + process_every` before the first
    /// cycle.
    pub fn scan_horizon(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let stored = *self
            .scan_horizon
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        stored.unwrap_or_else(|| horizon_after(now, self.settings.process_every))
    }

    /// Run a store call under the claim timeout.
    async fn bounded<T>(&self, op: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = self.settings.claim_timeout;
        tokio::time::timeout(limit, call).await.map_err(|_| {
            JobLockError::Timeout(format!(
                "{} on '{}' exceeded {}ms",
                op,
                self.store.collection(),
                limit.as_millis()
            ))
        })?
    }
}

/// `now + window`, saturating at the latest representable instant.
pub(crate) fn horizon_after(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
