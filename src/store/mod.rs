//! The shared job record store.
//!
//! A store owns the persisted job records. Workers only ever mutate them through
//! [`JobStore::update_many`], which must apply "match filter, then set fields" to
//! every matching record as one atomic step relative to other callers. That
//! atomicity is the only thing keeping two workers from claiming the same record.
//!
//! # Backends
//!
//! - [`MemoryStore`]: in-process, serialised by one async mutex.
//! - [`FileStore`]: a JSON table on disk, serialised across processes by an
//!   exclusive table lock file and published by atomic rename.

mod file;
mod memory;
pub mod query;

use crate::error::Result;
use crate::job::JobRecord;
use async_trait::async_trait;

pub use file::{FileStore, FileStoreOptions};
pub use memory::{MemoryStore, StoreOp};
pub use query::{
    ClaimCriteria, Filter, IndexSpec, JobField, LockUpdate, SortDirection, SortKey, SortSpec,
};

/// Counts reported by a conditional multi-record update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

/// Snapshot of the store driver's connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    pub live_connections: usize,
    pub auto_reconnect: bool,
    pub destroyed: bool,
}

impl Topology {
    pub fn connected() -> Self {
        Self {
            live_connections: 1,
            auto_reconnect: true,
            destroyed: false,
        }
    }
}

/// Operations every job store backend provides.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Name of the collection this store serves.
    fn collection(&self) -> &str;

    /// Current connection state. Must not touch the network.
    fn topology(&self) -> Topology;

    /// Create an index. Creating an identical index again is a no-op; reusing a
    /// name with different keys is an error.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    async fn list_indexes(&self) -> Result<Vec<IndexSpec>>;

    async fn insert(&self, record: &JobRecord) -> Result<()>;

    /// Atomically apply `update` to every record matching `filter`.
    async fn update_many(&self, filter: &Filter, update: &LockUpdate) -> Result<UpdateResult>;

    async fn find(&self, filter: &Filter, sort: &SortSpec) -> Result<Vec<JobRecord>>;
}

/// Index creation shared by the backends: identical specs are a no-op, a name
/// reused with different keys is a conflict.
pub(crate) fn register_index(indexes: &mut Vec<IndexSpec>, spec: &IndexSpec) -> Result<bool> {
    use crate::error::JobLockError;

    match indexes.iter().find(|existing| existing.name == spec.name) {
        Some(existing) if existing.keys == spec.keys => Ok(false),
        Some(_) => Err(JobLockError::IndexError(format!(
            "an index named '{}' already exists with different keys",
            spec.name
        ))),
        None => {
            indexes.push(spec.clone());
            Ok(true)
        }
    }
}

/// Apply a lock update to every matching record in a table.
pub(crate) fn apply_update(
    jobs: &mut [JobRecord],
    filter: &Filter,
    update: &LockUpdate,
) -> UpdateResult {
    let mut result = UpdateResult::default();
    for record in jobs.iter_mut().filter(|record| filter.matches(record)) {
        result.matched_count += 1;
        if update.apply(record) {
            result.modified_count += 1;
        }
    }
    result
}

/// Select and order matching records from a table.
pub(crate) fn select(jobs: &[JobRecord], filter: &Filter, sort: &SortSpec) -> Vec<JobRecord> {
    let mut found: Vec<JobRecord> = jobs
        .iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect();
    sort.sort(&mut found);
    found
}
