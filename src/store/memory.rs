//! In-process job store.

use super::{
    Filter, IndexSpec, JobStore, LockUpdate, SortSpec, Topology, UpdateResult, apply_update,
    register_index, select,
};
use crate::error::{JobLockError, Result};
use crate::job::JobRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Store operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    CreateIndex,
    UpdateMany,
    Find,
}

#[derive(Debug, Default)]
struct Table {
    jobs: Vec<JobRecord>,
    indexes: Vec<IndexSpec>,
}

/// A job store held in memory.
///
/// Every mutation holds the table mutex across match-and-set, which makes
/// `update_many` atomic with respect to concurrent callers. Topology and
/// one-shot failures can be set from the outside to simulate outages.
#[derive(Debug)]
pub struct MemoryStore {
    collection: String,
    table: Mutex<Table>,
    topology: StdMutex<Topology>,
    failures: StdMutex<HashMap<StoreOp, String>>,
    update_calls: AtomicUsize,
    find_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            table: Mutex::new(Table::default()),
            topology: StdMutex::new(Topology::connected()),
            failures: StdMutex::new(HashMap::new()),
            update_calls: AtomicUsize::new(0),
            find_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_topology(&self, topology: Topology) {
        *self
            .topology
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = topology;
    }

    /// Make the next call of `op` fail with `message`.
    pub fn fail_next(&self, op: StoreOp, message: impl Into<String>) {
        self.failures
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .insert(op, message.into());
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored record, in insertion order.
    pub async fn records(&self) -> Vec<JobRecord> {
        self.table.lock().await.jobs.clone()
    }

    fn take_failure(&self, op: StoreOp) -> Result<()> {
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .remove(&op);
        match failure {
            Some(message) if op == StoreOp::CreateIndex => Err(JobLockError::IndexError(message)),
            Some(message) => Err(JobLockError::StoreError(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn topology(&self) -> Topology {
        *self
            .topology
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.take_failure(StoreOp::CreateIndex)?;
        let mut table = self.table.lock().await;
        register_index(&mut table.indexes, spec)?;
        Ok(())
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        Ok(self.table.lock().await.indexes.clone())
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let mut table = self.table.lock().await;
        if table.jobs.iter().any(|existing| existing.id == record.id) {
            return Err(JobLockError::StoreError(format!(
                "duplicate job id '{}'",
                record.id
            )));
        }
        table.jobs.push(record.clone());
        Ok(())
    }

    async fn update_many(&self, filter: &Filter, update: &LockUpdate) -> Result<UpdateResult> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure(StoreOp::UpdateMany)?;
        let mut table = self.table.lock().await;
        Ok(apply_update(&mut table.jobs, filter, update))
    }

    async fn find(&self, filter: &Filter, sort: &SortSpec) -> Result<Vec<JobRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure(StoreOp::Find)?;
        let table = self.table.lock().await;
        Ok(select(&table.jobs, filter, sort))
    }
}
