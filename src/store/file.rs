//! File-backed job store.
//!
//! One collection is one JSON table file, `<dir>/<collection>.json`, holding the
//! collection's indexes and job records. Workers on the same host (or sharing a
//! filesystem with working advisory locks) coordinate through it:
//!
//! - mutations take `<dir>/<collection>.lock`, read the table, change it, and
//!   publish the result with an atomic rename before releasing the lock;
//! - reads never take the lock, since the rename guarantees they see a whole
//!   table.
//!
//! All file I/O runs on tokio's blocking pool.

use super::{
    Filter, IndexSpec, JobStore, LockUpdate, SortSpec, Topology, UpdateResult, apply_update,
    register_index, select,
};
use crate::error::{JobLockError, Result};
use crate::fs::atomic_write_file;
use crate::job::JobRecord;
use crate::locks::{TableLockOptions, acquire_table_lock};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Settings for opening a [`FileStore`].
#[derive(Debug, Clone, Copy)]
pub struct FileStoreOptions {
    pub table_lock: TableLockOptions,
    /// Whether an unreachable data directory may come back on its own.
    pub auto_reconnect: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TableFile {
    #[serde(default)]
    indexes: Vec<IndexSpec>,
    #[serde(default)]
    jobs: Vec<JobRecord>,
}

#[derive(Debug)]
struct Inner {
    collection: String,
    dir: PathBuf,
    table_path: PathBuf,
    lock_path: PathBuf,
    options: FileStoreOptions,
    destroyed: AtomicBool,
}

impl Inner {
    fn ensure_open(&self) -> Result<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(JobLockError::StoreError(format!(
                "store for collection '{}' is closed",
                self.collection
            )));
        }
        if !self.dir.is_dir() {
            return Err(JobLockError::StoreError(format!(
                "data directory '{}' is not reachable",
                self.dir.display()
            )));
        }
        Ok(())
    }

    fn read_table(&self) -> Result<TableFile> {
        if !self.table_path.exists() {
            return Ok(TableFile::default());
        }

        let content = std::fs::read_to_string(&self.table_path).map_err(|e| {
            JobLockError::StoreError(format!(
                "failed to read table '{}': {}",
                self.table_path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            JobLockError::StoreError(format!(
                "table '{}' is corrupt: {}",
                self.table_path.display(),
                e
            ))
        })
    }

    /// Read-modify-write under the table lock. `change` reports whether the
    /// table needs writing back.
    fn mutate<T>(
        &self,
        action: &str,
        change: impl FnOnce(&mut TableFile) -> Result<(T, bool)>,
    ) -> Result<T> {
        self.ensure_open()?;
        let guard = acquire_table_lock(&self.lock_path, action, self.options.table_lock)?;

        let mut table = self.read_table()?;
        let (output, dirty) = change(&mut table)?;

        if dirty {
            let json = serde_json::to_string_pretty(&table).map_err(|e| {
                JobLockError::StoreError(format!("failed to serialize table: {}", e))
            })?;
            atomic_write_file(&self.table_path, &json)?;
        }

        guard.release()?;
        Ok(output)
    }
}

/// A job store persisted as a JSON table file.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

impl FileStore {
    /// Open (without creating) the table for `collection` under `dir`.
    pub fn open(dir: impl AsRef<Path>, collection: &str, options: FileStoreOptions) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            inner: Arc::new(Inner {
                collection: collection.to_string(),
                table_path: dir.join(format!("{}.json", collection)),
                lock_path: dir.join(format!("{}.lock", collection)),
                dir,
                options,
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    pub fn table_path(&self) -> &Path {
        &self.inner.table_path
    }

    /// Close the store for good. Later calls fail and the topology reports
    /// it as destroyed.
    pub fn close(&self) {
        self.inner.destroyed.store(true, Ordering::SeqCst);
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Inner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| JobLockError::StoreError(format!("store task failed: {}", e)))?
    }
}

#[async_trait]
impl JobStore for FileStore {
    fn collection(&self) -> &str {
        &self.inner.collection
    }

    fn topology(&self) -> Topology {
        let destroyed = self.inner.destroyed.load(Ordering::SeqCst);
        let live_connections = if !destroyed && self.inner.dir.is_dir() {
            1
        } else {
            0
        };
        Topology {
            live_connections,
            auto_reconnect: self.inner.options.auto_reconnect,
            destroyed,
        }
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let spec = spec.clone();
        self.blocking(move |inner| {
            inner.mutate("create_index", |table| {
                let created = register_index(&mut table.indexes, &spec)?;
                Ok(((), created))
            })
        })
        .await
    }

    async fn list_indexes(&self) -> Result<Vec<IndexSpec>> {
        self.blocking(|inner| {
            inner.ensure_open()?;
            Ok(inner.read_table()?.indexes)
        })
        .await
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let record = record.clone();
        self.blocking(move |inner| {
            inner.mutate("insert", |table| {
                if table.jobs.iter().any(|existing| existing.id == record.id) {
                    return Err(JobLockError::StoreError(format!(
                        "duplicate job id '{}'",
                        record.id
                    )));
                }
                table.jobs.push(record);
                Ok(((), true))
            })
        })
        .await
    }

    async fn update_many(&self, filter: &Filter, update: &LockUpdate) -> Result<UpdateResult> {
        let filter = filter.clone();
        let update = *update;
        self.blocking(move |inner| {
            inner.mutate("update_many", |table| {
                let result = apply_update(&mut table.jobs, &filter, &update);
                Ok((result, result.modified_count > 0))
            })
        })
        .await
    }

    async fn find(&self, filter: &Filter, sort: &SortSpec) -> Result<Vec<JobRecord>> {
        let filter = filter.clone();
        let sort = sort.clone();
        self.blocking(move |inner| {
            inner.ensure_open()?;
            let table = inner.read_table()?;
            Ok(select(&table.jobs, &filter, &sort))
        })
        .await
    }
}
