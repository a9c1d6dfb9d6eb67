//! Table locks for the file-backed job store.
//!
//! Every mutation of a [`FileStore`](crate::store::FileStore) table runs while
//! holding an exclusive OS lock (`flock` on Unix, `LockFileEx` on Windows) on
//! `<collection>.lock` next to the table file. Exactly one handle holds it at a
//! time, so the read-modify-write it guards is atomic with respect to other
//! workers, whether they live in this process or another one.
//!
//! # Lock Metadata
//!
//! While held, the lock file contains JSON metadata used only in error
//! messages:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID
//! - `action`: The store operation being performed (update_many/insert/create_index)
//! - `acquired_at`: RFC3339 timestamp
//!
//! # Crashed Holders
//!
//! The OS drops the lock when the holding process exits, so a crash never
//! leaves a lock behind and nothing has to break one.
//!
//! # RAII Guards
//!
//! Locks are released when the guard is dropped. If unlocking fails during
//! drop, a warning is logged but the program does not crash.

mod guard;
mod metadata;
mod operations;

#[cfg(test)]
mod tests;

pub use guard::LockGuard;
pub use metadata::LockMetadata;
pub(crate) use metadata::get_owner_string;
pub use operations::{TableLockOptions, acquire_table_lock};
