//! Index provisioning.

use super::JobLocker;
use crate::error::Result;
use crate::events::Event;
use crate::store::{IndexSpec, JobField, SortKey, SortSpec};
use std::sync::atomic::Ordering;

/// Name of the index backing the claim predicate.
pub const LOCK_INDEX_NAME: &str = "findAndLockIndex";

/// Name of the index backing the claim read-back order.
pub const SORT_INDEX_NAME: &str = "findAndSortIndex";

/// Covers the claim predicate: name, due time, priority, lock age, disabled.
pub fn lock_index() -> IndexSpec {
    IndexSpec::new(
        LOCK_INDEX_NAME,
        vec![
            SortKey::asc(JobField::Name),
            SortKey::asc(JobField::NextRunAt),
            SortKey::desc(JobField::Priority),
            SortKey::asc(JobField::LockedAt),
            SortKey::asc(JobField::Disabled),
        ],
    )
}

/// Covers the configured result order.
pub fn sort_index(sort: &SortSpec) -> IndexSpec {
    IndexSpec::new(SORT_INDEX_NAME, sort.keys().to_vec())
}

impl JobLocker {
    /// Ensure both indexes exist, then mark the locker ready.
    ///
    /// Safe to call on every startup: existing identical indexes are left
    /// alone. Emits exactly one `ready` or `error` event per call.
    pub async fn provision(&self) -> Result<()> {
        let collection = self.store.collection().to_string();
        tracing::debug!(collection = %collection, "creating job indexes");

        let outcome = async {
            self.bounded("create_index", self.store.create_index(&lock_index()))
                .await?;
            self.bounded(
                "create_index",
                self.store.create_index(&sort_index(&self.settings.sort)),
            )
            .await
        }
        .await;

        match outcome {
            Ok(()) => {
                self.ready.store(true, Ordering::SeqCst);
                self.events.emit(Event::ready(&collection));
                Ok(())
            }
            Err(e) => {
                self.events.emit(Event::error(&e));
                Err(e)
            }
        }
    }
}
