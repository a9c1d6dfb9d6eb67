//! Lock acquisition.

use super::JobLocker;
use crate::error::{JobLockError, Result};
use crate::events::Event;
use crate::job::{Job, JobDefinition, lock_deadline};
use crate::store::{ClaimCriteria, Filter, LockUpdate};

impl JobLocker {
    /// Claim every eligible record named `job_name` for this worker.
    ///
    /// A record is eligible when it is enabled and either unlocked and due by
    /// the scan horizon, or locked at or before `now - lock_lifetime`. All
    /// eligible records are stamped with `now` and a fresh claim token in one
    /// atomic update, then read back by that token in the configured order.
    ///
    /// Returns an empty list (not an error) when nothing is eligible or when
    /// the store is transiently unreachable. Returns
    /// [`JobLockError::ConnectionLost`] without touching the store when the
    /// connection cannot come back.
    ///
    /// If the read-back fails after the update succeeded, the records stay
    /// locked by a token nobody holds; they become claimable again once their
    /// lock is stale.
    pub async fn find_and_lock(
        &self,
        job_name: &str,
        definition: &JobDefinition,
    ) -> Result<Vec<Job>> {
        if job_name.trim().is_empty() {
            return Err(JobLockError::UserError("job name must be non-empty".to_string()));
        }

        if !self.guard_connectivity(job_name)? {
            return Ok(Vec::new());
        }
        if !self.is_ready() {
            tracing::debug!(job = job_name, "claiming before indexes are provisioned");
        }

        let now = self.clock.now();
        let token = self.clock.claim_token();
        let criteria = ClaimCriteria {
            name: job_name.to_string(),
            scan_horizon: self.scan_horizon(now),
            lock_deadline: lock_deadline(now, definition.lock_lifetime),
        };
        tracing::debug!(
            job = job_name,
            horizon = %criteria.scan_horizon,
            deadline = %criteria.lock_deadline,
            "finding and locking jobs"
        );

        let update = LockUpdate {
            locked_at: now,
            locked_uuid: token,
        };
        let result = self
            .bounded(
                "update_many",
                self.store.update_many(&Filter::Claimable(criteria), &update),
            )
            .await?;
        tracing::debug!(
            job = job_name,
            matched = result.matched_count,
            modified = result.modified_count,
            "lock update applied"
        );

        let records = self
            .bounded(
                "find",
                self.store
                    .find(&Filter::ByClaimToken(token), &self.settings.sort),
            )
            .await
            .inspect_err(|e| {
                tracing::warn!(
                    job = job_name,
                    token = %token,
                    error = %e,
                    "claimed jobs could not be read back; they stay locked until stale"
                );
            })?;

        let jobs: Vec<Job> = records
            .into_iter()
            .map(|record| Job::new(record, token, self.worker.to_string()))
            .collect();

        if !jobs.is_empty() {
            self.events.emit(Event::claim(job_name, jobs.len(), token));
        }

        Ok(jobs)
    }
}
