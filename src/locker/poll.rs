//! Polling loop.

use super::{JobLocker, horizon_after};
use crate::error::{JobLockError, Result};
use crate::events::Event;
use crate::job::{Job, JobDefinition};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

impl JobLocker {
    /// Run one polling cycle: move the scan horizon to `now + process_every`
    /// and claim every definition concurrently, forwarding claimed jobs to
    /// `sink`.
    ///
    /// Non-fatal claim errors are emitted as `error` events and do not fail
    /// the cycle. A fatal error is emitted and returned once every claim of
    /// the cycle has finished.
    pub async fn poll_once(
        &self,
        definitions: &[(String, JobDefinition)],
        sink: &mpsc::Sender<Job>,
    ) -> Result<usize> {
        let now = self.clock.now();
        self.set_scan_horizon(horizon_after(now, self.settings.process_every));

        let mut claims = JoinSet::new();
        for (name, definition) in definitions.iter().cloned() {
            let locker = self.clone();
            claims.spawn(async move {
                let outcome = locker.find_and_lock(&name, &definition).await;
                (name, outcome)
            });
        }

        let mut claimed = 0;
        let mut fatal: Option<JobLockError> = None;
        while let Some(joined) = claims.join_next().await {
            match joined {
                Ok((_, Ok(jobs))) => {
                    for job in jobs {
                        claimed += 1;
                        if sink.send(job).await.is_err() {
                            tracing::debug!("job receiver dropped");
                        }
                    }
                }
                Ok((name, Err(e))) if e.is_fatal() => {
                    tracing::debug!(job = %name, error = %e, "claim failed fatally");
                    fatal.get_or_insert(e);
                }
                Ok((name, Err(e))) => {
                    self.events.emit(Event::error(&e).with_job(name));
                }
                Err(join_error) => {
                    let e = JobLockError::StoreError(format!("claim task failed: {}", join_error));
                    self.events.emit(Event::error(&e));
                }
            }
        }

        if let Some(e) = fatal {
            self.events.emit(Event::error(&e));
            return Err(e);
        }
        Ok(claimed)
    }

    /// Poll every `process_every` until `shutdown` is cancelled, the job
    /// receiver is dropped, or a fatal error occurs.
    pub async fn run(
        &self,
        definitions: Vec<(String, JobDefinition)>,
        sink: mpsc::Sender<Job>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        if definitions.is_empty() {
            tracing::warn!("no job definitions configured; polling will never claim anything");
        }

        let mut interval = tokio::time::interval(self.settings.process_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("polling stopped");
                    return Ok(());
                }
                _ = interval.tick() => {}
            }

            let claimed = self.poll_once(&definitions, &sink).await?;
            if claimed > 0 {
                tracing::info!(claimed, "claimed jobs");
            }

            if sink.is_closed() {
                tracing::info!("job receiver dropped, polling stopped");
                return Ok(());
            }
        }
    }
}
