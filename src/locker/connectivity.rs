//! Connectivity guard.
//!
//! Decides, before any claim, whether the store is worth talking to. A worker
//! that lost its connection for a moment (laptop sleep, failover) keeps polling;
//! one whose driver can never reconnect stops loudly instead of looping forever.

use super::JobLocker;
use crate::error::{JobLockError, Result};
use crate::events::Event;
use crate::store::Topology;

/// Classification of a store topology snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// At least one live connection.
    Connected,
    /// No live connection, but the driver will reconnect on its own.
    TransientlyUnreachable,
    /// No live connection and no way back without a restart.
    PermanentlyUnreachable,
}

impl Connectivity {
    pub fn classify(topology: Topology) -> Self {
        if topology.live_connections > 0 {
            Connectivity::Connected
        } else if topology.auto_reconnect && !topology.destroyed {
            Connectivity::TransientlyUnreachable
        } else {
            Connectivity::PermanentlyUnreachable
        }
    }
}

impl JobLocker {
    /// Returns whether the claim may proceed.
    ///
    /// * `Ok(true)` - connected
    /// * `Ok(false)` - transient outage; an `error` event was emitted and the
    ///   claim should be a successful no-op
    /// * `Err(JobLockError::ConnectionLost)` - unrecoverable; do not retry
    pub(crate) fn guard_connectivity(&self, job_name: &str) -> Result<bool> {
        let topology = self.store.topology();
        match Connectivity::classify(topology) {
            Connectivity::Connected => Ok(true),
            Connectivity::TransientlyUnreachable => {
                tracing::debug!(
                    job = job_name,
                    "missing store connection, not attempting to find and lock jobs"
                );
                let cause = JobLockError::StoreError(format!(
                    "lost connection to collection '{}'",
                    self.store.collection()
                ));
                self.events.emit(Event::error(&cause).with_job(job_name));
                Ok(false)
            }
            Connectivity::PermanentlyUnreachable => {
                tracing::debug!(
                    job = job_name,
                    auto_reconnect = topology.auto_reconnect,
                    destroyed = topology.destroyed,
                    "store connection is not recoverable"
                );
                Err(JobLockError::ConnectionLost(format!(
                    "collection '{}' has no live connection (auto_reconnect: {}, destroyed: {})",
                    self.store.collection(),
                    topology.auto_reconnect,
                    topology.destroyed
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(live_connections: usize, auto_reconnect: bool, destroyed: bool) -> Topology {
        Topology {
            live_connections,
            auto_reconnect,
            destroyed,
        }
    }

    #[test]
    fn live_connection_is_connected_whatever_the_flags() {
        assert_eq!(
            Connectivity::classify(topology(1, false, true)),
            Connectivity::Connected
        );
        assert_eq!(
            Connectivity::classify(topology(3, true, false)),
            Connectivity::Connected
        );
    }

    #[test]
    fn no_connection_with_auto_reconnect_is_transient() {
        assert_eq!(
            Connectivity::classify(topology(0, true, false)),
            Connectivity::TransientlyUnreachable
        );
    }

    #[test]
    fn no_connection_without_reconnect_or_destroyed_is_permanent() {
        assert_eq!(
            Connectivity::classify(topology(0, false, false)),
            Connectivity::PermanentlyUnreachable
        );
        assert_eq!(
            Connectivity::classify(topology(0, true, true)),
            Connectivity::PermanentlyUnreachable
        );
    }
}
