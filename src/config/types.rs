//! Configuration types and defaults for joblock.

use serde::{Deserialize, Serialize};

/// Per-job-name settings under `definitions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionConfig {
    /// Lock lifetime for this job name; falls back to `default_lock_lifetime_ms`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_lifetime_ms: Option<u64>,
}

// Default value functions for serde
pub(crate) fn default_collection() -> String {
    "jobs".to_string()
}
pub(crate) fn default_process_every_ms() -> u64 {
    5_000
}
pub(crate) fn default_lock_lifetime_ms() -> u64 {
    600_000
}
pub(crate) fn default_claim_timeout_ms() -> u64 {
    30_000
}
pub(crate) fn default_table_lock_wait_ms() -> u64 {
    5_000
}
pub(crate) fn default_true() -> bool {
    true
}
