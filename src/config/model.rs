//! Config struct definition and default implementation.

use super::types::*;
use crate::store::SortSpec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a joblock root.
///
/// This struct represents the contents of `.joblock/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Store settings
    // =========================================================================
    /// Name of the job collection (table file `<collection>.json`).
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Whether a lost store connection may recover without a restart.
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// Upper bound for a single store call during a claim.
    #[serde(default = "default_claim_timeout_ms")]
    pub claim_timeout_ms: u64,

    /// How long a mutation waits for another process's table lock.
    #[serde(default = "default_table_lock_wait_ms")]
    pub table_lock_wait_ms: u64,

    // =========================================================================
    // Polling settings
    // =========================================================================
    /// Interval between polling cycles; also how far ahead each cycle scans.
    #[serde(default = "default_process_every_ms")]
    pub process_every_ms: u64,

    /// Lock lifetime for job names without their own.
    #[serde(default = "default_lock_lifetime_ms")]
    pub default_lock_lifetime_ms: u64,

    /// Order in which claimed jobs are returned; also the sort index keys.
    #[serde(default)]
    pub sort: SortSpec,

    /// Job names polled by `joblock poll`.
    #[serde(default)]
    pub definitions: BTreeMap<String, DefinitionConfig>,

    // =========================================================================
    // Event settings
    // =========================================================================
    /// Whether to append events to `.joblock/events/events.ndjson`.
    #[serde(default = "default_true")]
    pub journal_events: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            auto_reconnect: default_true(),
            claim_timeout_ms: default_claim_timeout_ms(),
            table_lock_wait_ms: default_table_lock_wait_ms(),
            process_every_ms: default_process_every_ms(),
            default_lock_lifetime_ms: default_lock_lifetime_ms(),
            sort: SortSpec::default(),
            definitions: BTreeMap::new(),
            journal_events: default_true(),
        }
    }
}
