//! Config loading, validation, and derived settings.

use super::model::Config;
use crate::error::{JobLockError, Result};
use crate::job::JobDefinition;
use crate::locks::TableLockOptions;
use crate::store::FileStoreOptions;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(JobLockError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            JobLockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string. Unknown fields are silently ignored.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| JobLockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            JobLockError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - durations used as intervals or waits must be positive
    /// - `collection` must be a plain file stem (no separators, no dots)
    /// - `sort` must be non-empty without repeated fields
    /// - definition names must be non-empty
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("process_every_ms", self.process_every_ms),
            ("claim_timeout_ms", self.claim_timeout_ms),
            ("table_lock_wait_ms", self.table_lock_wait_ms),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be greater than 0", key)));
            }
        }

        if self.collection.trim().is_empty() {
            return Err(invalid("collection must be non-empty".to_string()));
        }
        if self
            .collection
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '.')
        {
            return Err(invalid(format!(
                "collection '{}' must not contain path separators or dots",
                self.collection
            )));
        }

        if self.sort.keys().is_empty() {
            return Err(invalid("sort must list at least one field".to_string()));
        }
        let mut seen = HashSet::new();
        for key in self.sort.keys() {
            if !seen.insert(key.field) {
                return Err(invalid(format!("sort lists '{}' more than once", key.field)));
            }
        }

        if self.definitions.keys().any(|name| name.trim().is_empty()) {
            return Err(invalid("definition names must be non-empty".to_string()));
        }

        Ok(())
    }

    /// The locking definition for `name`, falling back to the default lifetime.
    pub fn definition(&self, name: &str) -> JobDefinition {
        let lifetime_ms = self
            .definitions
            .get(name)
            .and_then(|definition| definition.lock_lifetime_ms)
            .unwrap_or(self.default_lock_lifetime_ms);
        JobDefinition::new(Duration::from_millis(lifetime_ms))
    }

    /// Every configured job name with its definition.
    pub fn job_definitions(&self) -> Vec<(String, JobDefinition)> {
        self.definitions
            .keys()
            .map(|name| (name.clone(), self.definition(name)))
            .collect()
    }

    pub fn process_every(&self) -> Duration {
        Duration::from_millis(self.process_every_ms)
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_millis(self.claim_timeout_ms)
    }

    pub fn file_store_options(&self) -> FileStoreOptions {
        FileStoreOptions {
            table_lock: TableLockOptions {
                wait: Duration::from_millis(self.table_lock_wait_ms),
            },
            auto_reconnect: self.auto_reconnect,
        }
    }
}

fn invalid(message: String) -> JobLockError {
    JobLockError::UserError(format!("config validation failed: {}", message))
}
