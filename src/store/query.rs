//! Filters, updates, sort orders, and index specifications understood by every
//! store backend.

use crate::clock::ClaimToken;
use crate::job::JobRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Fields of a job record that can be indexed or sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobField {
    Name,
    NextRunAt,
    Priority,
    LockedAt,
    Disabled,
}

impl JobField {
    /// Name of the field in the stored document.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobField::Name => "name",
            JobField::NextRunAt => "nextRunAt",
            JobField::Priority => "priority",
            JobField::LockedAt => "lockedAt",
            JobField::Disabled => "disabled",
        }
    }

    /// Compare two records on this field, ascending.
    ///
    /// Null timestamps sort before any value, as document stores order them.
    fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering {
        match self {
            JobField::Name => a.name.cmp(&b.name),
            JobField::NextRunAt => a.next_run_at.cmp(&b.next_run_at),
            JobField::Priority => a.priority.cmp(&b.priority),
            JobField::LockedAt => a.locked_at.cmp(&b.locked_at),
            JobField::Disabled => a.disabled.cmp(&b.disabled),
        }
    }
}

impl std::fmt::Display for JobField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One key of a sort order or index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: JobField,
    #[serde(default)]
    pub order: SortDirection,
}

impl SortKey {
    pub fn asc(field: JobField) -> Self {
        Self {
            field,
            order: SortDirection::Asc,
        }
    }

    pub fn desc(field: JobField) -> Self {
        Self {
            field,
            order: SortDirection::Desc,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = match self.order {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{} {}", self.field, order)
    }
}

/// Ordered list of sort keys, compared lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec(pub Vec<SortKey>);

impl Default for SortSpec {
    /// Earliest `nextRunAt` first, then highest priority.
    fn default() -> Self {
        Self(vec![
            SortKey::asc(JobField::NextRunAt),
            SortKey::desc(JobField::Priority),
        ])
    }
}

impl SortSpec {
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn compare(&self, a: &JobRecord, b: &JobRecord) -> Ordering {
        for key in &self.0 {
            let ord = key.field.compare(a, b);
            let ord = match key.order {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Sort records in place. Stable, so ties keep insertion order.
    pub fn sort(&self, records: &mut [JobRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

/// A named index over job fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub keys: Vec<SortKey>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, keys: Vec<SortKey>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }
}

/// The eligibility predicate of one claim call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCriteria {
    pub name: String,
    /// Unlocked jobs are eligible when `nextRunAt <= scan_horizon`.
    pub scan_horizon: DateTime<Utc>,
    /// Locks taken at or before this instant are stale.
    pub lock_deadline: DateTime<Utc>,
}

impl ClaimCriteria {
    pub fn matches(&self, record: &JobRecord) -> bool {
        if record.disabled || record.name != self.name {
            return false;
        }
        match record.locked_at {
            None => record
                .next_run_at
                .is_some_and(|next_run_at| next_run_at <= self.scan_horizon),
            // Stale locks are reclaimable whatever their nextRunAt.
            Some(locked_at) => locked_at <= self.lock_deadline,
        }
    }
}

/// Record selection for `update_many` and `find`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    ByName(String),
    ByClaimToken(ClaimToken),
    Claimable(ClaimCriteria),
}

impl Filter {
    pub fn matches(&self, record: &JobRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::ByName(name) => record.name == *name,
            Filter::ByClaimToken(token) => record.locked_uuid == Some(*token),
            Filter::Claimable(criteria) => criteria.matches(record),
        }
    }
}

/// The `$set` applied to every record a claim matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockUpdate {
    pub locked_at: DateTime<Utc>,
    pub locked_uuid: ClaimToken,
}

impl LockUpdate {
    /// Apply the update; returns whether the record changed.
    pub fn apply(&self, record: &mut JobRecord) -> bool {
        let changed = record.locked_at != Some(self.locked_at)
            || record.locked_uuid != Some(self.locked_uuid);
        record.locked_at = Some(self.locked_at);
        record.locked_uuid = Some(self.locked_uuid);
        changed
    }
}
