//! In-memory versioned store for grievance records.
//!
//! Each record carries a monotonically increasing version; updates are
//! compare-and-swap against the version the caller read. A lost update
//! (two writers both applying, one silently overwriting the other's
//! timeline append) is therefore impossible: the loser gets a
//! [`StoreError::VersionConflict`]. Operations on different grievances
//! are fully independent.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::model::{Category, GrievanceId, GrievanceRecord};
use crate::policy::UserId;
use crate::status::Status;

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("grievance not found: {0}")]
    NotFound(GrievanceId),

    #[error("version conflict on grievance {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: GrievanceId,
        expected: u64,
        found: u64,
    },

    #[error("grievance id already exists: {0}")]
    DuplicateId(GrievanceId),

    #[error("lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a grievance store.
pub type SharedGrievanceStore = Arc<GrievanceStore>;

/// A record paired with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned {
    pub record: GrievanceRecord,
    pub version: u64,
}

/// In-memory grievance store with optimistic concurrency control.
#[derive(Default)]
pub struct GrievanceStore {
    records: RwLock<HashMap<GrievanceId, Versioned>>,
}

impl GrievanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared reference to this store.
    pub fn shared(self) -> SharedGrievanceStore {
        Arc::new(self)
    }

    /// Insert a freshly created record at version 0.
    pub fn insert(&self, record: GrievanceRecord) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        if records.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        records.insert(
            record.id.clone(),
            Versioned { record, version: 0 },
        );
        Ok(())
    }

    /// Get a record together with its current version.
    pub fn get(&self, id: &str) -> StoreResult<Option<Versioned>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    /// Replace a record if its version still matches `expected_version`.
    ///
    /// The swap is all-or-nothing under the write lock: concurrent readers
    /// see either the old record or the new one, never a mix. Returns the
    /// new version on success.
    pub fn update(
        &self,
        id: &str,
        expected_version: u64,
        record: GrievanceRecord,
    ) -> StoreResult<u64> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        let entry = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                found: entry.version,
            });
        }

        entry.record = record;
        entry.version += 1;
        Ok(entry.version)
    }

    /// List records matching a filter, most recently created first.
    pub fn list(&self, filter: &GrievanceFilter) -> StoreResult<Vec<GrievanceRecord>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;

        let mut matching: Vec<GrievanceRecord> = records
            .values()
            .filter(|v| filter.matches(&v.record))
            .map(|v| v.record.clone())
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Filter for listing grievances. An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct GrievanceFilter {
    pub status: Option<Status>,
    pub category: Option<Category>,
    pub village: Option<String>,
    pub submitter: Option<UserId>,
}

impl GrievanceFilter {
    /// Create a new empty filter (matches all records).
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by status.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by category.
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Filter by village of the grievance location.
    pub fn village(mut self, village: &str) -> Self {
        self.village = Some(village.to_string());
        self
    }

    /// Filter by submitter.
    pub fn submitter(mut self, submitter: &str) -> Self {
        self.submitter = Some(submitter.to_string());
        self
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &GrievanceRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(category) = self.category {
            if record.category != category {
                return false;
            }
        }
        if let Some(ref village) = self.village {
            if &record.location.address.village != village {
                return false;
            }
        }
        if let Some(ref submitter) = self.submitter {
            if &record.submitter != submitter {
                return false;
            }
        }
        true
    }
}
