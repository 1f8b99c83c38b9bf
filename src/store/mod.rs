//! Persistence for job records.
//!
//! [`JobStore`] is the document-store boundary the service is written
//! against: lookup by id, ordered listing, partial updates, and inserts that
//! enforce a unique `referenceNumber`. Two implementations share the same
//! [`Collection`] core: [`MemoryStore`] for tests and embedding, and
//! [`FileStore`], which keeps the collection in a JSON file.

mod file;
mod memory;

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::lifecycle::{JobPatch, JobRecord};

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A write would have produced two records with the same reference.
    #[error("duplicate reference number: {reference}")]
    DuplicateKey { reference: String },

    #[error("failed to access store file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file '{path}' is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Ordering for [`JobStore::find_all`]. Both sort ascending and are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CollectionTime,
    CreatedAt,
}

/// Document store for job records.
///
/// Implementations must check reference uniqueness under the same lock as
/// the write, so concurrent inserts on one reference never both succeed.
pub trait JobStore: Send + Sync {
    /// Insert one record, assigning its id and bookkeeping instants.
    fn insert(&self, record: JobRecord) -> Result<JobRecord, StoreError>;

    fn find_by_id(&self, id: &str) -> Result<Option<JobRecord>, StoreError>;

    fn find_all(&self, sort: SortKey) -> Result<Vec<JobRecord>, StoreError>;

    /// Apply `patch` and return the updated record, or `None` for an unknown id.
    fn update_by_id(&self, id: &str, patch: &JobPatch) -> Result<Option<JobRecord>, StoreError>;

    /// Remove every record, returning how many were removed.
    fn delete_all(&self) -> Result<usize, StoreError>;

    /// Insert a batch. Either every record is inserted or none is.
    fn insert_many(&self, records: Vec<JobRecord>) -> Result<usize, StoreError>;
}

/// In-memory record set with the uniqueness rules applied.
#[derive(Debug, Clone, Default)]
pub(crate) struct Collection {
    records: Vec<JobRecord>,
}

impl Collection {
    pub(crate) fn from_records(records: Vec<JobRecord>) -> Self {
        Self { records }
    }

    pub(crate) fn records(&self) -> &[JobRecord] {
        &self.records
    }

    fn contains_reference(&self, reference: &str) -> bool {
        self.records.iter().any(|r| r.reference_number == reference)
    }

    fn stamp_new(mut record: JobRecord) -> JobRecord {
        let now = Utc::now();
        record.id = Uuid::new_v4().to_string();
        record.created_at = now;
        record.updated_at = now;
        record
    }

    pub(crate) fn insert(&mut self, record: JobRecord) -> Result<JobRecord, StoreError> {
        if self.contains_reference(&record.reference_number) {
            return Err(StoreError::DuplicateKey {
                reference: record.reference_number,
            });
        }
        let record = Self::stamp_new(record);
        self.records.push(record.clone());
        Ok(record)
    }

    pub(crate) fn insert_many(&mut self, batch: Vec<JobRecord>) -> Result<usize, StoreError> {
        let mut seen = HashSet::with_capacity(batch.len());
        for record in &batch {
            let reference = record.reference_number.as_str();
            if !seen.insert(reference) || self.contains_reference(reference) {
                return Err(StoreError::DuplicateKey {
                    reference: reference.to_string(),
                });
            }
        }
        let count = batch.len();
        self.records.extend(batch.into_iter().map(Self::stamp_new));
        Ok(count)
    }

    pub(crate) fn find_by_id(&self, id: &str) -> Option<JobRecord> {
        self.records.iter().find(|r| r.id == id).cloned()
    }

    pub(crate) fn find_all(&self, sort: SortKey) -> Vec<JobRecord> {
        let mut records = self.records.clone();
        match sort {
            SortKey::CollectionTime => records.sort_by_key(|r| r.collection_time),
            SortKey::CreatedAt => records.sort_by_key(|r| r.created_at),
        }
        records
    }

    pub(crate) fn update_by_id(&mut self, id: &str, patch: &JobPatch) -> Option<JobRecord> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        patch.apply(record);
        record.updated_at = Utc::now();
        Some(record.clone())
    }

    pub(crate) fn delete_all(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use crate::lifecycle::JobStatus;

    #[test]
    fn insert_assigns_id_and_rejects_duplicate_reference() {
        let mut c = Collection::default();
        let first = c.insert(record("A-1", 1, 9)).unwrap();
        assert!(!first.id.is_empty());

        let err = c.insert(record("A-1", 2, 9)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { reference } if reference == "A-1"));
        assert_eq!(c.records().len(), 1);
    }

    #[test]
    fn reference_match_is_case_sensitive() {
        let mut c = Collection::default();
        c.insert(record("abc", 1, 9)).unwrap();
        assert!(c.insert(record("ABC", 1, 9)).is_ok());
    }

    #[test]
    fn insert_many_is_all_or_nothing_against_existing() {
        let mut c = Collection::default();
        c.insert(record("A-2", 1, 9)).unwrap();

        let err = c
            .insert_many(vec![record("A-1", 1, 9), record("A-2", 1, 9)])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(c.records().len(), 1);
    }

    #[test]
    fn insert_many_rejects_in_batch_collision() {
        let mut c = Collection::default();
        let err = c
            .insert_many(vec![
                record("B-1", 1, 9),
                record("B-2", 1, 9),
                record("B-1", 2, 9),
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { reference } if reference == "B-1"));
        assert!(c.records().is_empty());
    }

    #[test]
    fn find_all_orders_by_collection_time() {
        let mut c = Collection::default();
        c.insert(record("late", 5, 9)).unwrap();
        c.insert(record("early", 1, 7)).unwrap();
        c.insert(record("mid", 3, 12)).unwrap();

        let refs: Vec<_> = c
            .find_all(SortKey::CollectionTime)
            .into_iter()
            .map(|r| r.reference_number)
            .collect();
        assert_eq!(refs, ["early", "mid", "late"]);
    }

    #[test]
    fn update_by_id_unknown_returns_none() {
        let mut c = Collection::default();
        let patch = JobPatch {
            status: Some(JobStatus::Loaded),
            ..Default::default()
        };
        assert!(c.update_by_id("missing", &patch).is_none());
    }

    #[test]
    fn update_by_id_refreshes_updated_at() {
        let mut c = Collection::default();
        let job = c.insert(record("U-1", 1, 9)).unwrap();
        let patch = JobPatch {
            notes: Some("gate code 1234".into()),
            ..Default::default()
        };
        let updated = c.update_by_id(&job.id, &patch).unwrap();
        assert_eq!(updated.notes, "gate code 1234");
        assert!(updated.updated_at >= job.updated_at);
        assert_eq!(updated.created_at, job.created_at);
    }

    #[test]
    fn delete_all_reports_count() {
        let mut c = Collection::default();
        c.insert_many(vec![record("D-1", 1, 9), record("D-2", 1, 9)])
            .unwrap();
        assert_eq!(c.delete_all(), 2);
        assert!(c.records().is_empty());
    }
}
