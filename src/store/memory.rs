use std::sync::{Mutex, MutexGuard};

use super::{Collection, JobStore, SortKey, StoreError};
use crate::lifecycle::{JobPatch, JobRecord};

/// A [`JobStore`] that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collection>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl JobStore for MemoryStore {
    fn insert(&self, record: JobRecord) -> Result<JobRecord, StoreError> {
        self.lock()?.insert(record)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.lock()?.find_by_id(id))
    }

    fn find_all(&self, sort: SortKey) -> Result<Vec<JobRecord>, StoreError> {
        Ok(self.lock()?.find_all(sort))
    }

    fn update_by_id(&self, id: &str, patch: &JobPatch) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.lock()?.update_by_id(id, patch))
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.delete_all())
    }

    fn insert_many(&self, records: Vec<JobRecord>) -> Result<usize, StoreError> {
        self.lock()?.insert_many(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::record;

    #[test]
    fn concurrent_inserts_on_same_reference_admit_exactly_one() {
        let store = MemoryStore::new();
        let shared = &store;
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| scope.spawn(move || shared.insert(record("RACE-1", 1, 8 + i))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let dup = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::DuplicateKey { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
        assert_eq!(store.find_all(SortKey::CreatedAt).unwrap().len(), 1);
    }

    #[test]
    fn find_by_id_round_trips() {
        let store = MemoryStore::new();
        let job = store.insert(record("M-1", 2, 10)).unwrap();
        assert_eq!(store.find_by_id(&job.id).unwrap(), Some(job));
        assert_eq!(store.find_by_id("nope").unwrap(), None);
    }
}
