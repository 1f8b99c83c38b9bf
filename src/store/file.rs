use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{Collection, JobStore, SortKey, StoreError};
use crate::lifecycle::{JobPatch, JobRecord};

/// A [`JobStore`] backed by a single JSON document file.
///
/// Several handles, in one process or many, may share a file. Every call
/// takes an advisory lock on a sidecar `.lock` file and re-reads the document
/// under it: shared for reads, exclusive for writes. Uniqueness is therefore
/// checked against what is actually on disk. A write goes to a temporary file
/// that is renamed into place; if that fails, neither disk nor the cached
/// collection changes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    inner: Mutex<Collection>,
}

fn io_err(path: &Path) -> impl Fn(std::io::Error) -> StoreError {
    let path = path.to_path_buf();
    move |source| StoreError::Io {
        path: path.clone(),
        source,
    }
}

fn read_records(path: &Path) -> Result<Vec<JobRecord>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).map_err(io_err(path))?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let lock_path = path.with_extension("json.lock");
        let store = Self {
            inner: Mutex::new(Collection::default()),
            path,
            lock_path,
        };
        let records = store.refresh()?.records().len();
        debug!(path = %store.path.display(), records, "opened job store");
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collection>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Open the sidecar lock file. The advisory lock is released when the
    /// returned handle is dropped.
    fn lock_file(&self) -> Result<File, StoreError> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(io_err(&self.lock_path))
    }

    /// Reload the cached collection from disk under a shared lock.
    fn refresh(&self) -> Result<MutexGuard<'_, Collection>, StoreError> {
        let mut guard = self.lock()?;
        let lock = self.lock_file()?;
        lock.lock_shared().map_err(io_err(&self.lock_path))?;
        *guard = Collection::from_records(read_records(&self.path)?);
        drop(lock);
        Ok(guard)
    }

    fn persist(&self, collection: &Collection) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(collection.records())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err(&self.path))?;
        fs::rename(&tmp, &self.path).map_err(io_err(&self.path))
    }

    /// Run `op` on the current on-disk collection while holding the
    /// exclusive lock, and commit the result only if `op` succeeds and the
    /// write reaches disk.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut Collection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.lock()?;
        let lock = self.lock_file()?;
        lock.lock().map_err(io_err(&self.lock_path))?;

        let current = Collection::from_records(read_records(&self.path)?);
        let mut next = current.clone();
        let out = match op(&mut next) {
            Ok(out) => out,
            Err(e) => {
                *guard = current;
                return Err(e);
            }
        };
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }
}

impl JobStore for FileStore {
    fn insert(&self, record: JobRecord) -> Result<JobRecord, StoreError> {
        self.mutate(|c| c.insert(record))
    }

    fn find_by_id(&self, id: &str) -> Result<Option<JobRecord>, StoreError> {
        Ok(self.refresh()?.find_by_id(id))
    }

    fn find_all(&self, sort: SortKey) -> Result<Vec<JobRecord>, StoreError> {
        Ok(self.refresh()?.find_all(sort))
    }

    fn update_by_id(&self, id: &str, patch: &JobPatch) -> Result<Option<JobRecord>, StoreError> {
        self.mutate(|c| Ok(c.update_by_id(id, patch)))
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        self.mutate(|c| Ok(c.delete_all()))
    }

    fn insert_many(&self, records: Vec<JobRecord>) -> Result<usize, StoreError> {
        self.mutate(|c| c.insert_many(records))
    }
}
