//! Persistence of active jobs
//!
//! Active (non-terminal) jobs are mirrored to durable storage on every
//! state change so a reload does not lose visibility into in-flight work.
//! `FileJobStore` is the durable implementation (a single JSON file, the
//! local-storage analogue); `MemoryJobStore` backs tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use marginalia_types::ProcessingJob;

use crate::error::StreamError;

/// Storage seam for active-job mirroring.
pub trait JobStore: Send + Sync {
    /// All persisted active jobs, in no particular order.
    fn load_active(&self) -> Result<Vec<ProcessingJob>, StreamError>;

    /// Mirror one job's current state.
    fn save(&self, job: &ProcessingJob) -> Result<(), StreamError>;

    /// Drop a job from active persistence (it reached a terminal status).
    fn remove(&self, job_id: &str) -> Result<(), StreamError>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, ProcessingJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn load_active(&self) -> Result<Vec<ProcessingJob>, StreamError> {
        let jobs = self.jobs.lock().expect("job store lock poisoned");
        Ok(jobs.values().cloned().collect())
    }

    fn save(&self, job: &ProcessingJob) -> Result<(), StreamError> {
        let mut jobs = self.jobs.lock().expect("job store lock poisoned");
        jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    fn remove(&self, job_id: &str) -> Result<(), StreamError> {
        let mut jobs = self.jobs.lock().expect("job store lock poisoned");
        jobs.remove(job_id);
        Ok(())
    }
}

/// Durable store: the full active-job map serialized to one JSON file,
/// rewritten on every change. Job volumes are tiny (a handful per user),
/// so the whole-file rewrite is fine.
#[derive(Debug)]
pub struct FileJobStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, ProcessingJob>>,
}

impl FileJobStore {
    /// Open the store, reading any previously persisted jobs. A missing
    /// file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let path = path.as_ref().to_path_buf();
        let cache = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| StreamError::Persistence(format!("corrupt job file: {e}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StreamError::Persistence(err.to_string())),
        };
        debug!(path = %path.display(), "opened job store");
        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    fn flush(&self, jobs: &HashMap<String, ProcessingJob>) -> Result<(), StreamError> {
        let contents = serde_json::to_string_pretty(jobs)
            .map_err(|e| StreamError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(|e| StreamError::Persistence(e.to_string()))
    }
}

impl JobStore for FileJobStore {
    fn load_active(&self) -> Result<Vec<ProcessingJob>, StreamError> {
        let jobs = self.cache.lock().expect("job store lock poisoned");
        Ok(jobs.values().cloned().collect())
    }

    fn save(&self, job: &ProcessingJob) -> Result<(), StreamError> {
        let mut jobs = self.cache.lock().expect("job store lock poisoned");
        jobs.insert(job.job_id.clone(), job.clone());
        self.flush(&jobs)
    }

    fn remove(&self, job_id: &str) -> Result<(), StreamError> {
        let mut jobs = self.cache.lock().expect("job store lock poisoned");
        if jobs.remove(job_id).is_some() {
            self.flush(&jobs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_types::ProcessingStatus;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryJobStore::new();
        let mut job = ProcessingJob::new("j1", "paper.pdf");
        job.status = ProcessingStatus::Processing;
        store.save(&job).unwrap();

        let active = store.load_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0], job);

        store.remove("j1").unwrap();
        assert!(store.load_active().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let store = FileJobStore::open(&path).unwrap();
        let job = ProcessingJob::new("j1", "paper.pdf");
        store.save(&job).unwrap();
        drop(store);

        let reopened = FileJobStore::open(&path).unwrap();
        let active = reopened.load_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].job_id, "j1");
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileJobStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.load_active().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let store = FileJobStore::open(&path).unwrap();
        store.save(&ProcessingJob::new("j1", "a.pdf")).unwrap();
        store.save(&ProcessingJob::new("j2", "b.pdf")).unwrap();
        store.remove("j1").unwrap();
        drop(store);

        let reopened = FileJobStore::open(&path).unwrap();
        let active = reopened.load_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].job_id, "j2");
    }
}
