//! In-memory job store for cleaned datasets.
//!
//! Front ends (an upload service, a batch runner) keep the cleaned output of
//! a run here under an opaque id so it can be listed, exported or deleted
//! later. Entries expire after a TTL and the store holds at most `capacity`
//! jobs, evicting the oldest first.

use crate::error::{DataQualityError, Result};
use crate::reporting::{ReportWriter, file_stem};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_CAPACITY: usize = 100;

struct Job {
    filename: String,
    data: DataFrame,
    created_at: Instant,
    created: DateTime<Utc>,
    /// Insertion order; breaks ties between jobs created in the same instant.
    seq: u64,
}

impl Job {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

/// Listing entry for a stored job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInfo {
    pub job_id: String,
    pub filename: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, Job>,
    next_seq: u64,
}

impl Inner {
    fn evict_expired(&mut self, ttl: Duration) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| !job.is_expired(ttl));
        before - self.jobs.len()
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let oldest = self
            .jobs
            .iter()
            .min_by_key(|(_, job)| job.seq)
            .map(|(id, _)| id.clone())?;
        self.jobs.remove(&oldest);
        Some(oldest)
    }
}

/// Thread-safe TTL + capacity bounded job store.
pub struct JobStore {
    ttl: Duration,
    capacity: usize,
    inner: RwLock<Inner>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

impl JobStore {
    /// A capacity of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Store a cleaned dataset and return its job id.
    pub fn insert(&self, filename: impl Into<String>, data: DataFrame) -> String {
        let mut inner = self.inner.write();

        let expired = inner.evict_expired(self.ttl);
        if expired > 0 {
            debug!("Evicted {} expired jobs", expired);
        }
        while inner.jobs.len() >= self.capacity {
            match inner.evict_oldest() {
                Some(id) => debug!("Evicted job {} (store at capacity)", id),
                None => break,
            }
        }

        let mut id = new_job_id();
        while inner.jobs.contains_key(&id) {
            id = new_job_id();
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let filename = filename.into();
        info!("Stored job {} for '{}'", id, filename);
        inner.jobs.insert(
            id.clone(),
            Job {
                filename,
                data,
                created_at: Instant::now(),
                created: Utc::now(),
                seq,
            },
        );
        id
    }

    /// Cleaned dataset for a job. Expired jobs are dropped and reported as
    /// not found.
    pub fn get(&self, id: &str) -> Result<DataFrame> {
        {
            let inner = self.inner.read();
            match inner.jobs.get(id) {
                Some(job) if !job.is_expired(self.ttl) => return Ok(job.data.clone()),
                Some(_) => {}
                None => return Err(DataQualityError::JobNotFound(id.to_string())),
            }
        }

        self.inner.write().jobs.remove(id);
        debug!("Job {} expired", id);
        Err(DataQualityError::JobNotFound(id.to_string()))
    }

    /// Live jobs, oldest first.
    pub fn list(&self) -> Vec<JobInfo> {
        let mut inner = self.inner.write();
        inner.evict_expired(self.ttl);

        let mut jobs: Vec<(&String, &Job)> = inner.jobs.iter().collect();
        jobs.sort_by_key(|(_, job)| job.seq);
        jobs.into_iter()
            .map(|(id, job)| JobInfo {
                job_id: id.clone(),
                filename: job.filename.clone(),
                created_at: job.created.to_rfc3339(),
                rows: job.data.height(),
                columns: job.data.width(),
            })
            .collect()
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        match self.inner.write().jobs.remove(id) {
            Some(_) => {
                info!("Deleted job {}", id);
                Ok(())
            }
            None => Err(DataQualityError::JobNotFound(id.to_string())),
        }
    }

    /// Write a job's data to `<dir>/<name>_cleaned.csv`, where `name` is the
    /// stem of the original filename.
    pub fn export(&self, id: &str, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let stem = {
            let inner = self.inner.read();
            let job = inner
                .jobs
                .get(id)
                .ok_or_else(|| DataQualityError::JobNotFound(id.to_string()))?;
            file_stem(&job.filename)
        };
        let mut data = self.get(id)?;
        ReportWriter::new(dir.as_ref()).write_cleaned(&mut data, &stem)
    }

    /// Drop expired jobs now; returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.inner.write().evict_expired(self.ttl)
    }

    /// Number of stored jobs, including ones that expired but were not yet
    /// evicted.
    pub fn len(&self) -> usize {
        self.inner.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn new_job_id() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

static_assertions::assert_impl_all!(JobStore: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::time::Duration;

    fn sample(rows: i32) -> DataFrame {
        let values: Vec<i32> = (0..rows).collect();
        df!["value" => values].unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = JobStore::default();
        let id = store.insert("sales.csv", sample(3));

        assert_eq!(id.len(), 32);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&id).unwrap().height(), 3);
    }

    #[test]
    fn test_unknown_job() {
        let store = JobStore::default();
        let err = store.get("nope").unwrap_err();
        assert_eq!(err.error_code(), "JOB_NOT_FOUND");
        assert!(store.remove("nope").is_err());
    }

    #[test]
    fn test_expired_job_is_dropped() {
        let store = JobStore::new(Duration::ZERO, 10);
        let id = store.insert("a.csv", sample(1));

        assert!(matches!(
            store.get(&id).unwrap_err(),
            DataQualityError::JobNotFound(_)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_expired() {
        let store = JobStore::new(Duration::ZERO, 10);
        store.insert("a.csv", sample(1));
        store.insert("b.csv", sample(1));
        // each insert evicts what came before
        assert_eq!(store.len(), 1);
        assert_eq!(store.evict_expired(), 1);
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = JobStore::new(DEFAULT_TTL, 2);
        let first = store.insert("first.csv", sample(1));
        let second = store.insert("second.csv", sample(2));
        let third = store.insert("third.csv", sample(3));

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_err());

        let listed: Vec<String> = store.list().into_iter().map(|j| j.job_id).collect();
        assert_eq!(listed, vec![second, third]);
    }

    #[test]
    fn test_list_and_remove() {
        let store = JobStore::default();
        let id = store.insert("sales.csv", sample(4));

        let jobs = store.list();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].filename, "sales.csv");
        assert_eq!(jobs[0].rows, 4);
        assert_eq!(jobs[0].columns, 1);
        assert!(DateTime::parse_from_rfc3339(&jobs[0].created_at).is_ok());

        store.remove(&id).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_export() {
        let store = JobStore::default();
        let id = store.insert("sales.csv", sample(2));
        let dir = std::env::temp_dir().join(format!("dataq_jobs_{}", std::process::id()));

        let path = store.export(&id, &dir).unwrap();
        assert_eq!(path, dir.join("sales_cleaned.csv"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "value\n0\n1\n");

        fs::remove_dir_all(&dir).unwrap();
    }
}
