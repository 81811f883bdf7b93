//! Process-wide job registry.
//!
//! The store lock only guards the id → job map. It is always released before
//! any job's own lock is taken, so inserting a job never waits on a progress
//! update and the other way round.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::{Job, JobId, JobSummary, DEFAULT_MAX_LOGS};

#[derive(Debug)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    next_seq: AtomicU64,
    max_logs: usize,
}

impl JobStore {
    /// `max_logs` is the per-job log retention cap.
    pub fn new(max_logs: usize) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            max_logs,
        }
    }

    /// Inserts a queued job and returns its fresh id.
    pub fn create(&self, url: &str, preset: &str, use_cookies: bool) -> JobId {
        let id = JobId::generate();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let job = Arc::new(Job::new(
            id.clone(),
            seq,
            url.to_string(),
            preset.to_string(),
            use_cookies,
            self.max_logs,
        ));
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), job);
        tracing::debug!(job_id = %id, url, preset, "job created");
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&JobId::from(id))
            .cloned()
    }

    /// Newest first, at most `limit` entries.
    pub fn list(&self, limit: usize) -> Vec<JobSummary> {
        let mut jobs: Vec<Arc<Job>> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.seq().cmp(&a.seq()))
        });
        jobs.truncate(limit);
        jobs.iter().map(|job| job.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}
