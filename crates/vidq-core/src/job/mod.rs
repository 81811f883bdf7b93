//! Jobs: one per submitted URL, with immutable inputs and lock-guarded runtime state.
//!
//! All mutable fields of a job live in a single [`JobState`] behind the job's own
//! mutex. `JobState` enforces the lifecycle rules itself: once `done` is set,
//! only the title may still change, and progress never moves backwards.

mod log_buffer;
mod store;

pub use log_buffer::{LogBuffer, LogSlice, DEFAULT_MAX_LOGS};
pub use store::JobStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Opaque job identifier (UUID v4 in simple hex form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        JobId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Phase of a job, in expected order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Starting,
    /// Carries the composed "percent at speed ETA eta" detail (may be empty).
    Downloading(String),
    Processing,
    PostProcessing,
    Finalizing,
    Done,
    Failed,
}

impl JobStatus {
    /// Machine-friendly phase name (stable across detail changes).
    pub fn phase(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Starting => "starting",
            JobStatus::Downloading(_) => "downloading",
            JobStatus::Processing => "processing",
            JobStatus::PostProcessing => "post_processing",
            JobStatus::Finalizing => "finalizing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("Queued"),
            JobStatus::Starting => f.write_str("Starting..."),
            JobStatus::Downloading(detail) if detail.is_empty() => f.write_str("Downloading..."),
            JobStatus::Downloading(detail) => write!(f, "Downloading {detail}"),
            JobStatus::Processing => f.write_str("Processing..."),
            JobStatus::PostProcessing => f.write_str("Post-processing..."),
            JobStatus::Finalizing => f.write_str("Finalizing..."),
            JobStatus::Done => f.write_str("Done"),
            JobStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// Mutable runtime state of a job. Only reachable through [`Job::update`] / [`Job::read`].
#[derive(Debug)]
pub struct JobState {
    status: JobStatus,
    progress: f64,
    done: bool,
    success: bool,
    error: Option<String>,
    title: Option<String>,
    logs: LogBuffer,
}

impl JobState {
    fn new(max_logs: usize) -> Self {
        Self {
            status: JobStatus::Queued,
            progress: 0.0,
            done: false,
            success: false,
            error: None,
            title: None,
            logs: LogBuffer::new(max_logs),
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn logs(&self) -> &LogBuffer {
        &self.logs
    }

    /// Moves to a non-terminal phase. Ignored once the job is done; returns whether it applied.
    pub fn set_status(&mut self, status: JobStatus) -> bool {
        if self.done || status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    /// Raises progress to `percent` (clamped to [0, 100]). Never lowers it, ignores NaN.
    pub fn raise_progress(&mut self, percent: f64) {
        if self.done || !percent.is_finite() {
            return;
        }
        let clamped = percent.clamp(0.0, 100.0);
        if clamped > self.progress {
            self.progress = clamped;
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn set_title_if_empty(&mut self, title: &str) {
        if self.title.is_none() && !title.is_empty() {
            self.title = Some(title.to_string());
        }
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.logs.append(line);
    }

    /// Terminal success transition. Returns false if the job was already done.
    pub fn finish_success(&mut self) -> bool {
        if self.done {
            return false;
        }
        self.progress = 100.0;
        self.status = JobStatus::Done;
        self.success = true;
        self.done = true;
        true
    }

    /// Terminal failure transition. Returns false if the job was already done.
    pub fn finish_failure(&mut self, message: impl Into<String>) -> bool {
        if self.done {
            return false;
        }
        self.status = JobStatus::Failed;
        self.success = false;
        self.error = Some(message.into());
        self.done = true;
        true
    }
}

/// One submitted download request and its runtime state.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    url: String,
    preset: String,
    use_cookies: bool,
    created_at: DateTime<Utc>,
    seq: u64,
    state: Mutex<JobState>,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        seq: u64,
        url: String,
        preset: String,
        use_cookies: bool,
        max_logs: usize,
    ) -> Self {
        Self {
            id,
            url,
            preset,
            use_cookies,
            created_at: Utc::now(),
            seq,
            state: Mutex::new(JobState::new(max_logs)),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    pub fn use_cookies(&self) -> bool {
        self.use_cookies
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Store insertion order; breaks `created_at` ties.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    fn lock(&self) -> MutexGuard<'_, JobState> {
        // A panicking hook cannot leave JobState half-updated in a way that
        // breaks its invariants, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates the job state under its lock. Keep `f` short: no I/O.
    pub fn update<R>(&self, f: impl FnOnce(&mut JobState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn read<R>(&self, f: impl FnOnce(&JobState) -> R) -> R {
        f(&self.lock())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.lock();
        self.snapshot_of(&state)
    }

    /// Snapshot plus the log lines after `cursor`, taken under one lock acquisition.
    pub fn status_view(&self, cursor: u64) -> JobStatusView {
        let state = self.lock();
        let slice = state.logs.fetch_since(cursor);
        JobStatusView {
            job: self.snapshot_of(&state),
            logs: slice.lines,
            next: slice.next,
            truncated: slice.truncated,
        }
    }

    pub fn summary(&self) -> JobSummary {
        let state = self.lock();
        JobSummary {
            id: self.id.clone(),
            url: self.url.clone(),
            title: state.title.clone().unwrap_or_else(|| self.url.clone()),
            status: state.status.to_string(),
            progress: (state.progress * 10.0).round() / 10.0,
            done: state.done,
            success: state.success,
            error: state.error.clone(),
            created_at: self.created_at,
        }
    }

    fn snapshot_of(&self, state: &JobState) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            url: self.url.clone(),
            preset: self.preset.clone(),
            title: state.title.clone(),
            status: state.status.to_string(),
            phase: state.status.phase(),
            progress: state.progress,
            done: state.done,
            success: state.success,
            error: state.error.clone(),
            created_at: self.created_at,
        }
    }
}

/// Point-in-time copy of a job's fields.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub url: String,
    pub preset: String,
    pub title: Option<String>,
    pub status: String,
    pub phase: &'static str,
    pub progress: f64,
    pub done: bool,
    pub success: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Response of a status poll: snapshot plus incremental logs.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    #[serde(flatten)]
    pub job: JobSnapshot,
    pub logs: Vec<String>,
    pub next: u64,
    /// True when lines after the client's cursor were discarded before it polled.
    pub truncated: bool,
}

/// Dashboard row for the recent-jobs list.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub id: JobId,
    pub url: String,
    /// Resolved title, or the URL while unknown.
    pub title: String,
    pub status: String,
    /// Rounded to one decimal.
    pub progress: f64,
    pub done: bool,
    pub success: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}
