//! Converts fetcher callbacks into job state.
//!
//! One `JobProgress` per running job, owned by the worker thread. Each callback
//! takes the job lock for a single field update; formatting happens before the
//! lock is taken.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::fetcher::{DownloadProgress, FetchHooks, MessageLevel, PostProcessEvent};
use crate::job::{Job, JobStatus};

/// Default minimum spacing between progress log lines.
pub const DEFAULT_PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(1);

pub struct JobProgress {
    job: Arc<Job>,
    log_interval: Duration,
    last_progress_log: Option<Instant>,
}

impl JobProgress {
    pub fn new(job: Arc<Job>) -> Self {
        Self::with_log_interval(job, DEFAULT_PROGRESS_LOG_INTERVAL)
    }

    pub fn with_log_interval(job: Arc<Job>, log_interval: Duration) -> Self {
        Self {
            job,
            log_interval,
            last_progress_log: None,
        }
    }

    pub fn job(&self) -> &Arc<Job> {
        &self.job
    }

    pub fn log(&self, line: impl Into<String>) {
        let line = line.into();
        self.job.update(|s| s.push_log(line));
    }

    /// Queued → Starting. Returns false if the job already left `Queued`.
    pub fn starting(&self) -> bool {
        self.job.update(|s| {
            if *s.status() != JobStatus::Queued {
                return false;
            }
            s.set_status(JobStatus::Starting);
            s.push_log("Starting download...");
            true
        })
    }

    pub fn set_title(&self, title: &str) {
        let line = format!("Title: {title}");
        self.job.update(|s| {
            s.set_title(title);
            s.push_log(line);
        });
    }

    /// Terminal success. No-op if the job is already done.
    pub fn complete(&self) {
        self.job.update(|s| {
            if s.finish_success() {
                s.push_log("Download complete");
            }
        });
    }

    /// Terminal failure. No-op if the job is already done.
    pub fn fail(&self, message: &str) {
        let line = format!("ERROR: {message}");
        self.job.update(|s| {
            if s.finish_failure(message) {
                s.push_log(line);
            }
        });
    }

    fn should_log_progress(&mut self, now: Instant) -> bool {
        match self.last_progress_log {
            Some(last) if now.duration_since(last) < self.log_interval => false,
            _ => {
                self.last_progress_log = Some(now);
                true
            }
        }
    }
}

/// "25.0% at 1.00MiB/s ETA 00:03" from whichever parts are present.
pub fn status_detail(progress: &DownloadProgress) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(percent) = &progress.percent {
        parts.push(percent.clone());
    }
    if let Some(speed) = &progress.speed {
        parts.push(format!("at {speed}"));
    }
    if let Some(eta) = &progress.eta {
        parts.push(format!("ETA {eta}"));
    }
    parts.join(" ")
}

/// "Downloading: 25.0% at 1.00MiB/s, ETA 00:03"; None without a percent.
pub fn progress_log_line(progress: &DownloadProgress) -> Option<String> {
    let percent = progress.percent.as_ref()?;
    let mut line = format!("Downloading: {percent}");
    if let Some(speed) = &progress.speed {
        line.push_str(&format!(" at {speed}"));
    }
    if let Some(eta) = &progress.eta {
        line.push_str(&format!(", ETA {eta}"));
    }
    Some(line)
}

impl FetchHooks for JobProgress {
    fn on_download(&mut self, progress: &DownloadProgress) {
        let percent = progress.percent_complete();
        let status = JobStatus::Downloading(status_detail(progress));
        // The window advances even when the event has no percent to log.
        let log_line = if self.should_log_progress(Instant::now()) {
            progress_log_line(progress)
        } else {
            None
        };
        self.job.update(|s| {
            if let Some(percent) = percent {
                s.raise_progress(percent);
            }
            if let Some(title) = &progress.title {
                s.set_title_if_empty(title);
            }
            if s.set_status(status) {
                if let Some(line) = log_line {
                    s.push_log(line);
                }
            }
        });
    }

    fn on_download_finished(&mut self) {
        self.job.update(|s| {
            if s.set_status(JobStatus::Processing) {
                s.push_log("Download finished, processing...");
            }
        });
    }

    fn on_post_process(&mut self, event: &PostProcessEvent) {
        match event {
            PostProcessEvent::Started { name } => {
                let line = format!("Post-processing: {name}");
                self.job.update(|s| {
                    if s.set_status(JobStatus::PostProcessing) {
                        s.push_log(line);
                    }
                });
            }
            PostProcessEvent::Finished { name } => {
                let line = format!("Post-processing complete: {name}");
                self.job.update(|s| {
                    if s.set_status(JobStatus::Finalizing) {
                        s.push_log(line);
                    }
                });
            }
        }
    }

    fn on_message(&mut self, level: MessageLevel, line: &str) {
        match level {
            MessageLevel::Error => tracing::warn!(job_id = %self.job.id(), "{}", line),
            MessageLevel::Warning => tracing::debug!(job_id = %self.job.id(), "{}", line),
            MessageLevel::Info => tracing::trace!(job_id = %self.job.id(), "{}", line),
        }
        self.job.update(|s| {
            if !s.done() {
                s.push_log(line);
            }
        });
    }
}
