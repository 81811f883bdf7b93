//! Runs queued jobs on a bounded worker pool.
//!
//! `dispatch` only enqueues; the submitting caller never waits on a download.
//! Each dispatched unit runs the whole job pipeline (see `execute`) and always
//! leaves the job terminal, including when the fetcher panics.

mod execute;
mod pool;

#[cfg(test)]
mod tests;

pub use pool::WorkerPool;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::VidqConfig;
use crate::fetcher::{CookieSource, MediaFetcher};
use crate::job::{JobId, JobStore};
use crate::preset::PresetTable;
use crate::progress::DEFAULT_PROGRESS_LOG_INTERVAL;

/// Per-run settings read when a job starts.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub download_dir: PathBuf,
    pub cookies_path: Option<PathBuf>,
    pub cookies_from_browser: Option<String>,
    pub progress_log_interval: Duration,
}

impl DispatchSettings {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            cookies_path: None,
            cookies_from_browser: None,
            progress_log_interval: DEFAULT_PROGRESS_LOG_INTERVAL,
        }
    }

    pub fn from_config(cfg: &VidqConfig) -> Self {
        Self {
            download_dir: cfg.download_dir.clone(),
            cookies_path: cfg.cookies_path.clone(),
            cookies_from_browser: cfg.cookies_from_browser.clone(),
            progress_log_interval: cfg.progress_log_interval(),
        }
    }

    /// Resolved at dispatch time so a cookie file added later is picked up.
    pub fn cookie_source(&self) -> Option<CookieSource> {
        CookieSource::resolve(
            self.cookies_path.as_deref(),
            self.cookies_from_browser.as_deref(),
        )
    }
}

/// Shared, read-only inputs of every dispatched unit.
pub struct DispatchContext {
    pub store: Arc<JobStore>,
    pub presets: Arc<PresetTable>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub settings: DispatchSettings,
}

pub struct Dispatcher {
    ctx: Arc<DispatchContext>,
    pool: WorkerPool,
}

impl Dispatcher {
    /// Starts the pool. `max_concurrency = 0` means no limit.
    pub fn start(ctx: DispatchContext, max_concurrency: usize) -> std::io::Result<Self> {
        let pool = WorkerPool::new(max_concurrency)?;
        tracing::info!(max_concurrency, "dispatcher started");
        Ok(Self {
            ctx: Arc::new(ctx),
            pool,
        })
    }

    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    pub fn max_concurrency(&self) -> usize {
        self.pool.max_concurrency()
    }

    /// Jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.pool.queued()
    }

    /// Schedules `id` for execution. If it cannot be scheduled the job is
    /// marked failed, so it never stays queued forever.
    pub fn dispatch(&self, id: JobId) {
        let ctx = Arc::clone(&self.ctx);
        let task_id = id.clone();
        if let Err(e) = self.pool.execute(move || execute::run_job(&ctx, &task_id)) {
            tracing::error!(job_id = %id, "dispatch failed: {}", e);
            if let Some(job) = self.ctx.store.get(id.as_str()) {
                let message = format!("could not schedule job: {e}");
                job.update(|s| {
                    if s.finish_failure(message.as_str()) {
                        s.push_log(format!("ERROR: {message}"));
                    }
                });
            }
        }
    }
}
