//! Shared helpers for core integration tests.

#![allow(dead_code)]

pub mod fake_fetcher;
pub mod fake_ytdlp;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;
use vidq_core::config::VidqConfig;
use vidq_core::fetcher::MediaFetcher;
use vidq_core::job::{JobId, JobStatusView};
use vidq_core::service::DownloadService;

/// Service writing into a fresh temp dir, with progress logging unthrottled.
pub fn service(fetcher: Arc<dyn MediaFetcher>, workers: usize) -> (DownloadService, TempDir) {
    service_with(fetcher, |cfg| cfg.max_workers = workers)
}

pub fn service_with(
    fetcher: Arc<dyn MediaFetcher>,
    tweak: impl FnOnce(&mut VidqConfig),
) -> (DownloadService, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = VidqConfig {
        download_dir: dir.path().join("downloads"),
        progress_log_interval_ms: 0,
        ..Default::default()
    };
    tweak(&mut cfg);
    let svc = DownloadService::from_config(&cfg, fetcher).unwrap();
    (svc, dir)
}

/// Polls until the job is terminal; panics after ten seconds.
pub fn wait_done(svc: &DownloadService, id: &JobId) -> JobStatusView {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let view = svc.status(id.as_str(), 0).unwrap();
        if view.job.done {
            return view;
        }
        assert!(Instant::now() < deadline, "job {id} still running: {}", view.job.status);
        thread::sleep(Duration::from_millis(5));
    }
}
