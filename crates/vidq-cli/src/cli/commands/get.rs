//! `vidq get` – download in the foreground, following each job's log.

use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vidq_core::config::VidqConfig;
use vidq_core::fetcher::YtDlpFetcher;
use vidq_core::job::JobId;
use vidq_core::service::{DownloadService, SubmitRequest};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct GetOptions {
    pub urls: Vec<String>,
    pub preset: Option<String>,
    pub cookies: bool,
    pub download_dir: Option<PathBuf>,
}

pub async fn run_get(mut cfg: VidqConfig, opts: GetOptions) -> Result<()> {
    if let Some(dir) = opts.download_dir {
        cfg.download_dir = dir;
    }
    let fetcher = Arc::new(YtDlpFetcher::new(cfg.ytdlp_bin.clone()));
    let service = DownloadService::from_config(&cfg, fetcher)?;

    let request = SubmitRequest {
        url: opts.urls.join("\n"),
        preset: opts.preset,
        use_cookies: opts.cookies,
    };
    let ids = service.submit(&request)?;
    println!(
        "Queued {} download(s) into {}",
        ids.len(),
        service.download_dir().display()
    );

    let failed = follow_jobs(&service, &ids, &mut io::stdout(), POLL_INTERVAL).await?;
    if failed > 0 {
        anyhow::bail!("{failed} of {} download(s) failed", ids.len());
    }
    Ok(())
}

/// Prints new log lines of every job until all are terminal, using the
/// status cursor so each line is printed once. Returns how many failed.
async fn follow_jobs(
    service: &DownloadService,
    ids: &[JobId],
    out: &mut impl Write,
    interval: Duration,
) -> Result<usize> {
    let tagged = ids.len() > 1;
    let mut cursors = vec![0u64; ids.len()];
    let mut finished = vec![false; ids.len()];
    let mut failed = 0;

    loop {
        for (i, id) in ids.iter().enumerate() {
            if finished[i] {
                continue;
            }
            let view = service.status(id.as_str(), cursors[i])?;
            let tag = if tagged {
                format!("[{}] ", short_id(id))
            } else {
                String::new()
            };
            if view.truncated {
                writeln!(out, "{tag}...")?;
            }
            for line in &view.logs {
                writeln!(out, "{tag}{line}")?;
            }
            cursors[i] = view.next;
            if view.job.done {
                finished[i] = true;
                if !view.job.success {
                    failed += 1;
                }
            }
        }
        out.flush()?;
        if finished.iter().all(|f| *f) {
            return Ok(failed);
        }
        tokio::time::sleep(interval).await;
    }
}

fn short_id(id: &JobId) -> &str {
    id.as_str().get(..8).unwrap_or(id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidq_core::fetcher::{FetchError, FetchHooks, FetchRequest, MediaFetcher, MessageLevel};

    /// Logs a few lines; fails for URLs containing "bad".
    struct EchoFetcher;

    impl MediaFetcher for EchoFetcher {
        fn resolve_title(&self, _request: &FetchRequest) -> Result<Option<String>, FetchError> {
            Ok(None)
        }

        fn fetch(&self, request: &FetchRequest, hooks: &mut dyn FetchHooks) -> Result<(), FetchError> {
            for i in 0..3 {
                hooks.on_message(MessageLevel::Info, &format!("step {i}"));
            }
            if request.url.contains("bad") {
                return Err(FetchError::failed("Video unavailable"));
            }
            Ok(())
        }
    }

    fn service(dir: &std::path::Path) -> DownloadService {
        let cfg = VidqConfig {
            download_dir: dir.to_path_buf(),
            ..Default::default()
        };
        DownloadService::from_config(&cfg, Arc::new(EchoFetcher)).unwrap()
    }

    #[tokio::test]
    async fn follow_prints_each_line_once() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let ids = svc
            .submit(&SubmitRequest::new("https://example.com/ok"))
            .unwrap();
        let mut out = Vec::new();
        let failed = follow_jobs(&svc, &ids, &mut out, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(failed, 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("step 1").count(), 1);
        assert!(text.starts_with("Starting download..."));
        assert!(text.trim_end().ends_with("Download complete"));
    }

    #[tokio::test]
    async fn follow_counts_failures_and_tags_lines() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        let ids = svc
            .submit(&SubmitRequest::new(
                "https://example.com/ok\nhttps://example.com/bad",
            ))
            .unwrap();
        let mut out = Vec::new();
        let failed = follow_jobs(&svc, &ids, &mut out, Duration::from_millis(5))
            .await
            .unwrap();
        assert_eq!(failed, 1);
        let text = String::from_utf8(out).unwrap();
        let bad_tag = format!("[{}] ", short_id(&ids[1]));
        assert!(text.contains(&format!("{bad_tag}ERROR: Video unavailable")));
        assert!(text.lines().all(|l| l.starts_with('[')));
    }
}
