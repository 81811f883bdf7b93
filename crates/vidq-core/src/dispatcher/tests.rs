use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::*;
use crate::fetcher::{DownloadProgress, FetchError, FetchHooks, FetchRequest};
use crate::job::JobSnapshot;

struct FnFetcher<F> {
    title: Result<Option<String>, String>,
    run: F,
}

impl<F> MediaFetcher for FnFetcher<F>
where
    F: Fn(&FetchRequest, &mut dyn FetchHooks) -> Result<(), FetchError> + Send + Sync,
{
    fn resolve_title(&self, _request: &FetchRequest) -> Result<Option<String>, FetchError> {
        self.title.clone().map_err(FetchError::failed)
    }

    fn fetch(&self, request: &FetchRequest, hooks: &mut dyn FetchHooks) -> Result<(), FetchError> {
        (self.run)(request, hooks)
    }
}

fn fetcher<F>(run: F) -> Arc<dyn MediaFetcher>
where
    F: Fn(&FetchRequest, &mut dyn FetchHooks) -> Result<(), FetchError> + Send + Sync + 'static,
{
    Arc::new(FnFetcher {
        title: Ok(None),
        run,
    })
}

fn ok_fetcher() -> Arc<dyn MediaFetcher> {
    fetcher(|_, hooks| {
        hooks.on_download(&DownloadProgress {
            downloaded_bytes: Some(10),
            total_bytes: Some(10),
            percent: Some("100.0%".into()),
            ..Default::default()
        });
        hooks.on_download_finished();
        Ok(())
    })
}

struct Harness {
    store: Arc<JobStore>,
    dispatcher: Dispatcher,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(fetcher: Arc<dyn MediaFetcher>, max_concurrency: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JobStore::default());
        let mut settings = DispatchSettings::new(dir.path().join("out"));
        settings.progress_log_interval = Duration::ZERO;
        let ctx = DispatchContext {
            store: Arc::clone(&store),
            presets: Arc::new(PresetTable::builtin()),
            fetcher,
            settings,
        };
        let dispatcher = Dispatcher::start(ctx, max_concurrency).unwrap();
        Self {
            store,
            dispatcher,
            _dir: dir,
        }
    }

    fn submit(&self, url: &str) -> JobId {
        self.submit_with(url, "Video (Best MP4)", false)
    }

    fn submit_with(&self, url: &str, preset: &str, cookies: bool) -> JobId {
        let id = self.store.create(url, preset, cookies);
        self.dispatcher.dispatch(id.clone());
        id
    }

    fn snapshot(&self, id: &JobId) -> JobSnapshot {
        self.store.get(id.as_str()).unwrap().snapshot()
    }

    fn logs(&self, id: &JobId) -> Vec<String> {
        self.store.get(id.as_str()).unwrap().status_view(0).logs
    }

    fn wait_done(&self, id: &JobId) -> JobSnapshot {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let snap = self.snapshot(id);
            if snap.done {
                return snap;
            }
            assert!(Instant::now() < deadline, "job {id} did not finish: {snap:?}");
            thread::sleep(Duration::from_millis(5));
        }
    }
}

#[test]
fn successful_job_reaches_done() {
    let h = Harness::new(ok_fetcher(), 2);
    let id = h.submit("https://example.com/a");
    let snap = h.wait_done(&id);
    assert!(snap.success);
    assert_eq!(snap.status, "Done");
    assert_eq!(snap.progress, 100.0);
    let logs = h.logs(&id);
    assert_eq!(logs.first().map(String::as_str), Some("Starting download..."));
    assert!(logs.iter().any(|l| l == "Preset: Video (Best MP4)"));
    assert!(logs.iter().any(|l| l.starts_with("Saving to: ")));
    assert_eq!(logs.last().map(String::as_str), Some("Download complete"));
}

#[test]
fn fetch_error_marks_job_failed() {
    let h = Harness::new(fetcher(|_, _| Err(FetchError::failed("Video unavailable"))), 1);
    let id = h.submit("https://example.com/gone");
    let snap = h.wait_done(&id);
    assert!(!snap.success);
    assert_eq!(snap.status, "Failed");
    assert_eq!(snap.error.as_deref(), Some("Video unavailable"));
    assert_eq!(
        h.logs(&id).last().map(String::as_str),
        Some("ERROR: Video unavailable")
    );
}

#[test]
fn unknown_preset_fails_at_run_time() {
    let h = Harness::new(ok_fetcher(), 1);
    let id = h.submit_with("https://example.com/a", "Nope", false);
    let snap = h.wait_done(&id);
    assert_eq!(snap.status, "Failed");
    assert_eq!(snap.error.as_deref(), Some("Unknown preset: Nope"));
}

#[test]
fn panicking_fetcher_fails_job_and_worker_survives() {
    let h = Harness::new(
        fetcher(|req, _| {
            if req.url.contains("boom") {
                panic!("fetcher exploded");
            }
            Ok(())
        }),
        1,
    );
    let bad = h.submit("https://example.com/boom");
    let good = h.submit("https://example.com/fine");
    let snap = h.wait_done(&bad);
    assert_eq!(snap.status, "Failed");
    assert!(snap.error.unwrap().contains("fetcher exploded"));
    assert!(h.wait_done(&good).success);
}

#[test]
fn concurrency_never_exceeds_pool_size() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
    let h = Harness::new(
        fetcher(move |_, _| {
            let now = r.fetch_add(1, Ordering::SeqCst) + 1;
            p.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(30));
            r.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }),
        2,
    );
    let ids: Vec<_> = (0..8)
        .map(|i| h.submit(&format!("https://example.com/{i}")))
        .collect();
    for id in &ids {
        assert!(h.wait_done(id).success);
    }
    let peak = peak.load(Ordering::SeqCst);
    assert!((1..=2).contains(&peak), "peak concurrency {peak}");
}

#[test]
fn single_worker_runs_jobs_in_submission_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&order);
    let h = Harness::new(
        fetcher(move |req, _| {
            seen.lock().unwrap().push(req.url.clone());
            Ok(())
        }),
        1,
    );
    let urls: Vec<String> = (0..5).map(|i| format!("https://example.com/{i}")).collect();
    let ids: Vec<_> = urls.iter().map(|u| h.submit(u)).collect();
    for id in &ids {
        h.wait_done(id);
    }
    assert_eq!(*order.lock().unwrap(), urls);
}

#[test]
fn dispatch_does_not_wait_for_running_jobs() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let h = Harness::new(
        fetcher(move |_, _| {
            let _ = release_rx.lock().unwrap().recv_timeout(Duration::from_secs(10));
            Ok(())
        }),
        1,
    );
    let first = h.submit("https://example.com/1");
    let second = h.submit("https://example.com/2");
    // The single worker is blocked on the first job; the second is still queued.
    let deadline = Instant::now() + Duration::from_secs(5);
    while h.snapshot(&first).status != "Starting..." {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(h.snapshot(&second).status, "Queued");
    assert_eq!(h.dispatcher.queued(), 1);
    release_tx.send(()).unwrap();
    release_tx.send(()).unwrap();
    assert!(h.wait_done(&first).success);
    assert!(h.wait_done(&second).success);
}

#[test]
fn zero_means_unbounded() {
    let barrier = Arc::new(Barrier::new(4));
    let b = Arc::clone(&barrier);
    let h = Harness::new(
        fetcher(move |_, _| {
            b.wait();
            Ok(())
        }),
        0,
    );
    assert_eq!(h.dispatcher.max_concurrency(), 0);
    let ids: Vec<_> = (0..4)
        .map(|i| h.submit(&format!("https://example.com/{i}")))
        .collect();
    for id in &ids {
        assert!(h.wait_done(id).success);
    }
}

#[test]
fn title_lookup_sets_title_and_errors_are_ignored() {
    let titled = Harness::new(
        Arc::new(FnFetcher {
            title: Ok(Some("My Video".into())),
            run: |_: &FetchRequest, _: &mut dyn FetchHooks| Ok::<(), FetchError>(()),
        }),
        1,
    );
    let id = titled.submit("https://example.com/t");
    assert_eq!(titled.wait_done(&id).title.as_deref(), Some("My Video"));
    assert!(titled.logs(&id).iter().any(|l| l == "Title: My Video"));

    let untitled = Harness::new(
        Arc::new(FnFetcher {
            title: Err("metadata lookup failed".into()),
            run: |_: &FetchRequest, _: &mut dyn FetchHooks| Ok::<(), FetchError>(()),
        }),
        1,
    );
    let id = untitled.submit("https://example.com/t");
    let snap = untitled.wait_done(&id);
    assert!(snap.success);
    assert!(snap.title.is_none());
}

#[test]
fn cookies_requested_without_source_are_logged() {
    let h = Harness::new(
        fetcher(|req, _| {
            assert!(req.cookies.is_none());
            Ok(())
        }),
        1,
    );
    let id = h.submit_with("https://example.com/c", "Video (Best MP4)", true);
    assert!(h.wait_done(&id).success);
    assert!(h.logs(&id).iter().any(|l| l.starts_with("Cookies requested")));
}

#[test]
fn redispatching_a_started_job_is_ignored() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let h = Harness::new(
        fetcher(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
        1,
    );
    let id = h.submit("https://example.com/a");
    h.wait_done(&id);
    h.dispatcher.dispatch(id.clone());
    let marker = h.submit("https://example.com/b");
    h.wait_done(&marker);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.snapshot(&id).status, "Done");
}

#[test]
fn unwritable_download_dir_is_a_resource_failure() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    let store = Arc::new(JobStore::default());
    let ctx = DispatchContext {
        store: Arc::clone(&store),
        presets: Arc::new(PresetTable::builtin()),
        fetcher: ok_fetcher(),
        settings: DispatchSettings::new(blocker.join("sub")),
    };
    let dispatcher = Dispatcher::start(ctx, 1).unwrap();
    let id = store.create("https://example.com/a", "Video (Best MP4)", false);
    dispatcher.dispatch(id.clone());
    let deadline = Instant::now() + Duration::from_secs(10);
    let job = store.get(id.as_str()).unwrap();
    while !job.snapshot().done {
        assert!(Instant::now() < deadline);
        thread::sleep(Duration::from_millis(5));
    }
    let snap = job.snapshot();
    assert_eq!(snap.status, "Failed");
    assert!(snap.error.unwrap().starts_with("output directory"));
}
