//! In-process fetcher that replays a fixed script of callbacks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use vidq_core::fetcher::{
    DownloadProgress, FetchError, FetchHooks, FetchRequest, MediaFetcher, MessageLevel,
    PostProcessEvent,
};

#[derive(Debug, Clone)]
pub enum Step {
    Progress { downloaded: u64, total: u64 },
    DownloadFinished,
    PostProcess(&'static str),
    Message(String),
    Sleep(Duration),
    Fail(&'static str),
}

pub struct ScriptedFetcher {
    title: Option<String>,
    steps: Vec<Step>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            title: None,
            steps,
            calls: AtomicUsize::new(0),
        }
    }

    /// Three progress events, download finished, one merge, success.
    pub fn happy() -> Self {
        Self::new(vec![
            Step::Progress { downloaded: 10, total: 100 },
            Step::Progress { downloaded: 60, total: 100 },
            Step::Progress { downloaded: 100, total: 100 },
            Step::DownloadFinished,
            Step::PostProcess("Merger"),
        ])
    }

    pub fn failing(message: &'static str) -> Self {
        Self::new(vec![
            Step::Progress { downloaded: 5, total: 100 },
            Step::Fail(message),
        ])
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MediaFetcher for ScriptedFetcher {
    fn resolve_title(&self, _request: &FetchRequest) -> Result<Option<String>, FetchError> {
        Ok(self.title.clone())
    }

    fn fetch(&self, _request: &FetchRequest, hooks: &mut dyn FetchHooks) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for step in &self.steps {
            match step {
                Step::Progress { downloaded, total } => hooks.on_download(&DownloadProgress {
                    downloaded_bytes: Some(*downloaded),
                    total_bytes: Some(*total),
                    percent: Some(format!("{:.1}%", *downloaded as f64 / *total as f64 * 100.0)),
                    speed: Some("1.00MiB/s".into()),
                    eta: Some("00:01".into()),
                    title: None,
                    ..Default::default()
                }),
                Step::DownloadFinished => hooks.on_download_finished(),
                Step::PostProcess(name) => {
                    hooks.on_post_process(&PostProcessEvent::Started { name: name.to_string() });
                    hooks.on_post_process(&PostProcessEvent::Finished { name: name.to_string() });
                }
                Step::Message(line) => hooks.on_message(MessageLevel::Info, line),
                Step::Sleep(d) => thread::sleep(*d),
                Step::Fail(message) => return Err(FetchError::failed(*message)),
            }
        }
        Ok(())
    }
}
