//! Media fetcher seam: what the core hands the external downloader and the
//! callbacks it expects back.
//!
//! A [`MediaFetcher`] runs synchronously on a worker thread and reports through
//! a [`FetchHooks`] implementation on that same thread, so hooks are never
//! called concurrently for one job.

mod parse;
mod ytdlp;

pub use parse::{parse_line, progress_template, OutputLine, PROGRESS_PREFIX};
pub use ytdlp::YtDlpFetcher;

use std::path::{Path, PathBuf};

use crate::preset::{PostProcessor, Preset};

/// Output filename template relative to the output directory.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Where the fetcher reads cookies from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Netscape-format cookies.txt.
    File(PathBuf),
    /// Browser profile to read cookies from (e.g. "chrome").
    Browser(String),
}

impl CookieSource {
    /// Cookie file if given and present on disk, else the browser if given.
    pub fn resolve(file: Option<&Path>, browser: Option<&str>) -> Option<CookieSource> {
        if let Some(path) = file.filter(|p| p.is_file()) {
            return Some(CookieSource::File(path.to_path_buf()));
        }
        browser
            .filter(|b| !b.is_empty())
            .map(|b| CookieSource::Browser(b.to_string()))
    }
}

/// Everything the fetcher needs for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub format: String,
    pub output_template: PathBuf,
    pub merge_output_format: Option<String>,
    pub postprocessors: Vec<PostProcessor>,
    pub cookies: Option<CookieSource>,
}

impl FetchRequest {
    pub fn new(url: &str, preset: &Preset, output_dir: &Path) -> Self {
        Self {
            url: url.to_string(),
            format: preset.format.clone(),
            output_template: output_dir.join(OUTPUT_TEMPLATE),
            merge_output_format: preset.merge_output_format.clone(),
            postprocessors: preset.postprocessors.clone(),
            cookies: None,
        }
    }

    pub fn with_cookies(mut self, cookies: Option<CookieSource>) -> Self {
        self.cookies = cookies;
        self
    }
}

/// One "downloading" callback. Every field is optional; fetchers fill what they know.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadProgress {
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
    /// Pre-formatted strings as the fetcher displays them.
    pub percent: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
    pub title: Option<String>,
}

impl DownloadProgress {
    /// Exact total if known, else the estimate. Zero counts as unknown.
    pub fn total(&self) -> Option<u64> {
        self.total_bytes
            .filter(|t| *t > 0)
            .or(self.total_bytes_estimate.filter(|t| *t > 0))
    }

    /// `downloaded / total * 100` when both are known and non-zero.
    pub fn percent_complete(&self) -> Option<f64> {
        let downloaded = self.downloaded_bytes.filter(|d| *d > 0)?;
        let total = self.total()?;
        Some(downloaded as f64 / total as f64 * 100.0)
    }
}

/// Post-processing phase callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessEvent {
    Started { name: String },
    Finished { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Callback target registered with the fetcher for one job.
pub trait FetchHooks {
    fn on_download(&mut self, progress: &DownloadProgress);
    /// Download phase complete; post-processing may follow.
    fn on_download_finished(&mut self);
    fn on_post_process(&mut self, event: &PostProcessEvent);
    /// Free-form output line from the fetcher.
    fn on_message(&mut self, level: MessageLevel, line: &str);
}

/// External media downloader. Calls block until the work is done.
pub trait MediaFetcher: Send + Sync {
    /// Metadata-only lookup of the media title.
    fn resolve_title(&self, request: &FetchRequest) -> Result<Option<String>, FetchError>;

    /// Downloads and post-processes `request`, reporting through `hooks`.
    fn fetch(&self, request: &FetchRequest, hooks: &mut dyn FetchHooks) -> Result<(), FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fetcher i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The fetcher ran and reported failure.
    #[error("{message}")]
    Failed { code: Option<i32>, message: String },
}

impl FetchError {
    pub fn failed(message: impl Into<String>) -> Self {
        FetchError::Failed {
            code: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::PresetTable;

    #[test]
    fn percent_needs_both_counts() {
        let mut p = DownloadProgress {
            downloaded_bytes: Some(50),
            total_bytes: Some(200),
            ..Default::default()
        };
        assert_eq!(p.percent_complete(), Some(25.0));
        p.total_bytes = Some(0);
        assert_eq!(p.percent_complete(), None);
        p.total_bytes_estimate = Some(100);
        assert_eq!(p.percent_complete(), Some(50.0));
        p.downloaded_bytes = None;
        assert_eq!(p.percent_complete(), None);
    }

    #[test]
    fn request_from_preset() {
        let table = PresetTable::builtin();
        let preset = table.get("Video (1080p MP4)").unwrap();
        let req = FetchRequest::new("https://example.com/v", preset, Path::new("/data"))
            .with_cookies(Some(CookieSource::Browser("chrome".into())));
        assert_eq!(req.output_template, Path::new("/data/%(title)s.%(ext)s"));
        assert_eq!(req.merge_output_format.as_deref(), Some("mp4"));
        assert_eq!(req.format, preset.format);
        assert!(req.postprocessors.is_empty());
        assert_eq!(req.cookies, Some(CookieSource::Browser("chrome".into())));
    }
}
