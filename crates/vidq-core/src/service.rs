//! Client-facing operations over the store and dispatcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::VidqConfig;
use crate::dispatcher::{DispatchContext, DispatchSettings, Dispatcher};
use crate::error::CoreError;
use crate::fetcher::{CookieSource, MediaFetcher};
use crate::job::{Job, JobId, JobStatusView, JobStore, JobSummary};
use crate::library::{self, FileEntry};
use crate::preset::PresetTable;

/// One submission: newline-separated URLs sharing a preset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmitRequest {
    pub url: String,
    /// Empty or missing selects the default preset.
    pub preset: Option<String>,
    pub use_cookies: bool,
}

impl SubmitRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    pub fn use_cookies(mut self, use_cookies: bool) -> Self {
        self.use_cookies = use_cookies;
        self
    }
}

/// What a dashboard needs to render its form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub presets: Vec<String>,
    pub default_preset: String,
    pub download_dir: String,
    pub cookies_available: bool,
    pub cookies_path: Option<String>,
}

pub struct DownloadService {
    store: Arc<JobStore>,
    presets: Arc<PresetTable>,
    dispatcher: Dispatcher,
    task_list_limit: usize,
}

impl DownloadService {
    /// Builds the store, preset table and worker pool from `cfg`.
    pub fn from_config(cfg: &VidqConfig, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        let presets = Arc::new(cfg.preset_table().context("preset table")?);
        let store = Arc::new(JobStore::new(cfg.max_logs));
        let ctx = DispatchContext {
            store: Arc::clone(&store),
            presets: Arc::clone(&presets),
            fetcher,
            settings: DispatchSettings::from_config(cfg),
        };
        let dispatcher =
            Dispatcher::start(ctx, cfg.max_workers).context("start worker threads")?;
        Ok(Self {
            store,
            presets,
            dispatcher,
            task_list_limit: cfg.task_list_limit,
        })
    }

    /// Validates every line, then creates and dispatches one job per URL.
    /// Nothing is created if any line is rejected.
    pub fn submit(&self, req: &SubmitRequest) -> Result<Vec<JobId>, CoreError> {
        let urls = parse_urls(&req.url)?;
        let preset = match req.preset.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => self.presets.resolve(name)?,
            _ => self.presets.default_preset(),
        };

        let ids: Vec<JobId> = urls
            .iter()
            .map(|url| self.store.create(url, &preset.name, req.use_cookies))
            .collect();
        for id in &ids {
            self.dispatcher.dispatch(id.clone());
        }
        tracing::info!(
            count = ids.len(),
            preset = %preset.name,
            use_cookies = req.use_cookies,
            "jobs submitted"
        );
        Ok(ids)
    }

    /// Snapshot plus log lines after `after`.
    pub fn status(&self, id: &str, after: u64) -> Result<JobStatusView, CoreError> {
        Ok(self.job(id)?.status_view(after))
    }

    pub fn job(&self, id: &str) -> Result<Arc<Job>, CoreError> {
        self.store
            .get(id)
            .ok_or_else(|| CoreError::not_found("job", id))
    }

    /// Most recent jobs first; `limit` is capped at the configured list size.
    pub fn tasks(&self, limit: Option<usize>) -> Vec<JobSummary> {
        let limit = limit.map_or(self.task_list_limit, |l| l.min(self.task_list_limit));
        self.store.list(limit)
    }

    pub fn presets(&self) -> &PresetTable {
        &self.presets
    }

    pub fn client_config(&self) -> ClientConfig {
        let settings = &self.dispatcher.context().settings;
        let cookies = settings.cookie_source();
        ClientConfig {
            presets: self.presets.names().into_iter().map(String::from).collect(),
            default_preset: self.presets.default_preset().name.clone(),
            download_dir: settings.download_dir.display().to_string(),
            cookies_path: match &cookies {
                Some(CookieSource::File(path)) => Some(path.display().to_string()),
                _ => settings
                    .cookies_path
                    .as_ref()
                    .map(|p| p.display().to_string()),
            },
            cookies_available: cookies.is_some(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.dispatcher.context().settings.download_dir
    }

    pub fn files(&self) -> Result<Vec<FileEntry>, CoreError> {
        library::list_files(self.download_dir())
    }

    pub fn resolve_file(&self, name: &str) -> Result<PathBuf, CoreError> {
        library::resolve_file(self.download_dir(), name)
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn max_workers(&self) -> usize {
        self.dispatcher.max_concurrency()
    }
}

/// Non-blank lines, each of which must be an http(s) URL.
fn parse_urls(input: &str) -> Result<Vec<String>, CoreError> {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(CoreError::validation("No URL provided"));
    }
    lines
        .into_iter()
        .map(|line| match Url::parse(line) {
            Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => {
                Ok(line.to_string())
            }
            _ => Err(CoreError::validation(format!("Invalid URL: {line}"))),
        })
        .collect()
}
