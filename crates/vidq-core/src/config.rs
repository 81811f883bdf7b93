use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;
use crate::fetcher::CookieSource;
use crate::job::DEFAULT_MAX_LOGS;
use crate::preset::{Preset, PresetTable};

/// HTTP listener settings for `vidq serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Global configuration loaded from `~/.config/vidq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VidqConfig {
    /// Directory downloads are written to (created on demand).
    pub download_dir: PathBuf,
    /// cookies.txt passed to the fetcher for jobs that ask for cookies.
    pub cookies_path: Option<PathBuf>,
    /// Browser to read cookies from when no cookie file is available (e.g. "chrome").
    pub cookies_from_browser: Option<String>,
    /// Jobs downloading at once. 0 = one thread per job, no limit.
    pub max_workers: usize,
    /// Log lines retained per job.
    pub max_logs: usize,
    /// Upper bound on rows returned by the recent-jobs list.
    pub task_list_limit: usize,
    /// Minimum spacing between progress log lines of one job.
    pub progress_log_interval_ms: u64,
    /// yt-dlp executable (name on PATH or absolute path).
    pub ytdlp_bin: String,
    /// Preset used when a request names none. Defaults to the first preset.
    pub default_preset: Option<String>,
    pub server: ServerConfig,
    /// Replaces the built-in preset table when present.
    pub presets: Option<Vec<Preset>>,
}

impl Default for VidqConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            cookies_path: None,
            cookies_from_browser: None,
            max_workers: 2,
            max_logs: DEFAULT_MAX_LOGS,
            task_list_limit: 50,
            progress_log_interval_ms: 1000,
            ytdlp_bin: "yt-dlp".to_string(),
            default_preset: None,
            server: ServerConfig::default(),
            presets: None,
        }
    }
}

impl VidqConfig {
    pub fn progress_log_interval(&self) -> Duration {
        Duration::from_millis(self.progress_log_interval_ms)
    }

    /// Built-in or configured presets, with the configured default applied.
    pub fn preset_table(&self) -> Result<PresetTable, CoreError> {
        match (&self.presets, self.default_preset.as_deref()) {
            (Some(presets), default) => PresetTable::new(presets.clone(), default),
            (None, None) => Ok(PresetTable::builtin()),
            (None, Some(default)) => {
                PresetTable::new(PresetTable::builtin().iter().cloned().collect(), Some(default))
            }
        }
    }

    /// Cookie file if configured and present, else browser cookies if configured.
    pub fn cookie_source(&self) -> Option<CookieSource> {
        CookieSource::resolve(
            self.cookies_path.as_deref(),
            self.cookies_from_browser.as_deref(),
        )
    }

    /// Overrides from `DOWNLOAD_DIR`, `COOKIES_PATH`, `MAX_WORKERS`, `HOST`, `PORT`, `VIDQ_YTDLP`.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = get("DOWNLOAD_DIR").filter(|v| !v.is_empty()) {
            self.download_dir = PathBuf::from(dir);
        }
        if let Some(path) = get("COOKIES_PATH") {
            self.cookies_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(n) = get("MAX_WORKERS") {
            self.max_workers = n
                .trim()
                .parse()
                .with_context(|| format!("MAX_WORKERS must be a number, got {n:?}"))?;
        }
        if let Some(host) = get("HOST").filter(|v| !v.is_empty()) {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {port:?}"))?;
        }
        if let Some(bin) = get("VIDQ_YTDLP").filter(|v| !v.is_empty()) {
            self.ytdlp_bin = bin;
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vidq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<VidqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = VidqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit file; it must exist.
pub fn load_from_path(path: &Path) -> Result<VidqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: VidqConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
