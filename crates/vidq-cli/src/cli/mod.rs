//! CLI for the vidq download service.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vidq_core::config::{self, VidqConfig};

use commands::{run_doctor, run_get, run_presets, run_serve, GetOptions, ServeOptions};

/// Top-level CLI for vidq.
#[derive(Debug, Parser)]
#[command(name = "vidq")]
#[command(about = "vidq: queue media downloads and follow their progress", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/vidq/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Serve the HTTP API (submit, status polling, task list, files).
    Serve {
        /// Address to bind (overrides config and HOST).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides config and PORT).
        #[arg(long)]
        port: Option<u16>,
        /// Jobs downloading at once; 0 = no limit (overrides config and MAX_WORKERS).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },

    /// Download URLs in the foreground and print each job's log.
    Get {
        /// Media page URLs.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Format preset name (see `vidq presets`).
        #[arg(long, short)]
        preset: Option<String>,
        /// Pass the configured cookie file or browser cookies to the fetcher.
        #[arg(long)]
        cookies: bool,
        /// Output directory (overrides config and DOWNLOAD_DIR).
        #[arg(long, short = 'o', value_name = "DIR")]
        download_dir: Option<PathBuf>,
    },

    /// List the available format presets.
    Presets,

    /// Check that yt-dlp, ffmpeg and a JavaScript runtime are available.
    Doctor,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = load_config(cli.config.as_deref())?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Serve {
                host,
                port,
                workers,
            } => {
                run_serve(
                    cfg,
                    ServeOptions {
                        host,
                        port,
                        workers,
                    },
                )
                .await?
            }
            CliCommand::Get {
                urls,
                preset,
                cookies,
                download_dir,
            } => {
                run_get(
                    cfg,
                    GetOptions {
                        urls,
                        preset,
                        cookies,
                        download_dir,
                    },
                )
                .await?
            }
            CliCommand::Presets => run_presets(&cfg)?,
            CliCommand::Doctor => run_doctor(&cfg),
        }

        Ok(())
    }
}

/// Explicit file if given, else the XDG config (created on first run); env overrides last.
fn load_config(path: Option<&Path>) -> Result<VidqConfig> {
    let mut cfg = match path {
        Some(path) => config::load_from_path(path)?,
        None => config::load_or_init()?,
    };
    cfg.apply_env()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests;
