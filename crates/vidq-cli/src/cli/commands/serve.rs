//! `vidq serve` – run the HTTP API until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use vidq_core::config::VidqConfig;
use vidq_core::fetcher::YtDlpFetcher;
use vidq_core::service::DownloadService;

use crate::server::{self, AppState};

/// Command-line overrides applied on top of config and environment.
#[derive(Debug, Default)]
pub struct ServeOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub workers: Option<usize>,
}

impl ServeOptions {
    fn apply(self, cfg: &mut VidqConfig) {
        if let Some(host) = self.host {
            cfg.server.host = host;
        }
        if let Some(port) = self.port {
            cfg.server.port = port;
        }
        if let Some(workers) = self.workers {
            cfg.max_workers = workers;
        }
    }
}

pub async fn run_serve(mut cfg: VidqConfig, opts: ServeOptions) -> Result<()> {
    opts.apply(&mut cfg);
    let fetcher = Arc::new(YtDlpFetcher::new(cfg.ytdlp_bin.clone()));
    let service = DownloadService::from_config(&cfg, fetcher)?;
    let app = server::app(AppState::new(service));

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(
        %addr,
        workers = cfg.max_workers,
        download_dir = %cfg.download_dir.display(),
        "serving"
    );
    println!("vidq listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server")?;
    // Queued and running jobs are abandoned with the process.
    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("ctrl-c handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
