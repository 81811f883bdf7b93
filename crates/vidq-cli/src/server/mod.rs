//! HTTP surface over [`DownloadService`].

mod error;
mod routes;


pub use error::{AppError, AppResult};

use std::sync::Arc;

use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use vidq_core::service::DownloadService;

/// Shared state handed to every handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DownloadService>,
}

impl AppState {
    pub fn new(service: DownloadService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// All routes with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::jobs::router())
        .merge(routes::files::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
