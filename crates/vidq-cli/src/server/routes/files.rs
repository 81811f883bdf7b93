//! Finished-file listing and download.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use vidq_core::error::CoreError;
use vidq_core::library::FileEntry;

use crate::server::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct FilesResponse {
    pub files: Vec<FileEntry>,
}

/// GET /api/files
async fn list_files(State(state): State<AppState>) -> AppResult<Json<FilesResponse>> {
    let service = Arc::clone(&state.service);
    let files = tokio::task::spawn_blocking(move || service.files())
        .await
        .map_err(|e| AppError::InternalError(format!("list files: {e}")))??;
    Ok(Json(FilesResponse { files }))
}

/// GET /download/{*name} – streams the file as an attachment.
async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let path = state.service.resolve_file(&name)?;
    let file = tokio::fs::File::open(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AppError::Core(CoreError::not_found("file", name.as_str())),
        _ => AppError::InternalError(format!("open {}: {e}", path.display())),
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name))
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

/// `attachment` with an ASCII fallback name and the exact UTF-8 name.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let mut encoded = String::with_capacity(file_name.len());
    for b in file_name.bytes() {
        if b.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&b) {
            encoded.push(b as char);
        } else {
            encoded.push_str(&format!("%{b:02X}"));
        }
    }
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/files", get(list_files))
        .route("/download/{*name}", get(download))
}
