//! Submission, status polling, recent tasks and dashboard config.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use vidq_core::job::{JobId, JobStatusView, JobSummary};
use vidq_core::service::{ClientConfig, SubmitRequest};

use crate::server::{AppError, AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub message: &'static str,
    pub count: usize,
    pub job_ids: Vec<JobId>,
    /// First created job, for single-URL clients.
    pub job_id: Option<JobId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    /// Log cursor returned as `next` by the previous poll.
    #[serde(default)]
    pub after: u64,
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<JobSummary>,
}

/// POST /api/start
async fn start(
    State(state): State<AppState>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> AppResult<Json<StartResponse>> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let job_ids = state.service.submit(&req)?;
    Ok(Json(StartResponse {
        message: "Tasks started",
        count: job_ids.len(),
        job_id: job_ids.first().cloned(),
        job_ids,
    }))
}

/// GET /api/status/{id}?after=<cursor>
async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> AppResult<Json<JobStatusView>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(state.service.status(&id, query.after)?))
}

/// GET /api/tasks?limit=<n>
async fn tasks(
    State(state): State<AppState>,
    query: Result<Query<TasksQuery>, QueryRejection>,
) -> AppResult<Json<TasksResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(TasksResponse {
        tasks: state.service.tasks(query.limit),
    }))
}

/// GET /api/config
async fn client_config(State(state): State<AppState>) -> Json<ClientConfig> {
    Json(state.service.client_config())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/start", post(start))
        .route("/api/status/{id}", get(status))
        .route("/api/tasks", get(tasks))
        .route("/api/config", get(client_config))
}
