//! Download job API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use niluflix_core::{ContentDescriptor, DownloadJob, JobStatus, ManagerStats, TorrentCandidate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::error::{api_error, manager_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for queueing a download
#[derive(Debug, Deserialize)]
pub struct CreateDownloadBody {
    pub content: ContentDescriptor,
    /// Candidates picked ahead of time (e.g. from `POST /search`). The first
    /// one is used; when absent or empty the server searches.
    #[serde(default)]
    pub candidates: Option<Vec<TorrentCandidate>>,
}

/// Query parameters for listing downloads
#[derive(Debug, Deserialize)]
pub struct ListDownloadsParams {
    /// Filter by job status (e.g., "downloading")
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListDownloadsResponse {
    pub jobs: Vec<DownloadJob>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    pub cleared: Vec<String>,
    pub count: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/downloads
pub async fn create_download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateDownloadBody>,
) -> Result<(StatusCode, Json<DownloadJob>), ApiError> {
    let manager = state.manager();
    let label = body.content.label();

    let job_id = manager
        .add_download(body.content, body.candidates)
        .await
        .map_err(manager_error)?;
    info!(job_id = %job_id, content = %label, "Download requested via API");

    let job = manager
        .get_job(&job_id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Job not found: {}", job_id)))?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/downloads
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListDownloadsParams>,
) -> Result<Json<ListDownloadsResponse>, ApiError> {
    let manager = state.manager();
    let jobs = match params.status.as_deref() {
        Some(status) => {
            let status: JobStatus = status
                .parse()
                .map_err(|e: String| api_error(StatusCode::BAD_REQUEST, e))?;
            manager.get_jobs_by_status(status).await
        }
        None => manager.get_all_jobs().await,
    };

    let count = jobs.len();
    Ok(Json(ListDownloadsResponse { jobs, count }))
}

/// GET /api/v1/downloads/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ManagerStats> {
    Json(state.manager().get_stats().await)
}

/// DELETE /api/v1/downloads/completed
///
/// Drops completed jobs. Failed and cancelled ones stay listed.
pub async fn clear_completed(State(state): State<Arc<AppState>>) -> Json<ClearedResponse> {
    let cleared = state.manager().clear_completed().await;
    let count = cleared.len();
    Json(ClearedResponse { cleared, count })
}

/// GET /api/v1/downloads/{id}
pub async fn get_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DownloadJob>, ApiError> {
    state
        .manager()
        .get_job(&id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Job not found: {}", id)))
}

/// DELETE /api/v1/downloads/{id}
pub async fn cancel_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DownloadJob>, ApiError> {
    state
        .manager()
        .cancel_download(&id)
        .await
        .map_err(manager_error)?;
    current_job(&state, &id).await
}

/// POST /api/v1/downloads/{id}/pause
pub async fn pause_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DownloadJob>, ApiError> {
    state
        .manager()
        .pause_download(&id)
        .await
        .map_err(manager_error)?;
    current_job(&state, &id).await
}

/// POST /api/v1/downloads/{id}/resume
pub async fn resume_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DownloadJob>, ApiError> {
    state
        .manager()
        .resume_download(&id)
        .await
        .map_err(manager_error)?;
    current_job(&state, &id).await
}

async fn current_job(state: &AppState, id: &str) -> Result<Json<DownloadJob>, ApiError> {
    state
        .manager()
        .get_job(id)
        .await
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Job not found: {}", id)))
}
