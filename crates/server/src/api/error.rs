//! Error responses shared by the API handlers.

use axum::{http::StatusCode, Json};
use niluflix_core::{ManagerError, SearchError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Id of the job recorded as failed, for `NoCandidatesFound`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            job_id: None,
        }),
    )
}

pub fn manager_error(e: ManagerError) -> ApiError {
    match e {
        ManagerError::JobNotFound(_) => api_error(StatusCode::NOT_FOUND, e.to_string()),
        ManagerError::InvalidTransition { .. } | ManagerError::NotAdmitted(_) => {
            api_error(StatusCode::CONFLICT, e.to_string())
        }
        ManagerError::NoCandidatesFound { ref job_id } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
                job_id: Some(job_id.clone()),
            }),
        ),
        ManagerError::Search(e) => search_error(e),
        ManagerError::TorrentClient(_) => api_error(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

pub fn search_error(e: SearchError) -> ApiError {
    let status = match e {
        SearchError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
        SearchError::NoProvidersEnabled => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::ProviderSearchTimeout { .. } | SearchError::ProviderFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
    };
    api_error(status, e.to_string())
}
