//! Torrent search and provider API handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use niluflix_core::{searcher::ProviderStatus, ContentDescriptor, TorrentCandidate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{manager_error, search_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub candidates: Vec<TorrentCandidate>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct SetProviderBody {
    pub enabled: bool,
}

/// POST /api/v1/search
///
/// Ranked candidates for a content item, without queueing anything.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(content): Json<ContentDescriptor>,
) -> Result<Json<SearchResponse>, ApiError> {
    let candidates = state
        .manager()
        .search(&content)
        .await
        .map_err(manager_error)?;
    let count = candidates.len();
    Ok(Json(SearchResponse { candidates, count }))
}

/// GET /api/v1/providers
pub async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.search_engine().providers().await,
    })
}

/// PUT /api/v1/providers/{name}
pub async fn set_provider(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(body): Json<SetProviderBody>,
) -> Result<Json<ProviderStatus>, ApiError> {
    state
        .search_engine()
        .set_provider_enabled(&name, body.enabled)
        .await
        .map_err(search_error)?;
    Ok(Json(ProviderStatus {
        name,
        enabled: body.enabled,
    }))
}
