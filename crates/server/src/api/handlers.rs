use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use niluflix_core::SanitizedConfig;
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub torrent_client: String,
    pub daemon_connected: bool,
    pub manager_running: bool,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let manager = state.manager();
    Json(HealthResponse {
        status: "ok".to_string(),
        torrent_client: manager.client_name().to_string(),
        daemon_connected: manager.client_connected().await,
        manager_running: manager.is_running(),
        started_at: state.started_at(),
        uptime_secs: (Utc::now() - state.started_at()).num_seconds(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /metrics
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
