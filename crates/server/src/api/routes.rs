use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{downloads, handlers, middleware::metrics_middleware, search, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Downloads
        .route("/downloads", post(downloads::create_download))
        .route("/downloads", get(downloads::list_downloads))
        .route("/downloads/stats", get(downloads::get_stats))
        .route("/downloads/completed", delete(downloads::clear_completed))
        .route("/downloads/{id}", get(downloads::get_download))
        .route("/downloads/{id}", delete(downloads::cancel_download))
        .route("/downloads/{id}/pause", post(downloads::pause_download))
        .route("/downloads/{id}/resume", post(downloads::resume_download))
        // Search
        .route("/search", post(search::search))
        .route("/providers", get(search::list_providers))
        .route("/providers/{name}", put(search::set_provider))
        // Event stream
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
