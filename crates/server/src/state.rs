use chrono::{DateTime, Utc};
use niluflix_core::{Config, DownloadManager, SanitizedConfig, TorrentSearchEngine};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    manager: Arc<DownloadManager>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, manager: Arc<DownloadManager>) -> Self {
        Self {
            config,
            manager,
            started_at: Utc::now(),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn manager(&self) -> &Arc<DownloadManager> {
        &self.manager
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn search_engine(&self) -> &TorrentSearchEngine {
        self.manager.search_engine()
    }
}
