//! Types for torrent client operations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that can occur during torrent daemon RPC.
///
/// Every variant carries the name of the backend that produced it.
#[derive(Debug, Clone, Error)]
pub enum TorrentClientError {
    #[error("{backend}: connection failed: {message}")]
    ConnectionFailed {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: authentication failed: {message}")]
    AuthenticationFailed {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: torrent not found: {id}")]
    TorrentNotFound { backend: &'static str, id: String },

    #[error("{backend}: RPC error: {message}")]
    Rpc {
        backend: &'static str,
        message: String,
    },

    #[error("{backend}: request timeout")]
    Timeout { backend: &'static str },

    #[error("{backend}: invalid response: {message}")]
    InvalidResponse {
        backend: &'static str,
        message: String,
    },
}

impl TorrentClientError {
    /// Name of the backend that raised the error.
    pub fn backend(&self) -> &'static str {
        match self {
            TorrentClientError::ConnectionFailed { backend, .. }
            | TorrentClientError::AuthenticationFailed { backend, .. }
            | TorrentClientError::TorrentNotFound { backend, .. }
            | TorrentClientError::Rpc { backend, .. }
            | TorrentClientError::Timeout { backend }
            | TorrentClientError::InvalidResponse { backend, .. } => backend,
        }
    }

    pub(crate) fn rpc(backend: &'static str, message: impl Into<String>) -> Self {
        TorrentClientError::Rpc {
            backend,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(backend: &'static str, message: impl Into<String>) -> Self {
        TorrentClientError::InvalidResponse {
            backend,
            message: message.into(),
        }
    }

    /// Map a transport error into the taxonomy.
    pub(crate) fn from_reqwest(backend: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TorrentClientError::Timeout { backend }
        } else if e.is_connect() {
            TorrentClientError::ConnectionFailed {
                backend,
                message: e.to_string(),
            }
        } else {
            TorrentClientError::Rpc {
                backend,
                message: e.to_string(),
            }
        }
    }
}

/// Normalized torrent state, independent of backend status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    Downloading,
    Seeding,
    Paused,
    Error,
}

impl TorrentState {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Paused => "paused",
            TorrentState::Error => "error",
        }
    }
}

/// Point-in-time progress of one torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Completion fraction (0.0 - 1.0).
    pub percent_done: f64,
    /// Bytes/second.
    pub download_speed: u64,
    /// Bytes/second.
    pub upload_speed: u64,
    /// ETA in seconds (None if unknown).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_secs: Option<u64>,
    pub status: TorrentState,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub seeders: u32,
    pub leechers: u32,
    /// Daemon-reported error text when `status` is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProgressSnapshot {
    /// Whether the payload is fully downloaded.
    pub fn is_complete(&self) -> bool {
        self.percent_done >= 1.0 || self.status == TorrentState::Seeding
    }
}

/// A torrent currently known to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTorrent {
    /// External id as returned by `start`.
    pub id: String,
    pub name: String,
    /// Magnet link, when the daemon reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub status: TorrentState,
    /// Completion fraction (0.0 - 1.0).
    pub progress: f64,
    /// Directory the daemon writes this torrent's payload into.
    pub download_path: PathBuf,
}

impl ActiveTorrent {
    /// Location of the payload on disk (a single file or a directory).
    pub fn content_path(&self) -> PathBuf {
        self.download_path.join(&self.name)
    }
}

/// Push notification from a backend that can report transitions itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TorrentEvent {
    Progress {
        torrent_id: String,
        snapshot: ProgressSnapshot,
    },
    Completed {
        torrent_id: String,
    },
    Failed {
        torrent_id: String,
        message: String,
    },
}

/// Trait for torrent daemon backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Whether the daemon is reachable (and accepts our credentials).
    async fn is_connected(&self) -> bool;

    /// Hand a magnet link or torrent URL to the daemon. Returns the external id.
    async fn start(
        &self,
        link: &str,
        download_path: Option<&Path>,
    ) -> Result<String, TorrentClientError>;

    async fn pause(&self, id: &str) -> Result<(), TorrentClientError>;

    async fn resume(&self, id: &str) -> Result<(), TorrentClientError>;

    /// Remove a torrent.
    /// If `delete_files` is true, also delete downloaded files.
    async fn remove(&self, id: &str, delete_files: bool) -> Result<(), TorrentClientError>;

    async fn get_progress(&self, id: &str) -> Result<ProgressSnapshot, TorrentClientError>;

    async fn list_active(&self) -> Result<Vec<ActiveTorrent>, TorrentClientError>;

    /// Subscribe to pushed progress/completion events.
    ///
    /// Backends that only support polling return `None`.
    fn subscribe_events(&self) -> Option<broadcast::Receiver<TorrentEvent>> {
        None
    }
}
