//! Torrent client abstraction.
//!
//! This module provides a `TorrentClient` trait for driving a locally running
//! torrent daemon, with Transmission and qBittorrent backends and a startup
//! detector that picks whichever one answers.

mod config;
mod detector;
mod qbittorrent;
mod transmission;
mod types;

use std::sync::Arc;

pub use config::{
    QBittorrentConfig, TorrentClientBackend, TorrentClientConfig, TransmissionConfig,
};
pub use detector::{CommandInstaller, DaemonInstaller, DetectError, TorrentClientDetector};
pub use qbittorrent::QBittorrentClient;
pub(crate) use qbittorrent::extract_hash_from_magnet;
pub use transmission::TransmissionClient;
pub use types::*;

/// Build the client for a backend. Selection happens once, at startup.
pub fn create_torrent_client(
    backend: TorrentClientBackend,
    config: &TorrentClientConfig,
) -> Result<Arc<dyn TorrentClient>, TorrentClientError> {
    Ok(match backend {
        TorrentClientBackend::Transmission => {
            Arc::new(TransmissionClient::new(config.transmission.clone())?) as Arc<dyn TorrentClient>
        }
        TorrentClientBackend::Qbittorrent => {
            Arc::new(QBittorrentClient::new(config.qbittorrent.clone())?) as Arc<dyn TorrentClient>
        }
    })
}
