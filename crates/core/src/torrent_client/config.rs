//! Torrent daemon connection configuration.

use serde::{Deserialize, Serialize};

/// Known daemon backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentClientBackend {
    Transmission,
    Qbittorrent,
}

impl TorrentClientBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentClientBackend::Transmission => "transmission",
            TorrentClientBackend::Qbittorrent => "qbittorrent",
        }
    }
}

/// `[torrent_client]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentClientConfig {
    /// Backend to use. When absent the detector tries every known backend.
    #[serde(default)]
    pub backend: Option<TorrentClientBackend>,

    /// Try to install and start a default daemon when none responds.
    #[serde(default = "default_auto_install")]
    pub auto_install: bool,

    /// Seconds to wait after installing before probing again.
    #[serde(default = "default_install_wait")]
    pub install_wait_secs: u64,

    /// Shell command overriding the platform default installer.
    #[serde(default)]
    pub install_command: Option<String>,

    #[serde(default)]
    pub transmission: TransmissionConfig,

    #[serde(default)]
    pub qbittorrent: QBittorrentConfig,
}

fn default_auto_install() -> bool {
    true
}

fn default_install_wait() -> u64 {
    3
}

impl Default for TorrentClientConfig {
    fn default() -> Self {
        Self {
            backend: None,
            auto_install: default_auto_install(),
            install_wait_secs: default_install_wait(),
            install_command: None,
            transmission: TransmissionConfig::default(),
            qbittorrent: QBittorrentConfig::default(),
        }
    }
}

/// Transmission RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionConfig {
    /// Daemon URL (e.g., "http://localhost:9091").
    #[serde(default = "default_transmission_url")]
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_transmission_url() -> String {
    "http://localhost:9091".to_string()
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            url: default_transmission_url(),
            username: None,
            password: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// qBittorrent Web API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QBittorrentConfig {
    /// Web UI URL (e.g., "http://localhost:8080").
    #[serde(default = "default_qbittorrent_url")]
    pub url: String,
    #[serde(default = "default_qbittorrent_username")]
    pub username: String,
    #[serde(default = "default_qbittorrent_password")]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_qbittorrent_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_qbittorrent_username() -> String {
    "admin".to_string()
}

fn default_qbittorrent_password() -> String {
    "adminadmin".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            url: default_qbittorrent_url(),
            username: default_qbittorrent_username(),
            password: default_qbittorrent_password(),
            timeout_secs: default_timeout(),
        }
    }
}
