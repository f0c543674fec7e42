use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::manager::ManagerConfig;
use crate::organizer::{LibraryLayout, OrganizerConfig};
use crate::searcher::{ProviderConfig, QualityPreference, SearchConfig};
use crate::torrent_client::{TorrentClientBackend, TorrentClientConfig};

/// Root configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub torrent_client: TorrentClientConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub downloads: ManagerConfig,
    #[serde(default)]
    pub organizer: OrganizerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3030
}

/// Media library location.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Base directory holding `Movies`, `TV Shows`, `Downloads` and `.metadata`.
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
}

impl LibraryConfig {
    pub fn layout(&self) -> LibraryLayout {
        LibraryLayout::new(&self.base_path)
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
        }
    }
}

fn default_base_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Movies")
        .join("NiluFlix")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub torrent_client: SanitizedTorrentClientConfig,
    pub search: SanitizedSearchConfig,
    pub downloads: ManagerConfig,
    pub organizer: OrganizerConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTorrentClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<TorrentClientBackend>,
    pub auto_install: bool,
    pub install_wait_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_command: Option<String>,
    pub transmission: SanitizedDaemonConfig,
    pub qbittorrent: SanitizedDaemonConfig,
}

/// Daemon connection with the password hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDaemonConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSearchConfig {
    pub timeout_secs: u64,
    pub max_results: usize,
    pub movie_min_seeders: u32,
    pub episode_min_seeders: u32,
    pub max_query_variants: usize,
    pub preferred_quality: QualityPreference,
    pub yts: ProviderConfig,
    pub apibay: ProviderConfig,
    pub jackett: SanitizedJackettConfig,
}

/// Sanitized Jackett config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedJackettConfig {
    pub enabled: bool,
    pub url: String,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let tc = &config.torrent_client;
        let search = &config.search;
        Self {
            server: config.server.clone(),
            library: config.library.clone(),
            torrent_client: SanitizedTorrentClientConfig {
                backend: tc.backend,
                auto_install: tc.auto_install,
                install_wait_secs: tc.install_wait_secs,
                install_command: tc.install_command.clone(),
                transmission: SanitizedDaemonConfig {
                    url: tc.transmission.url.clone(),
                    username: tc.transmission.username.clone(),
                    password_configured: tc
                        .transmission
                        .password
                        .as_deref()
                        .is_some_and(|p| !p.is_empty()),
                    timeout_secs: tc.transmission.timeout_secs,
                },
                qbittorrent: SanitizedDaemonConfig {
                    url: tc.qbittorrent.url.clone(),
                    username: Some(tc.qbittorrent.username.clone()),
                    password_configured: !tc.qbittorrent.password.is_empty(),
                    timeout_secs: tc.qbittorrent.timeout_secs,
                },
            },
            search: SanitizedSearchConfig {
                timeout_secs: search.timeout_secs,
                max_results: search.max_results,
                movie_min_seeders: search.movie_min_seeders,
                episode_min_seeders: search.episode_min_seeders,
                max_query_variants: search.max_query_variants,
                preferred_quality: search.preferred_quality,
                yts: search.yts.clone(),
                apibay: search.apibay.clone(),
                jackett: SanitizedJackettConfig {
                    enabled: search.jackett.enabled,
                    url: search.jackett.url.clone(),
                    api_key_configured: !search.jackett.api_key.is_empty(),
                },
            },
            downloads: config.downloads.clone(),
            organizer: config.organizer.clone(),
        }
    }
}
