//! qBittorrent torrent client implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    ActiveTorrent, ProgressSnapshot, QBittorrentConfig, TorrentClient, TorrentClientError,
    TorrentState,
};

const BACKEND: &str = "qbittorrent";

/// ETA qBittorrent reports for "infinite".
const QB_UNKNOWN_ETA: i64 = 8_640_000;

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    /// Set once login succeeded; the SID cookie itself lives in the cookie jar.
    session: RwLock<Option<String>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::rpc(BACKEND, e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: RwLock::new(None),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TorrentClientError::from_reqwest(BACKEND, e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            *self.session.write().await = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed {
                backend: BACKEND,
                message: "Invalid credentials".to_string(),
            })
        } else {
            Err(TorrentClientError::AuthenticationFailed {
                backend: BACKEND,
                message: format!(
                    "Unexpected response: {}",
                    body.chars().take(100).collect::<String>()
                ),
            })
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        self.login().await
    }

    /// Send an authenticated request, logging in again once on `403`.
    async fn send<F>(&self, build: F) -> Result<String, TorrentClientError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let mut response = build(&self.client)
            .send()
            .await
            .map_err(|e| TorrentClientError::from_reqwest(BACKEND, e))?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!("qBittorrent session expired, re-authenticating");
            *self.session.write().await = None;
            self.login().await?;

            response = build(&self.client)
                .send()
                .await
                .map_err(|e| TorrentClientError::from_reqwest(BACKEND, e))?;
        }

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(TorrentClientError::AuthenticationFailed {
                backend: BACKEND,
                message: "session rejected after re-login".to_string(),
            });
        }
        if !status.is_success() {
            return Err(TorrentClientError::rpc(BACKEND, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::invalid_response(BACKEND, e.to_string()))
    }

    /// Make an authenticated GET request.
    async fn get(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.send(|client| client.get(&url)).await
    }

    /// Make an authenticated POST request with form data.
    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        self.send(|client| client.post(&url).form(params)).await
    }

    async fn torrents(&self, query: &str) -> Result<Vec<QBTorrentInfo>, TorrentClientError> {
        let response = self.get(&format!("/api/v2/torrents/info{}", query)).await?;
        serde_json::from_str(&response).map_err(|e| {
            TorrentClientError::invalid_response(BACKEND, format!("Failed to parse response: {}", e))
        })
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    progress: f64,
    size: i64,
    completed: i64,
    dlspeed: i64,
    upspeed: i64,
    num_seeds: i64,
    num_leechs: i64,
    eta: i64,
    save_path: String,
    magnet_uri: String,
}

impl QBTorrentInfo {
    fn into_snapshot(self) -> ProgressSnapshot {
        let status = parse_qb_state(&self.state);
        ProgressSnapshot {
            percent_done: self.progress.clamp(0.0, 1.0),
            download_speed: self.dlspeed.max(0) as u64,
            upload_speed: self.upspeed.max(0) as u64,
            eta_secs: if self.eta >= 0 && self.eta < QB_UNKNOWN_ETA {
                Some(self.eta as u64)
            } else {
                None
            },
            status,
            downloaded_bytes: self.completed.max(0) as u64,
            total_bytes: self.size.max(0) as u64,
            seeders: self.num_seeds.max(0) as u32,
            leechers: self.num_leechs.max(0) as u32,
            error_message: if status == TorrentState::Error {
                Some(format!("qBittorrent state: {}", self.state))
            } else {
                None
            },
        }
    }

    fn into_active(self) -> ActiveTorrent {
        ActiveTorrent {
            id: self.hash.to_lowercase(),
            status: parse_qb_state(&self.state),
            progress: self.progress.clamp(0.0, 1.0),
            download_path: PathBuf::from(&self.save_path),
            link: if self.magnet_uri.is_empty() {
                None
            } else {
                Some(self.magnet_uri)
            },
            name: self.name,
        }
    }
}

/// Parse qBittorrent state string to TorrentState.
fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "metaDL" | "forcedDL" | "allocating" | "queuedDL" | "stalledDL"
        | "checkingDL" => TorrentState::Downloading,
        "uploading" | "forcedUP" | "stalledUP" | "queuedUP" | "checkingUP" => {
            TorrentState::Seeding
        }
        "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => TorrentState::Paused,
        "error" | "missingFiles" => TorrentState::Error,
        other => {
            debug!(state = other, "Unmapped qBittorrent state, treating as downloading");
            TorrentState::Downloading
        }
    }
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn is_connected(&self) -> bool {
        match self.get("/api/v2/app/version").await {
            Ok(version) => {
                debug!(version = %version.trim(), "qBittorrent reachable");
                true
            }
            Err(e) => {
                debug!(error = %e, "qBittorrent not reachable");
                false
            }
        }
    }

    async fn start(
        &self,
        link: &str,
        download_path: Option<&Path>,
    ) -> Result<String, TorrentClientError> {
        let save_path = download_path.map(|p| p.to_string_lossy().into_owned());
        let mut params = vec![("urls", link)];
        if let Some(path) = save_path.as_deref() {
            params.push(("savepath", path));
        }

        let body = self.post_form("/api/v2/torrents/add", &params).await?;
        if body.contains("Fails.") {
            return Err(TorrentClientError::rpc(BACKEND, "torrent rejected by daemon"));
        }

        if let Some(hash) = extract_hash_from_magnet(link) {
            return Ok(hash);
        }

        // Not a magnet: the newest torrent is the one we just added.
        self.torrents("?sort=added_on&reverse=true&limit=1")
            .await?
            .into_iter()
            .next()
            .map(|t| t.hash.to_lowercase())
            .ok_or_else(|| {
                TorrentClientError::invalid_response(BACKEND, "added torrent not listed")
            })
    }

    async fn pause(&self, id: &str) -> Result<(), TorrentClientError> {
        let hash = id.to_lowercase();
        self.post_form("/api/v2/torrents/pause", &[("hashes", &hash)])
            .await?;
        Ok(())
    }

    async fn resume(&self, id: &str) -> Result<(), TorrentClientError> {
        let hash = id.to_lowercase();
        self.post_form("/api/v2/torrents/resume", &[("hashes", &hash)])
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        let hash = id.to_lowercase();
        let delete_str = if delete_files { "true" } else { "false" };

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", &hash), ("deleteFiles", delete_str)],
        )
        .await?;

        Ok(())
    }

    async fn get_progress(&self, id: &str) -> Result<ProgressSnapshot, TorrentClientError> {
        let hash = id.to_lowercase();
        self.torrents(&format!("?hashes={}", urlencoding::encode(&hash)))
            .await?
            .into_iter()
            .next()
            .map(QBTorrentInfo::into_snapshot)
            .ok_or_else(|| TorrentClientError::TorrentNotFound {
                backend: BACKEND,
                id: id.to_string(),
            })
    }

    async fn list_active(&self) -> Result<Vec<ActiveTorrent>, TorrentClientError> {
        Ok(self
            .torrents("")
            .await?
            .into_iter()
            .map(QBTorrentInfo::into_active)
            .collect())
    }
}

/// Extract info hash from a magnet URI.
pub(crate) fn extract_hash_from_magnet(magnet: &str) -> Option<String> {
    let (_, query) = magnet.split_once('?')?;

    query
        .split('&')
        .find_map(|param| param.strip_prefix("xt=urn:btih:"))
        .filter(|hash| !hash.is_empty())
        .map(str::to_lowercase)
}
