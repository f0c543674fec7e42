//! Transmission torrent client implementation.
//!
//! Transmission speaks JSON-RPC over HTTP. Every call must carry the
//! `X-Transmission-Session-Id` header; the daemon answers `409 Conflict` with
//! a fresh id whenever the one we hold is missing or stale.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    ActiveTorrent, ProgressSnapshot, TorrentClient, TorrentClientError, TorrentState,
    TransmissionConfig,
};

const BACKEND: &str = "transmission";
const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const TORRENT_FIELDS: &[&str] = &[
    "id",
    "hashString",
    "name",
    "status",
    "error",
    "errorString",
    "percentDone",
    "rateDownload",
    "rateUpload",
    "eta",
    "sizeWhenDone",
    "leftUntilDone",
    "peersSendingToUs",
    "peersGettingFromUs",
    "downloadDir",
    "magnetLink",
];

/// Transmission client implementation.
pub struct TransmissionClient {
    client: Client,
    config: TransmissionConfig,
    /// Session id captured from the last 409 handshake.
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    /// Create a new Transmission client.
    pub fn new(config: TransmissionConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TorrentClientError::rpc(BACKEND, e.to_string()))?;

        Ok(Self {
            client,
            config,
            session_id: RwLock::new(None),
        })
    }

    fn rpc_url(&self) -> String {
        format!("{}/transmission/rpc", self.config.url.trim_end_matches('/'))
    }

    async fn send(&self, body: &Value) -> Result<Response, TorrentClientError> {
        let mut request = self.client.post(self.rpc_url()).json(body);

        if let Some(id) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_HEADER, id);
        }
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        request
            .send()
            .await
            .map_err(|e| TorrentClientError::from_reqwest(BACKEND, e))
    }

    /// Issue one RPC call, refreshing the session id at most once.
    async fn rpc(&self, method: &str, arguments: Value) -> Result<Value, TorrentClientError> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut response = self.send(&body).await?;

        if response.status() == StatusCode::CONFLICT {
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| TorrentClientError::AuthenticationFailed {
                    backend: BACKEND,
                    message: "409 response without a session id".to_string(),
                })?;
            debug!(method, "Transmission session id refreshed");
            *self.session_id.write().await = Some(session_id);

            response = self.send(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(TorrentClientError::AuthenticationFailed {
                backend: BACKEND,
                message: "invalid credentials".to_string(),
            });
        }
        if !status.is_success() {
            return Err(TorrentClientError::rpc(BACKEND, format!("HTTP {}", status)));
        }

        let envelope: RpcResponse = response.json().await.map_err(|e| {
            TorrentClientError::invalid_response(BACKEND, format!("Failed to parse response: {}", e))
        })?;

        if envelope.result != "success" {
            warn!(method, result = %envelope.result, "Transmission RPC call failed");
            return Err(TorrentClientError::rpc(BACKEND, envelope.result));
        }

        Ok(envelope.arguments.unwrap_or(Value::Null))
    }

    async fn torrent_get(&self, ids: Option<Value>) -> Result<Vec<RpcTorrent>, TorrentClientError> {
        let mut arguments = json!({ "fields": TORRENT_FIELDS });
        if let Some(ids) = ids {
            arguments["ids"] = ids;
        }

        let response = self.rpc("torrent-get", arguments).await?;
        let list: TorrentList = serde_json::from_value(response).map_err(|e| {
            TorrentClientError::invalid_response(BACKEND, format!("Failed to parse torrents: {}", e))
        })?;
        Ok(list.torrents)
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct TorrentList {
    #[serde(default)]
    torrents: Vec<RpcTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddedTorrent {
    id: i64,
    #[serde(default)]
    hash_string: Option<String>,
}

/// Transmission torrent-get entry.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RpcTorrent {
    id: i64,
    hash_string: Option<String>,
    name: String,
    status: i64,
    error: i64,
    error_string: String,
    percent_done: f64,
    rate_download: i64,
    rate_upload: i64,
    eta: i64,
    size_when_done: i64,
    left_until_done: i64,
    peers_sending_to_us: i64,
    peers_getting_from_us: i64,
    download_dir: String,
    magnet_link: Option<String>,
}

impl RpcTorrent {
    fn external_id(&self) -> String {
        match &self.hash_string {
            Some(hash) if !hash.is_empty() => hash.to_lowercase(),
            _ => self.id.to_string(),
        }
    }

    fn state(&self) -> TorrentState {
        parse_transmission_status(self.status, self.error)
    }

    fn into_snapshot(self) -> ProgressSnapshot {
        let status = self.state();
        let total = self.size_when_done.max(0) as u64;
        let left = self.left_until_done.clamp(0, self.size_when_done.max(0)) as u64;
        ProgressSnapshot {
            percent_done: self.percent_done.clamp(0.0, 1.0),
            download_speed: self.rate_download.max(0) as u64,
            upload_speed: self.rate_upload.max(0) as u64,
            eta_secs: if self.eta >= 0 {
                Some(self.eta as u64)
            } else {
                None
            },
            status,
            downloaded_bytes: total - left,
            total_bytes: total,
            seeders: self.peers_sending_to_us.max(0) as u32,
            leechers: self.peers_getting_from_us.max(0) as u32,
            error_message: if status == TorrentState::Error && !self.error_string.is_empty() {
                Some(self.error_string)
            } else {
                None
            },
        }
    }

    fn into_active(self) -> ActiveTorrent {
        ActiveTorrent {
            id: self.external_id(),
            status: self.state(),
            progress: self.percent_done.clamp(0.0, 1.0),
            download_path: PathBuf::from(&self.download_dir),
            link: self.magnet_link,
            name: self.name,
        }
    }
}

/// Map Transmission's numeric status (and error flag) to TorrentState.
///
/// 0 stopped, 1-2 check wait/checking, 3-4 download wait/downloading,
/// 5-6 seed wait/seeding.
fn parse_transmission_status(status: i64, error: i64) -> TorrentState {
    if error != 0 {
        return TorrentState::Error;
    }
    match status {
        0 => TorrentState::Paused,
        1..=4 => TorrentState::Downloading,
        5 | 6 => TorrentState::Seeding,
        _ => TorrentState::Error,
    }
}

/// Transmission accepts numeric ids or info hashes in `ids`.
fn ids_argument(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(numeric) => json!([numeric]),
        Err(_) => json!([id]),
    }
}

#[async_trait]
impl TorrentClient for TransmissionClient {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn is_connected(&self) -> bool {
        match self.rpc("session-get", json!({ "fields": ["version"] })).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Transmission not reachable");
                false
            }
        }
    }

    async fn start(
        &self,
        link: &str,
        download_path: Option<&Path>,
    ) -> Result<String, TorrentClientError> {
        let mut arguments = json!({ "filename": link });
        if let Some(path) = download_path {
            arguments["download-dir"] = json!(path.to_string_lossy());
        }

        let response = self.rpc("torrent-add", arguments).await?;

        let added = response
            .get("torrent-added")
            .or_else(|| response.get("torrent-duplicate"))
            .cloned()
            .ok_or_else(|| {
                TorrentClientError::invalid_response(BACKEND, "torrent-add returned no torrent")
            })?;
        let added: AddedTorrent = serde_json::from_value(added).map_err(|e| {
            TorrentClientError::invalid_response(BACKEND, format!("Failed to parse torrent: {}", e))
        })?;

        Ok(match added.hash_string {
            Some(hash) if !hash.is_empty() => hash.to_lowercase(),
            _ => added.id.to_string(),
        })
    }

    async fn pause(&self, id: &str) -> Result<(), TorrentClientError> {
        self.rpc("torrent-stop", json!({ "ids": ids_argument(id) }))
            .await?;
        Ok(())
    }

    async fn resume(&self, id: &str) -> Result<(), TorrentClientError> {
        self.rpc("torrent-start", json!({ "ids": ids_argument(id) }))
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        self.rpc(
            "torrent-remove",
            json!({ "ids": ids_argument(id), "delete-local-data": delete_files }),
        )
        .await?;
        Ok(())
    }

    async fn get_progress(&self, id: &str) -> Result<ProgressSnapshot, TorrentClientError> {
        self.torrent_get(Some(ids_argument(id)))
            .await?
            .into_iter()
            .next()
            .map(RpcTorrent::into_snapshot)
            .ok_or_else(|| TorrentClientError::TorrentNotFound {
                backend: BACKEND,
                id: id.to_string(),
            })
    }

    async fn list_active(&self) -> Result<Vec<ActiveTorrent>, TorrentClientError> {
        Ok(self
            .torrent_get(None)
            .await?
            .into_iter()
            .map(RpcTorrent::into_active)
            .collect())
    }
}
