//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::torrent_client::{
    extract_hash_from_magnet, ActiveTorrent, ProgressSnapshot, TorrentClient, TorrentClientError,
    TorrentEvent, TorrentState,
};

const BACKEND: &str = "mock";

/// A recorded `start` call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedStart {
    pub link: String,
    pub download_path: Option<PathBuf>,
    /// Id handed back to the caller.
    pub torrent_id: String,
    pub timestamp: chrono::DateTime<Utc>,
}

/// Internal state for a mock torrent.
#[derive(Debug, Clone)]
struct MockTorrent {
    id: String,
    name: String,
    link: String,
    download_path: PathBuf,
    snapshot: ProgressSnapshot,
}

impl MockTorrent {
    fn to_active(&self) -> ActiveTorrent {
        ActiveTorrent {
            id: self.id.clone(),
            name: self.name.clone(),
            link: Some(self.link.clone()),
            status: self.snapshot.status,
            progress: self.snapshot.percent_done,
            download_path: self.download_path.clone(),
        }
    }
}

fn fresh_snapshot() -> ProgressSnapshot {
    ProgressSnapshot {
        percent_done: 0.0,
        download_speed: 0,
        upload_speed: 0,
        eta_secs: None,
        status: TorrentState::Downloading,
        downloaded_bytes: 0,
        total_bytes: 1024 * 1024 * 1024,
        seeders: 10,
        leechers: 2,
        error_message: None,
    }
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Track started and removed torrents for assertions
/// - Control torrent progress/state
/// - Simulate failures
/// - Push daemon events (when built with [`MockTorrentClient::with_events`])
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
///
/// let id = client.start("magnet:?xt=urn:btih:abc123", None).await?;
/// assert_eq!(id, "abc123");
///
/// client.set_progress("abc123", 0.5).await;
/// client.set_progress("abc123", 1.0).await; // Seeding
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    started: Arc<RwLock<Vec<RecordedStart>>>,
    removed: Arc<RwLock<Vec<(String, bool)>>>,
    /// Torrents in insertion order.
    torrents: Arc<RwLock<Vec<MockTorrent>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    id_counter: Arc<RwLock<u32>>,
    connected: AtomicBool,
    default_download_path: PathBuf,
    events: Option<broadcast::Sender<TorrentEvent>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            started: Arc::new(RwLock::new(Vec::new())),
            removed: Arc::new(RwLock::new(Vec::new())),
            torrents: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            id_counter: Arc::new(RwLock::new(0)),
            connected: AtomicBool::new(true),
            default_download_path: PathBuf::from("/mock/downloads"),
            events: None,
        }
    }

    /// Mock client whose torrents land in `path` when no path is given.
    pub fn with_download_path(path: impl Into<PathBuf>) -> Self {
        Self {
            default_download_path: path.into(),
            ..Self::new()
        }
    }

    /// Enables the push event stream.
    pub fn with_events(mut self) -> Self {
        let (tx, _) = broadcast::channel(64);
        self.events = Some(tx);
        self
    }

    /// Pushes a daemon event to subscribers. Returns false when events are
    /// disabled or nobody listens.
    pub fn emit(&self, event: TorrentEvent) -> bool {
        self.events
            .as_ref()
            .map(|tx| tx.send(event).is_ok())
            .unwrap_or(false)
    }

    pub async fn started_torrents(&self) -> Vec<RecordedStart> {
        self.started.read().await.clone()
    }

    /// `(id, delete_files)` for every successful remove.
    pub async fn removed_torrents(&self) -> Vec<(String, bool)> {
        self.removed.read().await.clone()
    }

    pub async fn has_torrent(&self, id: &str) -> bool {
        self.torrents.read().await.iter().any(|t| t.id == id)
    }

    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the progress for a torrent (0.0 to 1.0).
    ///
    /// When progress reaches 1.0, the torrent state changes to Seeding.
    pub async fn set_progress(&self, id: &str, progress: f64) {
        self.update(id, |t| {
            let progress = progress.clamp(0.0, 1.0);
            let snapshot = &mut t.snapshot;
            snapshot.percent_done = progress;
            snapshot.downloaded_bytes = (snapshot.total_bytes as f64 * progress) as u64;
            if progress >= 1.0 {
                snapshot.status = TorrentState::Seeding;
                snapshot.eta_secs = None;
                snapshot.download_speed = 0;
            } else if snapshot.status != TorrentState::Paused {
                snapshot.status = TorrentState::Downloading;
            }
        })
        .await;
    }

    pub async fn set_speeds(&self, id: &str, download: u64, upload: u64) {
        self.update(id, |t| {
            t.snapshot.download_speed = download;
            t.snapshot.upload_speed = upload;
        })
        .await;
    }

    /// Puts a torrent into the daemon's error state.
    pub async fn set_error(&self, id: &str, message: &str) {
        self.update(id, |t| {
            t.snapshot.status = TorrentState::Error;
            t.snapshot.error_message = Some(message.to_string());
        })
        .await;
    }

    /// Renames a torrent as the daemon reports it.
    pub async fn set_name(&self, id: &str, name: &str) {
        self.update(id, |t| t.name = name.to_string()).await;
    }

    async fn update(&self, id: &str, f: impl FnOnce(&mut MockTorrent)) {
        let mut torrents = self.torrents.write().await;
        if let Some(torrent) = torrents.iter_mut().find(|t| t.id == id) {
            f(torrent);
        }
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Result<(), TorrentClientError> {
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn next_id(&self) -> String {
        let mut counter = self.id_counter.write().await;
        *counter += 1;
        format!("mockhash{:08x}", *counter)
    }

    fn not_found(id: &str) -> TorrentClientError {
        TorrentClientError::TorrentNotFound {
            backend: BACKEND,
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn start(
        &self,
        link: &str,
        download_path: Option<&Path>,
    ) -> Result<String, TorrentClientError> {
        self.take_error().await?;

        let id = match extract_hash_from_magnet(link) {
            Some(hash) => hash,
            None => self.next_id().await,
        };

        let mut torrents = self.torrents.write().await;
        if !torrents.iter().any(|t| t.id == id) {
            torrents.push(MockTorrent {
                id: id.clone(),
                name: id.clone(),
                link: link.to_string(),
                download_path: download_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.default_download_path.clone()),
                snapshot: fresh_snapshot(),
            });
        }

        self.started.write().await.push(RecordedStart {
            link: link.to_string(),
            download_path: download_path.map(Path::to_path_buf),
            torrent_id: id.clone(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    async fn pause(&self, id: &str) -> Result<(), TorrentClientError> {
        self.take_error().await?;
        let mut torrents = self.torrents.write().await;
        let torrent = torrents
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        torrent.snapshot.status = TorrentState::Paused;
        torrent.snapshot.download_speed = 0;
        Ok(())
    }

    async fn resume(&self, id: &str) -> Result<(), TorrentClientError> {
        self.take_error().await?;
        let mut torrents = self.torrents.write().await;
        let torrent = torrents
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Self::not_found(id))?;
        torrent.snapshot.status = if torrent.snapshot.percent_done >= 1.0 {
            TorrentState::Seeding
        } else {
            TorrentState::Downloading
        };
        Ok(())
    }

    async fn remove(&self, id: &str, delete_files: bool) -> Result<(), TorrentClientError> {
        self.take_error().await?;
        let mut torrents = self.torrents.write().await;
        let before = torrents.len();
        torrents.retain(|t| t.id != id);
        if torrents.len() == before {
            return Err(Self::not_found(id));
        }
        self.removed
            .write()
            .await
            .push((id.to_string(), delete_files));
        Ok(())
    }

    async fn get_progress(&self, id: &str) -> Result<ProgressSnapshot, TorrentClientError> {
        self.take_error().await?;
        self.torrents
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.snapshot.clone())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn list_active(&self) -> Result<Vec<ActiveTorrent>, TorrentClientError> {
        self.take_error().await?;
        Ok(self
            .torrents
            .read()
            .await
            .iter()
            .map(MockTorrent::to_active)
            .collect())
    }

    fn subscribe_events(&self) -> Option<broadcast::Receiver<TorrentEvent>> {
        self.events.as_ref().map(|tx| tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_get_progress() {
        let client = MockTorrentClient::new();

        let id = client
            .start("magnet:?xt=urn:btih:ABC123DEF456", None)
            .await
            .unwrap();
        assert_eq!(id, "abc123def456");

        let snapshot = client.get_progress(&id).await.unwrap();
        assert_eq!(snapshot.status, TorrentState::Downloading);
        assert_eq!(snapshot.percent_done, 0.0);

        let active = client.list_active().await.unwrap();
        assert_eq!(active[0].download_path, PathBuf::from("/mock/downloads"));
    }

    #[tokio::test]
    async fn test_progress_tracking() {
        let client = MockTorrentClient::new();
        let id = client.start("magnet:?xt=urn:btih:p", None).await.unwrap();

        client.set_progress(&id, 0.5).await;
        let snapshot = client.get_progress(&id).await.unwrap();
        assert!((snapshot.percent_done - 0.5).abs() < 0.01);
        assert!(!snapshot.is_complete());

        client.set_progress(&id, 1.0).await;
        let snapshot = client.get_progress(&id).await.unwrap();
        assert_eq!(snapshot.status, TorrentState::Seeding);
        assert!(snapshot.is_complete());
    }

    #[tokio::test]
    async fn test_non_magnet_links_get_generated_ids() {
        let client = MockTorrentClient::new();
        let a = client.start("http://x/a.torrent", None).await.unwrap();
        let b = client.start("http://x/b.torrent", None).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(client.started_torrents().await.len(), 2);
    }

    #[tokio::test]
    async fn test_error_injection() {
        let client = MockTorrentClient::new();
        client
            .set_next_error(TorrentClientError::Timeout { backend: "mock" })
            .await;

        assert!(client.start("magnet:?xt=urn:btih:e", None).await.is_err());
        // Error is consumed.
        assert!(client.start("magnet:?xt=urn:btih:e", None).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_records_and_forgets() {
        let client = MockTorrentClient::new();
        let id = client.start("magnet:?xt=urn:btih:r", None).await.unwrap();

        client.remove(&id, false).await.unwrap();
        assert!(!client.has_torrent(&id).await);
        assert_eq!(client.removed_torrents().await, vec![(id.clone(), false)]);

        let err = client.remove(&id, false).await.unwrap_err();
        assert!(matches!(err, TorrentClientError::TorrentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_events_only_when_enabled() {
        let plain = MockTorrentClient::new();
        assert!(plain.subscribe_events().is_none());

        let client = MockTorrentClient::new().with_events();
        let mut rx = client.subscribe_events().unwrap();
        assert!(client.emit(TorrentEvent::Completed {
            torrent_id: "x".to_string()
        }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            TorrentEvent::Completed { .. }
        ));
    }
}
