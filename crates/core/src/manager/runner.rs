//! Download manager implementation.
//!
//! Owns the job table and drives every job through its state machine:
//! - Admission: FIFO, bounded by `max_concurrent_downloads`
//! - Progress: periodic poll of the daemon, plus push events when the
//!   backend offers them
//! - Completion: hands the download to the organizer, then removes the
//!   torrent from the daemon (files kept)

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::content::ContentDescriptor;
use crate::metrics;
use crate::organizer::{OrganizeRequest, Organizer};
use crate::searcher::{TorrentCandidate, TorrentSearchEngine};
use crate::torrent_client::{
    ActiveTorrent, ProgressSnapshot, TorrentClient, TorrentClientError, TorrentEvent, TorrentState,
};

use super::config::ManagerConfig;
use super::events::DownloadEvent;
use super::types::{DownloadJob, JobStatus, ManagerError, ManagerStats};

fn find_mut<'a>(jobs: &'a mut [DownloadJob], id: &str) -> Option<&'a mut DownloadJob> {
    jobs.iter_mut().find(|j| j.id == id)
}

/// The download manager - queues, admits, tracks and completes jobs.
pub struct DownloadManager {
    config: ManagerConfig,
    client: Arc<dyn TorrentClient>,
    search: Arc<TorrentSearchEngine>,
    organizer: Arc<dyn Organizer>,
    /// Directory handed to the daemon for every torrent.
    downloads_dir: PathBuf,

    // Runtime state
    /// Jobs in insertion order; the order is the admission queue.
    jobs: Mutex<Vec<DownloadJob>>,
    events: broadcast::Sender<DownloadEvent>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl DownloadManager {
    /// Create a new download manager.
    pub fn new(
        config: ManagerConfig,
        client: Arc<dyn TorrentClient>,
        search: Arc<TorrentSearchEngine>,
        organizer: Arc<dyn Organizer>,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            client,
            search,
            organizer,
            downloads_dir: downloads_dir.into(),
            jobs: Mutex::new(Vec::new()),
            events,
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn search_engine(&self) -> &Arc<TorrentSearchEngine> {
        &self.search
    }

    /// Name of the torrent daemon backend in use.
    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    pub async fn client_connected(&self) -> bool {
        self.client.is_connected().await
    }

    /// Subscribe to job lifecycle and progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Start the background worker (progress poll and daemon event listener).
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Download manager already running");
            return;
        }

        info!(
            backend = self.client.name(),
            max_concurrent = self.config.max_concurrent_downloads,
            "Starting download manager"
        );

        self.spawn_poll_loop();

        if let Some(events) = self.client.subscribe_events() {
            self.spawn_event_listener(events);
        }
    }

    /// Stop the background worker. In-flight organize steps run to completion.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Download manager not running");
            return;
        }

        info!("Stopping download manager");
        let _ = self.shutdown_tx.send(());
    }

    fn spawn_poll_loop(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_millis(self.config.progress_poll_interval_ms);

        tokio::spawn(async move {
            info!("Progress poll loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Progress poll loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !manager.running.load(Ordering::Relaxed) {
                            break;
                        }
                        manager.poll_once().await;
                    }
                }
            }
            info!("Progress poll loop stopped");
        });
    }

    fn spawn_event_listener(self: &Arc<Self>, mut events: broadcast::Receiver<TorrentEvent>) {
        let manager = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Torrent event listener started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    event = events.recv() => match event {
                        Ok(event) => manager.handle_torrent_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Torrent event stream lagged, relying on poll");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            info!("Torrent event listener stopped");
        });
    }

    fn emit(&self, event: DownloadEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn record_rpc_error(&self, error: &TorrentClientError) {
        metrics::DAEMON_RPC_ERRORS
            .with_label_values(&[error.backend()])
            .inc();
    }

    /// Marks a live job failed. No-op for terminal jobs.
    fn fail_job(&self, job: &mut DownloadJob, message: impl Into<String>) {
        let message = message.into();
        if job.transition(JobStatus::Failed).is_err() {
            debug!(job_id = %job.id, status = %job.status, "Ignoring failure for finished job");
            return;
        }
        warn!(job_id = %job.id, error = %message, "Download job failed");
        job.error_message = Some(message.clone());
        metrics::DOWNLOADS_FAILED.inc();
        self.emit(DownloadEvent::JobFailed {
            job_id: job.id.clone(),
            error: message,
        });
    }

    /// Admits queued jobs, oldest first, while slots are free.
    async fn admit(&self, jobs: &mut [DownloadJob]) {
        let held = jobs.iter().filter(|j| j.status.holds_slot()).count();
        let mut slots = self.config.max_concurrent_downloads.saturating_sub(held);

        for job in jobs.iter_mut() {
            if slots == 0 {
                break;
            }
            if job.status != JobStatus::Queued {
                continue;
            }

            let Some(link) = job.candidate.as_ref().map(|c| c.link.clone()) else {
                self.fail_job(job, "Job has no torrent candidate");
                continue;
            };

            match self.client.start(&link, Some(&self.downloads_dir)).await {
                Ok(torrent_id) => {
                    if let Err(e) = job.transition(JobStatus::Downloading) {
                        warn!(job_id = %job.id, error = %e, "Admission skipped");
                        continue;
                    }
                    job.torrent_id = Some(torrent_id.clone());
                    job.started_at = Some(Utc::now());
                    slots -= 1;

                    info!(job_id = %job.id, torrent_id = %torrent_id, "Download started");
                    metrics::DOWNLOADS_STARTED.inc();
                    self.emit(DownloadEvent::JobStarted {
                        job_id: job.id.clone(),
                        torrent_id,
                    });
                }
                Err(e) => {
                    self.record_rpc_error(&e);
                    self.fail_job(job, format!("Failed to start torrent: {}", e));
                }
            }
        }
    }

    /// Creates a job for `content` and tries to admit it right away.
    ///
    /// With no (or an empty) candidate list the search engine is asked for
    /// one. If that yields nothing, the job is still recorded, as `failed`,
    /// and its id is returned inside [`ManagerError::NoCandidatesFound`].
    pub async fn add_download(
        &self,
        content: ContentDescriptor,
        candidates: Option<Vec<TorrentCandidate>>,
    ) -> Result<String, ManagerError> {
        let candidates = match candidates {
            Some(list) if !list.is_empty() => Ok(list),
            _ => self.search.search(&content).await,
        };

        let (candidate, failure) = match candidates {
            Ok(list) => match list.into_iter().next() {
                Some(top) => (Some(top), None),
                None => (
                    None,
                    Some(format!("No torrent candidates found for {}", content.label())),
                ),
            },
            Err(e) => (
                None,
                Some(format!("Search failed for {}: {}", content.label(), e)),
            ),
        };

        let mut job = DownloadJob::new(content, candidate);
        let job_id = job.id.clone();
        info!(job_id = %job_id, content = %job.content.label(), "Download job added");
        self.emit(DownloadEvent::JobAdded {
            job: Box::new(job.clone()),
        });

        let mut jobs = self.jobs.lock().await;
        if let Some(message) = failure {
            self.fail_job(&mut job, message);
            jobs.push(job);
            return Err(ManagerError::NoCandidatesFound { job_id });
        }

        jobs.push(job);
        self.admit(&mut jobs).await;
        Ok(job_id)
    }

    /// Ranked candidates for `content`, for callers that want to choose
    /// before calling [`DownloadManager::add_download`].
    pub async fn search(
        &self,
        content: &ContentDescriptor,
    ) -> Result<Vec<TorrentCandidate>, ManagerError> {
        Ok(self.search.search(content).await?)
    }

    pub async fn get_job(&self, id: &str) -> Option<DownloadJob> {
        self.jobs.lock().await.iter().find(|j| j.id == id).cloned()
    }

    /// All jobs in creation order.
    pub async fn get_all_jobs(&self) -> Vec<DownloadJob> {
        self.jobs.lock().await.clone()
    }

    pub async fn get_jobs_by_status(&self, status: JobStatus) -> Vec<DownloadJob> {
        self.jobs
            .lock()
            .await
            .iter()
            .filter(|j| j.status == status)
            .cloned()
            .collect()
    }

    pub async fn get_stats(&self) -> ManagerStats {
        ManagerStats::from_jobs(self.jobs.lock().await.iter())
    }

    /// Cancels a live job. The torrent is removed from the daemon with its
    /// files kept, and the freed slot is offered to the queue.
    pub async fn cancel_download(&self, id: &str) -> Result<(), ManagerError> {
        let mut jobs = self.jobs.lock().await;
        let job = find_mut(&mut jobs, id).ok_or_else(|| ManagerError::JobNotFound(id.to_string()))?;

        if !job.status.can_transition_to(JobStatus::Cancelled) {
            return Err(ManagerError::InvalidTransition {
                job_id: id.to_string(),
                from: job.status,
                to: JobStatus::Cancelled,
            });
        }

        if let Some(torrent_id) = job.torrent_id.clone() {
            if let Err(e) = self.client.remove(&torrent_id, false).await {
                self.record_rpc_error(&e);
                warn!(
                    job_id = %id,
                    torrent_id = %torrent_id,
                    error = %e,
                    "Failed to remove torrent for cancelled job"
                );
            }
        }

        job.transition(JobStatus::Cancelled)?;
        info!(job_id = %id, "Download cancelled");
        metrics::DOWNLOADS_CANCELLED.inc();
        self.emit(DownloadEvent::JobCancelled {
            job_id: id.to_string(),
        });

        self.admit(&mut jobs).await;
        Ok(())
    }

    /// Pauses a downloading job. The job keeps its admission slot.
    pub async fn pause_download(&self, id: &str) -> Result<(), ManagerError> {
        let mut jobs = self.jobs.lock().await;
        let job = find_mut(&mut jobs, id).ok_or_else(|| ManagerError::JobNotFound(id.to_string()))?;

        if job.status != JobStatus::Downloading {
            return Err(ManagerError::InvalidTransition {
                job_id: id.to_string(),
                from: job.status,
                to: JobStatus::Paused,
            });
        }
        let torrent_id = job
            .torrent_id
            .clone()
            .ok_or_else(|| ManagerError::NotAdmitted(id.to_string()))?;

        if let Err(e) = self.client.pause(&torrent_id).await {
            self.record_rpc_error(&e);
            return Err(e.into());
        }

        job.transition(JobStatus::Paused)?;
        info!(job_id = %id, "Download paused");
        self.emit(DownloadEvent::JobPaused {
            job_id: id.to_string(),
        });
        Ok(())
    }

    pub async fn resume_download(&self, id: &str) -> Result<(), ManagerError> {
        let mut jobs = self.jobs.lock().await;
        let job = find_mut(&mut jobs, id).ok_or_else(|| ManagerError::JobNotFound(id.to_string()))?;

        if job.status != JobStatus::Paused {
            return Err(ManagerError::InvalidTransition {
                job_id: id.to_string(),
                from: job.status,
                to: JobStatus::Downloading,
            });
        }
        let torrent_id = job
            .torrent_id
            .clone()
            .ok_or_else(|| ManagerError::NotAdmitted(id.to_string()))?;

        if let Err(e) = self.client.resume(&torrent_id).await {
            self.record_rpc_error(&e);
            return Err(e.into());
        }

        job.transition(JobStatus::Downloading)?;
        info!(job_id = %id, "Download resumed");
        self.emit(DownloadEvent::JobResumed {
            job_id: id.to_string(),
        });
        Ok(())
    }

    /// Drops completed jobs from the table. Failed and cancelled jobs stay
    /// so their error record remains inspectable. Returns the ids removed.
    pub async fn clear_completed(&self) -> Vec<String> {
        let mut jobs = self.jobs.lock().await;
        let (cleared, kept): (Vec<_>, Vec<_>) = jobs
            .drain(..)
            .partition(|j| j.status == JobStatus::Completed);
        *jobs = kept;

        let job_ids: Vec<String> = cleared.into_iter().map(|j| j.id).collect();
        info!(count = job_ids.len(), "Cleared completed download jobs");
        self.emit(DownloadEvent::JobsCleared {
            job_ids: job_ids.clone(),
        });
        job_ids
    }

    /// One progress pass: fetch a snapshot for every downloading job, apply
    /// it, complete finished torrents, then retry admission.
    pub async fn poll_once(&self) {
        let active: Vec<(String, String)> = {
            let jobs = self.jobs.lock().await;
            jobs.iter()
                .filter(|j| j.status == JobStatus::Downloading)
                .filter_map(|j| j.torrent_id.clone().map(|t| (j.id.clone(), t)))
                .collect()
        };

        for (job_id, torrent_id) in active {
            match self.client.get_progress(&torrent_id).await {
                Ok(snapshot) => self.apply_snapshot(&job_id, &torrent_id, snapshot).await,
                Err(e @ TorrentClientError::TorrentNotFound { .. }) => {
                    self.record_rpc_error(&e);
                    let mut jobs = self.jobs.lock().await;
                    if let Some(job) = find_mut(&mut jobs, &job_id) {
                        self.fail_job(job, format!("Torrent is gone from the daemon: {}", e));
                    }
                    self.admit(&mut jobs).await;
                }
                Err(e) => {
                    self.record_rpc_error(&e);
                    debug!(
                        job_id = %job_id,
                        torrent_id = %torrent_id,
                        error = %e,
                        "Progress poll failed"
                    );
                }
            }
        }

        let mut jobs = self.jobs.lock().await;
        self.admit(&mut jobs).await;
    }

    async fn apply_snapshot(&self, job_id: &str, torrent_id: &str, snapshot: ProgressSnapshot) {
        let complete = {
            let mut jobs = self.jobs.lock().await;
            let Some(job) = find_mut(&mut jobs, job_id) else {
                return;
            };
            if job.status != JobStatus::Downloading || job.torrent_id.as_deref() != Some(torrent_id)
            {
                return;
            }

            if snapshot.status == TorrentState::Error {
                let message = snapshot
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "Torrent daemon reported an error".to_string());
                self.fail_job(job, message);
                self.admit(&mut jobs).await;
                return;
            }

            job.apply_snapshot(&snapshot);
            self.emit(DownloadEvent::JobProgress {
                job_id: job.id.clone(),
                progress: job.progress,
                download_speed: job.download_speed,
                upload_speed: job.upload_speed,
                eta_secs: job.eta_secs,
            });
            snapshot.is_complete()
        };

        if complete {
            self.handle_completion(job_id).await;
        }
    }

    async fn handle_torrent_event(&self, event: TorrentEvent) {
        match event {
            TorrentEvent::Progress {
                torrent_id,
                snapshot,
            } => {
                if let Some(job_id) = self.live_job_for_torrent(&torrent_id).await {
                    self.apply_snapshot(&job_id, &torrent_id, snapshot).await;
                }
            }
            TorrentEvent::Completed { torrent_id } => {
                if let Some(job_id) = self.live_job_for_torrent(&torrent_id).await {
                    self.handle_completion(&job_id).await;
                }
            }
            TorrentEvent::Failed {
                torrent_id,
                message,
            } => {
                let mut jobs = self.jobs.lock().await;
                if let Some(job) = jobs.iter_mut().find(|j| {
                    j.status.holds_slot() && j.torrent_id.as_deref() == Some(torrent_id.as_str())
                }) {
                    self.fail_job(job, message);
                }
                self.admit(&mut jobs).await;
            }
        }
    }

    async fn live_job_for_torrent(&self, torrent_id: &str) -> Option<String> {
        self.jobs
            .lock()
            .await
            .iter()
            .find(|j| !j.status.is_terminal() && j.torrent_id.as_deref() == Some(torrent_id))
            .map(|j| j.id.clone())
    }

    async fn locate_download(&self, torrent_id: &str) -> Result<ActiveTorrent, String> {
        match self.client.list_active().await {
            Ok(torrents) => torrents
                .into_iter()
                .find(|t| t.id == torrent_id)
                .ok_or_else(|| format!("Torrent {} not found in daemon listing", torrent_id)),
            Err(e) => {
                self.record_rpc_error(&e);
                Err(format!("Failed to list daemon torrents: {}", e))
            }
        }
    }

    /// Organizes a finished download. Runs at most once per job: only a job
    /// still in `downloading` enters `organizing`.
    async fn handle_completion(&self, job_id: &str) {
        let (torrent_id, content) = {
            let mut jobs = self.jobs.lock().await;
            let Some(job) = find_mut(&mut jobs, job_id) else {
                return;
            };
            if job.status != JobStatus::Downloading {
                return;
            }
            let Some(torrent_id) = job.torrent_id.clone() else {
                return;
            };
            if job.transition(JobStatus::Organizing).is_err() {
                return;
            }
            job.progress = 1.0;
            job.eta_secs = None;
            let content = job.content.clone();

            info!(job_id = %job_id, torrent_id = %torrent_id, "Download complete, organizing");
            self.emit(DownloadEvent::JobOrganizing {
                job_id: job_id.to_string(),
            });
            self.admit(&mut jobs).await;
            (torrent_id, content)
        };

        let outcome = match self.locate_download(&torrent_id).await {
            Ok(torrent) => {
                let request = OrganizeRequest {
                    source: torrent.content_path(),
                    content,
                    torrent_name: torrent.name,
                };
                self.organizer
                    .organize(request)
                    .await
                    .map_err(|e| format!("Organize failed: {}", e))
            }
            Err(message) => Err(message),
        };

        let remove_torrent = {
            let mut jobs = self.jobs.lock().await;
            let Some(job) = find_mut(&mut jobs, job_id) else {
                warn!(job_id = %job_id, "Job cleared while organizing");
                return;
            };

            match outcome {
                Ok(files) if !files.is_empty() => {
                    let paths: Vec<PathBuf> = files.into_iter().map(|f| f.new_path).collect();
                    job.organized_files = paths.clone();
                    if job.transition(JobStatus::Completed).is_ok() {
                        info!(job_id = %job_id, files = paths.len(), "Download completed");
                        metrics::DOWNLOADS_COMPLETED.inc();
                        self.emit(DownloadEvent::JobCompleted {
                            job_id: job_id.to_string(),
                            organized_files: paths,
                        });
                        true
                    } else {
                        info!(
                            job_id = %job_id,
                            status = %job.status,
                            "Organized files recorded on finished job"
                        );
                        false
                    }
                }
                Ok(_) => {
                    self.fail_job(job, "Organizer produced no files");
                    false
                }
                Err(message) => {
                    self.fail_job(job, message);
                    false
                }
            }
        };

        if remove_torrent {
            if let Err(e) = self.client.remove(&torrent_id, false).await {
                self.record_rpc_error(&e);
                warn!(
                    job_id = %job_id,
                    torrent_id = %torrent_id,
                    error = %e,
                    "Failed to remove completed torrent from daemon"
                );
            }
        }
    }
}
