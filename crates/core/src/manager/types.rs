//! Types for the download manager.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::content::ContentDescriptor;
use crate::searcher::TorrentCandidate;
use crate::torrent_client::{ProgressSnapshot, TorrentClientError};

/// Lifecycle state of a download job.
///
/// ```text
/// queued -> downloading -> organizing -> completed
///              ^    |
///              |    v
///              paused
/// ```
///
/// Any non-terminal state may also move to `failed` or `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Paused,
    Organizing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Queued,
        JobStatus::Downloading,
        JobStatus::Paused,
        JobStatus::Organizing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Paused => "paused",
            JobStatus::Organizing => "organizing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the job occupies an admission slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, JobStatus::Downloading | JobStatus::Paused)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Queued, Downloading)
            | (Downloading, Paused)
            | (Paused, Downloading)
            | (Downloading, Organizing)
            | (Organizing, Completed) => true,
            (from, Failed | Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status: {}", s))
    }
}

/// One download request and its full lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadJob {
    pub id: String,
    pub content: ContentDescriptor,
    /// Selected candidate; absent only when the search found nothing.
    pub candidate: Option<TorrentCandidate>,
    pub status: JobStatus,
    /// Fraction in `[0, 1]`, never decreasing.
    pub progress: f64,
    pub download_speed: u64,
    pub upload_speed: u64,
    pub eta_secs: Option<u64>,
    /// Daemon handle, set on admission.
    pub torrent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub organized_files: Vec<PathBuf>,
    pub error_message: Option<String>,
}

impl DownloadJob {
    pub fn new(content: ContentDescriptor, candidate: Option<TorrentCandidate>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            candidate,
            status: JobStatus::Queued,
            progress: 0.0,
            download_speed: 0,
            upload_speed: 0,
            eta_secs: None,
            torrent_id: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            organized_files: Vec::new(),
            error_message: None,
        }
    }

    /// Moves to `next` if the state machine allows it.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), ManagerError> {
        if !self.status.can_transition_to(next) {
            return Err(ManagerError::InvalidTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        if !matches!(next, JobStatus::Downloading) {
            self.download_speed = 0;
            self.upload_speed = 0;
        }
        Ok(())
    }

    /// Copies rates and ETA from a snapshot. Progress only moves forward.
    pub fn apply_snapshot(&mut self, snapshot: &ProgressSnapshot) {
        let percent = snapshot.percent_done.clamp(0.0, 1.0);
        if percent > self.progress {
            self.progress = percent;
        }
        self.download_speed = snapshot.download_speed;
        self.upload_speed = snapshot.upload_speed;
        self.eta_secs = snapshot.eta_secs;
    }
}

/// Aggregate view over the job table, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerStats {
    pub total_jobs: usize,
    pub queued: usize,
    pub downloading: usize,
    pub paused: usize,
    pub organizing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Summed over downloading jobs, bytes/s.
    pub total_download_speed: u64,
    pub total_upload_speed: u64,
}

impl ManagerStats {
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a DownloadJob>) -> Self {
        let mut stats = ManagerStats::default();
        for job in jobs {
            stats.total_jobs += 1;
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Downloading => {
                    stats.downloading += 1;
                    stats.total_download_speed += job.download_speed;
                    stats.total_upload_speed += job.upload_speed;
                }
                JobStatus::Paused => stats.paused += 1,
                JobStatus::Organizing => stats.organizing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

/// Errors returned by download manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("job not found: {0}")]
    JobNotFound(String),

    #[error("invalid transition for job {job_id}: {from} -> {to}")]
    InvalidTransition {
        job_id: String,
        from: JobStatus,
        to: JobStatus,
    },

    /// The job was recorded as failed and can be inspected by id.
    #[error("no candidates found for job {job_id}")]
    NoCandidatesFound { job_id: String },

    #[error("job {0} has no torrent in the daemon")]
    NotAdmitted(String),

    #[error("search error: {0}")]
    Search(#[from] crate::searcher::SearchError),

    #[error("torrent client error: {0}")]
    TorrentClient(#[from] TorrentClientError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::torrent_client::TorrentState;

    fn snapshot(percent_done: f64) -> ProgressSnapshot {
        ProgressSnapshot {
            percent_done,
            download_speed: 1000,
            upload_speed: 10,
            eta_secs: Some(60),
            status: TorrentState::Downloading,
            downloaded_bytes: 0,
            total_bytes: 0,
            seeders: 0,
            leechers: 0,
            error_message: None,
        }
    }

    #[test]
    fn test_forward_transitions() {
        use JobStatus::*;
        assert!(Queued.can_transition_to(Downloading));
        assert!(Downloading.can_transition_to(Paused));
        assert!(Paused.can_transition_to(Downloading));
        assert!(Downloading.can_transition_to(Organizing));
        assert!(Organizing.can_transition_to(Completed));
    }

    #[test]
    fn test_illegal_transitions() {
        use JobStatus::*;
        assert!(!Completed.can_transition_to(Downloading));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Queued));
        assert!(!Queued.can_transition_to(Organizing));
        assert!(!Paused.can_transition_to(Organizing));
        assert!(!Organizing.can_transition_to(Downloading));
        assert!(!Downloading.can_transition_to(Queued));
    }

    #[test]
    fn test_any_live_state_can_fail_or_cancel() {
        for status in JobStatus::ALL {
            let live = !status.is_terminal();
            assert_eq!(status.can_transition_to(JobStatus::Failed), live, "{status}");
            assert_eq!(status.can_transition_to(JobStatus::Cancelled), live, "{status}");
        }
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_transition_records_completion_time() {
        let mut job = DownloadJob::new(ContentDescriptor::movie("Inception", Some(2010)), None);
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.completed_at.is_none());

        job.transition(JobStatus::Failed).unwrap();
        assert!(job.completed_at.is_some());

        let err = job.transition(JobStatus::Downloading).unwrap_err();
        assert!(matches!(err, ManagerError::InvalidTransition { .. }));
        assert_eq!(err.to_string(), format!("invalid transition for job {}: failed -> downloading", job.id));
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let mut job = DownloadJob::new(ContentDescriptor::movie("Inception", Some(2010)), None);

        job.apply_snapshot(&snapshot(0.4));
        assert_eq!(job.progress, 0.4);

        job.apply_snapshot(&snapshot(0.2));
        assert_eq!(job.progress, 0.4);
        assert_eq!(job.download_speed, 1000);

        job.apply_snapshot(&snapshot(1.7));
        assert_eq!(job.progress, 1.0);
    }

    #[test]
    fn test_stats_from_jobs() {
        let mut a = DownloadJob::new(ContentDescriptor::movie("A", None), None);
        a.status = JobStatus::Downloading;
        a.download_speed = 100;
        a.upload_speed = 5;
        let mut b = DownloadJob::new(ContentDescriptor::movie("B", None), None);
        b.status = JobStatus::Downloading;
        b.download_speed = 50;
        let mut c = DownloadJob::new(ContentDescriptor::movie("C", None), None);
        c.status = JobStatus::Paused;
        c.download_speed = 999;
        let d = DownloadJob::new(ContentDescriptor::movie("D", None), None);

        let stats = ManagerStats::from_jobs([&a, &b, &c, &d]);
        assert_eq!(stats.total_jobs, 4);
        assert_eq!(stats.downloading, 2);
        assert_eq!(stats.paused, 1);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.total_download_speed, 150);
        assert_eq!(stats.total_upload_speed, 5);
    }

    #[test]
    fn test_job_ids_are_unique() {
        let a = DownloadJob::new(ContentDescriptor::movie("A", None), None);
        let b = DownloadJob::new(ContentDescriptor::movie("A", None), None);
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }
}
