//! Job lifecycle events.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::types::DownloadJob;

/// Notification broadcast on every job state change and progress update.
///
/// Serialized with a `type` tag so UIs can switch on it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    JobAdded {
        job: Box<DownloadJob>,
    },
    JobStarted {
        job_id: String,
        torrent_id: String,
    },
    JobProgress {
        job_id: String,
        progress: f64,
        download_speed: u64,
        upload_speed: u64,
        eta_secs: Option<u64>,
    },
    JobPaused {
        job_id: String,
    },
    JobResumed {
        job_id: String,
    },
    JobOrganizing {
        job_id: String,
    },
    JobCompleted {
        job_id: String,
        organized_files: Vec<PathBuf>,
    },
    JobFailed {
        job_id: String,
        error: String,
    },
    JobCancelled {
        job_id: String,
    },
    JobsCleared {
        job_ids: Vec<String>,
    },
}

impl DownloadEvent {
    /// The job this event is about, if it concerns a single job.
    pub fn job_id(&self) -> Option<&str> {
        match self {
            DownloadEvent::JobAdded { job } => Some(&job.id),
            DownloadEvent::JobStarted { job_id, .. }
            | DownloadEvent::JobProgress { job_id, .. }
            | DownloadEvent::JobPaused { job_id }
            | DownloadEvent::JobResumed { job_id }
            | DownloadEvent::JobOrganizing { job_id }
            | DownloadEvent::JobCompleted { job_id, .. }
            | DownloadEvent::JobFailed { job_id, .. }
            | DownloadEvent::JobCancelled { job_id } => Some(job_id),
            DownloadEvent::JobsCleared { .. } => None,
        }
    }

    /// The serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadEvent::JobAdded { .. } => "JobAdded",
            DownloadEvent::JobStarted { .. } => "JobStarted",
            DownloadEvent::JobProgress { .. } => "JobProgress",
            DownloadEvent::JobPaused { .. } => "JobPaused",
            DownloadEvent::JobResumed { .. } => "JobResumed",
            DownloadEvent::JobOrganizing { .. } => "JobOrganizing",
            DownloadEvent::JobCompleted { .. } => "JobCompleted",
            DownloadEvent::JobFailed { .. } => "JobFailed",
            DownloadEvent::JobCancelled { .. } => "JobCancelled",
            DownloadEvent::JobsCleared { .. } => "JobsCleared",
        }
    }
}
