//! Download manager - the job queue between "user picked a title" and
//! "file sits in the library".
//!
//! A job is created per request, admitted to the torrent daemon under a
//! concurrency limit, tracked until the daemon reports completion, and then
//! handed to the organizer.

mod config;
mod events;
mod runner;
mod types;

pub use config::ManagerConfig;
pub use events::DownloadEvent;
pub use runner::DownloadManager;
pub use types::{DownloadJob, JobStatus, ManagerError, ManagerStats};
