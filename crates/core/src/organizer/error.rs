//! Error types for the organizer module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while organizing a completed download.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The download contains no recognizable video file.
    #[error("No video files found in {path}")]
    NoVideoFiles { path: PathBuf },

    /// The download path does not exist.
    #[error("Download not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Failed to create a library directory.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move a video into the library.
    #[error("Failed to move file from {source} to {destination}")]
    MoveFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to copy a subtitle into the library.
    #[error("Failed to copy file from {source} to {destination}")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write the metadata sidecar.
    #[error("Failed to write metadata sidecar {path}: {reason}")]
    SidecarFailed { path: PathBuf, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrganizeError {
    /// Creates a move failed error.
    pub fn move_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::MoveFailed {
            source,
            destination,
            error,
        }
    }

    /// Creates a copy failed error.
    pub fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed {
            source,
            destination,
            error,
        }
    }
}
