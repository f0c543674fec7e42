//! Types for the organizer module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::content::{ContentDescriptor, ContentKind};

/// A completed download to be moved into the library.
#[derive(Debug, Clone)]
pub struct OrganizeRequest {
    /// `<daemon download dir>/<torrent name>`; a single file or a directory.
    pub source: PathBuf,
    pub content: ContentDescriptor,
    /// Release name as reported by the daemon.
    pub torrent_name: String,
}

/// Metadata sidecar record written next to organized videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidecarMetadata {
    pub tmdb_id: Option<u64>,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tv_show_name: Option<String>,
    pub downloaded_at: DateTime<Utc>,
    pub file_size: u64,
    pub file_path: PathBuf,
    pub original_torrent_name: String,
}

impl SidecarMetadata {
    /// Builds the record for one organized file.
    pub fn for_file(
        content: &ContentDescriptor,
        file_path: PathBuf,
        file_size: u64,
        torrent_name: &str,
    ) -> Self {
        Self {
            tmdb_id: content.tmdb_id,
            title: content.title.clone(),
            kind: content.kind,
            year: content.year,
            season_number: content.season,
            episode_number: content.episode,
            tv_show_name: content.tv_show_name.clone(),
            downloaded_at: Utc::now(),
            file_size,
            file_path,
            original_torrent_name: torrent_name.to_string(),
        }
    }
}

/// One video file after organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizedFile {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
    pub metadata: SidecarMetadata,
}

/// A filesystem change that rollback can undo.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackAction {
    /// A file moved from `from` to `to`; undone by moving it back.
    Moved { from: PathBuf, to: PathBuf },
    /// A file created by the organizer; undone by deleting it.
    Created(PathBuf),
}

/// Record of changes made during one organize run.
#[derive(Debug, Clone)]
pub struct RollbackPlan {
    /// Release name, for logging.
    pub torrent_name: String,
    /// File changes in the order they happened.
    pub actions: Vec<RollbackAction>,
    /// Directories that were created, parents first.
    pub created_directories: Vec<PathBuf>,
}

impl RollbackPlan {
    /// Creates a new empty rollback plan.
    pub fn new(torrent_name: impl Into<String>) -> Self {
        Self {
            torrent_name: torrent_name.into(),
            actions: Vec::new(),
            created_directories: Vec::new(),
        }
    }

    pub fn record_move(&mut self, from: PathBuf, to: PathBuf) {
        self.actions.push(RollbackAction::Moved { from, to });
    }

    pub fn record_created_file(&mut self, path: PathBuf) {
        self.actions.push(RollbackAction::Created(path));
    }

    pub fn record_directory(&mut self, path: PathBuf) {
        self.created_directories.push(path);
    }

    /// Returns true if there's anything to roll back.
    pub fn has_changes(&self) -> bool {
        !self.actions.is_empty() || !self.created_directories.is_empty()
    }
}

/// Outcome of a rollback.
#[derive(Debug, Clone, Default)]
pub struct RollbackResult {
    pub files_restored: usize,
    pub files_removed: usize,
    pub directories_removed: usize,
    pub errors: Vec<String>,
}

impl RollbackResult {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_plan_record() {
        let mut plan = RollbackPlan::new("Some.Release");
        assert!(!plan.has_changes());

        plan.record_directory(PathBuf::from("/lib/Movies/X"));
        plan.record_move(PathBuf::from("/dl/x.mkv"), PathBuf::from("/lib/Movies/X/X.mkv"));
        plan.record_created_file(PathBuf::from("/lib/Movies/X/X.metadata.json"));

        assert!(plan.has_changes());
        assert_eq!(plan.actions.len(), 2);
        assert!(matches!(plan.actions[1], RollbackAction::Created(_)));
    }

    #[test]
    fn test_sidecar_serializes_camel_case() {
        let content = ContentDescriptor::episode("Breaking Bad", 1, 1).with_tmdb_id(1396);
        let meta = SidecarMetadata::for_file(
            &content,
            PathBuf::from("/lib/TV Shows/Breaking Bad/Season 01/Breaking Bad S01E01.mkv"),
            1024,
            "Breaking.Bad.S01E01.720p",
        );
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["tmdbId"], 1396);
        assert_eq!(json["type"], "episode");
        assert_eq!(json["seasonNumber"], 1);
        assert_eq!(json["episodeNumber"], 1);
        assert_eq!(json["tvShowName"], "Breaking Bad");
        assert_eq!(json["fileSize"], 1024);
        assert_eq!(json["originalTorrentName"], "Breaking.Bad.S01E01.720p");
        assert!(json.get("year").is_none());
        assert!(json.get("downloadedAt").is_some());
    }
}
