//! File system organizer implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info, warn};

use super::config::OrganizerConfig;
use super::error::OrganizeError;
use super::layout::LibraryLayout;
use super::naming;
use super::traits::Organizer;
use super::types::{
    OrganizeRequest, OrganizedFile, RollbackAction, RollbackPlan, RollbackResult, SidecarMetadata,
};
use crate::metrics;

/// A video found in a download, with its size.
#[derive(Debug, Clone)]
struct VideoFile {
    path: PathBuf,
    size: u64,
}

/// Everything of interest found under a download path.
#[derive(Debug, Default)]
struct SourceFiles {
    /// Largest first, ties by path.
    videos: Vec<VideoFile>,
    subtitles: Vec<PathBuf>,
    /// Subdirectories below the source, excluding the source itself.
    directories: Vec<PathBuf>,
    source_is_dir: bool,
}

/// Organizes downloads into a [`LibraryLayout`] on the local file system.
pub struct FileOrganizer {
    layout: LibraryLayout,
    config: OrganizerConfig,
}

impl FileOrganizer {
    pub fn new(layout: LibraryLayout, config: OrganizerConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    /// Rename, falling back to copy + delete across file systems.
    async fn move_file(source: &Path, destination: &Path) -> Result<(), OrganizeError> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(()),
            // Cross-filesystem moves fail with EXDEV (18 on Linux)
            Err(e)
                if e.kind() == std::io::ErrorKind::CrossesDevices
                    || e.raw_os_error() == Some(18) =>
            {
                fs::copy(source, destination).await.map_err(|e| {
                    OrganizeError::move_failed(source.to_path_buf(), destination.to_path_buf(), e)
                })?;
                if let Err(e) = fs::remove_file(source).await {
                    let _ = fs::remove_file(destination).await;
                    return Err(OrganizeError::move_failed(
                        source.to_path_buf(),
                        destination.to_path_buf(),
                        e,
                    ));
                }
                Ok(())
            }
            Err(e) => Err(OrganizeError::move_failed(
                source.to_path_buf(),
                destination.to_path_buf(),
                e,
            )),
        }
    }

    /// Walks the download, collecting videos and subtitles at any depth.
    async fn scan(source: &Path) -> Result<SourceFiles, OrganizeError> {
        let meta = fs::metadata(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OrganizeError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                OrganizeError::Io(e)
            }
        })?;

        let mut files = SourceFiles::default();

        if meta.is_file() {
            if naming::is_video(source) {
                files.videos.push(VideoFile {
                    path: source.to_path_buf(),
                    size: meta.len(),
                });
            }
            return Ok(files);
        }

        files.source_is_dir = true;
        let mut pending = vec![source.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    files.directories.push(path.clone());
                    pending.push(path);
                } else if file_type.is_file() {
                    if naming::is_video(&path) {
                        let size = entry.metadata().await?.len();
                        files.videos.push(VideoFile { path, size });
                    } else if naming::is_subtitle(&path) {
                        files.subtitles.push(path);
                    }
                }
            }
        }

        files
            .videos
            .sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        files.subtitles.sort();
        Ok(files)
    }

    /// Creates `dir` and records every directory that did not exist before.
    async fn ensure_dir(dir: &Path, plan: &mut RollbackPlan) -> Result<(), OrganizeError> {
        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(path) = current {
            if fs::try_exists(path).await? {
                break;
            }
            missing.push(path.to_path_buf());
            current = path.parent();
        }
        if missing.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(dir)
            .await
            .map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;

        for created in missing.into_iter().rev() {
            plan.record_directory(created);
        }
        Ok(())
    }

    /// First free path among `path`, `path (1)`, `path (2)`, ...
    async fn unique_destination(path: PathBuf) -> Result<PathBuf, OrganizeError> {
        if !fs::try_exists(&path).await? {
            return Ok(path);
        }
        let mut n = 1;
        loop {
            let candidate = naming::with_collision_suffix(&path, n);
            if !fs::try_exists(&candidate).await? {
                warn!(
                    wanted = %path.display(),
                    using = %candidate.display(),
                    "Destination exists, using suffixed name"
                );
                return Ok(candidate);
            }
            n += 1;
        }
    }

    async fn write_sidecar(
        target_dir: &Path,
        primary: &OrganizedFile,
        plan: &mut RollbackPlan,
    ) -> Result<PathBuf, OrganizeError> {
        let path = target_dir.join(naming::sidecar_file_name(&primary.new_path));
        let body = serde_json::to_vec_pretty(&primary.metadata).map_err(|e| {
            OrganizeError::SidecarFailed {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;

        let existed = fs::try_exists(&path).await?;
        fs::write(&path, body)
            .await
            .map_err(|e| OrganizeError::SidecarFailed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if !existed {
            plan.record_created_file(path.clone());
        }
        debug!(path = %path.display(), "Wrote metadata sidecar");
        Ok(path)
    }

    /// Moves videos, copies subtitles and writes the sidecar, recording each
    /// change in `plan`.
    async fn run(
        &self,
        request: &OrganizeRequest,
        files: &SourceFiles,
        plan: &mut RollbackPlan,
    ) -> Result<Vec<OrganizedFile>, OrganizeError> {
        let max_len = self.config.max_name_len;
        let target_dir = self.layout.target_dir(&request.content, max_len);
        Self::ensure_dir(&target_dir, plan).await?;

        let multi_file = files.videos.len() > 1;
        let mut organized = Vec::with_capacity(files.videos.len());

        for video in &files.videos {
            let name = naming::video_file_name(&request.content, &video.path, multi_file, max_len);
            let destination = Self::unique_destination(target_dir.join(name)).await?;

            Self::move_file(&video.path, &destination).await?;
            plan.record_move(video.path.clone(), destination.clone());
            info!(
                from = %video.path.display(),
                to = %destination.display(),
                "Moved file"
            );

            organized.push(OrganizedFile {
                original_path: video.path.clone(),
                metadata: SidecarMetadata::for_file(
                    &request.content,
                    destination.clone(),
                    video.size,
                    &request.torrent_name,
                ),
                new_path: destination,
            });
        }

        for subtitle in &files.subtitles {
            let Some(name) = subtitle.file_name() else {
                continue;
            };
            let destination = Self::unique_destination(target_dir.join(name)).await?;
            fs::copy(subtitle, &destination).await.map_err(|e| {
                OrganizeError::copy_failed(subtitle.clone(), destination.clone(), e)
            })?;
            plan.record_created_file(destination.clone());
            debug!(to = %destination.display(), "Copied subtitle");
        }

        if let Some(primary) = organized.first() {
            Self::write_sidecar(&target_dir, primary, plan).await?;
        }

        Ok(organized)
    }

    /// Removes directories of the download that are now empty, deepest
    /// first. The downloads root itself is never removed.
    async fn cleanup_source(&self, source: &Path, files: &SourceFiles) {
        if !files.source_is_dir || source == self.layout.downloads_dir() {
            return;
        }

        let mut dirs = files.directories.clone();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        dirs.push(source.to_path_buf());

        for dir in dirs {
            match remove_dir_if_empty(&dir).await {
                Ok(true) => debug!(path = %dir.display(), "Removed empty directory"),
                Ok(false) => debug!(path = %dir.display(), "Directory not empty, keeping"),
                Err(e) => debug!(path = %dir.display(), error = %e, "Failed to clean up directory"),
            }
        }
    }

    /// Undoes the changes recorded in `plan`, newest first. Best effort:
    /// individual failures are collected, not propagated.
    pub async fn rollback(&self, plan: RollbackPlan) -> RollbackResult {
        let mut result = RollbackResult::default();

        for action in plan.actions.iter().rev() {
            match action {
                RollbackAction::Moved { from, to } => match Self::move_file(to, from).await {
                    Ok(()) => result.files_restored += 1,
                    Err(e) => result.errors.push(e.to_string()),
                },
                RollbackAction::Created(path) => match fs::remove_file(path).await {
                    Ok(()) => result.files_removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => result
                        .errors
                        .push(format!("Failed to remove {}: {}", path.display(), e)),
                },
            }
        }

        for dir in plan.created_directories.iter().rev() {
            match remove_dir_if_empty(dir).await {
                Ok(true) => result.directories_removed += 1,
                Ok(false) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => result
                    .errors
                    .push(format!("Failed to remove directory {}: {}", dir.display(), e)),
            }
        }

        result
    }
}

/// Removes `dir` only when it has no entries. Returns whether it was removed.
async fn remove_dir_if_empty(dir: &Path) -> Result<bool, std::io::Error> {
    let mut entries = fs::read_dir(dir).await?;
    if entries.next_entry().await?.is_some() {
        return Ok(false);
    }
    fs::remove_dir(dir).await?;
    Ok(true)
}

#[async_trait]
impl Organizer for FileOrganizer {
    fn name(&self) -> &str {
        "fs"
    }

    async fn organize(&self, request: OrganizeRequest) -> Result<Vec<OrganizedFile>, OrganizeError> {
        let start = Instant::now();
        info!(
            torrent = %request.torrent_name,
            content = %request.content.label(),
            "Organizing download"
        );

        let files = Self::scan(&request.source).await?;
        if files.videos.is_empty() {
            return Err(OrganizeError::NoVideoFiles {
                path: request.source.clone(),
            });
        }

        let mut plan = RollbackPlan::new(request.torrent_name.clone());
        let organized = match self.run(&request, &files, &mut plan).await {
            Ok(organized) => organized,
            Err(e) => {
                if self.config.rollback_on_failure && plan.has_changes() {
                    let result = self.rollback(plan).await;
                    if result.success() {
                        info!(
                            torrent = %request.torrent_name,
                            restored = result.files_restored,
                            "Rolled back partial organize"
                        );
                    } else {
                        warn!(
                            torrent = %request.torrent_name,
                            errors = ?result.errors,
                            "Rollback incomplete"
                        );
                    }
                }
                return Err(e);
            }
        };

        self.cleanup_source(&request.source, &files).await;

        metrics::ORGANIZE_DURATION.observe(start.elapsed().as_secs_f64());
        info!(
            torrent = %request.torrent_name,
            files = organized.len(),
            "Organized download"
        );
        Ok(organized)
    }
}
