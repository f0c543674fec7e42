//! Library directory layout.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::error::OrganizeError;
use super::naming;
use crate::content::{ContentDescriptor, ContentKind};

/// Fixed subfolders under the library base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    base: PathBuf,
}

impl LibraryLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn movies_dir(&self) -> PathBuf {
        self.base.join("Movies")
    }

    pub fn tv_dir(&self) -> PathBuf {
        self.base.join("TV Shows")
    }

    /// Where the torrent daemon is told to download.
    pub fn downloads_dir(&self) -> PathBuf {
        self.base.join("Downloads")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.base.join(".metadata")
    }

    /// Target directory for a piece of content.
    pub fn target_dir(&self, content: &ContentDescriptor, max_name_len: usize) -> PathBuf {
        let root = match content.kind {
            ContentKind::Movie => self.movies_dir(),
            ContentKind::Episode => self.tv_dir(),
        };
        root.join(naming::content_dir(content, max_name_len))
    }

    /// Creates the base directory and every fixed subfolder.
    pub async fn ensure_directories(&self) -> Result<(), OrganizeError> {
        for dir in [
            self.base.clone(),
            self.movies_dir(),
            self.tv_dir(),
            self.downloads_dir(),
            self.metadata_dir(),
        ] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| OrganizeError::DirectoryCreationFailed {
                    path: dir.clone(),
                    source: e,
                })?;
            debug!(path = %dir.display(), "Ensured directory exists");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_target_dirs() {
        let layout = LibraryLayout::new("/media/NiluFlix");

        let movie = ContentDescriptor::movie("The Matrix", Some(1999));
        assert_eq!(
            layout.target_dir(&movie, 200),
            PathBuf::from("/media/NiluFlix/Movies/The Matrix (1999)")
        );

        let ep = ContentDescriptor::episode("Breaking Bad", 2, 3);
        assert_eq!(
            layout.target_dir(&ep, 200),
            PathBuf::from("/media/NiluFlix/TV Shows/Breaking Bad/Season 02")
        );
    }

    #[tokio::test]
    async fn test_ensure_directories() {
        let temp = TempDir::new().unwrap();
        let layout = LibraryLayout::new(temp.path().join("lib"));

        layout.ensure_directories().await.unwrap();
        // Idempotent.
        layout.ensure_directories().await.unwrap();

        assert!(layout.movies_dir().is_dir());
        assert!(layout.tv_dir().is_dir());
        assert!(layout.downloads_dir().is_dir());
        assert!(layout.metadata_dir().is_dir());
    }
}
