//! Mock organizer for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::organizer::{OrganizeError, OrganizeRequest, OrganizedFile, Organizer, SidecarMetadata};

/// Mock implementation of the Organizer trait.
///
/// Touches no files: every request "organizes" to
/// `<library>/<torrent name>.mkv`, or fails with `NoVideoFiles` when told to.
#[derive(Debug)]
pub struct MockOrganizer {
    library: PathBuf,
    requests: RwLock<Vec<OrganizeRequest>>,
    fail: AtomicBool,
    delay: Option<Duration>,
}

impl Default for MockOrganizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOrganizer {
    pub fn new() -> Self {
        Self {
            library: PathBuf::from("/mock/library"),
            requests: RwLock::new(Vec::new()),
            fail: AtomicBool::new(false),
            delay: None,
        }
    }

    /// Every organize sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes subsequent organize calls fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<OrganizeRequest> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl Organizer for MockOrganizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn organize(&self, request: OrganizeRequest) -> Result<Vec<OrganizedFile>, OrganizeError> {
        self.requests.write().await.push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(OrganizeError::NoVideoFiles {
                path: request.source,
            });
        }

        let new_path = self.library.join(format!("{}.mkv", request.torrent_name));
        Ok(vec![OrganizedFile {
            metadata: SidecarMetadata::for_file(
                &request.content,
                new_path.clone(),
                0,
                &request.torrent_name,
            ),
            original_path: request.source,
            new_path,
        }])
    }
}
