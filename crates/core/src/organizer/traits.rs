//! Trait definitions for the organizer module.

use async_trait::async_trait;

use super::error::OrganizeError;
use super::types::{OrganizeRequest, OrganizedFile};

/// Moves a completed download into the media library.
#[async_trait]
pub trait Organizer: Send + Sync {
    /// Returns the name of this organizer implementation.
    fn name(&self) -> &str;

    /// Organizes every video of the download, returning one entry per video
    /// in library order (largest first).
    async fn organize(&self, request: OrganizeRequest) -> Result<Vec<OrganizedFile>, OrganizeError>;
}
