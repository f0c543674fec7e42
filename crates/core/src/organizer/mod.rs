//! Library organization.
//!
//! Turns a completed download plus its [`ContentDescriptor`] into the
//! canonical library layout: videos moved and renamed, subtitles copied,
//! one JSON metadata sidecar per content item.
//!
//! [`ContentDescriptor`]: crate::content::ContentDescriptor

mod config;
mod error;
mod fs_organizer;
mod layout;
pub mod naming;
mod traits;
mod types;

pub use config::OrganizerConfig;
pub use error::OrganizeError;
pub use fs_organizer::FileOrganizer;
pub use layout::LibraryLayout;
pub use naming::sanitize;
pub use traits::Organizer;
pub use types::*;
