pub mod config;
pub mod content;
pub mod manager;
pub mod metrics;
pub mod organizer;
pub mod searcher;
pub mod testing;
pub mod torrent_client;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LibraryConfig,
    SanitizedConfig, ServerConfig,
};
pub use content::{ContentDescriptor, ContentKind};
pub use manager::{
    DownloadEvent, DownloadJob, DownloadManager, JobStatus, ManagerConfig, ManagerError,
    ManagerStats,
};
pub use organizer::{
    FileOrganizer, LibraryLayout, OrganizeError, OrganizeRequest, OrganizedFile, Organizer,
    OrganizerConfig,
};
pub use searcher::{
    Quality, QualityPreference, SearchConfig, SearchError, SearchProvider, TorrentCandidate,
    TorrentSearchEngine,
};
pub use torrent_client::{
    create_torrent_client, ProgressSnapshot, TorrentClient, TorrentClientBackend,
    TorrentClientConfig, TorrentClientDetector, TorrentClientError, TorrentEvent, TorrentState,
};
