//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the core's external seams
//! (torrent daemon, search providers, library organizer), allowing the
//! download manager and HTTP surface to be tested without real
//! infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use niluflix_core::testing::{candidate, MockOrganizer, MockTorrentClient};
//!
//! let client = Arc::new(MockTorrentClient::new());
//! let organizer = Arc::new(MockOrganizer::new());
//!
//! // Pre-supplied candidates skip the search.
//! let id = manager
//!     .add_download(content, Some(vec![candidate("Inception 2010 1080p", "aa11")]))
//!     .await?;
//! client.set_progress("aa11", 1.0).await;
//! manager.poll_once().await;
//! ```

mod mock_organizer;
mod mock_provider;
mod mock_torrent_client;

pub use fixtures::{candidate, raw_result};
pub use mock_organizer::MockOrganizer;
pub use mock_provider::MockProvider;
pub use mock_torrent_client::{MockTorrentClient, RecordedStart};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::searcher::{scoring, RawTorrentResult, TorrentCandidate};

    /// A raw provider result with just the fields the engine cares about.
    pub fn raw_result(title: &str, seeders: u32, magnet: Option<&str>) -> RawTorrentResult {
        RawTorrentResult {
            title: title.to_string(),
            magnet_uri: magnet.map(str::to_string),
            seeders,
            provider: "mock".to_string(),
            ..Default::default()
        }
    }

    /// A scored candidate whose link is a magnet for `info_hash`.
    pub fn candidate(title: &str, info_hash: &str) -> TorrentCandidate {
        let seeders = 50;
        let size = "2.0 GB".to_string();
        TorrentCandidate {
            title: title.to_string(),
            link: format!("magnet:?xt=urn:btih:{}", info_hash),
            quality: scoring::detect_quality(title),
            score: scoring::score_candidate(title, seeders, &size, Default::default()),
            size,
            seeders,
            leechers: 10,
            provider: "mock".to_string(),
            verified: false,
            info_hash: Some(info_hash.to_lowercase()),
        }
    }

    /// A 1080p movie candidate.
    pub fn movie_candidate(title: &str, year: u16, info_hash: &str) -> TorrentCandidate {
        candidate(&format!("{} {} 1080p BluRay", title, year), info_hash)
    }
}
