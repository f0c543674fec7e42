//! Torrent search.
//!
//! Providers (YTS, apibay, Jackett) implement [`SearchProvider`]; the
//! [`TorrentSearchEngine`] fans a request out over every enabled provider and
//! ranks the merged results with the heuristic in [`scoring`].

mod apibay;
mod config;
mod engine;
mod jackett;
pub mod scoring;
mod types;
mod yts;

pub use apibay::ApibayProvider;
pub use config::{JackettConfig, ProviderConfig, SearchConfig};
pub use engine::{build_search_terms, SearchRequest, TorrentSearchEngine};
pub use jackett::JackettProvider;
pub use scoring::rank_candidates;
pub use types::*;
pub use yts::YtsProvider;
