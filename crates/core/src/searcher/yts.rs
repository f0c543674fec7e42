//! YTS movie index.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderConfig, ProviderQuery, RawTorrentResult, SearchCategory, SearchError, SearchProvider};

const NAME: &str = "yts";

const TRACKERS: &[&str] = &[
    "udp://open.demonii.com:1337/announce",
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://tracker.openbittorrent.com:80",
];

/// YTS JSON API (`/api/v2/list_movies.json`). Movies only.
pub struct YtsProvider {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl YtsProvider {
    pub fn new(config: &ProviderConfig, timeout_secs: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SearchError::provider_failed(NAME, e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn build_search_url(&self, query: &ProviderQuery) -> String {
        format!(
            "{}/api/v2/list_movies.json?query_term={}&limit={}&sort_by=seeds",
            self.base_url,
            urlencoding::encode(&query.term),
            query.limit.min(50)
        )
    }
}

/// Magnet link for a YTS torrent hash.
fn build_magnet(hash: &str, name: &str) -> String {
    let mut magnet = format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        hash.to_lowercase(),
        urlencoding::encode(name)
    );
    for tracker in TRACKERS {
        magnet.push_str("&tr=");
        magnet.push_str(&urlencoding::encode(tracker));
    }
    magnet
}

#[derive(Debug, Deserialize)]
struct YtsResponse {
    status: String,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    data: Option<YtsData>,
}

#[derive(Debug, Deserialize)]
struct YtsData {
    #[serde(default)]
    movies: Vec<YtsMovie>,
}

#[derive(Debug, Deserialize)]
struct YtsMovie {
    title_long: String,
    #[serde(default)]
    torrents: Vec<YtsTorrent>,
}

#[derive(Debug, Deserialize)]
struct YtsTorrent {
    hash: String,
    quality: String,
    #[serde(rename = "type", default)]
    release_type: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default)]
    seeds: u32,
    #[serde(default)]
    peers: u32,
}

fn flatten(response: YtsResponse) -> Vec<RawTorrentResult> {
    let movies = response.data.map(|d| d.movies).unwrap_or_default();
    movies
        .into_iter()
        .flat_map(|movie| {
            let title_long = movie.title_long;
            movie.torrents.into_iter().map(move |t| {
                let title = if t.release_type.is_empty() {
                    format!("{} [{}] [YTS]", title_long, t.quality)
                } else {
                    format!("{} [{}] [{}] [YTS]", title_long, t.quality, t.release_type)
                };
                RawTorrentResult {
                    magnet_uri: Some(build_magnet(&t.hash, &title)),
                    torrent_url: None,
                    info_hash: Some(t.hash.to_lowercase()),
                    size_bytes: t.size_bytes,
                    size_text: t.size,
                    seeders: t.seeds,
                    leechers: t.peers,
                    provider: NAME.to_string(),
                    verified: true,
                    title,
                }
            })
        })
        .collect()
}

#[async_trait]
impl SearchProvider for YtsProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<RawTorrentResult>, SearchError> {
        if query.category != SearchCategory::Movies {
            return Ok(Vec::new());
        }

        let url = self.build_search_url(query);
        debug!(provider = NAME, term = %query.term, "Searching");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(NAME, e, self.timeout_secs))?;

        if !response.status().is_success() {
            return Err(SearchError::provider_failed(
                NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: YtsResponse = response
            .json()
            .await
            .map_err(|e| SearchError::provider_failed(NAME, format!("Failed to parse response: {}", e)))?;

        if body.status != "ok" {
            return Err(SearchError::provider_failed(NAME, body.status_message));
        }

        Ok(flatten(body))
    }
}
