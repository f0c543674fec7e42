//! The Pirate Bay JSON API (apibay).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderConfig, ProviderQuery, RawTorrentResult, SearchCategory, SearchError, SearchProvider};

const NAME: &str = "apibay";

/// apibay answers an empty search with a single all-zero hash row.
const EMPTY_HASH: &str = "0000000000000000000000000000000000000000";

/// apibay search provider (`/q.php`).
pub struct ApibayProvider {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl ApibayProvider {
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
            "{}/q.php?q={}&cat={}",
            self.base_url,
            urlencoding::encode(&query.term),
            category_to_apibay_id(query.category)
        )
    }
}

/// TPB category ids: 201 movies, 205 TV shows.
fn category_to_apibay_id(category: SearchCategory) -> u32 {
    match category {
        SearchCategory::Movies => 201,
        SearchCategory::Tv => 205,
    }
}

/// apibay encodes every number as a string.
#[derive(Debug, Deserialize)]
struct ApibayRow {
    name: String,
    info_hash: String,
    #[serde(default)]
    seeders: String,
    #[serde(default)]
    leechers: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    status: String,
}

impl ApibayRow {
    fn into_raw(self) -> Option<RawTorrentResult> {
        if self.info_hash.is_empty() || self.info_hash == EMPTY_HASH {
            return None;
        }
        let hash = self.info_hash.to_lowercase();
        let magnet = format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            hash,
            urlencoding::encode(&self.name)
        );
        Some(RawTorrentResult {
            magnet_uri: Some(magnet),
            torrent_url: None,
            info_hash: Some(hash),
            size_bytes: self.size.parse().ok(),
            size_text: None,
            seeders: self.seeders.parse().unwrap_or(0),
            leechers: self.leechers.parse().unwrap_or(0),
            provider: NAME.to_string(),
            verified: matches!(self.status.as_str(), "vip" | "trusted"),
            title: self.name,
        })
    }
}

#[async_trait]
impl SearchProvider for ApibayProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<RawTorrentResult>, SearchError> {
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

        let rows: Vec<ApibayRow> = response
            .json()
            .await
            .map_err(|e| SearchError::provider_failed(NAME, format!("Failed to parse response: {}", e)))?;

        Ok(rows
            .into_iter()
            .filter_map(ApibayRow::into_raw)
            .take(query.limit)
            .collect())
    }
}
