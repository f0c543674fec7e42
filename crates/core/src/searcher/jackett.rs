//! Jackett search backend implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{JackettConfig, ProviderQuery, RawTorrentResult, SearchCategory, SearchError, SearchProvider};

const NAME: &str = "jackett";

/// Jackett aggregate search across all configured indexers.
pub struct JackettProvider {
    client: Client,
    config: JackettConfig,
    timeout_secs: u64,
}

impl JackettProvider {
    /// Create a new JackettProvider with the given configuration.
    pub fn new(config: JackettConfig, timeout_secs: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SearchError::provider_failed(NAME, e.to_string()))?;

        Ok(Self {
            client,
            config,
            timeout_secs,
        })
    }

    /// Build the Jackett API URL for a search.
    fn build_search_url(&self, query: &ProviderQuery) -> String {
        let mut url = format!(
            "{}/api/v2.0/indexers/all/results?apikey={}&Query={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(&query.term)
        );

        for cat_id in category_to_jackett_ids(query.category) {
            url.push_str(&format!("&Category[]={}", cat_id));
        }

        url
    }
}

/// Map our categories to Jackett category IDs.
fn category_to_jackett_ids(cat: SearchCategory) -> Vec<i32> {
    match cat {
        SearchCategory::Movies => vec![2000],
        SearchCategory::Tv => vec![5000],
    }
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    Seeders: Option<i32>,
    Peers: Option<i32>,
}

impl JackettResult {
    fn into_raw(self) -> RawTorrentResult {
        let seeders = self.Seeders.unwrap_or(0).max(0);
        RawTorrentResult {
            title: self.Title,
            magnet_uri: self.MagnetUri,
            torrent_url: self.Link,
            info_hash: self.InfoHash.map(|h| h.to_lowercase()),
            size_bytes: self.Size.filter(|s| *s > 0).map(|s| s as u64),
            size_text: None,
            seeders: seeders as u32,
            leechers: self.Peers.unwrap_or(0).saturating_sub(seeders).max(0) as u32,
            provider: NAME.to_string(),
            verified: false,
        }
    }
}

#[async_trait]
impl SearchProvider for JackettProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<RawTorrentResult>, SearchError> {
        let url = self.build_search_url(query);
        debug!(provider = NAME, term = %query.term, "Searching Jackett");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SearchError::from_reqwest(NAME, e, self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::provider_failed(
                NAME,
                format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            ));
        }

        let jackett_response: JackettResponse = response
            .json()
            .await
            .map_err(|e| SearchError::provider_failed(NAME, format!("Failed to parse response: {}", e)))?;

        debug!(
            provider = NAME,
            results = jackett_response.Results.len(),
            "Jackett search complete"
        );

        Ok(jackett_response
            .Results
            .into_iter()
            .map(JackettResult::into_raw)
            .take(query.limit)
            .collect())
    }
}
