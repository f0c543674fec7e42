//! Types for the torrent search system.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content category for filtering search results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Movies,
    Tv,
}

/// One query sent to one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderQuery {
    /// Free-text search term (one variant).
    pub term: String,
    pub category: SearchCategory,
    /// Upper bound on results the provider should return.
    pub limit: usize,
}

/// Raw result from a single provider, before normalization.
#[derive(Debug, Clone, Default)]
pub struct RawTorrentResult {
    pub title: String,
    pub magnet_uri: Option<String>,
    pub torrent_url: Option<String>,
    /// Info hash if the provider reports one.
    pub info_hash: Option<String>,
    pub size_bytes: Option<u64>,
    /// Human readable size as printed by the provider (e.g. "1.4 GB").
    pub size_text: Option<String>,
    pub seeders: u32,
    pub leechers: u32,
    pub provider: String,
    pub verified: bool,
}

/// Video quality derived from a release title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "2160p")]
    Uhd2160p,
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "1080p")]
    Fhd1080p,
    #[serde(rename = "720p")]
    Hd720p,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Uhd2160p => "2160p",
            Quality::Uhd4k => "4K",
            Quality::Fhd1080p => "1080p",
            Quality::Hd720p => "720p",
            Quality::Unknown => "unknown",
        }
    }

    /// Preference rank used by scoring: 1080p > 720p > 4K/2160p > unknown.
    pub fn rank(&self) -> i64 {
        match self {
            Quality::Fhd1080p => 3,
            Quality::Hd720p => 2,
            Quality::Uhd4k | Quality::Uhd2160p => 1,
            Quality::Unknown => 0,
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "2160p" => Ok(Quality::Uhd2160p),
            "4k" => Ok(Quality::Uhd4k),
            "1080p" => Ok(Quality::Fhd1080p),
            "720p" => Ok(Quality::Hd720p),
            "unknown" => Ok(Quality::Unknown),
            other => Err(format!("unknown quality: {}", other)),
        }
    }
}

/// Caller's quality preference: `auto` or one exact quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QualityPreference {
    #[default]
    Auto,
    Exact(Quality),
}

impl FromStr for QualityPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(QualityPreference::Auto)
        } else {
            s.parse().map(QualityPreference::Exact)
        }
    }
}

impl TryFrom<String> for QualityPreference {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<QualityPreference> for String {
    fn from(value: QualityPreference) -> Self {
        match value {
            QualityPreference::Auto => "auto".to_string(),
            QualityPreference::Exact(q) => q.as_str().to_string(),
        }
    }
}

/// A scored search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentCandidate {
    pub title: String,
    /// Magnet link or .torrent URL handed to the daemon.
    pub link: String,
    /// Human readable size (e.g. "1.4 GB"); empty when unknown.
    pub size: String,
    pub seeders: u32,
    pub leechers: u32,
    pub provider: String,
    pub quality: Quality,
    pub score: u32,
    pub verified: bool,
    /// Lowercase info hash, used for deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
}

/// Enable state of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub enabled: bool,
}

/// Errors that can occur during search operations.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    #[error("Provider {provider} timed out after {timeout_secs}s")]
    ProviderSearchTimeout { provider: String, timeout_secs: u64 },

    #[error("Provider {provider} failed: {message}")]
    ProviderFailed { provider: String, message: String },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("No search providers are enabled")]
    NoProvidersEnabled,
}

impl SearchError {
    pub(crate) fn provider_failed(provider: &str, message: impl Into<String>) -> Self {
        SearchError::ProviderFailed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Map a transport error from a provider request.
    pub(crate) fn from_reqwest(provider: &str, e: reqwest::Error, timeout_secs: u64) -> Self {
        if e.is_timeout() {
            SearchError::ProviderSearchTimeout {
                provider: provider.to_string(),
                timeout_secs,
            }
        } else {
            SearchError::provider_failed(provider, e.to_string())
        }
    }
}

/// A third-party torrent index.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logging and enable/disable.
    fn name(&self) -> &str;

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<RawTorrentResult>, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_serialization() {
        assert_eq!(serde_json::to_string(&Quality::Uhd4k).unwrap(), "\"4K\"");
        assert_eq!(
            serde_json::to_string(&Quality::Fhd1080p).unwrap(),
            "\"1080p\""
        );
        assert_eq!(
            serde_json::from_str::<Quality>("\"unknown\"").unwrap(),
            Quality::Unknown
        );
    }

    #[test]
    fn test_quality_rank_order() {
        assert!(Quality::Fhd1080p.rank() > Quality::Hd720p.rank());
        assert!(Quality::Hd720p.rank() > Quality::Uhd4k.rank());
        assert_eq!(Quality::Uhd4k.rank(), Quality::Uhd2160p.rank());
        assert_eq!(Quality::Unknown.rank(), 0);
    }

    #[test]
    fn test_quality_preference_parse() {
        assert_eq!("auto".parse(), Ok(QualityPreference::Auto));
        assert_eq!(
            "1080p".parse(),
            Ok(QualityPreference::Exact(Quality::Fhd1080p))
        );
        assert_eq!("4K".parse(), Ok(QualityPreference::Exact(Quality::Uhd4k)));
        assert!("8k".parse::<QualityPreference>().is_err());
    }

    #[test]
    fn test_quality_preference_serde_roundtrip_through_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            preferred_quality: QualityPreference,
        }
        let w: Wrapper = toml::from_str(r#"preferred_quality = "720p""#).unwrap();
        assert_eq!(w.preferred_quality, QualityPreference::Exact(Quality::Hd720p));
        assert_eq!(String::from(w.preferred_quality), "720p");
    }

    #[test]
    fn test_search_error_display() {
        let err = SearchError::ProviderSearchTimeout {
            provider: "yts".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.to_string(), "Provider yts timed out after 30s");
    }
}
