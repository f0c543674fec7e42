//! Search configuration.

use serde::{Deserialize, Serialize};

use super::QualityPreference;

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-provider request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum ranked candidates returned.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_movie_min_seeders")]
    pub movie_min_seeders: u32,

    #[serde(default = "default_episode_min_seeders")]
    pub episode_min_seeders: u32,

    /// Cap on search-term variants sent to each provider.
    #[serde(default = "default_max_query_variants")]
    pub max_query_variants: usize,

    #[serde(default)]
    pub preferred_quality: QualityPreference,

    #[serde(default = "default_yts")]
    pub yts: ProviderConfig,

    #[serde(default = "default_apibay")]
    pub apibay: ProviderConfig,

    #[serde(default)]
    pub jackett: JackettConfig,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_results() -> usize {
    30
}

fn default_movie_min_seeders() -> u32 {
    5
}

fn default_episode_min_seeders() -> u32 {
    3
}

fn default_max_query_variants() -> usize {
    3
}

fn default_yts() -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        url: "https://yts.mx".to_string(),
    }
}

fn default_apibay() -> ProviderConfig {
    ProviderConfig {
        enabled: true,
        url: "https://apibay.org".to_string(),
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_results: default_max_results(),
            movie_min_seeders: default_movie_min_seeders(),
            episode_min_seeders: default_episode_min_seeders(),
            max_query_variants: default_max_query_variants(),
            preferred_quality: QualityPreference::Auto,
            yts: default_yts(),
            apibay: default_apibay(),
            jackett: JackettConfig::default(),
        }
    }
}

/// A public JSON index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub url: String,
}

fn default_enabled() -> bool {
    true
}

/// Jackett search backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JackettConfig {
    /// Disabled unless explicitly turned on.
    #[serde(default)]
    pub enabled: bool,
    /// Jackett server URL (e.g., "http://localhost:9117")
    #[serde(default = "default_jackett_url")]
    pub url: String,
    /// Jackett API key
    #[serde(default)]
    pub api_key: String,
}

fn default_jackett_url() -> String {
    "http://localhost:9117".to_string()
}

impl Default for JackettConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_jackett_url(),
            api_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::Quality;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_results, 30);
        assert_eq!(config.movie_min_seeders, 5);
        assert_eq!(config.episode_min_seeders, 3);
        assert_eq!(config.max_query_variants, 3);
        assert_eq!(config.preferred_quality, QualityPreference::Auto);
        assert!(config.yts.enabled);
        assert!(config.apibay.enabled);
        assert!(!config.jackett.enabled);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            preferred_quality = "1080p"
            max_results = 10

            [yts]
            enabled = false
            url = "https://yts.example"

            [jackett]
            enabled = true
            api_key = "abc"
        "#;
        let config: SearchConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.preferred_quality,
            QualityPreference::Exact(Quality::Fhd1080p)
        );
        assert_eq!(config.max_results, 10);
        assert!(!config.yts.enabled);
        assert_eq!(config.yts.url, "https://yts.example");
        assert!(config.apibay.enabled);
        assert!(config.jackett.enabled);
        assert_eq!(config.jackett.url, "http://localhost:9117");
        assert_eq!(config.timeout_secs, 30);
    }
}
