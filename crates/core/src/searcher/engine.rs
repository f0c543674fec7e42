//! Multi-provider search facade.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::content::{ContentDescriptor, ContentKind};
use crate::metrics;
use crate::torrent_client::extract_hash_from_magnet;

use super::scoring::{detect_quality, format_size, rank_candidates};
use super::{
    ApibayProvider, JackettProvider, ProviderQuery, ProviderStatus, QualityPreference,
    RawTorrentResult, SearchCategory, SearchConfig, SearchError, SearchProvider,
    TorrentCandidate, YtsProvider,
};

const MOVIE_QUALITY_TERMS: &[&str] = &["1080p", "720p", "BluRay", "WEB-DL"];
const EPISODE_QUALITY_TERMS: &[&str] = &["1080p", "720p"];

/// Parameters of one ranked search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Base title ("Inception", "Breaking Bad S01E01").
    pub title: String,
    pub year: Option<u16>,
    pub kind: ContentKind,
    pub min_seeders: u32,
    pub max_results: usize,
    pub preferred_quality: QualityPreference,
}

impl SearchRequest {
    /// Request for a content item using configured defaults.
    pub fn for_content(content: &ContentDescriptor, config: &SearchConfig) -> Self {
        let min_seeders = match content.kind {
            ContentKind::Movie => config.movie_min_seeders,
            ContentKind::Episode => config.episode_min_seeders,
        };
        Self {
            title: content.search_title(),
            year: if content.is_movie() { content.year } else { None },
            kind: content.kind,
            min_seeders,
            max_results: config.max_results,
            preferred_quality: config.preferred_quality,
        }
    }

    fn category(&self) -> SearchCategory {
        match self.kind {
            ContentKind::Movie => SearchCategory::Movies,
            ContentKind::Episode => SearchCategory::Tv,
        }
    }
}

/// Search-term variants in query order, deduplicated and capped.
///
/// Plain title first, then title+year, then title plus quality tokens.
pub fn build_search_terms(
    title: &str,
    year: Option<u16>,
    kind: ContentKind,
    max_variants: usize,
) -> Vec<String> {
    let mut terms = vec![title.to_string()];
    if let Some(year) = year {
        terms.push(format!("{} {}", title, year));
    }
    let quality_terms = match kind {
        ContentKind::Movie => MOVIE_QUALITY_TERMS,
        ContentKind::Episode => EPISODE_QUALITY_TERMS,
    };
    for quality in quality_terms {
        terms.push(format!("{} {}", title, quality));
    }

    let mut unique: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        if !unique.contains(&term) {
            unique.push(term);
        }
    }
    unique.truncate(max_variants);
    unique
}

/// Turn a raw provider row into an unscored candidate.
///
/// Rows without a title or a usable link are dropped.
fn normalize(raw: RawTorrentResult) -> Option<TorrentCandidate> {
    let title = raw.title.trim().to_string();
    if title.is_empty() {
        return None;
    }
    let link = raw
        .magnet_uri
        .filter(|m| !m.is_empty())
        .or(raw.torrent_url.filter(|u| !u.is_empty()))?;

    let info_hash = raw
        .info_hash
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
        .or_else(|| extract_hash_from_magnet(&link));

    let size = match (raw.size_text, raw.size_bytes) {
        (Some(text), _) if !text.is_empty() => text,
        (_, Some(bytes)) => format_size(bytes),
        _ => String::new(),
    };

    Some(TorrentCandidate {
        quality: detect_quality(&title),
        title,
        link,
        size,
        seeders: raw.seeders,
        leechers: raw.leechers,
        provider: raw.provider,
        score: 0,
        verified: raw.verified,
        info_hash,
    })
}

/// Collapse candidates sharing an info hash (or link, when no hash is known).
///
/// Keeps the entry with the most seeders; the first one seen wins ties.
/// Output keeps first-discovery order.
fn deduplicate(candidates: Vec<TorrentCandidate>) -> Vec<TorrentCandidate> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<TorrentCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = candidate
            .info_hash
            .clone()
            .unwrap_or_else(|| candidate.link.clone());
        match index.get(&key) {
            Some(&i) => {
                if candidate.seeders > unique[i].seeders {
                    unique[i] = candidate;
                }
            }
            None => {
                index.insert(key, unique.len());
                unique.push(candidate);
            }
        }
    }
    unique
}

/// Queries every enabled provider and ranks the merged results.
pub struct TorrentSearchEngine {
    config: SearchConfig,
    providers: Vec<Arc<dyn SearchProvider>>,
    enabled: RwLock<HashMap<String, bool>>,
}

impl TorrentSearchEngine {
    /// Engine over an explicit provider list, all enabled.
    pub fn new(config: SearchConfig, providers: Vec<Arc<dyn SearchProvider>>) -> Self {
        let enabled = providers
            .iter()
            .map(|p| (p.name().to_string(), true))
            .collect();
        Self {
            config,
            providers,
            enabled: RwLock::new(enabled),
        }
    }

    /// Engine with the built-in providers (YTS, apibay, Jackett) and their
    /// configured enable flags.
    pub fn from_config(config: SearchConfig) -> Result<Self, SearchError> {
        let timeout = config.timeout_secs;
        let providers: Vec<(Arc<dyn SearchProvider>, bool)> = vec![
            (
                Arc::new(YtsProvider::new(&config.yts, timeout)?) as Arc<dyn SearchProvider>,
                config.yts.enabled,
            ),
            (
                Arc::new(ApibayProvider::new(&config.apibay, timeout)?) as Arc<dyn SearchProvider>,
                config.apibay.enabled,
            ),
            (
                Arc::new(JackettProvider::new(config.jackett.clone(), timeout)?)
                    as Arc<dyn SearchProvider>,
                config.jackett.enabled,
            ),
        ];

        let enabled = providers
            .iter()
            .map(|(p, on)| (p.name().to_string(), *on))
            .collect();
        Ok(Self {
            config,
            providers: providers.into_iter().map(|(p, _)| p).collect(),
            enabled: RwLock::new(enabled),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Providers in query order with their enable state.
    pub async fn providers(&self) -> Vec<ProviderStatus> {
        let enabled = self.enabled.read().await;
        self.providers
            .iter()
            .map(|p| ProviderStatus {
                name: p.name().to_string(),
                enabled: enabled.get(p.name()).copied().unwrap_or(false),
            })
            .collect()
    }

    pub async fn set_provider_enabled(&self, name: &str, on: bool) -> Result<(), SearchError> {
        let mut enabled = self.enabled.write().await;
        match enabled.get_mut(name) {
            Some(state) => {
                *state = on;
                info!(provider = name, enabled = on, "Search provider toggled");
                Ok(())
            }
            None => Err(SearchError::ProviderNotFound(name.to_string())),
        }
    }

    async fn enabled_providers(&self) -> Vec<Arc<dyn SearchProvider>> {
        let enabled = self.enabled.read().await;
        self.providers
            .iter()
            .filter(|p| enabled.get(p.name()).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Ranked candidates for a content item.
    pub async fn search(
        &self,
        content: &ContentDescriptor,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        self.search_with(&SearchRequest::for_content(content, &self.config))
            .await
    }

    /// Ranked candidates for an explicit request.
    ///
    /// Provider failures and timeouts are logged and skipped; an empty list is
    /// a valid answer.
    pub async fn search_with(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<TorrentCandidate>, SearchError> {
        let started = Instant::now();
        let providers = self.enabled_providers().await;
        if providers.is_empty() {
            return Err(SearchError::NoProvidersEnabled);
        }

        let terms = build_search_terms(
            &request.title,
            request.year,
            request.kind,
            self.config.max_query_variants,
        );
        let timeout = Duration::from_secs(self.config.timeout_secs);

        debug!(
            title = %request.title,
            terms = ?terms,
            providers = providers.len(),
            "Starting torrent search"
        );

        // Variant-major, provider-minor; join_all keeps this order.
        let calls: Vec<_> = terms
            .iter()
            .flat_map(|term| {
                providers.iter().map(move |provider| {
                    let query = ProviderQuery {
                        term: term.clone(),
                        category: request.category(),
                        limit: request.max_results,
                    };
                    let provider = Arc::clone(provider);
                    async move {
                        let result = match tokio::time::timeout(timeout, provider.search(&query)).await {
                            Ok(result) => result,
                            Err(_) => Err(SearchError::ProviderSearchTimeout {
                                provider: provider.name().to_string(),
                                timeout_secs: timeout.as_secs(),
                            }),
                        };
                        (provider.name().to_string(), query.term, result)
                    }
                })
            })
            .collect();

        let results = futures::future::join_all(calls).await;

        let mut raw: Vec<RawTorrentResult> = Vec::new();
        for (provider, term, result) in results {
            match result {
                Ok(mut rows) => raw.append(&mut rows),
                Err(e) => {
                    warn!(provider = %provider, term = %term, error = %e, "Provider search failed");
                    metrics::PROVIDER_FAILURES
                        .with_label_values(&[provider.as_str()])
                        .inc();
                }
            }
        }

        let raw_count = raw.len();
        let candidates: Vec<TorrentCandidate> = raw
            .into_iter()
            .filter_map(normalize)
            .filter(|c| c.seeders >= request.min_seeders)
            .collect();
        let ranked = rank_candidates(
            deduplicate(candidates),
            request.preferred_quality,
            request.max_results,
        );

        metrics::SEARCH_DURATION
            .with_label_values(&[request.kind.as_str()])
            .observe(started.elapsed().as_secs_f64());

        info!(
            title = %request.title,
            raw = raw_count,
            ranked = ranked.len(),
            "Torrent search complete"
        );
        if let Some(best) = ranked.first() {
            debug!(title = %best.title, score = best.score, seeders = best.seeders, "Best candidate");
        }

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::Quality;
    use crate::testing::{raw_result, MockProvider};

    fn engine(providers: Vec<Arc<dyn SearchProvider>>) -> TorrentSearchEngine {
        let config = SearchConfig {
            timeout_secs: 1,
            ..Default::default()
        };
        TorrentSearchEngine::new(config, providers)
    }

    #[test]
    fn test_build_search_terms_movie() {
        let terms = build_search_terms("Inception", Some(2010), ContentKind::Movie, 3);
        assert_eq!(terms, vec!["Inception", "Inception 2010", "Inception 1080p"]);

        let all = build_search_terms("Inception", None, ContentKind::Movie, 10);
        assert_eq!(
            all,
            vec![
                "Inception",
                "Inception 1080p",
                "Inception 720p",
                "Inception BluRay",
                "Inception WEB-DL"
            ]
        );
    }

    #[test]
    fn test_build_search_terms_episode() {
        let terms = build_search_terms("Breaking Bad S01E01", None, ContentKind::Episode, 10);
        assert_eq!(
            terms,
            vec![
                "Breaking Bad S01E01",
                "Breaking Bad S01E01 1080p",
                "Breaking Bad S01E01 720p"
            ]
        );
    }

    #[test]
    fn test_normalize_drops_unusable_rows() {
        assert!(normalize(raw_result("", 10, Some("magnet:?xt=urn:btih:aa"))).is_none());
        assert!(normalize(raw_result("Movie", 10, None)).is_none());

        let c = normalize(raw_result("Movie 1080p", 10, Some("magnet:?xt=urn:btih:AA"))).unwrap();
        assert_eq!(c.info_hash.as_deref(), Some("aa"));
        assert_eq!(c.quality, Quality::Fhd1080p);
    }

    #[test]
    fn test_normalize_formats_byte_sizes() {
        let mut raw = raw_result("Movie", 10, Some("magnet:?xt=urn:btih:aa"));
        raw.size_bytes = Some(1_610_612_736);
        assert_eq!(normalize(raw).unwrap().size, "1.5 GB");
    }

    #[test]
    fn test_deduplicate_keeps_most_seeded() {
        let mut a = normalize(raw_result("A", 10, Some("magnet:?xt=urn:btih:aa"))).unwrap();
        a.provider = "first".to_string();
        let mut b = normalize(raw_result("A copy", 30, Some("magnet:?xt=urn:btih:AA"))).unwrap();
        b.provider = "second".to_string();
        let c = normalize(raw_result("C", 5, Some("magnet:?xt=urn:btih:cc"))).unwrap();
        let mut d = normalize(raw_result("C again", 5, Some("magnet:?xt=urn:btih:cc"))).unwrap();
        d.provider = "later".to_string();

        let unique = deduplicate(vec![a, c, b, d]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].provider, "second");
        assert_eq!(unique[1].title, "C");
    }

    #[tokio::test]
    async fn test_search_ranks_across_providers() {
        let yts = MockProvider::new("yts").with_results(vec![raw_result(
            "X 1080p BluRay",
            50,
            Some("magnet:?xt=urn:btih:bb"),
        )]);
        let tpb = MockProvider::new("apibay").with_results(vec![raw_result(
            "X 720p CAM",
            6,
            Some("magnet:?xt=urn:btih:aa"),
        )]);

        let engine = engine(vec![Arc::new(tpb), Arc::new(yts)]);
        let content = ContentDescriptor::movie("X", None);
        let ranked = engine.search(&content).await.unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "X 1080p BluRay");
        assert!(ranked[0].score > ranked[1].score);
    }

    #[tokio::test]
    async fn test_search_filters_min_seeders() {
        let provider = MockProvider::new("yts").with_results(vec![
            raw_result("Movie 1080p", 4, Some("magnet:?xt=urn:btih:aa")),
            raw_result("Movie 720p", 5, Some("magnet:?xt=urn:btih:bb")),
        ]);
        let engine = engine(vec![Arc::new(provider)]);

        let ranked = engine
            .search(&ContentDescriptor::movie("Movie", None))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].seeders, 5);
    }

    #[tokio::test]
    async fn test_failing_provider_is_skipped() {
        let broken = MockProvider::new("broken").failing("upstream down");
        let good = MockProvider::new("good").with_results(vec![raw_result(
            "Movie 1080p",
            20,
            Some("magnet:?xt=urn:btih:aa"),
        )]);
        let engine = engine(vec![Arc::new(broken), Arc::new(good)]);

        let ranked = engine
            .search(&ContentDescriptor::movie("Movie", None))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let slow = MockProvider::new("slow")
            .with_results(vec![raw_result("Slow 1080p", 99, Some("magnet:?xt=urn:btih:ss"))])
            .with_delay(Duration::from_secs(5));
        let fast = MockProvider::new("fast").with_results(vec![raw_result(
            "Fast 1080p",
            20,
            Some("magnet:?xt=urn:btih:ff"),
        )]);
        let engine = engine(vec![Arc::new(slow), Arc::new(fast)]);

        let ranked = engine
            .search(&ContentDescriptor::movie("Movie", None))
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].title, "Fast 1080p");
    }

    #[tokio::test]
    async fn test_variant_cap_bounds_provider_calls() {
        let provider = Arc::new(MockProvider::new("yts"));
        let engine = engine(vec![provider.clone()]);

        engine
            .search(&ContentDescriptor::movie("Inception", Some(2010)))
            .await
            .unwrap();

        let queries = provider.queries().await;
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[1].term, "Inception 2010");
        assert!(queries.iter().all(|q| q.category == SearchCategory::Movies));
    }

    #[tokio::test]
    async fn test_episode_search_uses_tv_category() {
        let provider = Arc::new(MockProvider::new("apibay"));
        let engine = engine(vec![provider.clone()]);

        engine
            .search(&ContentDescriptor::episode("Breaking Bad", 1, 1))
            .await
            .unwrap();

        let queries = provider.queries().await;
        assert_eq!(queries[0].term, "Breaking Bad S01E01");
        assert!(queries.iter().all(|q| q.category == SearchCategory::Tv));
    }

    #[tokio::test]
    async fn test_provider_toggle() {
        let engine = engine(vec![Arc::new(MockProvider::new("yts"))]);

        engine.set_provider_enabled("yts", false).await.unwrap();
        let statuses = engine.providers().await;
        assert!(!statuses[0].enabled);

        let err = engine
            .search(&ContentDescriptor::movie("X", None))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NoProvidersEnabled));

        let err = engine.set_provider_enabled("nope", true).await.unwrap_err();
        assert!(matches!(err, SearchError::ProviderNotFound(_)));
    }

    #[test]
    fn test_from_config_respects_enable_flags() {
        let mut config = SearchConfig::default();
        config.apibay.enabled = false;
        let engine = TorrentSearchEngine::from_config(config).unwrap();

        let statuses = tokio_test::block_on(engine.providers());
        let names: Vec<_> = statuses.iter().map(|s| (s.name.as_str(), s.enabled)).collect();
        assert_eq!(
            names,
            vec![("yts", true), ("apibay", false), ("jackett", false)]
        );
    }
}
