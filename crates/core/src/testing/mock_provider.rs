//! Mock search provider for testing.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::searcher::{ProviderQuery, RawTorrentResult, SearchError, SearchProvider};

/// Mock implementation of the SearchProvider trait.
///
/// Returns the same canned results for every query and records each query
/// it receives.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    results: Vec<RawTorrentResult>,
    failure: Option<String>,
    delay: Option<Duration>,
    queries: RwLock<Vec<ProviderQuery>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            results: Vec::new(),
            failure: None,
            delay: None,
            queries: RwLock::new(Vec::new()),
        }
    }

    pub fn with_results(mut self, results: Vec<RawTorrentResult>) -> Self {
        self.results = results;
        self
    }

    /// Every search fails with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Every search sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries received so far, in order.
    pub async fn queries(&self) -> Vec<ProviderQuery> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &ProviderQuery) -> Result<Vec<RawTorrentResult>, SearchError> {
        // Recorded before any delay so timed-out queries still show up.
        self.queries.write().await.push(query.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(SearchError::provider_failed(&self.name, message.clone()));
        }

        Ok(self
            .results
            .iter()
            .cloned()
            .map(|mut r| {
                r.provider = self.name.clone();
                r
            })
            .take(query.limit)
            .collect())
    }
}
