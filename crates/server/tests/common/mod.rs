//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing of the HTTP
//! surface without a torrent daemon, indexers or a media library.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use niluflix_core::{
    searcher::{RawTorrentResult, SearchProvider},
    testing::{MockOrganizer, MockProvider, MockTorrentClient},
    Config, DownloadManager, ManagerConfig, TorrentSearchEngine,
};

/// Re-export fixtures for test convenience
pub use niluflix_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Torrent search (one MockProvider named "mock")
/// - Torrent daemon (MockTorrentClient)
/// - Library organization (MockOrganizer)
///
/// The manager's background worker is not started; tests drive progress
/// with `fixture.manager.poll_once()`.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_download_creation() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/downloads", json!({
///         "content": { "title": "Inception", "type": "movie", "year": 2010 }
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Download manager behind the router
    pub manager: Arc<DownloadManager>,
    /// Mock torrent client - control downloads
    pub torrent_client: Arc<MockTorrentClient>,
    /// Mock organizer - inspect organize requests
    pub organizer: Arc<MockOrganizer>,
    /// Mock search provider - inspect queries
    pub provider: Arc<MockProvider>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let torrent_client = Arc::new(MockTorrentClient::new());
        let organizer = Arc::new(MockOrganizer::new());
        let provider = Arc::new(MockProvider::new("mock").with_results(test_config.search_results));

        let mut config = Config::default();
        config.downloads = ManagerConfig {
            max_concurrent_downloads: test_config.max_concurrent_downloads,
            ..Default::default()
        };
        config.search.timeout_secs = 1;

        let search = Arc::new(TorrentSearchEngine::new(
            config.search.clone(),
            vec![Arc::clone(&provider) as Arc<dyn SearchProvider>],
        ));

        let manager = Arc::new(DownloadManager::new(
            config.downloads.clone(),
            Arc::clone(&torrent_client) as Arc<dyn niluflix_core::TorrentClient>,
            search,
            Arc::clone(&organizer) as Arc<dyn niluflix_core::Organizer>,
            "/mock/library/Downloads",
        ));

        let state = Arc::new(niluflix_server::state::AppState::new(
            config,
            Arc::clone(&manager),
        ));
        let router = niluflix_server::api::create_router(state);

        Self {
            router,
            manager,
            torrent_client,
            organizer,
            provider,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(request).await;
        TestResponse {
            status,
            body: parse_json(&bytes),
        }
    }

    /// GET returning the raw body text (for non-JSON endpoints).
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let (status, bytes) = self.send(request).await;
        TestResponse {
            status,
            body: parse_json(&bytes),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, body_bytes.to_vec())
    }
}

fn parse_json(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub max_concurrent_downloads: usize,
    /// Canned results returned by the mock provider for every query
    pub search_results: Vec<RawTorrentResult>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 3,
            search_results: Vec::new(),
        }
    }
}

impl TestConfig {
    /// Config whose provider answers with the given results.
    pub fn with_results(search_results: Vec<RawTorrentResult>) -> Self {
        Self {
            search_results,
            ..Default::default()
        }
    }

    /// Config with a concurrency limit.
    pub fn with_max_concurrent(max_concurrent_downloads: usize) -> Self {
        Self {
            max_concurrent_downloads,
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
