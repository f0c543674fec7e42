//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download manager (job outcomes)
//! - Organizer (organize duration)
//! - Search (search duration, provider failures)
//! - Torrent daemon RPC errors

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Download Manager
// =============================================================================

/// Jobs admitted to the torrent daemon.
pub static DOWNLOADS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("niluflix_downloads_started_total", "Total downloads started").unwrap()
});

/// Jobs organized into the library.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "niluflix_downloads_completed_total",
        "Total downloads completed and organized",
    )
    .unwrap()
});

/// Jobs that ended in `failed`.
pub static DOWNLOADS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("niluflix_downloads_failed_total", "Total downloads failed").unwrap()
});

/// Jobs cancelled by the user.
pub static DOWNLOADS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "niluflix_downloads_cancelled_total",
        "Total downloads cancelled",
    )
    .unwrap()
});

// =============================================================================
// Organizer
// =============================================================================

/// Time spent moving a finished download into the library.
pub static ORGANIZE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "niluflix_organize_duration_seconds",
            "Duration of library organization per download",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0]),
    )
    .unwrap()
});

// =============================================================================
// Search
// =============================================================================

/// Full multi-provider search duration by content kind.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "niluflix_search_duration_seconds",
            "Duration of a torrent search across all providers",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["kind"], // "movie", "episode"
    )
    .unwrap()
});

/// Provider queries that failed or timed out.
pub static PROVIDER_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "niluflix_provider_failures_total",
            "Search provider queries that failed or timed out",
        ),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Torrent Daemon
// =============================================================================

/// RPC calls to the torrent daemon that returned an error.
pub static DAEMON_RPC_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "niluflix_daemon_rpc_errors_total",
            "Torrent daemon RPC calls that failed",
        ),
        &["backend"], // "transmission", "qbittorrent"
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Downloads
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOADS_FAILED.clone()),
        Box::new(DOWNLOADS_CANCELLED.clone()),
        // Organizer
        Box::new(ORGANIZE_DURATION.clone()),
        // Search
        Box::new(SEARCH_DURATION.clone()),
        Box::new(PROVIDER_FAILURES.clone()),
        // Daemon
        Box::new(DAEMON_RPC_ERRORS.clone()),
    ]
}
