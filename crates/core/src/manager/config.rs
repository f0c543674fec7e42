//! Download manager configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the download manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Maximum jobs admitted to the torrent daemon at once.
    /// Paused jobs keep their slot.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// How often to poll download progress (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub progress_poll_interval_ms: u64,

    /// Capacity of the lifecycle event channel. Slow subscribers that fall
    /// further behind than this skip events.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_event_buffer() -> usize {
    256
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent(),
            progress_poll_interval_ms: default_poll_interval(),
            event_buffer: default_event_buffer(),
        }
    }
}
