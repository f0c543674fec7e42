//! Configuration for the organizer module.

use serde::{Deserialize, Serialize};

/// Configuration for the library file organizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerConfig {
    /// Hard cap, in characters, on every sanitized path component.
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Whether a failed organize undoes the moves and writes it already made.
    #[serde(default = "default_true")]
    pub rollback_on_failure: bool,
}

fn default_max_name_len() -> usize {
    200
}

fn default_true() -> bool {
    true
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            max_name_len: default_max_name_len(),
            rollback_on_failure: true,
        }
    }
}

impl OrganizerConfig {
    /// Enables or disables rollback on failure.
    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }
}
