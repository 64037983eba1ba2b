use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the history engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept; the oldest are evicted first.
    pub capacity: usize,
    /// Position tolerance, in scene units, for matching a re-created object.
    pub position_epsilon: f64,
    /// Quiet period before a burst of change events becomes one snapshot.
    pub capture_debounce_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            position_epsilon: 1.0,
            capture_debounce_ms: 50,
        }
    }
}

impl HistoryConfig {
    pub fn capture_window(&self) -> Duration {
        Duration::from_millis(self.capture_debounce_ms)
    }
}
