use serde::{Deserialize, Serialize};

use crate::device::DeviceTier;

/// Tunables for the render scheduler. Tier-specific values live in
/// [`TierProfile`](crate::device::TierProfile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Use this tier instead of the detected one.
    pub device_override: Option<DeviceTier>,
    /// FPS samples per adaptive decision.
    pub fps_window: usize,
    /// Escalate when average FPS falls below this fraction of the target.
    pub escalate_ratio: f64,
    /// Relax when average FPS rises above this fraction of the target.
    pub relax_ratio: f64,
    /// Frames a debounced coordinate refresh waits.
    pub debounce_frames: u64,
    /// Images above this unscaled area are cached under the minimal strategy.
    pub large_image_area: f64,
    pub culling_enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            device_override: None,
            fps_window: 30,
            escalate_ratio: 0.7,
            relax_ratio: 0.9,
            debounce_frames: 2,
            large_image_area: 50_000.0,
            culling_enabled: true,
        }
    }
}
