use serde::{Deserialize, Serialize};
use studio_core::object::{ObjectKind, SceneObject};

/// Coarse classification of client hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceTier {
    Critical,
    Low,
    Medium,
    High,
}

/// What the host could find out about the device. Unknown values are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub cores: Option<usize>,
    pub memory_gb: Option<f64>,
    pub is_mobile: bool,
}

impl DeviceCapabilities {
    pub fn new(cores: usize, memory_gb: f64, is_mobile: bool) -> Self {
        Self {
            cores: Some(cores),
            memory_gb: Some(memory_gb),
            is_mobile,
        }
    }

    /// Probe the current process. Memory is not discoverable portably, so it stays unknown.
    pub fn detect() -> Self {
        let cores = match std::thread::available_parallelism() {
            Ok(n) => Some(n.get()),
            Err(e) => {
                log::warn!("Core count unavailable: {e}");
                None
            }
        };
        Self {
            cores,
            memory_gb: None,
            is_mobile: false,
        }
    }

    /// Unknown core count classifies as medium; unknown memory does not constrain.
    pub fn classify(&self) -> DeviceTier {
        let Some(cores) = self.cores else {
            return DeviceTier::Medium;
        };
        let memory_at_most = |gb: f64| self.memory_gb.is_some_and(|m| m <= gb);

        if cores <= 1 || memory_at_most(1.0) {
            DeviceTier::Critical
        } else if cores <= 2 || memory_at_most(2.0) {
            DeviceTier::Low
        } else if cores <= 4 || memory_at_most(4.0) || self.is_mobile {
            DeviceTier::Medium
        } else {
            DeviceTier::High
        }
    }
}

/// Which objects keep an offscreen render cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    None,
    /// Only images larger than the configured area.
    Minimal,
    /// Everything except high-priority (selected or dragged) objects.
    Moderate,
    Aggressive,
}

impl CacheStrategy {
    pub fn should_cache(&self, kind: ObjectKind, area: f64, high_priority: bool, large_image_area: f64) -> bool {
        match self {
            CacheStrategy::None => false,
            CacheStrategy::Minimal => kind == ObjectKind::Image && area > large_image_area,
            CacheStrategy::Moderate => !high_priority,
            CacheStrategy::Aggressive => true,
        }
    }
}

/// When a coordinate refresh request becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateStrategy {
    Immediate,
    Debounced,
    Batched,
}

/// Fixed per-tier tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierProfile {
    pub target_fps: f64,
    pub max_visible: usize,
    /// Scene units added around the viewport before culling.
    pub culling_padding: f64,
    pub cache: CacheStrategy,
    pub coordinates: CoordinateStrategy,
    /// Pointer slop in screen pixels.
    pub touch_sensitivity: u32,
    /// Coordinate recomputes allowed per frame.
    pub max_simultaneous_renders: usize,
}

impl TierProfile {
    pub fn for_tier(tier: DeviceTier) -> Self {
        match tier {
            DeviceTier::Critical => Self {
                target_fps: 20.0,
                max_visible: 10,
                culling_padding: 50.0,
                cache: CacheStrategy::None,
                coordinates: CoordinateStrategy::Batched,
                touch_sensitivity: 16,
                max_simultaneous_renders: 1,
            },
            DeviceTier::Low => Self {
                target_fps: 30.0,
                max_visible: 20,
                culling_padding: 75.0,
                cache: CacheStrategy::Minimal,
                coordinates: CoordinateStrategy::Batched,
                touch_sensitivity: 12,
                max_simultaneous_renders: 2,
            },
            DeviceTier::Medium => Self {
                target_fps: 45.0,
                max_visible: 50,
                culling_padding: 100.0,
                cache: CacheStrategy::Moderate,
                coordinates: CoordinateStrategy::Debounced,
                touch_sensitivity: 8,
                max_simultaneous_renders: 3,
            },
            DeviceTier::High => Self {
                target_fps: 60.0,
                max_visible: 50,
                culling_padding: 150.0,
                cache: CacheStrategy::Aggressive,
                coordinates: CoordinateStrategy::Immediate,
                touch_sensitivity: 4,
                max_simultaneous_renders: 5,
            },
        }
    }
}

/// Unscaled pixel area, the measure the minimal cache strategy uses.
pub fn cache_area(object: &SceneObject) -> f64 {
    object.width * object.height
}
