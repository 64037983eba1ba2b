use serde::Serialize;

use crate::adaptive::OptimizationLevel;
use crate::device::DeviceTier;
use crate::drag::InteractionState;

/// Point-in-time scheduler metrics, serializable for a debug overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    pub device_tier: DeviceTier,
    pub optimization_level: OptimizationLevel,
    pub average_fps: f64,
    pub target_fps: f64,
    /// `average_fps / target_fps`.
    pub performance_ratio: f64,
    /// Average FPS is at least 90% of the target.
    pub is_optimal: bool,
    pub object_count: usize,
    pub visible_count: usize,
    pub pending_coordinate_updates: usize,
    pub interaction: InteractionState,
    pub frames_drawn: u64,
    pub frames_failed: u64,
    pub coordinate_failures: u64,
}

/// What one [`tick`](crate::RenderScheduler::tick) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub coordinates_updated: usize,
    pub coordinate_failures: usize,
    /// Objects whose visibility or interactivity changed.
    pub flags_changed: usize,
    pub caching_changed: usize,
    /// Per-object surface calls that failed outside coordinate refresh.
    pub object_failures: usize,
    pub canvas_flags_applied: bool,
    pub drew: bool,
    pub draw_failed: bool,
}

/// Running totals kept across frames.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FrameCounters {
    pub frames_drawn: u64,
    pub frames_failed: u64,
    pub coordinate_failures: u64,
}

impl FrameCounters {
    pub fn absorb(&mut self, report: &FrameReport) {
        if report.drew {
            self.frames_drawn += 1;
        }
        if report.draw_failed {
            self.frames_failed += 1;
        }
        self.coordinate_failures += report.coordinate_failures as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut counters = FrameCounters::default();
        counters.absorb(&FrameReport {
            drew: true,
            coordinate_failures: 2,
            ..Default::default()
        });
        counters.absorb(&FrameReport {
            draw_failed: true,
            ..Default::default()
        });
        assert_eq!(counters.frames_drawn, 1);
        assert_eq!(counters.frames_failed, 1);
        assert_eq!(counters.coordinate_failures, 2);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = PerformanceSnapshot {
            device_tier: DeviceTier::Low,
            optimization_level: OptimizationLevel::Basic,
            average_fps: 27.0,
            target_fps: 30.0,
            performance_ratio: 0.9,
            is_optimal: true,
            object_count: 4,
            visible_count: 3,
            pending_coordinate_updates: 0,
            interaction: InteractionState::Idle,
            frames_drawn: 10,
            frames_failed: 0,
            coordinate_failures: 0,
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["device_tier"], "low");
        assert_eq!(value["optimization_level"], "basic");
        assert_eq!(value["interaction"]["state"], "idle");
    }
}
