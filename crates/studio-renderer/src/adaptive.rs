use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::device::{CacheStrategy, DeviceTier, TierProfile};

/// How hard the scheduler is trading quality for frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    None,
    Basic,
    Aggressive,
    Emergency,
}

impl OptimizationLevel {
    /// Starting level for a freshly classified device.
    pub fn initial_for(tier: DeviceTier) -> Self {
        match tier {
            DeviceTier::Critical => OptimizationLevel::Aggressive,
            DeviceTier::Low => OptimizationLevel::Basic,
            DeviceTier::Medium | DeviceTier::High => OptimizationLevel::None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn escalated(&self) -> Option<Self> {
        match self {
            OptimizationLevel::None => Some(OptimizationLevel::Basic),
            OptimizationLevel::Basic => Some(OptimizationLevel::Aggressive),
            OptimizationLevel::Aggressive => Some(OptimizationLevel::Emergency),
            OptimizationLevel::Emergency => None,
        }
    }

    pub fn relaxed(&self) -> Option<Self> {
        match self {
            OptimizationLevel::None => None,
            OptimizationLevel::Basic => Some(OptimizationLevel::None),
            OptimizationLevel::Aggressive => Some(OptimizationLevel::Basic),
            OptimizationLevel::Emergency => Some(OptimizationLevel::Aggressive),
        }
    }
}

/// Effective render quality for a tier at a given optimization level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub image_smoothing: bool,
    pub cache: CacheStrategy,
    pub per_pixel_hit_test: bool,
    pub target_find_tolerance: u32,
    pub max_simultaneous_renders: usize,
    pub target_fps: f64,
}

impl QualitySettings {
    pub const MIN_EMERGENCY_FPS: f64 = 15.0;

    /// Derived fresh from the profile each time, so leaving a level undoes its effects.
    pub fn resolve(tier: DeviceTier, profile: &TierProfile, level: OptimizationLevel) -> Self {
        let base = Self {
            image_smoothing: true,
            cache: profile.cache,
            per_pixel_hit_test: true,
            target_find_tolerance: 0,
            max_simultaneous_renders: profile.max_simultaneous_renders,
            target_fps: profile.target_fps,
        };
        match level {
            OptimizationLevel::None => base,
            OptimizationLevel::Basic => Self {
                image_smoothing: tier != DeviceTier::Critical,
                cache: CacheStrategy::Minimal,
                ..base
            },
            OptimizationLevel::Aggressive => Self {
                image_smoothing: false,
                cache: CacheStrategy::None,
                target_find_tolerance: 12,
                ..base
            },
            OptimizationLevel::Emergency => Self {
                image_smoothing: false,
                cache: CacheStrategy::None,
                per_pixel_hit_test: false,
                target_find_tolerance: 12,
                max_simultaneous_renders: 1,
                target_fps: (profile.target_fps * 0.7).max(Self::MIN_EMERGENCY_FPS),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub from: OptimizationLevel,
    pub to: OptimizationLevel,
}

/// Rolling-window FPS monitor that moves the optimization level up or down.
///
/// A decision needs a full window of samples, and the window is emptied after
/// every change so the new level is judged on fresh data.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    samples: VecDeque<f64>,
    window: usize,
    escalate_ratio: f64,
    relax_ratio: f64,
    level: OptimizationLevel,
}

impl AdaptiveController {
    pub fn new(window: usize, escalate_ratio: f64, relax_ratio: f64, level: OptimizationLevel) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            escalate_ratio,
            relax_ratio,
            level,
        }
    }

    pub fn level(&self) -> OptimizationLevel {
        self.level
    }

    /// Force a level, discarding collected samples.
    pub fn reset(&mut self, level: OptimizationLevel) {
        self.level = level;
        self.samples.clear();
    }

    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Feed one FPS measurement taken against `target_fps`.
    pub fn record(&mut self, fps: f64, target_fps: f64) -> Option<LevelChange> {
        if !fps.is_finite() || fps < 0.0 {
            log::debug!("Ignoring FPS sample {fps}");
            return None;
        }
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(fps);
        if self.samples.len() < self.window {
            return None;
        }

        let avg = self.average()?;
        let candidate = if avg < target_fps * self.escalate_ratio {
            self.level.escalated()
        } else if avg > target_fps * self.relax_ratio {
            self.level.relaxed()
        } else {
            None
        };
        let next = candidate?;

        let change = LevelChange {
            from: self.level,
            to: next,
        };
        self.reset(next);
        Some(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(controller: &mut AdaptiveController, fps: f64, target: f64, n: usize) -> Vec<LevelChange> {
        (0..n).filter_map(|_| controller.record(fps, target)).collect()
    }

    #[test]
    fn test_initial_levels() {
        assert_eq!(OptimizationLevel::initial_for(DeviceTier::Critical), OptimizationLevel::Aggressive);
        assert_eq!(OptimizationLevel::initial_for(DeviceTier::Low), OptimizationLevel::Basic);
        assert_eq!(OptimizationLevel::initial_for(DeviceTier::High), OptimizationLevel::None);
        assert_eq!(OptimizationLevel::Emergency.as_u8(), 3);
    }

    #[test]
    fn test_needs_full_window() {
        let mut c = AdaptiveController::new(30, 0.7, 0.9, OptimizationLevel::None);
        assert!(feed(&mut c, 10.0, 60.0, 29).is_empty());
        let change = c.record(10.0, 60.0).unwrap();
        assert_eq!(change.to, OptimizationLevel::Basic);
        assert_eq!(c.sample_count(), 0);
    }

    #[test]
    fn test_escalates_one_step_per_window_and_caps() {
        let mut c = AdaptiveController::new(30, 0.7, 0.9, OptimizationLevel::None);
        let changes = feed(&mut c, 20.0, 60.0, 200);
        assert_eq!(changes.len(), 3);
        assert_eq!(c.level(), OptimizationLevel::Emergency);
    }

    #[test]
    fn test_relaxes_when_fast() {
        let mut c = AdaptiveController::new(30, 0.7, 0.9, OptimizationLevel::Aggressive);
        feed(&mut c, 59.0, 60.0, 60);
        assert_eq!(c.level(), OptimizationLevel::None);
        assert!(feed(&mut c, 59.0, 60.0, 60).is_empty());
    }

    #[test]
    fn test_dead_band_holds_level() {
        let mut c = AdaptiveController::new(10, 0.7, 0.9, OptimizationLevel::Basic);
        // 80% of target: neither slow nor fast.
        assert!(feed(&mut c, 48.0, 60.0, 50).is_empty());
        assert_eq!(c.level(), OptimizationLevel::Basic);
    }

    #[test]
    fn test_quality_per_level() {
        let tier = DeviceTier::High;
        let profile = TierProfile::for_tier(tier);

        let q0 = QualitySettings::resolve(tier, &profile, OptimizationLevel::None);
        assert!(q0.image_smoothing);
        assert_eq!(q0.cache, CacheStrategy::Aggressive);

        let q1 = QualitySettings::resolve(tier, &profile, OptimizationLevel::Basic);
        assert!(q1.image_smoothing);
        assert_eq!(q1.cache, CacheStrategy::Minimal);
        let critical = TierProfile::for_tier(DeviceTier::Critical);
        assert!(!QualitySettings::resolve(DeviceTier::Critical, &critical, OptimizationLevel::Basic).image_smoothing);

        let q2 = QualitySettings::resolve(tier, &profile, OptimizationLevel::Aggressive);
        assert!(!q2.image_smoothing);
        assert_eq!(q2.cache, CacheStrategy::None);
        assert!(q2.per_pixel_hit_test);

        let q3 = QualitySettings::resolve(tier, &profile, OptimizationLevel::Emergency);
        assert!(!q3.per_pixel_hit_test);
        assert_eq!(q3.max_simultaneous_renders, 1);
        assert!((q3.target_fps - 42.0).abs() < 1e-9);

        let q3_critical = QualitySettings::resolve(DeviceTier::Critical, &critical, OptimizationLevel::Emergency);
        assert_eq!(q3_critical.target_fps, 15.0);
    }
}
