use std::time::Duration;

/// Coalesces redraw requests into at most one draw per frame interval.
#[derive(Debug, Clone)]
pub struct RenderThrottle {
    interval: Duration,
    last_draw: Option<Duration>,
    requested: bool,
}

impl RenderThrottle {
    pub fn new(target_fps: f64) -> Self {
        Self {
            interval: interval_for(target_fps),
            last_draw: None,
            requested: false,
        }
    }

    pub fn set_target_fps(&mut self, target_fps: f64) {
        self.interval = interval_for(target_fps);
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn request(&mut self) {
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Earliest time the next draw is allowed.
    pub fn next_slot(&self) -> Duration {
        self.last_draw
            .map_or(Duration::ZERO, |last| last + self.interval)
    }

    /// A draw is pending and its slot has arrived.
    pub fn ready(&self, now: Duration) -> bool {
        self.requested && now >= self.next_slot()
    }

    /// Mark the pending request served at `now`, whether or not the draw succeeded.
    pub fn mark_drawn(&mut self, now: Duration) {
        self.last_draw = Some(now);
        self.requested = false;
    }
}

fn interval_for(target_fps: f64) -> Duration {
    if target_fps.is_finite() && target_fps > 0.0 {
        Duration::from_secs_f64(1.0 / target_fps)
    } else {
        Duration::ZERO
    }
}
