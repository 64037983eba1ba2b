use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use studio_core::geometry::BBox;
use studio_core::object::{ObjectId, ObjectKind, SceneObject};
use studio_core::scene::CanvasFlags;

use crate::adaptive::{AdaptiveController, OptimizationLevel, QualitySettings};
use crate::config::SchedulerConfig;
use crate::coords::CoordinateQueue;
use crate::culling::Culler;
use crate::device::{cache_area, CoordinateStrategy, DeviceCapabilities, DeviceTier, TierProfile};
use crate::drag::{DragEnd, DragSession, InteractionState};
use crate::stats::{FrameCounters, FrameReport, PerformanceSnapshot};
use crate::surface::{ObjectFlags, RenderSurface};
use crate::throttle::RenderThrottle;
use crate::viewport::Viewport;

/// How urgently an object needs fresh coordinates and full-quality rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionPriority {
    Low,
    Medium,
    High,
}

/// The scheduler's view of one scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// Unscaled width × height.
    pub area: f64,
    pub bounds: BBox,
    pub dirty: bool,
    pub caching: bool,
    pub flags: ObjectFlags,
    pub priority: InteractionPriority,
    /// The surface may no longer hold `flags` (or `caching`), e.g. after a
    /// replay swapped in a restored copy. The next pass pushes them again.
    pub flags_stale: bool,
    pub caching_stale: bool,
}

impl RenderableObject {
    pub fn from_object(object: &SceneObject) -> Self {
        Self {
            id: object.id,
            kind: object.kind,
            area: cache_area(object),
            bounds: object.bounds(),
            dirty: true,
            caching: object.caching,
            flags: ObjectFlags {
                visible: object.visible,
                selectable: object.selectable,
                evented: object.evented,
            },
            priority: base_priority(object.kind),
            flags_stale: false,
            caching_stale: false,
        }
    }
}

fn base_priority(kind: ObjectKind) -> InteractionPriority {
    match kind {
        ObjectKind::Text | ObjectKind::Path => InteractionPriority::Medium,
        _ => InteractionPriority::Low,
    }
}

/// Frame scheduler for the design canvas.
///
/// Nothing touches the surface outside [`RenderScheduler::tick`]: the other
/// methods only queue work and mark state dirty.
#[derive(Debug)]
pub struct RenderScheduler {
    config: SchedulerConfig,
    capabilities: DeviceCapabilities,
    tier: DeviceTier,
    profile: TierProfile,
    quality: QualitySettings,
    adaptive: AdaptiveController,
    objects: HashMap<ObjectId, RenderableObject>,
    culler: Culler,
    coords: CoordinateQueue,
    throttle: RenderThrottle,
    drag: DragSession,
    viewport: Viewport,
    selection: Option<ObjectId>,
    frame: u64,
    culling_dirty: bool,
    caching_dirty: bool,
    canvas_dirty: bool,
    last_fps: Option<f64>,
    counters: FrameCounters,
}

impl RenderScheduler {
    pub fn new(config: SchedulerConfig, capabilities: DeviceCapabilities) -> Self {
        let tier = config
            .device_override
            .unwrap_or_else(|| capabilities.classify());
        let profile = TierProfile::for_tier(tier);
        let level = OptimizationLevel::initial_for(tier);
        let quality = QualitySettings::resolve(tier, &profile, level);
        log::info!(
            "Device tier {tier:?} ({:?} cores, {:?} GB), optimization level {level:?}",
            capabilities.cores,
            capabilities.memory_gb
        );

        Self {
            adaptive: AdaptiveController::new(
                config.fps_window,
                config.escalate_ratio,
                config.relax_ratio,
                level,
            ),
            throttle: RenderThrottle::new(quality.target_fps),
            objects: HashMap::new(),
            culler: Culler::new(),
            coords: CoordinateQueue::new(),
            drag: DragSession::new(),
            viewport: Viewport::default(),
            selection: None,
            frame: 0,
            culling_dirty: true,
            caching_dirty: true,
            canvas_dirty: true,
            last_fps: None,
            counters: FrameCounters::default(),
            config,
            capabilities,
            tier,
            profile,
            quality,
        }
    }

    /// Scheduler for the device this process runs on.
    pub fn detect(config: SchedulerConfig) -> Self {
        Self::new(config, DeviceCapabilities::detect())
    }

    // ── Object registry ──────────────────────────────────────────────

    /// Track `object` above everything registered so far.
    pub fn register_object(&mut self, object: &SceneObject) {
        self.track(object, None);
    }

    /// Track `object` at `index` in the scene's stacking order, as when an
    /// undo puts an object back underneath others.
    pub fn register_object_at(&mut self, object: &SceneObject, index: usize) {
        self.track(object, Some(index));
    }

    fn track(&mut self, object: &SceneObject, index: Option<usize>) {
        let renderable = RenderableObject::from_object(object);
        match index {
            Some(z) => self
                .culler
                .insert_at(renderable.id, renderable.kind, renderable.bounds, z),
            None => self.culler.insert(renderable.id, renderable.kind, renderable.bounds),
        }
        self.objects.insert(renderable.id, renderable);
        self.refresh_priority(&object.id);
        self.queue_coordinates(object.id);
        self.culling_dirty = true;
        self.caching_dirty = true;
        self.throttle.request();
    }

    pub fn unregister_object(&mut self, id: &ObjectId) -> bool {
        if self.objects.remove(id).is_none() {
            return false;
        }
        self.culler.remove(id);
        self.coords.cancel(id);
        if self.selection == Some(*id) {
            self.selection = None;
        }
        if self.drag.is_dragging(id) {
            self.drag.reset();
            self.canvas_dirty = true;
        }
        self.culling_dirty = true;
        self.throttle.request();
        true
    }

    pub fn object(&self, id: &ObjectId) -> Option<&RenderableObject> {
        self.objects.get(id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ── Change notifications ─────────────────────────────────────────

    /// An edit finished on `id`: invalidate its cache, queue a coordinate
    /// refresh and re-push its culling and caching state on the next frame.
    pub fn notify_modified(&mut self, id: &ObjectId) {
        let Some(object) = self.objects.get_mut(id) else {
            log::debug!("Modified notification for unknown object {id}");
            return;
        };
        object.dirty = true;
        object.flags_stale = true;
        object.caching_stale = true;
        self.culling_dirty = true;
        self.caching_dirty = true;
        self.queue_coordinates(*id);
        self.throttle.request();
    }

    /// `id` is moving. Refreshes for the dragged object wait for pointer up.
    pub fn notify_moving(&mut self, id: &ObjectId) {
        if !self.objects.contains_key(id) {
            return;
        }
        if !self.drag.defer_move(id) {
            self.queue_coordinates(*id);
        }
        self.throttle.request();
    }

    pub fn request_redraw(&mut self) {
        self.throttle.request();
    }

    fn queue_coordinates(&mut self, id: ObjectId) {
        self.coords.schedule(
            id,
            self.profile.coordinates,
            self.frame,
            self.config.debounce_frames,
        );
    }

    // ── View state ───────────────────────────────────────────────────

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.culling_dirty = true;
        self.throttle.request();
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_selection(&mut self, id: Option<ObjectId>) {
        if self.selection == id {
            return;
        }
        if id.is_none() && self.drag.dragged().is_some() {
            // Selection cleared under an active drag: the drag is over.
            self.finish_interaction();
        }
        let previous = std::mem::replace(&mut self.selection, id);
        if let Some(previous) = previous {
            self.refresh_priority(&previous);
        }
        if let Some(current) = id {
            self.refresh_priority(&current);
        }
        self.culling_dirty = true;
        self.caching_dirty = true;
        self.throttle.request();
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    fn refresh_priority(&mut self, id: &ObjectId) {
        let active = self.selection == Some(*id) || self.drag.is_dragging(id);
        if let Some(object) = self.objects.get_mut(id) {
            object.priority = if active {
                InteractionPriority::High
            } else {
                base_priority(object.kind)
            };
        }
    }

    // ── Pointer interaction ──────────────────────────────────────────

    pub fn pointer_down(&mut self, target: Option<ObjectId>) -> InteractionState {
        if self.drag.state() != InteractionState::Idle {
            log::warn!(
                "Pointer down while {}, ending stale interaction",
                self.drag.state().name()
            );
            self.finish_interaction();
        }

        let target = target.filter(|id| self.objects.contains_key(id));
        match self.drag.pointer_down(target) {
            Ok(state) => {
                if let Some(id) = target {
                    self.set_selection(Some(id));
                    self.refresh_priority(&id);
                    self.canvas_dirty = true;
                    log::debug!("Drag started on {id}");
                }
                state
            }
            Err(e) => {
                log::warn!("{e}");
                self.finish_interaction();
                self.drag.state()
            }
        }
    }

    /// Hit-test a screen position and press there.
    pub fn pointer_down_at(&mut self, screen_x: f64, screen_y: f64) -> InteractionState {
        let target = self.hit_test(screen_x, screen_y);
        self.pointer_down(target)
    }

    pub fn pointer_up(&mut self) -> InteractionState {
        match self.drag.pointer_up() {
            Ok(Some(end)) => self.end_drag(end),
            Ok(None) => {}
            Err(e) => log::warn!("{e}"),
        }
        self.drag.state()
    }

    pub fn interaction(&self) -> InteractionState {
        self.drag.state()
    }

    /// Force the interaction back to idle, settling any drag in progress.
    pub fn finish_interaction(&mut self) {
        if let Some(end) = self.drag.reset() {
            self.end_drag(end);
        }
    }

    fn end_drag(&mut self, end: DragEnd) {
        let id = end.target;
        if end.moved {
            self.coords
                .schedule(id, CoordinateStrategy::Immediate, self.frame, self.config.debounce_frames);
        }
        self.refresh_priority(&id);
        self.canvas_dirty = true;
        self.caching_dirty = true;
        self.throttle.request();
        log::debug!("Drag ended on {id}");
    }

    /// Topmost visible, evented object under a screen position.
    pub fn hit_test(&self, screen_x: f64, screen_y: f64) -> Option<ObjectId> {
        let point = self.viewport.screen_to_scene(screen_x, screen_y);
        let slop_px = f64::from(self.profile.touch_sensitivity + self.quality.target_find_tolerance);
        let slop = slop_px / self.viewport.zoom;
        self.culler.hits(&point, slop).into_iter().find(|id| {
            self.objects
                .get(id)
                .is_some_and(|o| o.flags.visible && o.flags.evented)
        })
    }

    // ── Device and quality ───────────────────────────────────────────

    /// Replace the detected tier, or return to it with `None`.
    pub fn set_device_override(&mut self, tier: Option<DeviceTier>) {
        self.config.device_override = tier;
        let tier = tier.unwrap_or_else(|| self.capabilities.classify());
        self.tier = tier;
        self.profile = TierProfile::for_tier(tier);
        self.adaptive.reset(OptimizationLevel::initial_for(tier));
        self.refresh_quality();
        log::info!("Device tier set to {tier:?}");
    }

    pub fn record_fps_sample(&mut self, fps: f64) {
        self.last_fps = Some(fps);
        if let Some(change) = self.adaptive.record(fps, self.quality.target_fps) {
            log::info!("Optimization level {:?} -> {:?}", change.from, change.to);
            self.refresh_quality();
        }
    }

    fn refresh_quality(&mut self) {
        self.quality = QualitySettings::resolve(self.tier, &self.profile, self.adaptive.level());
        self.throttle.set_target_fps(self.quality.target_fps);
        self.canvas_dirty = true;
        self.caching_dirty = true;
        self.culling_dirty = true;
        self.throttle.request();
    }

    pub fn tier(&self) -> DeviceTier {
        self.tier
    }

    pub fn profile(&self) -> &TierProfile {
        &self.profile
    }

    pub fn quality(&self) -> &QualitySettings {
        &self.quality
    }

    pub fn optimization_level(&self) -> OptimizationLevel {
        self.adaptive.level()
    }

    pub fn canvas_flags(&self) -> CanvasFlags {
        let dragging = self.drag.dragged().is_some();
        CanvasFlags {
            per_pixel_hit_test: self.quality.per_pixel_hit_test && !dragging,
            controls_visible: !dragging,
            image_smoothing: self.quality.image_smoothing,
            skip_target_find: false,
            target_find_tolerance: self.quality.target_find_tolerance,
        }
    }

    // ── Frame loop ───────────────────────────────────────────────────

    /// Index of the next frame [`RenderScheduler::tick`] will run.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pending_coordinate_updates(&self) -> usize {
        self.coords.len()
    }

    /// Run one animation frame at `now` (time since the scheduler's clock origin).
    pub fn tick(&mut self, now: Duration, surface: &mut dyn RenderSurface) -> FrameReport {
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        if self.canvas_dirty {
            surface.apply_canvas_flags(self.canvas_flags());
            self.canvas_dirty = false;
            report.canvas_flags_applied = true;
        }

        self.flush_coordinates(surface, &mut report);

        if self.culling_dirty {
            if self.config.culling_enabled {
                self.apply_culling(surface, &mut report);
            }
            self.culling_dirty = false;
        }

        if self.caching_dirty {
            self.apply_caching(surface, &mut report);
            self.caching_dirty = false;
        }

        if report.canvas_flags_applied || report.coordinates_updated > 0 || report.flags_changed > 0 {
            self.throttle.request();
        }

        if self.throttle.ready(now) {
            match surface.draw() {
                Ok(()) => {
                    report.drew = true;
                    for object in self.objects.values_mut() {
                        object.dirty = false;
                    }
                }
                Err(e) => {
                    log::warn!("Frame {} failed to draw: {e}", self.frame);
                    report.draw_failed = true;
                }
            }
            self.throttle.mark_drawn(now);
        }

        self.counters.absorb(&report);
        self.frame += 1;
        report
    }

    fn flush_coordinates(&mut self, surface: &mut dyn RenderSurface, report: &mut FrameReport) {
        let due = self
            .coords
            .flush(self.frame, self.quality.max_simultaneous_renders);
        for id in due {
            if !self.objects.contains_key(&id) {
                continue;
            }
            match surface.recompute_bounds(&id) {
                Ok(bounds) => {
                    report.coordinates_updated += 1;
                    if self.culler.update_bounds(&id, bounds) {
                        self.culling_dirty = true;
                    }
                    if let Some(object) = self.objects.get_mut(&id) {
                        object.bounds = bounds;
                    }
                }
                Err(e) => {
                    log::warn!("Coordinate refresh failed: {e}");
                    report.coordinate_failures += 1;
                }
            }
        }
    }

    fn apply_culling(&mut self, surface: &mut dyn RenderSurface, report: &mut FrameReport) {
        let plan = self.culler.plan(
            &self.viewport,
            self.profile.culling_padding,
            self.profile.max_visible,
            self.selection,
        );
        let shown = plan.visible.iter().map(|id| (id, ObjectFlags::shown()));
        let hidden = plan
            .over_cap
            .iter()
            .chain(plan.outside.iter())
            .map(|id| (id, ObjectFlags::hidden()));

        for (id, flags) in shown.chain(hidden) {
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            if object.flags == flags && !object.flags_stale {
                continue;
            }
            match surface.apply_object_flags(id, flags) {
                Ok(()) => {
                    object.flags = flags;
                    object.flags_stale = false;
                    report.flags_changed += 1;
                }
                Err(e) => {
                    log::warn!("Culling update failed: {e}");
                    report.object_failures += 1;
                }
            }
        }
        log::debug!(
            "Culled to {}/{} visible ({} over cap)",
            plan.visible.len(),
            self.objects.len(),
            plan.over_cap.len()
        );
    }

    fn apply_caching(&mut self, surface: &mut dyn RenderSurface, report: &mut FrameReport) {
        let strategy = self.quality.cache;
        let large_image_area = self.config.large_image_area;
        for object in self.objects.values_mut() {
            let high = object.priority == InteractionPriority::High;
            let wanted = strategy.should_cache(object.kind, object.area, high, large_image_area);
            if wanted == object.caching && !object.caching_stale {
                continue;
            }
            match surface.set_caching(&object.id, wanted) {
                Ok(()) => {
                    object.caching = wanted;
                    object.caching_stale = false;
                    object.dirty = true;
                    report.caching_changed += 1;
                }
                Err(e) => {
                    log::warn!("Cache update failed: {e}");
                    report.object_failures += 1;
                }
            }
        }
    }

    // ── Metrics ──────────────────────────────────────────────────────

    pub fn performance_snapshot(&self) -> PerformanceSnapshot {
        let target_fps = self.quality.target_fps;
        let average_fps = self
            .adaptive
            .average()
            .or(self.last_fps)
            .unwrap_or(target_fps);
        let performance_ratio = if target_fps > 0.0 {
            average_fps / target_fps
        } else {
            0.0
        };

        PerformanceSnapshot {
            device_tier: self.tier,
            optimization_level: self.adaptive.level(),
            average_fps,
            target_fps,
            performance_ratio,
            is_optimal: average_fps >= target_fps * self.config.relax_ratio,
            object_count: self.objects.len(),
            visible_count: self.objects.values().filter(|o| o.flags.visible).count(),
            pending_coordinate_updates: self.coords.len(),
            interaction: self.drag.state(),
            frames_drawn: self.counters.frames_drawn,
            frames_failed: self.counters.frames_failed,
            coordinate_failures: self.counters.coordinate_failures,
        }
    }
}
