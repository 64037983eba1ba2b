use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use studio_core::geometry::{BBox, Point};
use studio_core::object::{ObjectId, ObjectKind};
use studio_core::spatial::{SpatialEntry, SpatialIndex};

use crate::viewport::Viewport;

/// Culling order: the selected object first, then text, image, path, everything else.
pub fn type_rank(kind: ObjectKind, selected: bool) -> u8 {
    if selected {
        return 100;
    }
    match kind {
        ObjectKind::Text => 80,
        ObjectKind::Image => 60,
        ObjectKind::Path => 40,
        ObjectKind::Shape | ObjectKind::Group => 20,
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    kind: ObjectKind,
    bounds: BBox,
    /// Stacking position, 0 at the bottom.
    order: usize,
}

/// The outcome of one culling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullPlan {
    /// Shown and interactive, highest rank first.
    pub visible: Vec<ObjectId>,
    /// Inside the padded viewport but past the visible cap.
    pub over_cap: Vec<ObjectId>,
    /// Outside the padded viewport.
    pub outside: Vec<ObjectId>,
}

impl CullPlan {
    pub fn is_visible(&self, id: &ObjectId) -> bool {
        self.visible.contains(id)
    }
}

/// Bounds of every registered object, indexed for viewport and point queries.
#[derive(Debug, Default)]
pub struct Culler {
    index: SpatialIndex,
    tracked: HashMap<ObjectId, Tracked>,
}

impl Culler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.tracked.contains_key(id)
    }

    pub fn bounds(&self, id: &ObjectId) -> Option<BBox> {
        self.tracked.get(id).map(|t| t.bounds)
    }

    pub fn stacking_index(&self, id: &ObjectId) -> Option<usize> {
        self.tracked.get(id).map(|t| t.order)
    }

    /// Start tracking `id` on top of the stack. An already tracked object
    /// keeps its stacking position and takes the new bounds.
    pub fn insert(&mut self, id: ObjectId, kind: ObjectKind, bounds: BBox) {
        let z = self.stacking_index(&id).unwrap_or(self.tracked.len());
        self.insert_at(id, kind, bounds, z);
    }

    /// Track `id` at stacking position `z`, lifting everything at or above
    /// it by one. Positions past the top are clamped.
    pub fn insert_at(&mut self, id: ObjectId, kind: ObjectKind, bounds: BBox, z: usize) {
        self.remove(&id);
        let z = z.min(self.tracked.len());
        for tracked in self.tracked.values_mut() {
            if tracked.order >= z {
                tracked.order += 1;
            }
        }
        self.index.insert(SpatialEntry { id, bbox: bounds });
        self.tracked.insert(id, Tracked { kind, bounds, order: z });
    }

    pub fn remove(&mut self, id: &ObjectId) -> bool {
        let Some(removed) = self.tracked.remove(id) else {
            return false;
        };
        for tracked in self.tracked.values_mut() {
            if tracked.order > removed.order {
                tracked.order -= 1;
            }
        }
        self.index.remove(*id, removed.bounds)
    }

    /// Re-index an object whose bounds changed. Returns true if they differed.
    pub fn update_bounds(&mut self, id: &ObjectId, bounds: BBox) -> bool {
        let Some(tracked) = self.tracked.get_mut(id) else {
            return false;
        };
        if tracked.bounds == bounds {
            return false;
        }
        self.index.remove(*id, tracked.bounds);
        tracked.bounds = bounds;
        self.index.insert(SpatialEntry { id: *id, bbox: bounds });
        true
    }

    pub fn plan(
        &self,
        viewport: &Viewport,
        padding: f64,
        max_visible: usize,
        selected: Option<ObjectId>,
    ) -> CullPlan {
        let frustum = viewport.padded_bounds(padding);
        let center = frustum.center();

        let mut candidates: Vec<(ObjectId, u8, f64, usize)> = self
            .index
            .query_viewport(&frustum)
            .into_iter()
            .filter_map(|entry| {
                let tracked = self.tracked.get(&entry.id)?;
                let rank = type_rank(tracked.kind, selected == Some(entry.id));
                let distance = tracked.bounds.center().distance_to(&center);
                Some((entry.id, rank, distance, tracked.order))
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.2.partial_cmp(&b.2).unwrap_or(Ordering::Equal))
                .then(a.3.cmp(&b.3))
        });

        let inside: HashSet<ObjectId> = candidates.iter().map(|c| c.0).collect();
        let mut outside: Vec<(usize, ObjectId)> = self
            .tracked
            .iter()
            .filter(|(id, _)| !inside.contains(id))
            .map(|(id, t)| (t.order, *id))
            .collect();
        outside.sort();

        let split = candidates.len().min(max_visible);
        let over_cap = candidates.split_off(split);
        CullPlan {
            visible: candidates.into_iter().map(|c| c.0).collect(),
            over_cap: over_cap.into_iter().map(|c| c.0).collect(),
            outside: outside.into_iter().map(|(_, id)| id).collect(),
        }
    }

    /// Objects under a scene point, topmost first.
    /// `slop` grows the probe into a square of that half-width.
    pub fn hits(&self, point: &Point, slop: f64) -> Vec<ObjectId> {
        let entries = if slop > 0.0 {
            self.index.query_viewport(&BBox::new(*point, *point).expand(slop))
        } else {
            self.index.query_point(point)
        };
        let mut hits: Vec<(usize, ObjectId)> = entries
            .into_iter()
            .filter_map(|e| self.tracked.get(&e.id).map(|t| (t.order, e.id)))
            .collect();
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        hits.into_iter().map(|(_, id)| id).collect()
    }
}
