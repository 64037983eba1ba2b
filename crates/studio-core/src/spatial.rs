use std::fmt;

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point};
use crate::object::ObjectId;

/// An entry in the R-tree spatial index, referencing a scene object by id.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialEntry {
    pub id: ObjectId,
    /// World-space bounding box of the object.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

/// Spatial index for pointer hit queries and viewport culling.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index from a list of object bounding boxes.
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, entry: SpatialEntry) {
        self.tree.insert(entry);
    }

    /// Remove the entry for `id`, given the bbox it was indexed under.
    pub fn remove(&mut self, id: ObjectId, bbox: BBox) -> bool {
        self.tree.remove(&SpatialEntry { id, bbox }).is_some()
    }

    /// Find all entries whose bounding box contains the given point.
    pub fn query_point(&self, point: &Point) -> Vec<&SpatialEntry> {
        let probe = AABB::from_point([point.x, point.y]);
        self.tree.locate_in_envelope_intersecting(&probe).collect()
    }

    /// Find all entries that intersect with the given viewport bounding box.
    pub fn query_viewport(&self, viewport: &BBox) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners(
            [viewport.min.x, viewport.min.y],
            [viewport.max.x, viewport.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex").field("len", &self.len()).finish()
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
