use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::object::{ObjectId, SceneError, SceneObject};

/// The object container a canvas library exposes to the editing core.
///
/// History replay only ever touches the scene through this trait, so any
/// scene-graph binding can sit behind it.
pub trait SceneGraph {
    /// Number of top-level objects.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn object_at(&self, index: usize) -> Option<&SceneObject>;

    fn object_at_mut(&mut self, index: usize) -> Option<&mut SceneObject>;

    fn index_of(&self, id: &ObjectId) -> Option<usize> {
        (0..self.len()).find(|&i| self.object_at(i).is_some_and(|o| &o.id == id))
    }

    /// Insert at `index`, appending when the index is past the end.
    fn insert_at(&mut self, index: usize, object: SceneObject);

    fn remove_at(&mut self, index: usize) -> Option<SceneObject>;

    fn replace_at(&mut self, index: usize, object: SceneObject) -> Result<SceneObject, SceneError> {
        let len = self.len();
        let old = self
            .remove_at(index)
            .ok_or(SceneError::IndexOutOfRange { index, len })?;
        self.insert_at(index, object);
        Ok(old)
    }

    /// The currently selected object, if any.
    fn selected(&self) -> Option<ObjectId>;

    /// Ask the scene to redraw on its next frame.
    fn request_render(&mut self);
}

/// Canvas-wide interaction and quality switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasFlags {
    /// Exact per-pixel hit testing (expensive) instead of bounding-box tests.
    pub per_pixel_hit_test: bool,
    /// Transform handles drawn around the active object.
    pub controls_visible: bool,
    pub image_smoothing: bool,
    /// Skip pointer target lookup entirely.
    pub skip_target_find: bool,
    /// Extra pixels around an object that still count as a hit.
    pub target_find_tolerance: u32,
}

impl Default for CanvasFlags {
    fn default() -> Self {
        Self {
            per_pixel_hit_test: true,
            controls_visible: true,
            image_smoothing: true,
            skip_target_find: false,
            target_find_tolerance: 0,
        }
    }
}

/// In-memory reference scene: an ordered list of objects plus selection.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Scene {
    pub id: Uuid,
    pub name: String,
    objects: Vec<SceneObject>,
    pub selection: Option<ObjectId>,
    #[serde(skip)]
    pub canvas: CanvasFlags,
    /// Redraw requests received since creation.
    #[serde(skip)]
    pub render_requests: u64,
    #[serde(skip)]
    pub frames_drawn: u64,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            objects: Vec::new(),
            selection: None,
            canvas: CanvasFlags::default(),
            render_requests: 0,
            frames_drawn: 0,
        }
    }

    // ── Object management ────────────────────────────────────────────

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id;
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: &ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|o| &o.id == id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| &o.id == id)
    }

    pub fn remove(&mut self, id: &ObjectId) -> Option<SceneObject> {
        let index = self.index_of(id)?;
        if self.selection == Some(*id) {
            self.selection = None;
        }
        Some(self.objects.remove(index))
    }

    pub fn select(&mut self, id: Option<ObjectId>) {
        self.selection = id;
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut SceneObject> {
        self.objects.iter_mut()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl SceneGraph for Scene {
    fn len(&self) -> usize {
        self.objects.len()
    }

    fn object_at(&self, index: usize) -> Option<&SceneObject> {
        self.objects.get(index)
    }

    fn object_at_mut(&mut self, index: usize) -> Option<&mut SceneObject> {
        self.objects.get_mut(index)
    }

    fn index_of(&self, id: &ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| &o.id == id)
    }

    fn insert_at(&mut self, index: usize, object: SceneObject) {
        if index <= self.objects.len() {
            self.objects.insert(index, object);
        } else {
            self.objects.push(object);
        }
    }

    fn remove_at(&mut self, index: usize) -> Option<SceneObject> {
        if index >= self.objects.len() {
            return None;
        }
        let removed = self.objects.remove(index);
        if self.selection == Some(removed.id) {
            self.selection = None;
        }
        Some(removed)
    }

    fn selected(&self) -> Option<ObjectId> {
        self.selection
    }

    fn request_render(&mut self) {
        self.render_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    #[test]
    fn test_scene_create() {
        let scene = Scene::new("poster");
        assert_eq!(scene.name, "poster");
        assert!(scene.is_empty());
        assert!(scene.selected().is_none());
    }

    #[test]
    fn test_insert_at_clamps_to_end() {
        let mut scene = Scene::new("t");
        let a = scene.add(SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0));
        let b = SceneObject::new(ObjectKind::Text, 0.0, 0.0, 1.0, 1.0);
        let b_id = b.id;
        scene.insert_at(99, b);
        assert_eq!(scene.index_of(&a), Some(0));
        assert_eq!(scene.index_of(&b_id), Some(1));

        let c = SceneObject::new(ObjectKind::Image, 0.0, 0.0, 1.0, 1.0);
        let c_id = c.id;
        scene.insert_at(0, c);
        assert_eq!(scene.index_of(&c_id), Some(0));
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut scene = Scene::new("t");
        let id = scene.add(SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0));
        scene.select(Some(id));
        assert!(scene.remove_at(0).is_some());
        assert!(scene.selected().is_none());
        assert!(scene.remove_at(0).is_none());
    }

    #[test]
    fn test_replace_at_out_of_range() {
        let mut scene = Scene::new("t");
        let obj = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        assert!(matches!(
            scene.replace_at(3, obj),
            Err(SceneError::IndexOutOfRange { index: 3, len: 0 })
        ));
    }

    #[test]
    fn test_scene_json_roundtrip() {
        let mut scene = Scene::new("t");
        scene.add(SceneObject::new(ObjectKind::Path, 5.0, 6.0, 7.0, 8.0));
        let json = scene.to_json().unwrap();
        let back = Scene::from_json(&json).unwrap();
        assert_eq!(back.object_count(), 1);
        assert_eq!(back.objects()[0].state().unwrap(), scene.objects()[0].state().unwrap());
    }
}
