use studio_core::geometry::BBox;
use studio_core::object::ObjectId;
use studio_core::scene::{CanvasFlags, Scene};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Object {0} is no longer on the canvas")]
    ObjectDisposed(ObjectId),

    #[error("Draw failed: {0}")]
    DrawFailed(String),
}

/// Per-object visibility and hit-test switches set by culling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectFlags {
    pub visible: bool,
    pub selectable: bool,
    pub evented: bool,
}

impl ObjectFlags {
    pub fn shown() -> Self {
        Self {
            visible: true,
            selectable: true,
            evented: true,
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            selectable: false,
            evented: false,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.selectable && self.evented
    }
}

/// What the scheduler needs from the canvas it drives.
pub trait RenderSurface {
    /// Recompute and return an object's scene-space bounds.
    fn recompute_bounds(&mut self, id: &ObjectId) -> Result<BBox, RenderError>;

    fn apply_object_flags(&mut self, id: &ObjectId, flags: ObjectFlags) -> Result<(), RenderError>;

    fn set_caching(&mut self, id: &ObjectId, caching: bool) -> Result<(), RenderError>;

    fn apply_canvas_flags(&mut self, flags: CanvasFlags);

    fn draw(&mut self) -> Result<(), RenderError>;
}

impl RenderSurface for Scene {
    fn recompute_bounds(&mut self, id: &ObjectId) -> Result<BBox, RenderError> {
        let object = self.get_mut(id).ok_or(RenderError::ObjectDisposed(*id))?;
        Ok(object.set_coords())
    }

    fn apply_object_flags(&mut self, id: &ObjectId, flags: ObjectFlags) -> Result<(), RenderError> {
        let object = self.get_mut(id).ok_or(RenderError::ObjectDisposed(*id))?;
        object.visible = flags.visible;
        object.selectable = flags.selectable;
        object.evented = flags.evented;
        Ok(())
    }

    fn set_caching(&mut self, id: &ObjectId, caching: bool) -> Result<(), RenderError> {
        let object = self.get_mut(id).ok_or(RenderError::ObjectDisposed(*id))?;
        object.caching = caching;
        if caching {
            object.dirty = true;
        }
        Ok(())
    }

    fn apply_canvas_flags(&mut self, flags: CanvasFlags) {
        self.canvas = flags;
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        self.frames_drawn += 1;
        for object in self.objects_mut() {
            object.dirty = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::object::{ObjectKind, SceneObject};

    #[test]
    fn test_scene_surface() {
        let mut scene = Scene::new("t");
        let id = scene.add(SceneObject::new(ObjectKind::Image, 10.0, 20.0, 30.0, 40.0));

        let bounds = scene.recompute_bounds(&id).unwrap();
        assert_eq!(bounds, BBox::from_origin_size(10.0, 20.0, 30.0, 40.0));
        assert_eq!(scene.get(&id).unwrap().coords, Some(bounds));

        scene.apply_object_flags(&id, ObjectFlags::hidden()).unwrap();
        let obj = scene.get(&id).unwrap();
        assert!(!obj.visible && !obj.selectable && !obj.evented);

        scene.set_caching(&id, true).unwrap();
        assert!(scene.get(&id).unwrap().caching);

        scene.draw().unwrap();
        assert_eq!(scene.frames_drawn, 1);
        assert!(!scene.get(&id).unwrap().dirty);
    }

    #[test]
    fn test_disposed_object() {
        let mut scene = Scene::new("t");
        let ghost = ObjectId::new_v4();
        assert_eq!(scene.recompute_bounds(&ghost), Err(RenderError::ObjectDisposed(ghost)));
        assert!(scene.apply_object_flags(&ghost, ObjectFlags::shown()).is_err());
    }
}
