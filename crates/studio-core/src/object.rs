use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::geometry::{BBox, Point};

/// Unique, stable identity of a scene object.
pub type ObjectId = Uuid;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("Object {0} not found in scene")]
    ObjectNotFound(ObjectId),

    #[error("Index {index} out of range for {len} objects")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Property '{name}' cannot be set to {value}")]
    InvalidProperty { name: String, value: Value },

    #[error("Object state codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// The scene-graph type tag of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Text,
    Image,
    Path,
    Shape,
    Group,
}

/// Movement/rotation/scaling locks applied by the Lock and Unlock edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFlags {
    #[serde(rename = "lock_movement_x")]
    pub movement_x: bool,
    #[serde(rename = "lock_movement_y")]
    pub movement_y: bool,
    #[serde(rename = "lock_rotation")]
    pub rotation: bool,
    #[serde(rename = "lock_scaling_x")]
    pub scaling_x: bool,
    #[serde(rename = "lock_scaling_y")]
    pub scaling_y: bool,
    pub has_controls: bool,
}

impl Default for LockFlags {
    fn default() -> Self {
        Self::unlocked()
    }
}

impl LockFlags {
    pub fn unlocked() -> Self {
        Self {
            movement_x: false,
            movement_y: false,
            rotation: false,
            scaling_x: false,
            scaling_y: false,
            has_controls: true,
        }
    }

    pub fn locked() -> Self {
        Self {
            movement_x: true,
            movement_y: true,
            rotation: true,
            scaling_x: true,
            scaling_y: true,
            has_controls: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.movement_x && self.movement_y
    }
}

/// The transform an interaction applied to an object (move, scale, rotate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation delta.
    pub offset: Point,
    /// Rotation delta in degrees.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: Point::new(0.0, 0.0),
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Transform {
    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn rotate(degrees: f64) -> Self {
        Self {
            rotation: degrees,
            ..Default::default()
        }
    }

    pub fn scale(scale_x: f64, scale_y: f64) -> Self {
        Self {
            scale_x,
            scale_y,
            ..Default::default()
        }
    }
}

fn one() -> f64 {
    1.0
}

fn yes() -> bool {
    true
}

/// An object in the reference scene graph.
///
/// Serialized fields mirror the plain-object form a canvas library emits;
/// the trailing `#[serde(skip)]` fields are render-side state that never
/// enters history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default = "yes")]
    pub selectable: bool,
    #[serde(default = "yes")]
    pub evented: bool,
    #[serde(default)]
    pub lock: LockFlags,
    /// Group members, positioned relative to this object's `left`/`top`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneObject>,
    /// Free-form properties (fill, text, src, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(skip)]
    pub coords: Option<BBox>,
    #[serde(skip)]
    pub caching: bool,
    #[serde(skip)]
    pub dirty: bool,
}

impl SceneObject {
    pub fn new(kind: ObjectKind, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            visible: true,
            selectable: true,
            evented: true,
            lock: LockFlags::unlocked(),
            children: Vec::new(),
            props: Map::new(),
            coords: None,
            caching: false,
            dirty: true,
        }
    }

    /// Build a group around `members`, rebasing them onto the group origin.
    pub fn group(members: Vec<SceneObject>) -> Self {
        let bounds = members
            .iter()
            .map(|m| m.bounds())
            .reduce(|acc, bb| acc.union(&bb))
            .unwrap_or_else(|| BBox::from_origin_size(0.0, 0.0, 0.0, 0.0));

        let mut group = Self::new(
            ObjectKind::Group,
            bounds.min.x,
            bounds.min.y,
            bounds.width(),
            bounds.height(),
        );
        group.children = members
            .into_iter()
            .map(|mut m| {
                m.translate(-bounds.min.x, -bounds.min.y);
                m
            })
            .collect();
        group
    }

    pub fn with_prop(mut self, name: &str, value: Value) -> Self {
        self.props.insert(name.to_string(), value);
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.left += dx;
        self.top += dy;
        self.dirty = true;
    }

    /// World-space axis-aligned bounds, accounting for scale and rotation about the center.
    pub fn bounds(&self) -> BBox {
        let w = self.width * self.scale_x;
        let h = self.height * self.scale_y;
        if self.angle == 0.0 {
            return BBox::from_origin_size(self.left, self.top, w, h);
        }

        let cx = self.left + w / 2.0;
        let cy = self.top + h / 2.0;
        let rad = self.angle.to_radians();
        let (sin_r, cos_r) = rad.sin_cos();
        let corners: Vec<Point> = [(-w, -h), (w, -h), (w, h), (-w, h)]
            .iter()
            .map(|&(dx, dy)| {
                let (hx, hy) = (dx / 2.0, dy / 2.0);
                Point::new(cx + hx * cos_r - hy * sin_r, cy + hx * sin_r + hy * cos_r)
            })
            .collect();
        BBox::from_points(&corners).unwrap_or_else(|| BBox::from_origin_size(self.left, self.top, w, h))
    }

    /// Recompute and cache the object's screen-space bounds.
    pub fn set_coords(&mut self) -> BBox {
        let bounds = self.bounds();
        self.coords = Some(bounds);
        bounds
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        match name {
            "left" => Some(Value::from(self.left)),
            "top" => Some(Value::from(self.top)),
            "width" => Some(Value::from(self.width)),
            "height" => Some(Value::from(self.height)),
            "scale_x" => Some(Value::from(self.scale_x)),
            "scale_y" => Some(Value::from(self.scale_y)),
            "angle" => Some(Value::from(self.angle)),
            "opacity" => Some(Value::from(self.opacity)),
            "visible" => Some(Value::from(self.visible)),
            "selectable" => Some(Value::from(self.selectable)),
            "evented" => Some(Value::from(self.evented)),
            other => self.props.get(other).cloned(),
        }
    }

    /// Set a single named property. Geometry and flag names map onto typed
    /// fields; anything else lands in `props`.
    pub fn set_property(&mut self, name: &str, value: Value) -> Result<(), SceneError> {
        let invalid = |value: &Value| SceneError::InvalidProperty {
            name: name.to_string(),
            value: value.clone(),
        };

        match name {
            "left" | "top" | "width" | "height" | "scale_x" | "scale_y" | "angle" | "opacity" => {
                let n = value.as_f64().ok_or_else(|| invalid(&value))?;
                let slot = match name {
                    "left" => &mut self.left,
                    "top" => &mut self.top,
                    "width" => &mut self.width,
                    "height" => &mut self.height,
                    "scale_x" => &mut self.scale_x,
                    "scale_y" => &mut self.scale_y,
                    "angle" => &mut self.angle,
                    _ => &mut self.opacity,
                };
                *slot = n;
            }
            "visible" | "selectable" | "evented" => {
                let b = value.as_bool().ok_or_else(|| invalid(&value))?;
                match name {
                    "visible" => self.visible = b,
                    "selectable" => self.selectable = b,
                    _ => self.evented = b,
                }
            }
            "id" | "type" | "children" | "lock" => return Err(invalid(&value)),
            other => {
                if value.is_null() {
                    self.props.remove(other);
                } else {
                    self.props.insert(other.to_string(), value);
                }
            }
        }
        self.dirty = true;
        Ok(())
    }

    pub fn set_lock(&mut self, locked: bool) {
        self.lock = if locked {
            LockFlags::locked()
        } else {
            LockFlags::unlocked()
        };
    }

    pub fn state(&self) -> Result<ObjectState, SceneError> {
        ObjectState::capture(self)
    }
}

/// A plain serialized copy of a [`SceneObject`], as stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectState(Value);

impl ObjectState {
    pub fn capture(object: &SceneObject) -> Result<Self, SceneError> {
        Ok(Self(serde_json::to_value(object)?))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Rebuild a live object from this state.
    pub fn restore(&self) -> Result<SceneObject, SceneError> {
        Ok(serde_json::from_value(self.0.clone())?)
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.0
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
    }

    pub fn kind(&self) -> Option<ObjectKind> {
        self.0
            .get("type")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn position(&self) -> Option<Point> {
        let left = self.0.get("left").and_then(Value::as_f64)?;
        let top = self.0.get("top").and_then(Value::as_f64)?;
        Some(Point::new(left, top))
    }

    pub fn size(&self) -> Option<(f64, f64)> {
        let w = self.0.get("width").and_then(Value::as_f64)?;
        let h = self.0.get("height").and_then(Value::as_f64)?;
        Some((w, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_roundtrip_is_lossless() {
        let obj = SceneObject::new(ObjectKind::Text, 10.0, 20.0, 100.0, 40.0)
            .with_prop("text", json!("Hello"));
        let state = obj.state().unwrap();
        assert_eq!(state.id(), Some(obj.id));
        assert_eq!(state.kind(), Some(ObjectKind::Text));
        assert_eq!(state.position(), Some(Point::new(10.0, 20.0)));

        let restored = state.restore().unwrap();
        assert_eq!(restored.state().unwrap(), state);
        assert_eq!(restored.props["text"], json!("Hello"));
    }

    #[test]
    fn test_render_state_is_not_serialized() {
        let mut obj = SceneObject::new(ObjectKind::Image, 0.0, 0.0, 10.0, 10.0);
        let before = obj.state().unwrap();
        obj.set_coords();
        obj.caching = true;
        assert_eq!(obj.state().unwrap(), before);
    }

    #[test]
    fn test_set_property_typed_and_free_form() {
        let mut obj = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 10.0, 10.0);
        obj.set_property("left", json!(50)).unwrap();
        obj.set_property("visible", json!(false)).unwrap();
        obj.set_property("fill", json!("#ff0000")).unwrap();
        assert_eq!(obj.left, 50.0);
        assert!(!obj.visible);
        assert_eq!(obj.property("fill"), Some(json!("#ff0000")));

        obj.set_property("fill", Value::Null).unwrap();
        assert_eq!(obj.property("fill"), None);
    }

    #[test]
    fn test_set_property_rejects_bad_values() {
        let mut obj = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 10.0, 10.0);
        assert!(obj.set_property("left", json!("far")).is_err());
        assert!(obj.set_property("id", json!("x")).is_err());
        assert_eq!(obj.left, 0.0);
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let mut obj = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 10.0, 10.0);
        obj.angle = 45.0;
        let bb = obj.bounds();
        let diag = 10.0 * std::f64::consts::SQRT_2;
        assert!((bb.width() - diag).abs() < 1e-9);
        assert!((bb.center().x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_group_rebases_children() {
        let a = SceneObject::new(ObjectKind::Shape, 10.0, 10.0, 10.0, 10.0);
        let b = SceneObject::new(ObjectKind::Shape, 30.0, 40.0, 10.0, 10.0);
        let group = SceneObject::group(vec![a, b]);
        assert_eq!(group.position(), Point::new(10.0, 10.0));
        assert!((group.width - 30.0).abs() < 1e-10);
        assert!((group.height - 40.0).abs() < 1e-10);
        assert_eq!(group.children[0].position(), Point::new(0.0, 0.0));
        assert_eq!(group.children[1].position(), Point::new(20.0, 30.0));
    }

    #[test]
    fn test_lock_flags() {
        let mut obj = SceneObject::new(ObjectKind::Image, 0.0, 0.0, 1.0, 1.0);
        obj.set_lock(true);
        assert!(obj.lock.is_locked());
        assert!(!obj.lock.has_controls);
        obj.set_lock(false);
        assert_eq!(obj.lock, LockFlags::unlocked());
    }
}
