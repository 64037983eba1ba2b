use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::object::{ObjectId, ObjectState, SceneError, SceneObject, Transform};

/// Discriminant of a [`SnapshotPayload`], also the persisted row `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    Add,
    Delete,
    Modify,
    PropertyChange,
    Group,
    Ungroup,
    Lock,
    Unlock,
}

impl SnapshotKind {
    pub fn label(&self) -> &'static str {
        match self {
            SnapshotKind::Add => "Add object",
            SnapshotKind::Delete => "Delete object",
            SnapshotKind::Modify => "Modify object",
            SnapshotKind::PropertyChange => "Change property",
            SnapshotKind::Group => "Group objects",
            SnapshotKind::Ungroup => "Ungroup objects",
            SnapshotKind::Lock => "Lock object",
            SnapshotKind::Unlock => "Unlock object",
        }
    }
}

/// Which interaction produced a Modify edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyAction {
    Move,
    Scale,
    Rotate,
    Resize,
    Skew,
    Other,
}

/// Kind-specific data of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotPayload {
    Add,
    Delete,
    Modify {
        action: ModifyAction,
        transform: Transform,
        /// Serialized state after the modification; redo restores it.
        result: ObjectState,
    },
    PropertyChange {
        property: String,
        old_value: Value,
        new_value: Value,
    },
    /// `objects` are the members, positioned relative to the group origin.
    Group { objects: Vec<ObjectState> },
    Ungroup { objects: Vec<ObjectState> },
    Lock,
    Unlock,
}

impl SnapshotPayload {
    pub fn kind(&self) -> SnapshotKind {
        match self {
            SnapshotPayload::Add => SnapshotKind::Add,
            SnapshotPayload::Delete => SnapshotKind::Delete,
            SnapshotPayload::Modify { .. } => SnapshotKind::Modify,
            SnapshotPayload::PropertyChange { .. } => SnapshotKind::PropertyChange,
            SnapshotPayload::Group { .. } => SnapshotKind::Group,
            SnapshotPayload::Ungroup { .. } => SnapshotKind::Ungroup,
            SnapshotPayload::Lock => SnapshotKind::Lock,
            SnapshotPayload::Unlock => SnapshotKind::Unlock,
        }
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// An immutable record of one edit operation.
///
/// The sequence id is zero until the history log assigns one on insertion;
/// nothing outside this crate can change a snapshot after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    sequence_id: u64,
    timestamp: u64,
    target: Option<ObjectState>,
    container_index: Option<usize>,
    payload: SnapshotPayload,
}

impl Snapshot {
    pub fn new(
        payload: SnapshotPayload,
        target: Option<ObjectState>,
        container_index: Option<usize>,
    ) -> Self {
        Self {
            sequence_id: 0,
            timestamp: now_millis(),
            target,
            container_index,
            payload,
        }
    }

    /// `object` was inserted at `index`.
    pub fn add(object: &SceneObject, index: usize) -> Result<Self, SceneError> {
        Ok(Self::new(SnapshotPayload::Add, Some(object.state()?), Some(index)))
    }

    /// `object` was removed from `index`.
    pub fn delete(object: &SceneObject, index: usize) -> Result<Self, SceneError> {
        Ok(Self::new(SnapshotPayload::Delete, Some(object.state()?), Some(index)))
    }

    /// The object at `index` went from `before` to `after`.
    pub fn modify(
        before: &SceneObject,
        after: &SceneObject,
        index: usize,
        action: ModifyAction,
        transform: Transform,
    ) -> Result<Self, SceneError> {
        Ok(Self::new(
            SnapshotPayload::Modify {
                action,
                transform,
                result: after.state()?,
            },
            Some(before.state()?),
            Some(index),
        ))
    }

    /// One property of `object` changes from `old_value` to `new_value`.
    /// `object` is the state before the change.
    pub fn property_change(
        object: &SceneObject,
        index: usize,
        property: &str,
        old_value: Value,
        new_value: Value,
    ) -> Result<Self, SceneError> {
        Ok(Self::new(
            SnapshotPayload::PropertyChange {
                property: property.to_string(),
                old_value,
                new_value,
            },
            Some(object.state()?),
            Some(index),
        ))
    }

    /// `group` was formed from its children and inserted at `index`.
    pub fn group(group: &SceneObject, index: usize) -> Result<Self, SceneError> {
        let objects = member_states(group)?;
        Ok(Self::new(
            SnapshotPayload::Group { objects },
            Some(group.state()?),
            Some(index),
        ))
    }

    /// `group` at `index` was dissolved into its children.
    pub fn ungroup(group: &SceneObject, index: usize) -> Result<Self, SceneError> {
        let objects = member_states(group)?;
        Ok(Self::new(
            SnapshotPayload::Ungroup { objects },
            Some(group.state()?),
            Some(index),
        ))
    }

    pub fn lock(object: &SceneObject, index: usize) -> Result<Self, SceneError> {
        Ok(Self::new(SnapshotPayload::Lock, Some(object.state()?), Some(index)))
    }

    pub fn unlock(object: &SceneObject, index: usize) -> Result<Self, SceneError> {
        Ok(Self::new(SnapshotPayload::Unlock, Some(object.state()?), Some(index)))
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn kind(&self) -> SnapshotKind {
        self.payload.kind()
    }

    pub fn target(&self) -> Option<&ObjectState> {
        self.target.as_ref()
    }

    pub fn target_id(&self) -> Option<ObjectId> {
        self.target.as_ref().and_then(ObjectState::id)
    }

    pub fn container_index(&self) -> Option<usize> {
        self.container_index
    }

    pub fn payload(&self) -> &SnapshotPayload {
        &self.payload
    }

    pub(crate) fn stamp(&mut self, sequence_id: u64) {
        self.sequence_id = sequence_id;
    }

    /// Fold a later capture of the same edit into this pending one: the
    /// earliest before-state survives, the latest after-state wins.
    /// Returns false when the two cannot be merged.
    pub(crate) fn absorb(&mut self, later: Snapshot) -> bool {
        if self.kind() != later.kind() || self.target_id() != later.target_id() {
            return false;
        }

        match (&mut self.payload, later.payload) {
            (
                SnapshotPayload::Modify {
                    action,
                    transform,
                    result,
                },
                SnapshotPayload::Modify {
                    action: later_action,
                    transform: later_transform,
                    result: later_result,
                },
            ) => {
                *action = later_action;
                transform.offset = transform
                    .offset
                    .translate(later_transform.offset.x, later_transform.offset.y);
                transform.rotation += later_transform.rotation;
                transform.scale_x *= later_transform.scale_x;
                transform.scale_y *= later_transform.scale_y;
                *result = later_result;
            }
            (
                SnapshotPayload::PropertyChange {
                    property,
                    new_value,
                    ..
                },
                SnapshotPayload::PropertyChange {
                    property: later_property,
                    new_value: later_new,
                    ..
                },
            ) => {
                if *property != later_property {
                    return false;
                }
                *new_value = later_new;
            }
            // Structural edits (add/delete/group/lock) are never coalesced.
            _ => return false,
        }
        self.timestamp = later.timestamp;
        true
    }
}

fn member_states(group: &SceneObject) -> Result<Vec<ObjectState>, SceneError> {
    group.children.iter().map(SceneObject::state).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;
    use serde_json::json;

    #[test]
    fn test_constructors_capture_target_and_index() {
        let obj = SceneObject::new(ObjectKind::Image, 1.0, 2.0, 3.0, 4.0);
        let snap = Snapshot::add(&obj, 5).unwrap();
        assert_eq!(snap.kind(), SnapshotKind::Add);
        assert_eq!(snap.target_id(), Some(obj.id));
        assert_eq!(snap.container_index(), Some(5));
        assert_eq!(snap.sequence_id(), 0);
        assert!(snap.timestamp() > 0);
    }

    #[test]
    fn test_group_snapshot_lists_members() {
        let a = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 5.0, 5.0);
        let b = SceneObject::new(ObjectKind::Text, 10.0, 0.0, 5.0, 5.0);
        let group = SceneObject::group(vec![a.clone(), b.clone()]);
        let snap = Snapshot::group(&group, 0).unwrap();
        match snap.payload() {
            SnapshotPayload::Group { objects } => {
                let ids: Vec<_> = objects.iter().filter_map(ObjectState::id).collect();
                assert_eq!(ids, vec![a.id, b.id]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let payload = SnapshotPayload::PropertyChange {
            property: "opacity".into(),
            old_value: json!(1.0),
            new_value: json!(0.5),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], json!("property_change"));
        assert_eq!(value["new_value"], json!(0.5));
    }

    #[test]
    fn test_absorb_modify_keeps_first_before_state() {
        let start = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 10.0, 10.0);
        let mut mid = start.clone();
        mid.left = 5.0;
        let mut end = mid.clone();
        end.left = 12.0;

        let mut first = Snapshot::modify(
            &start,
            &mid,
            0,
            ModifyAction::Move,
            Transform::translate(5.0, 0.0),
        )
        .unwrap();
        let second = Snapshot::modify(&mid, &end, 0, ModifyAction::Move, Transform::translate(7.0, 0.0))
            .unwrap();

        assert!(first.absorb(second));
        assert_eq!(first.target().unwrap(), &start.state().unwrap());
        match first.payload() {
            SnapshotPayload::Modify {
                result, transform, ..
            } => {
                assert_eq!(result, &end.state().unwrap());
                assert!((transform.offset.x - 12.0).abs() < 1e-10);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_absorb_rejects_structural_and_mismatched() {
        let a = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        let b = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        let mut add = Snapshot::add(&a, 0).unwrap();
        assert!(!add.absorb(Snapshot::add(&a, 0).unwrap()));
        assert!(!add.absorb(Snapshot::add(&b, 0).unwrap()));

        let mut fill = Snapshot::property_change(&a, 0, "fill", json!("red"), json!("blue")).unwrap();
        let stroke = Snapshot::property_change(&a, 0, "stroke", json!(1), json!(2)).unwrap();
        assert!(!fill.absorb(stroke));
        let fill2 = Snapshot::property_change(&a, 0, "fill", json!("blue"), json!("green")).unwrap();
        assert!(fill.absorb(fill2));
        match fill.payload() {
            SnapshotPayload::PropertyChange {
                old_value,
                new_value,
                ..
            } => {
                assert_eq!(old_value, &json!("red"));
                assert_eq!(new_value, &json!("green"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
