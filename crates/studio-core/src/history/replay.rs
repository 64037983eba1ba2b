use serde_json::Value;
use thiserror::Error;

use super::resolve::{Locator, Resolution, Resolver};
use super::snapshot::{Snapshot, SnapshotPayload};
use crate::object::{ObjectId, ObjectState, SceneError};
use crate::scene::SceneGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Snapshot has no target object")]
    MissingTarget,

    #[error("Target object could not be found in the scene")]
    Unresolved,

    #[error("Object {0} is already in the scene")]
    AlreadyPresent(ObjectId),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Applies the forward or inverse effect of a snapshot to a scene.
#[derive(Debug)]
pub struct Replayer {
    resolver: Resolver,
}

impl Replayer {
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn apply(
        &self,
        snapshot: &Snapshot,
        direction: Direction,
        scene: &mut dyn SceneGraph,
    ) -> Result<(), ReplayError> {
        let target = snapshot.target().ok_or(ReplayError::MissingTarget)?;
        let index = snapshot.container_index();
        let locator = Locator::from_state(target, index);

        match (snapshot.payload(), direction) {
            (SnapshotPayload::Add, Direction::Undo) | (SnapshotPayload::Delete, Direction::Redo) => {
                let at = self.locate(scene, &locator)?;
                scene.remove_at(at);
            }
            (SnapshotPayload::Add, Direction::Redo) | (SnapshotPayload::Delete, Direction::Undo) => {
                insert_state(scene, target, index)?;
            }
            (SnapshotPayload::Modify { result, .. }, Direction::Undo) => {
                // The live object is in its post-modification state.
                let at = self.locate(scene, &Locator::from_state(result, index))?;
                scene.replace_at(at, target.restore()?)?;
            }
            (SnapshotPayload::Modify { result, .. }, Direction::Redo) => {
                let at = self.locate(scene, &locator)?;
                scene.replace_at(at, result.restore()?)?;
            }
            (
                SnapshotPayload::PropertyChange {
                    property,
                    old_value,
                    new_value,
                },
                _,
            ) => {
                let value = match direction {
                    Direction::Undo => old_value,
                    Direction::Redo => new_value,
                };
                self.set_property(scene, &locator, property, value.clone())?;
            }
            (SnapshotPayload::Group { objects }, Direction::Undo)
            | (SnapshotPayload::Ungroup { objects }, Direction::Redo) => {
                self.dissolve(scene, &locator, objects)?;
            }
            (SnapshotPayload::Group { objects }, Direction::Redo)
            | (SnapshotPayload::Ungroup { objects }, Direction::Undo) => {
                regroup(scene, target, objects, index)?;
            }
            (SnapshotPayload::Lock, Direction::Redo) | (SnapshotPayload::Unlock, Direction::Undo) => {
                self.set_lock(scene, &locator, true)?;
            }
            (SnapshotPayload::Lock, Direction::Undo) | (SnapshotPayload::Unlock, Direction::Redo) => {
                self.set_lock(scene, &locator, false)?;
            }
        }
        Ok(())
    }

    fn locate(&self, scene: &dyn SceneGraph, locator: &Locator) -> Result<usize, ReplayError> {
        match self.resolver.resolve(scene, locator) {
            Resolution::Resolved { index, .. } => Ok(index),
            Resolution::Unresolved => Err(ReplayError::Unresolved),
        }
    }

    fn set_property(
        &self,
        scene: &mut dyn SceneGraph,
        locator: &Locator,
        property: &str,
        value: Value,
    ) -> Result<(), ReplayError> {
        let at = self.locate(scene, locator)?;
        let len = scene.len();
        let object = scene
            .object_at_mut(at)
            .ok_or(SceneError::IndexOutOfRange { index: at, len })?;
        object.set_property(property, value)?;
        object.set_coords();
        Ok(())
    }

    fn set_lock(
        &self,
        scene: &mut dyn SceneGraph,
        locator: &Locator,
        locked: bool,
    ) -> Result<(), ReplayError> {
        let at = self.locate(scene, locator)?;
        let len = scene.len();
        scene
            .object_at_mut(at)
            .ok_or(SceneError::IndexOutOfRange { index: at, len })?
            .set_lock(locked);
        Ok(())
    }

    /// Replace the group with its members, moved back into world coordinates.
    fn dissolve(
        &self,
        scene: &mut dyn SceneGraph,
        locator: &Locator,
        members: &[ObjectState],
    ) -> Result<(), ReplayError> {
        let at = self.locate(scene, locator)?;
        let mut restored = Vec::with_capacity(members.len());
        for state in members {
            restored.push(state.restore()?);
        }

        let len = scene.len();
        let group = scene
            .remove_at(at)
            .ok_or(SceneError::IndexOutOfRange { index: at, len })?;
        for (offset, mut member) in restored.into_iter().enumerate() {
            if scene.index_of(&member.id).is_some() {
                log::warn!("Group member {} already in scene, not duplicated", member.id);
                continue;
            }
            member.translate(group.left, group.top);
            scene.insert_at(at + offset, member);
        }
        Ok(())
    }
}

fn insert_state(
    scene: &mut dyn SceneGraph,
    state: &ObjectState,
    index: Option<usize>,
) -> Result<usize, ReplayError> {
    let object = state.restore()?;
    if scene.index_of(&object.id).is_some() {
        return Err(ReplayError::AlreadyPresent(object.id));
    }
    let at = index.unwrap_or(scene.len()).min(scene.len());
    scene.insert_at(at, object);
    Ok(at)
}

/// Pull the members back out of the scene and put the group in their place.
fn regroup(
    scene: &mut dyn SceneGraph,
    group: &ObjectState,
    members: &[ObjectState],
    index: Option<usize>,
) -> Result<(), ReplayError> {
    let group_object = group.restore()?;
    if scene.index_of(&group_object.id).is_some() {
        return Err(ReplayError::AlreadyPresent(group_object.id));
    }

    let member_ids: Vec<ObjectId> = members.iter().filter_map(ObjectState::id).collect();
    let present: Vec<usize> = member_ids.iter().filter_map(|id| scene.index_of(id)).collect();
    if present.is_empty() && !member_ids.is_empty() {
        return Err(ReplayError::Unresolved);
    }

    for id in &member_ids {
        if let Some(at) = scene.index_of(id) {
            scene.remove_at(at);
        }
    }
    let fallback = present.iter().copied().min().unwrap_or(scene.len());
    let at = index.unwrap_or(fallback).min(scene.len());
    scene.insert_at(at, group_object);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::history::snapshot::ModifyAction;
    use crate::object::{ObjectKind, SceneObject, Transform};
    use crate::scene::Scene;
    use serde_json::json;

    fn replayer() -> Replayer {
        Replayer::new(Resolver::standard(1.0))
    }

    #[test]
    fn test_add_undo_redo() {
        let mut scene = Scene::new("t");
        let obj = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 10.0, 10.0);
        scene.add(obj.clone());
        let snap = Snapshot::add(&obj, 0).unwrap();

        replayer().apply(&snap, Direction::Undo, &mut scene).unwrap();
        assert!(scene.is_empty());
        replayer().apply(&snap, Direction::Redo, &mut scene).unwrap();
        assert_eq!(scene.index_of(&obj.id), Some(0));
        assert!(matches!(
            replayer().apply(&snap, Direction::Redo, &mut scene),
            Err(ReplayError::AlreadyPresent(_))
        ));
    }

    #[test]
    fn test_delete_undo_restores_index() {
        let mut scene = Scene::new("t");
        let a = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        let b = SceneObject::new(ObjectKind::Text, 5.0, 5.0, 1.0, 1.0);
        let c = SceneObject::new(ObjectKind::Image, 9.0, 9.0, 1.0, 1.0);
        scene.add(a);
        scene.add(c);
        let snap = Snapshot::delete(&b, 1).unwrap();

        replayer().apply(&snap, Direction::Undo, &mut scene).unwrap();
        assert_eq!(scene.index_of(&b.id), Some(1));
        replayer().apply(&snap, Direction::Redo, &mut scene).unwrap();
        assert!(scene.index_of(&b.id).is_none());
    }

    #[test]
    fn test_modify_roundtrip_is_exact() {
        let mut scene = Scene::new("t");
        let before = SceneObject::new(ObjectKind::Image, 0.0, 0.0, 20.0, 20.0);
        let mut after = before.clone();
        after.left = 50.0;
        after.angle = 15.0;
        scene.add(after.clone());
        let snap = Snapshot::modify(&before, &after, 0, ModifyAction::Move, Transform::translate(50.0, 0.0))
            .unwrap();

        replayer().apply(&snap, Direction::Undo, &mut scene).unwrap();
        assert_eq!(scene.objects()[0].state().unwrap(), before.state().unwrap());
        replayer().apply(&snap, Direction::Redo, &mut scene).unwrap();
        assert_eq!(scene.objects()[0].state().unwrap(), after.state().unwrap());
    }

    #[test]
    fn test_property_change() {
        let mut scene = Scene::new("t");
        let obj = SceneObject::new(ObjectKind::Text, 0.0, 0.0, 1.0, 1.0).with_prop("fill", json!("red"));
        scene.add(obj.clone());
        let snap = Snapshot::property_change(&obj, 0, "fill", json!("red"), json!("blue")).unwrap();

        replayer().apply(&snap, Direction::Redo, &mut scene).unwrap();
        assert_eq!(scene.objects()[0].property("fill"), Some(json!("blue")));
        assert!(scene.objects()[0].coords.is_some());
        replayer().apply(&snap, Direction::Undo, &mut scene).unwrap();
        assert_eq!(scene.objects()[0].property("fill"), Some(json!("red")));
    }

    #[test]
    fn test_group_undo_restores_world_positions() {
        let mut scene = Scene::new("t");
        let a = SceneObject::new(ObjectKind::Shape, 10.0, 20.0, 5.0, 5.0);
        let b = SceneObject::new(ObjectKind::Text, 40.0, 60.0, 5.0, 5.0);
        let group = SceneObject::group(vec![a.clone(), b.clone()]);
        scene.add(group.clone());
        let snap = Snapshot::group(&group, 0).unwrap();

        replayer().apply(&snap, Direction::Undo, &mut scene).unwrap();
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.get(&a.id).unwrap().position(), Point::new(10.0, 20.0));
        assert_eq!(scene.get(&b.id).unwrap().position(), Point::new(40.0, 60.0));
        assert!(scene.get(&group.id).is_none());

        replayer().apply(&snap, Direction::Redo, &mut scene).unwrap();
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.objects()[0].state().unwrap(), group.state().unwrap());
    }

    #[test]
    fn test_ungroup_is_inverse_of_group() {
        let mut scene = Scene::new("t");
        let a = SceneObject::new(ObjectKind::Shape, 10.0, 20.0, 5.0, 5.0);
        let group = SceneObject::group(vec![a.clone()]);
        scene.add(group.clone());
        let snap = Snapshot::ungroup(&group, 0).unwrap();

        replayer().apply(&snap, Direction::Redo, &mut scene).unwrap();
        assert_eq!(scene.get(&a.id).unwrap().position(), Point::new(10.0, 20.0));
        replayer().apply(&snap, Direction::Undo, &mut scene).unwrap();
        assert_eq!(scene.index_of(&group.id), Some(0));
        assert!(scene.get(&a.id).is_none());
    }

    #[test]
    fn test_lock_toggles() {
        let mut scene = Scene::new("t");
        let obj = SceneObject::new(ObjectKind::Image, 0.0, 0.0, 1.0, 1.0);
        scene.add(obj.clone());
        let lock = Snapshot::lock(&obj, 0).unwrap();
        let unlock = Snapshot::unlock(&obj, 0).unwrap();

        replayer().apply(&lock, Direction::Redo, &mut scene).unwrap();
        assert!(scene.objects()[0].lock.is_locked());
        replayer().apply(&lock, Direction::Undo, &mut scene).unwrap();
        assert!(!scene.objects()[0].lock.is_locked());
        replayer().apply(&unlock, Direction::Undo, &mut scene).unwrap();
        assert!(scene.objects()[0].lock.is_locked());
    }

    #[test]
    fn test_missing_target_and_unresolved() {
        let mut scene = Scene::new("t");
        let bare = Snapshot::new(SnapshotPayload::Add, None, Some(0));
        assert!(matches!(
            replayer().apply(&bare, Direction::Undo, &mut scene),
            Err(ReplayError::MissingTarget)
        ));

        let ghost = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        let snap = Snapshot::lock(&ghost, 0).unwrap();
        assert!(matches!(
            replayer().apply(&snap, Direction::Redo, &mut scene),
            Err(ReplayError::Unresolved)
        ));
    }
}
