use std::fmt;

use crate::geometry::Point;
use crate::object::{ObjectId, ObjectKind, ObjectState, SceneObject};
use crate::scene::SceneGraph;

/// What a snapshot knows about the object it refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Locator {
    pub id: Option<ObjectId>,
    pub kind: Option<ObjectKind>,
    pub position: Option<Point>,
    pub container_index: Option<usize>,
}

impl Locator {
    pub fn from_state(state: &ObjectState, container_index: Option<usize>) -> Self {
        Self {
            id: state.id(),
            kind: state.kind(),
            position: state.position(),
            container_index,
        }
    }

    /// Same type, and position within `epsilon` on both axes.
    fn looks_like(&self, object: &SceneObject, epsilon: f64) -> bool {
        match (self.kind, self.position) {
            (Some(kind), Some(position)) => {
                object.kind == kind && object.position().approx_eq(&position, epsilon)
            }
            _ => false,
        }
    }
}

/// One way of finding a snapshot's object in the live scene.
pub trait ResolveStrategy: fmt::Debug {
    fn name(&self) -> &'static str;

    fn resolve(&self, scene: &dyn SceneGraph, locator: &Locator) -> Option<usize>;
}

/// Match by stable object id.
#[derive(Debug, Default)]
pub struct ById;

impl ResolveStrategy for ById {
    fn name(&self) -> &'static str {
        "id"
    }

    fn resolve(&self, scene: &dyn SceneGraph, locator: &Locator) -> Option<usize> {
        scene.index_of(&locator.id?)
    }
}

/// Check the object sitting at the captured container index.
#[derive(Debug)]
pub struct ByIndexHint {
    pub epsilon: f64,
}

impl ResolveStrategy for ByIndexHint {
    fn name(&self) -> &'static str {
        "index-hint"
    }

    fn resolve(&self, scene: &dyn SceneGraph, locator: &Locator) -> Option<usize> {
        let index = locator.container_index?;
        let object = scene.object_at(index)?;
        locator.looks_like(object, self.epsilon).then_some(index)
    }
}

/// Scan every object for a type and position match.
#[derive(Debug)]
pub struct ByScan {
    pub epsilon: f64,
}

impl ResolveStrategy for ByScan {
    fn name(&self) -> &'static str {
        "scan"
    }

    fn resolve(&self, scene: &dyn SceneGraph, locator: &Locator) -> Option<usize> {
        (0..scene.len()).find(|&i| {
            scene
                .object_at(i)
                .is_some_and(|o| locator.looks_like(o, self.epsilon))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved { index: usize, strategy: &'static str },
    Unresolved,
}

impl Resolution {
    pub fn index(&self) -> Option<usize> {
        match self {
            Resolution::Resolved { index, .. } => Some(*index),
            Resolution::Unresolved => None,
        }
    }
}

/// Ranked list of strategies, tried in order until one matches.
#[derive(Debug)]
pub struct Resolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl Resolver {
    pub fn new(strategies: Vec<Box<dyn ResolveStrategy>>) -> Self {
        Self { strategies }
    }

    /// id, then index hint, then full scan.
    pub fn standard(epsilon: f64) -> Self {
        Self::new(vec![
            Box::new(ById),
            Box::new(ByIndexHint { epsilon }),
            Box::new(ByScan { epsilon }),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, scene: &dyn SceneGraph, locator: &Locator) -> Resolution {
        for strategy in &self.strategies {
            if let Some(index) = strategy.resolve(scene, locator) {
                log::debug!("Resolved object at index {index} via {}", strategy.name());
                return Resolution::Resolved {
                    index,
                    strategy: strategy.name(),
                };
            }
        }
        Resolution::Unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    fn scene_with(objects: Vec<SceneObject>) -> Scene {
        let mut scene = Scene::new("t");
        for o in objects {
            scene.add(o);
        }
        scene
    }

    fn locator_for(object: &SceneObject, index: usize) -> Locator {
        Locator::from_state(&object.state().unwrap(), Some(index))
    }

    #[test]
    fn test_by_id() {
        let a = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        let b = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        let scene = scene_with(vec![a.clone(), b.clone()]);
        assert_eq!(ById.resolve(&scene, &locator_for(&b, 0)), Some(1));

        let stranger = SceneObject::new(ObjectKind::Shape, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(ById.resolve(&scene, &locator_for(&stranger, 0)), None);
    }

    #[test]
    fn test_by_index_hint_checks_type_and_position() {
        let live = SceneObject::new(ObjectKind::Image, 100.0, 50.0, 10.0, 10.0);
        let scene = scene_with(vec![live]);
        let strategy = ByIndexHint { epsilon: 1.0 };

        // Re-created object: new id, same place.
        let ghost = SceneObject::new(ObjectKind::Image, 100.4, 49.7, 10.0, 10.0);
        assert_eq!(strategy.resolve(&scene, &locator_for(&ghost, 0)), Some(0));

        let moved = SceneObject::new(ObjectKind::Image, 102.0, 50.0, 10.0, 10.0);
        assert_eq!(strategy.resolve(&scene, &locator_for(&moved, 0)), None);

        let other_kind = SceneObject::new(ObjectKind::Text, 100.0, 50.0, 10.0, 10.0);
        assert_eq!(strategy.resolve(&scene, &locator_for(&other_kind, 0)), None);

        assert_eq!(strategy.resolve(&scene, &locator_for(&ghost, 4)), None);
    }

    #[test]
    fn test_by_scan_finds_first_match() {
        let scene = scene_with(vec![
            SceneObject::new(ObjectKind::Text, 0.0, 0.0, 1.0, 1.0),
            SceneObject::new(ObjectKind::Path, 30.0, 30.0, 1.0, 1.0),
        ]);
        let ghost = SceneObject::new(ObjectKind::Path, 30.5, 30.0, 1.0, 1.0);
        let strategy = ByScan { epsilon: 1.0 };
        assert_eq!(strategy.resolve(&scene, &locator_for(&ghost, 0)), Some(1));
    }

    #[test]
    fn test_resolver_order_and_unresolved() {
        let a = SceneObject::new(ObjectKind::Shape, 5.0, 5.0, 1.0, 1.0);
        let scene = scene_with(vec![a.clone()]);
        let resolver = Resolver::standard(1.0);
        assert_eq!(resolver.strategy_names(), vec!["id", "index-hint", "scan"]);

        assert_eq!(
            resolver.resolve(&scene, &locator_for(&a, 0)),
            Resolution::Resolved {
                index: 0,
                strategy: "id"
            }
        );

        let ghost = SceneObject::new(ObjectKind::Shape, 5.0, 5.0, 1.0, 1.0);
        assert_eq!(
            resolver.resolve(&scene, &locator_for(&ghost, 3)),
            Resolution::Resolved {
                index: 0,
                strategy: "scan"
            }
        );

        let nowhere = SceneObject::new(ObjectKind::Shape, 500.0, 5.0, 1.0, 1.0);
        assert_eq!(resolver.resolve(&scene, &locator_for(&nowhere, 0)), Resolution::Unresolved);
    }

    #[test]
    fn test_custom_strategy_list() {
        let a = SceneObject::new(ObjectKind::Shape, 5.0, 5.0, 1.0, 1.0);
        let scene = scene_with(vec![a.clone()]);
        let ghost = SceneObject::new(ObjectKind::Shape, 5.0, 5.0, 1.0, 1.0);
        let id_only = Resolver::new(vec![Box::new(ById)]);
        assert_eq!(id_only.resolve(&scene, &locator_for(&ghost, 0)), Resolution::Unresolved);
    }
}
