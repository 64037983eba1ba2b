//! # Canvas Studio Core
//!
//! Scene object model, R-tree spatial index, and the snapshot-based
//! undo/redo engine with transactional batching and cursor replay.
//!
//! The scene graph itself belongs to the host canvas library; history only
//! talks to it through [`SceneGraph`]. [`Scene`] is an in-memory reference
//! implementation.

pub mod geometry;
pub mod history;
pub mod object;
pub mod scene;
pub mod spatial;

pub use geometry::{BBox, Point};
pub use history::{HistoryConfig, HistoryManager, RecordOutcome, ReplayOutcome, Snapshot, SnapshotKind};
pub use object::{LockFlags, ObjectId, ObjectKind, ObjectState, SceneError, SceneObject, Transform};
pub use scene::{CanvasFlags, Scene, SceneGraph};
pub use spatial::{SpatialEntry, SpatialIndex};
