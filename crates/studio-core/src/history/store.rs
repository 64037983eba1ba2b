use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::snapshot::{Snapshot, SnapshotKind, SnapshotPayload};
use crate::object::ObjectState;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot row {id} is corrupt: {reason}")]
    Corrupt { id: u64, reason: String },

    #[error("Snapshot table unavailable: {0}")]
    Unavailable(String),
}

/// One row of the persisted snapshot table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Sequence id of the snapshot.
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: SnapshotKind,
    pub timestamp: u64,
    /// JSON-encoded target, container index, and kind-specific fields.
    pub payload: String,
}

#[derive(Serialize, Deserialize)]
struct RowBody {
    target: Option<ObjectState>,
    container_index: Option<usize>,
    payload: SnapshotPayload,
}

impl SnapshotRow {
    pub fn encode(snapshot: &Snapshot) -> Result<Self, StoreError> {
        let body = RowBody {
            target: snapshot.target().cloned(),
            container_index: snapshot.container_index(),
            payload: snapshot.payload().clone(),
        };
        Ok(Self {
            id: snapshot.sequence_id(),
            kind: snapshot.kind(),
            timestamp: snapshot.timestamp(),
            payload: serde_json::to_string(&body)?,
        })
    }

    pub fn decode(&self) -> Result<Snapshot, StoreError> {
        let body: RowBody = serde_json::from_str(&self.payload)?;
        if body.payload.kind() != self.kind {
            return Err(StoreError::Corrupt {
                id: self.id,
                reason: format!(
                    "row type {:?} does not match payload kind {:?}",
                    self.kind,
                    body.payload.kind()
                ),
            });
        }
        let mut snapshot = Snapshot::new(body.payload, body.target, body.container_index)
            .with_timestamp(self.timestamp);
        snapshot.stamp(self.id);
        Ok(snapshot)
    }
}

/// How much of the existing table survives a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truncate {
    Keep,
    /// Delete every row with an id greater than this one.
    After(u64),
    All,
}

/// One atomic mutation of the snapshot table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogChange {
    pub truncate: Truncate,
    pub append: Vec<SnapshotRow>,
    /// Delete every row with an id up to and including this one, after appending.
    pub evict_through: Option<u64>,
}

impl LogChange {
    /// Apply this change to an ordered row table.
    pub fn apply_to(&self, rows: &mut Vec<SnapshotRow>) {
        match self.truncate {
            Truncate::Keep => {}
            Truncate::After(id) => rows.retain(|r| r.id <= id),
            Truncate::All => rows.clear(),
        }
        rows.extend(self.append.iter().cloned());
        if let Some(through) = self.evict_through {
            rows.retain(|r| r.id > through);
        }
    }
}

/// Durable backing table for the history log.
///
/// Every method is all-or-nothing: on error the table is as it was.
pub trait SnapshotStore: std::fmt::Debug {
    fn commit(&mut self, change: &LogChange) -> Result<(), StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;

    /// All rows in sequence order.
    fn rows(&self) -> Result<Vec<SnapshotRow>, StoreError>;
}

/// Store that keeps the table in memory; the default for a fresh session.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<SnapshotRow>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }
}

impl SnapshotStore for MemoryStore {
    fn commit(&mut self, change: &LogChange) -> Result<(), StoreError> {
        change.apply_to(&mut self.rows);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.rows.clear();
        Ok(())
    }

    fn rows(&self) -> Result<Vec<SnapshotRow>, StoreError> {
        Ok(self.rows.clone())
    }
}
