//! Snapshot-based undo/redo.
//!
//! Edits are recorded as immutable [`Snapshot`]s in a capacity-bounded log
//! with a cursor at the last applied entry. Undo and redo replay a snapshot
//! against the live scene through the [`SceneGraph`] trait; batches group
//! several snapshots into one commit that stays undoable step by step.

mod capture;
mod config;
mod lease;
mod replay;
mod resolve;
mod snapshot;
mod store;
mod timeline;

use std::time::Instant;

pub use capture::CaptureDebouncer;
pub use config::HistoryConfig;
pub use lease::{LeaseBusy, LeaseGuard, LeaseKind, OperationLease};
pub use replay::{Direction, ReplayError, Replayer};
pub use resolve::{ById, ByIndexHint, ByScan, Locator, Resolution, ResolveStrategy, Resolver};
pub use snapshot::{ModifyAction, Snapshot, SnapshotKind, SnapshotPayload};
pub use store::{LogChange, MemoryStore, SnapshotRow, SnapshotStore, StoreError, Truncate};
pub use timeline::HistoryLog;

use crate::scene::SceneGraph;

/// What happened to a snapshot handed to [`HistoryManager::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded { sequence_id: u64 },
    /// Held in the open batch until it commits.
    Staged,
    /// A replay was in flight; the change came from history itself.
    Suppressed,
    /// The store rejected the write; history is unchanged.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Applied { sequence_id: u64 },
    /// The snapshot could not be applied; the cursor moved past it anyway.
    Skipped { sequence_id: u64 },
    /// Another replay or an open batch holds the lease.
    Busy,
    /// Nothing to undo or redo.
    Unavailable,
}

#[derive(Debug)]
struct BatchTransaction {
    guard: LeaseGuard,
    staged: Vec<Snapshot>,
}

/// Owns the history log, its backing store, and the operation lease.
#[derive(Debug)]
pub struct HistoryManager {
    config: HistoryConfig,
    log: HistoryLog,
    store: Box<dyn SnapshotStore>,
    lease: OperationLease,
    batch: Option<BatchTransaction>,
    replayer: Replayer,
    captures: CaptureDebouncer,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    /// History backed by an in-memory table.
    pub fn new(config: HistoryConfig) -> Self {
        Self::with_store(config, Box::new(MemoryStore::new()))
    }

    /// Attach to a durable store, wiping whatever an earlier session left in it.
    pub fn open(config: HistoryConfig, mut store: Box<dyn SnapshotStore>) -> Result<Self, StoreError> {
        store.clear()?;
        Ok(Self::with_store(config, store))
    }

    fn with_store(config: HistoryConfig, store: Box<dyn SnapshotStore>) -> Self {
        Self {
            log: HistoryLog::new(config.capacity),
            replayer: Replayer::new(Resolver::standard(config.position_epsilon)),
            captures: CaptureDebouncer::new(config.capture_window()),
            lease: OperationLease::new(),
            batch: None,
            store,
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ── Recording ────────────────────────────────────────────────────

    /// Record `snapshot` as the next step. Captures still waiting out their
    /// debounce window are recorded first so the log keeps arrival order.
    pub fn record(&mut self, snapshot: Snapshot) -> RecordOutcome {
        if !self.lease.is_held() && !self.captures.is_empty() {
            self.flush_captures();
        }
        self.record_now(snapshot)
    }

    fn record_now(&mut self, snapshot: Snapshot) -> RecordOutcome {
        if let Some(batch) = self.batch.as_mut() {
            batch.staged.push(snapshot);
            return RecordOutcome::Staged;
        }
        if self.lease.is_held() {
            log::debug!("Suppressed {:?} snapshot during replay", snapshot.kind());
            return RecordOutcome::Suppressed;
        }

        match self.commit(vec![snapshot]) {
            Ok(Some(sequence_id)) => RecordOutcome::Recorded { sequence_id },
            Ok(None) => RecordOutcome::Dropped,
            Err(e) => {
                log::warn!("Snapshot not recorded: {e}");
                RecordOutcome::Dropped
            }
        }
    }

    /// Write `snapshots` through the store, then into the log. Returns the
    /// last sequence id appended.
    fn commit(&mut self, snapshots: Vec<Snapshot>) -> Result<Option<u64>, StoreError> {
        let planned = self.log.plan(snapshots);
        let append = planned
            .snapshots
            .iter()
            .map(SnapshotRow::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let change = LogChange {
            truncate: planned.truncate,
            append,
            evict_through: planned.evict_through,
        };
        self.store.commit(&change)?;

        let last = planned.snapshots.last().map(Snapshot::sequence_id);
        if planned.truncated > 0 {
            log::debug!("Discarded {} redo entries", planned.truncated);
        }
        if planned.evicted > 0 {
            log::debug!("Evicted {} oldest entries", planned.evicted);
        }
        self.log.apply(planned);
        Ok(last)
    }

    // ── Batches ──────────────────────────────────────────────────────

    /// Open a batch. Returns false if one is already open or a replay is running.
    pub fn start_batch(&mut self) -> bool {
        if self.batch.is_some() {
            log::debug!("Batch already open, start ignored");
            return false;
        }
        if !self.lease.is_held() && !self.captures.is_empty() {
            self.flush_captures();
        }
        match self.lease.try_acquire(LeaseKind::Batch) {
            Ok(guard) => {
                self.batch = Some(BatchTransaction {
                    guard,
                    staged: Vec::new(),
                });
                true
            }
            Err(busy) => {
                log::debug!("Cannot start batch: {busy}");
                false
            }
        }
    }

    /// Commit the open batch as one log change. Returns the number of
    /// snapshots recorded.
    pub fn end_batch(&mut self) -> usize {
        let Some(batch) = self.batch.take() else {
            return 0;
        };
        let BatchTransaction { guard, staged } = batch;
        drop(guard);

        let count = staged.len();
        if count == 0 {
            return 0;
        }
        match self.commit(staged) {
            Ok(_) => {
                log::debug!("Committed batch of {count} snapshots");
                count
            }
            Err(e) => {
                log::warn!("Batch of {count} snapshots not recorded: {e}");
                0
            }
        }
    }

    /// Drop the open batch without recording it. Returns how many snapshots were discarded.
    pub fn discard_batch(&mut self) -> usize {
        self.batch.take().map_or(0, |b| b.staged.len())
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// True while a replay step holds the lease.
    pub fn is_processing(&self) -> bool {
        self.lease.holder() == Some(LeaseKind::Replay)
    }

    // ── Replay ───────────────────────────────────────────────────────

    pub fn undo(&mut self, scene: &mut dyn SceneGraph) -> ReplayOutcome {
        self.step(scene, Direction::Undo)
    }

    pub fn redo(&mut self, scene: &mut dyn SceneGraph) -> ReplayOutcome {
        self.step(scene, Direction::Redo)
    }

    fn step(&mut self, scene: &mut dyn SceneGraph, direction: Direction) -> ReplayOutcome {
        if !self.lease.is_held() && !self.captures.is_empty() {
            self.flush_captures();
        }

        let _guard = match self.lease.try_acquire(LeaseKind::Replay) {
            Ok(guard) => guard,
            Err(busy) => {
                log::debug!("{direction:?} refused: {busy}");
                return ReplayOutcome::Busy;
            }
        };

        let index = match direction {
            Direction::Undo => self.log.cursor(),
            Direction::Redo => Some(self.log.cursor().map_or(0, |c| c + 1)),
        };
        let Some(snapshot) = index.and_then(|i| self.log.get(i)) else {
            return ReplayOutcome::Unavailable;
        };

        let sequence_id = snapshot.sequence_id();
        let result = self.replayer.apply(snapshot, direction, scene);
        match direction {
            Direction::Undo => self.log.retreat(),
            Direction::Redo => self.log.advance(),
        };

        match result {
            Ok(()) => {
                scene.request_render();
                ReplayOutcome::Applied { sequence_id }
            }
            Err(ReplayError::MissingTarget) => {
                log::debug!("{direction:?} of snapshot {sequence_id} has no target, nothing to do");
                ReplayOutcome::Skipped { sequence_id }
            }
            Err(e) => {
                log::warn!("{direction:?} of snapshot {sequence_id} skipped: {e}");
                ReplayOutcome::Skipped { sequence_id }
            }
        }
    }

    // ── Debounced capture ────────────────────────────────────────────

    /// Queue a snapshot from a change event. Returns false if it was dropped
    /// because a replay produced the event.
    pub fn capture(&mut self, snapshot: Snapshot, now: Instant) -> bool {
        if self.is_processing() {
            return false;
        }
        self.captures.offer(snapshot, now);
        true
    }

    /// Record captures whose quiet window has elapsed. Returns how many were accepted.
    pub fn poll_captures(&mut self, now: Instant) -> usize {
        let ready = self.captures.poll(now);
        self.record_all(ready)
    }

    pub fn flush_captures(&mut self) -> usize {
        let ready = self.captures.flush();
        self.record_all(ready)
    }

    pub fn pending_captures(&self) -> usize {
        self.captures.len()
    }

    fn record_all(&mut self, snapshots: Vec<Snapshot>) -> usize {
        snapshots
            .into_iter()
            .map(|s| self.record_now(s))
            .filter(|o| matches!(o, RecordOutcome::Recorded { .. } | RecordOutcome::Staged))
            .count()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.log.cursor()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.log.iter()
    }

    pub fn peek_undo(&self) -> Option<&Snapshot> {
        self.log.current()
    }

    pub fn peek_redo(&self) -> Option<&Snapshot> {
        self.log.upcoming()
    }

    pub fn undo_description(&self) -> Option<&'static str> {
        self.peek_undo().map(|s| s.kind().label())
    }

    pub fn redo_description(&self) -> Option<&'static str> {
        self.peek_redo().map(|s| s.kind().label())
    }

    /// Shared handle to the lease, for event handlers that capture outside this manager.
    pub fn lease(&self) -> OperationLease {
        self.lease.clone()
    }

    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    /// Empty the log and the store. Refused while a batch or replay holds the lease.
    pub fn clear(&mut self) -> bool {
        if self.lease.is_held() {
            return false;
        }
        if let Err(e) = self.store.clear() {
            log::warn!("History not cleared: {e}");
            return false;
        }
        self.captures.flush();
        self.log.clear();
        true
    }
}
