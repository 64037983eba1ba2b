use std::collections::VecDeque;

use super::snapshot::Snapshot;
use super::store::Truncate;

/// A set of snapshots stamped and ready to be appended, plus the
/// truncation and eviction that appending them implies.
#[derive(Debug)]
pub(crate) struct PlannedCommit {
    pub truncate: Truncate,
    pub truncated: usize,
    pub snapshots: Vec<Snapshot>,
    pub evicted: usize,
    pub evict_through: Option<u64>,
}

/// Ordered, capacity-bounded snapshot log with a cursor at the last applied entry.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<Snapshot>,
    /// `None` is "before the first edit".
    cursor: Option<usize>,
    capacity: usize,
    next_sequence: u64,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            capacity: capacity.max(1),
            next_sequence: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.redo_position() < self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    /// The snapshot undo would reverse.
    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// The snapshot redo would re-apply.
    pub fn upcoming(&self) -> Option<&Snapshot> {
        self.entries.get(self.redo_position())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    fn redo_position(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    /// Stamp `incoming` and work out the truncation and eviction needed to append it.
    /// Nothing changes until [`HistoryLog::apply`].
    pub(crate) fn plan(&self, mut incoming: Vec<Snapshot>) -> PlannedCommit {
        let keep = self.redo_position();
        let truncated = self.entries.len() - keep;
        let truncate = if truncated == 0 {
            Truncate::Keep
        } else {
            match self.current() {
                Some(snapshot) => Truncate::After(snapshot.sequence_id()),
                None => Truncate::All,
            }
        };

        // Ids stay contiguous across the kept prefix.
        let mut next = match self.current() {
            Some(snapshot) => snapshot.sequence_id() + 1,
            None => self
                .entries
                .front()
                .map_or(self.next_sequence, Snapshot::sequence_id),
        };
        for snapshot in &mut incoming {
            snapshot.stamp(next);
            next += 1;
        }

        let new_len = keep + incoming.len();
        let evicted = new_len.saturating_sub(self.capacity);
        let evict_through = if evicted == 0 {
            None
        } else if evicted <= keep {
            self.entries.get(evicted - 1).map(Snapshot::sequence_id)
        } else {
            incoming.get(evicted - keep - 1).map(Snapshot::sequence_id)
        };

        PlannedCommit {
            truncate,
            truncated,
            snapshots: incoming,
            evicted,
            evict_through,
        }
    }

    /// Apply a plan produced by [`HistoryLog::plan`] against the same state.
    pub(crate) fn apply(&mut self, planned: PlannedCommit) {
        let keep = self.redo_position();
        self.entries.truncate(keep);
        for snapshot in planned.snapshots {
            self.next_sequence = self.next_sequence.max(snapshot.sequence_id() + 1);
            self.entries.push_back(snapshot);
        }
        for _ in 0..planned.evicted {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len().checked_sub(1);
    }

    /// Move the cursor one step back. Returns the index it left.
    pub(crate) fn retreat(&mut self) -> Option<usize> {
        let current = self.cursor?;
        self.cursor = current.checked_sub(1);
        Some(current)
    }

    /// Move the cursor one step forward. Returns the index it reached.
    pub(crate) fn advance(&mut self) -> Option<usize> {
        let next = self.redo_position();
        if next >= self.entries.len() {
            return None;
        }
        self.cursor = Some(next);
        Some(next)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::snapshot::SnapshotPayload;

    fn snap() -> Snapshot {
        Snapshot::new(SnapshotPayload::Add, None, None)
    }

    fn push(log: &mut HistoryLog, n: usize) {
        for _ in 0..n {
            let plan = log.plan(vec![snap()]);
            log.apply(plan);
        }
    }

    fn ids(log: &HistoryLog) -> Vec<u64> {
        log.iter().map(Snapshot::sequence_id).collect()
    }

    #[test]
    fn test_append_moves_cursor_to_end() {
        let mut log = HistoryLog::new(10);
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        push(&mut log, 3);
        assert_eq!(log.len(), 3);
        assert_eq!(log.cursor(), Some(2));
        assert_eq!(ids(&log), vec![1, 2, 3]);
        assert!(log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn test_plan_truncates_future_and_reuses_ids() {
        let mut log = HistoryLog::new(10);
        push(&mut log, 4);
        log.retreat();
        log.retreat();

        let plan = log.plan(vec![snap()]);
        assert_eq!(plan.truncate, Truncate::After(2));
        assert_eq!(plan.truncated, 2);
        log.apply(plan);
        assert_eq!(ids(&log), vec![1, 2, 3]);
        assert_eq!(log.cursor(), Some(2));
    }

    #[test]
    fn test_plan_truncates_everything_when_fully_undone() {
        let mut log = HistoryLog::new(10);
        push(&mut log, 2);
        log.retreat();
        log.retreat();
        assert_eq!(log.cursor(), None);

        let plan = log.plan(vec![snap()]);
        assert_eq!(plan.truncate, Truncate::All);
        log.apply(plan);
        assert_eq!(ids(&log), vec![1]);
    }

    #[test]
    fn test_eviction_shifts_window() {
        let mut log = HistoryLog::new(3);
        push(&mut log, 3);
        let plan = log.plan(vec![snap(), snap()]);
        assert_eq!(plan.evicted, 2);
        assert_eq!(plan.evict_through, Some(2));
        log.apply(plan);
        assert_eq!(ids(&log), vec![3, 4, 5]);
        assert_eq!(log.cursor(), Some(2));
    }

    #[test]
    fn test_eviction_reaching_into_incoming() {
        let mut log = HistoryLog::new(2);
        push(&mut log, 1);
        let plan = log.plan(vec![snap(), snap(), snap()]);
        assert_eq!(plan.evicted, 2);
        assert_eq!(plan.evict_through, Some(2));
        log.apply(plan);
        assert_eq!(ids(&log), vec![3, 4]);
    }

    #[test]
    fn test_retreat_and_advance_bounds() {
        let mut log = HistoryLog::new(5);
        assert_eq!(log.retreat(), None);
        assert_eq!(log.advance(), None);
        push(&mut log, 2);
        assert_eq!(log.retreat(), Some(1));
        assert_eq!(log.retreat(), Some(0));
        assert_eq!(log.retreat(), None);
        assert_eq!(log.advance(), Some(0));
        assert_eq!(log.upcoming().map(Snapshot::sequence_id), Some(2));
        assert_eq!(log.advance(), Some(1));
        assert_eq!(log.advance(), None);
    }

    #[test]
    fn test_clear_keeps_ids_monotonic() {
        let mut log = HistoryLog::new(5);
        push(&mut log, 2);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.cursor(), None);
        push(&mut log, 1);
        assert_eq!(ids(&log), vec![3]);
    }
}
