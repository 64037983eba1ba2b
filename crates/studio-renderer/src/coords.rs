use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use studio_core::object::ObjectId;

use crate::device::CoordinateStrategy;

/// Slot an object currently holds in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    due: u64,
    seq: u64,
}

/// Deferred per-object bounds recomputation, keyed by the frame it is due in.
///
/// Each object holds at most one live slot. Superseded heap entries are left
/// in place and skipped when popped.
#[derive(Debug, Default)]
pub struct CoordinateQueue {
    heap: BinaryHeap<Reverse<(u64, u64, ObjectId)>>,
    pending: HashMap<ObjectId, Slot>,
    next_seq: u64,
}

impl CoordinateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a refresh of `id` while `frame` is the next frame to run.
    /// Returns the frame the refresh is due in.
    pub fn schedule(
        &mut self,
        id: ObjectId,
        strategy: CoordinateStrategy,
        frame: u64,
        debounce_frames: u64,
    ) -> u64 {
        let due = match strategy {
            CoordinateStrategy::Immediate => frame,
            CoordinateStrategy::Batched => frame + 1,
            CoordinateStrategy::Debounced => frame + debounce_frames,
        };

        if let Some(existing) = self.pending.get(&id) {
            let keep = match strategy {
                // A debounced request always restarts the wait.
                CoordinateStrategy::Debounced => false,
                CoordinateStrategy::Immediate | CoordinateStrategy::Batched => existing.due <= due,
            };
            if keep {
                return existing.due;
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(id, Slot { due, seq });
        self.heap.push(Reverse((due, seq, id)));
        due
    }

    /// Pop up to `limit` objects due at or before `frame`, in (due, request) order.
    pub fn flush(&mut self, frame: u64, limit: usize) -> Vec<ObjectId> {
        let mut ready = Vec::new();
        while ready.len() < limit {
            let Some(Reverse((due, seq, id))) = self.heap.peek().copied() else {
                break;
            };
            if due > frame {
                break;
            }
            self.heap.pop();
            if self.pending.get(&id) == Some(&Slot { due, seq }) {
                self.pending.remove(&id);
                ready.push(id);
            }
        }
        ready
    }

    /// Drop any pending request for `id`.
    pub fn cancel(&mut self, id: &ObjectId) -> bool {
        self.pending.remove(id).is_some()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn due_frame(&self, id: &ObjectId) -> Option<u64> {
        self.pending.get(id).map(|s| s.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.clear();
    }
}
