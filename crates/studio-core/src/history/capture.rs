use std::time::{Duration, Instant};

use super::snapshot::{Snapshot, SnapshotKind};
use crate::object::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CaptureKey {
    target: Option<ObjectId>,
    kind: SnapshotKind,
}

#[derive(Debug)]
struct PendingCapture {
    key: CaptureKey,
    due: Instant,
    snapshot: Snapshot,
}

/// Trailing-edge debounce for bursts of change events.
///
/// Events for the same object and kind that arrive within the window fold
/// into one snapshot; it is released once the window passes with no new
/// event for that key.
#[derive(Debug)]
pub struct CaptureDebouncer {
    window: Duration,
    pending: Vec<PendingCapture>,
}

impl CaptureDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Vec::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue `snapshot`, merging it into a pending capture for the same key.
    pub fn offer(&mut self, snapshot: Snapshot, now: Instant) {
        let key = CaptureKey {
            target: snapshot.target_id(),
            kind: snapshot.kind(),
        };
        let due = now + self.window;

        // Several captures can share a key when they touch different properties.
        let merged = self
            .pending
            .iter_mut()
            .filter(|p| p.key == key)
            .any(|pending| {
                let absorbed = pending.snapshot.absorb(snapshot.clone());
                if absorbed {
                    pending.due = due;
                }
                absorbed
            });
        if !merged {
            self.pending.push(PendingCapture { key, due, snapshot });
        }
    }

    /// Release every capture whose window has elapsed, oldest first.
    pub fn poll(&mut self, now: Instant) -> Vec<Snapshot> {
        let mut ready = Vec::new();
        let mut kept = Vec::with_capacity(self.pending.len());
        for pending in self.pending.drain(..) {
            if pending.due <= now {
                ready.push(pending.snapshot);
            } else {
                kept.push(pending);
            }
        }
        self.pending = kept;
        ready
    }

    /// Release everything regardless of timing.
    pub fn flush(&mut self) -> Vec<Snapshot> {
        self.pending.drain(..).map(|p| p.snapshot).collect()
    }
}
