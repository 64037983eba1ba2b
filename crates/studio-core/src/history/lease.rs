use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

/// Who currently owns the history cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseKind {
    /// An undo/redo step is replaying against the scene; capture is suppressed.
    Replay,
    /// A batch transaction is open; records are staged.
    Batch,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Operation lease is held by {held:?}")]
pub struct LeaseBusy {
    pub held: LeaseKind,
}

/// Single-slot cooperative lock over the history cursor.
///
/// Clones share the slot, so event handlers outside the history manager can
/// check whether a replay is in flight before capturing.
#[derive(Debug, Clone, Default)]
pub struct OperationLease {
    slot: Rc<Cell<Option<LeaseKind>>>,
}

impl OperationLease {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, kind: LeaseKind) -> Result<LeaseGuard, LeaseBusy> {
        if let Some(held) = self.slot.get() {
            return Err(LeaseBusy { held });
        }
        self.slot.set(Some(kind));
        Ok(LeaseGuard {
            slot: Rc::clone(&self.slot),
            kind,
        })
    }

    pub fn holder(&self) -> Option<LeaseKind> {
        self.slot.get()
    }

    pub fn is_held(&self) -> bool {
        self.slot.get().is_some()
    }
}

/// Releases the lease when dropped, on every exit path.
#[derive(Debug)]
pub struct LeaseGuard {
    slot: Rc<Cell<Option<LeaseKind>>>,
    kind: LeaseKind,
}

impl LeaseGuard {
    pub fn kind(&self) -> LeaseKind {
        self.kind
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.slot.set(None);
    }
}
