use serde::Serialize;
use studio_core::object::ObjectId;
use thiserror::Error;

/// Pointer interaction phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging {
        target: ObjectId,
    },
    /// Rubber-band selection over empty canvas.
    Selecting,
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Dragging { .. } => "dragging",
            InteractionState::Selecting => "selecting",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    #[error("Cannot handle {event} while {state}")]
    InvalidTransition { state: &'static str, event: &'static str },
}

/// A drag that just ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEnd {
    pub target: ObjectId,
    /// A move of `target` was held back during the drag.
    pub moved: bool,
}

/// The idle/dragging/selecting state machine.
///
/// While an object is dragged, its coordinate refreshes are held back and
/// replayed once when the drag ends.
#[derive(Debug, Default)]
pub struct DragSession {
    state: InteractionState,
    moved_while_dragging: bool,
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn dragged(&self) -> Option<ObjectId> {
        match self.state {
            InteractionState::Dragging { target } => Some(target),
            _ => None,
        }
    }

    pub fn is_dragging(&self, id: &ObjectId) -> bool {
        self.dragged().as_ref() == Some(id)
    }

    pub fn pointer_down(&mut self, target: Option<ObjectId>) -> Result<InteractionState, InteractionError> {
        if self.state != InteractionState::Idle {
            return Err(InteractionError::InvalidTransition {
                state: self.state.name(),
                event: "pointer down",
            });
        }
        self.state = match target {
            Some(target) => InteractionState::Dragging { target },
            None => InteractionState::Selecting,
        };
        self.moved_while_dragging = false;
        Ok(self.state)
    }

    /// Returns the drag that ended, if one was in progress.
    pub fn pointer_up(&mut self) -> Result<Option<DragEnd>, InteractionError> {
        match self.state {
            InteractionState::Idle => Err(InteractionError::InvalidTransition {
                state: "idle",
                event: "pointer up",
            }),
            _ => Ok(self.reset()),
        }
    }

    /// Record a move of `id`. Returns true if it was held back by an active drag.
    pub fn defer_move(&mut self, id: &ObjectId) -> bool {
        if self.is_dragging(id) {
            self.moved_while_dragging = true;
            return true;
        }
        false
    }

    /// Return to idle from any state. Returns the drag that ended, if any.
    pub fn reset(&mut self) -> Option<DragEnd> {
        let ended = self.dragged().map(|target| DragEnd {
            target,
            moved: self.moved_while_dragging,
        });
        self.state = InteractionState::Idle;
        self.moved_while_dragging = false;
        ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_cycle() {
        let mut session = DragSession::new();
        let id = ObjectId::new_v4();
        assert_eq!(
            session.pointer_down(Some(id)).unwrap(),
            InteractionState::Dragging { target: id }
        );
        assert!(session.defer_move(&id));
        assert!(!session.defer_move(&ObjectId::new_v4()));
        assert_eq!(
            session.pointer_up().unwrap(),
            Some(DragEnd {
                target: id,
                moved: true
            })
        );
        assert_eq!(session.state(), InteractionState::Idle);

        // A press and release without movement.
        session.pointer_down(Some(id)).unwrap();
        assert_eq!(session.reset().map(|end| end.moved), Some(false));
    }

    #[test]
    fn test_selecting_cycle() {
        let mut session = DragSession::new();
        assert_eq!(session.pointer_down(None).unwrap(), InteractionState::Selecting);
        assert_eq!(session.pointer_up().unwrap(), None);
        assert!(!session.defer_move(&ObjectId::new_v4()));
    }

    #[test]
    fn test_invalid_transitions() {
        let mut session = DragSession::new();
        assert_eq!(
            session.pointer_up().unwrap_err(),
            InteractionError::InvalidTransition {
                state: "idle",
                event: "pointer up"
            }
        );
        session.pointer_down(None).unwrap();
        assert!(session.pointer_down(Some(ObjectId::new_v4())).is_err());
        assert_eq!(session.state(), InteractionState::Selecting);
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let id = ObjectId::new_v4();
        let value = serde_json::to_value(InteractionState::Dragging { target: id }).unwrap();
        assert_eq!(value["state"], "dragging");
        assert_eq!(value["target"], id.to_string());
    }
}
