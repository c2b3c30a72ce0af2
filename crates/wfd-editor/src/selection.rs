//! Single-entity selection.
//!
//! The designer selects at most one thing at a time: a status, a
//! transition, or nothing. The property panel edits whatever is selected.

use wfd_core::{StatusId, TransitionKey};

/// What the canvas reports as clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionTarget {
    Status(StatusId),
    Transition(TransitionKey),
}

/// Current selection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Status(StatusId),
    Transition(TransitionKey),
}

impl Selection {
    pub fn status(&self) -> Option<StatusId> {
        match self {
            Self::Status(id) => Some(*id),
            _ => None,
        }
    }

    pub fn transition(&self) -> Option<TransitionKey> {
        match self {
            Self::Transition(key) => Some(*key),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether deleting status `id` takes the selected entity with it:
    /// the status itself, or a transition cascaded away with it.
    pub fn depends_on_status(&self, id: StatusId) -> bool {
        match self {
            Self::None => false,
            Self::Status(s) => *s == id,
            Self::Transition(key) => key.touches(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_are_exclusive() {
        let key = TransitionKey::new("a".into(), "b".into());
        let sel = Selection::Transition(key);
        assert_eq!(sel.transition(), Some(key));
        assert_eq!(sel.status(), None);
        assert!(!sel.is_none());
        assert!(Selection::default().is_none());
    }

    #[test]
    fn cascade_dependency() {
        let key = TransitionKey::new("a".into(), "b".into());
        assert!(Selection::Transition(key).depends_on_status("b".into()));
        assert!(!Selection::Transition(key).depends_on_status("c".into()));
        assert!(Selection::Status("a".into()).depends_on_status("a".into()));
        assert!(!Selection::None.depends_on_status("a".into()));
    }
}
