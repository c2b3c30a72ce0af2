//! Discrete events reported by the canvas layer.
//!
//! The canvas keeps mid-gesture state (a node being dragged, a connection
//! line following the pointer) to itself and only reports the gesture's
//! end. Each event maps to at most one store operation.

use crate::selection::SelectionTarget;
use crate::shortcuts::FocusTarget;
use wfd_core::{StatusId, TransitionKey};

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// A node was dropped at `(x, y)`.
    NodeDragEnd { id: StatusId, x: f64, y: f64 },
    /// A connection line was released on `to`.
    Connect { from: StatusId, to: StatusId },
    /// An existing edge's end was dragged onto new endpoints.
    Reconnect {
        edge: TransitionKey,
        from: StatusId,
        to: StatusId,
    },
    /// Node clicked, edge clicked, or empty canvas clicked (`None`).
    SelectionChange(Option<SelectionTarget>),
    /// Delete or Backspace, with wherever focus was at the time.
    DeleteKey { focus: FocusTarget },
}
