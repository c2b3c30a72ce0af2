//! Structural validation of a workflow definition.
//!
//! Only the invariants that can be broken by ordinary editing are checked
//! here (name present, exactly one Start, exactly one End, Start ≠ End).
//! Self-loops, duplicate edges and dangling references are never allowed
//! into the editor in the first place, so they are not re-checked.

use crate::model::WorkflowDefinition;
use thiserror::Error;

/// The first structural problem found in a definition.
///
/// `Display` is the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workflow name is required")]
    NameRequired,
    #[error("a workflow must have exactly one Start status")]
    StartCount,
    #[error("a workflow must have exactly one End status")]
    EndCount,
    #[error("Start and End cannot be the same status")]
    StartIsEnd,
}

/// Check a full definition snapshot. Returns the first violation, in the
/// order: name, start count, end count, start/end overlap.
pub fn validate(def: &WorkflowDefinition) -> Result<(), ValidationError> {
    if def.name.trim().is_empty() {
        return Err(ValidationError::NameRequired);
    }

    let mut starts = def.statuses.iter().filter(|s| s.is_start);
    let start = match (starts.next(), starts.next()) {
        (Some(s), None) => s,
        _ => return Err(ValidationError::StartCount),
    };

    let mut ends = def.statuses.iter().filter(|s| s.is_end);
    let end = match (ends.next(), ends.next()) {
        (Some(s), None) => s,
        _ => return Err(ValidationError::EndCount),
    };

    if start.id == end.id {
        return Err(ValidationError::StartIsEnd);
    }
    Ok(())
}

/// Convenience for UI code: the message to show inline, if any.
#[must_use]
pub fn validation_message(def: &WorkflowDefinition) -> Option<String> {
    validate(def).err().map(|e| e.to_string())
}
