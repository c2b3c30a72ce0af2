//! Connection guard: may an edge `from → to` be created?
//!
//! Consulted by the canvas for the live "valid connection" hint while the
//! user drags, and by the mutation engine before committing an add or a
//! reconnect. Cycles through other statuses are legal workflow shapes
//! (e.g. rework loops) and are not rejected.

use crate::id::StatusId;
use crate::model::TransitionKey;
use thiserror::Error;

/// Why a proposed connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectRejection {
    #[error("a status cannot transition to itself")]
    SelfLoop,
    #[error("a transition between these statuses already exists")]
    Duplicate,
}

/// Check `from → to` against the keys of the existing transitions.
pub fn check_connection<I>(
    existing: I,
    from: StatusId,
    to: StatusId,
) -> Result<(), ConnectRejection>
where
    I: IntoIterator<Item = TransitionKey>,
{
    if from == to {
        return Err(ConnectRejection::SelfLoop);
    }
    let candidate = TransitionKey::new(from, to);
    if existing.into_iter().any(|k| k == candidate) {
        return Err(ConnectRejection::Duplicate);
    }
    Ok(())
}

/// Boolean form of [`check_connection`].
pub fn can_connect<I>(existing: I, from: StatusId, to: StatusId) -> bool
where
    I: IntoIterator<Item = TransitionKey>,
{
    check_connection(existing, from, to).is_ok()
}
