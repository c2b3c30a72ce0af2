//! Save adapter: validate, build, hand off to persistence.
//!
//! A save is split in two so the store is never borrowed across the
//! persistence await:
//!
//! 1. [`SaveAdapter::prepare`] builds the canonical payload from the store's
//!    *current* state, validates it, and claims the single in-flight slot.
//! 2. [`SaveTicket::submit`] (or [`SaveTicket::complete`] when the host
//!    awaits persistence itself) finishes the save and releases the slot.
//!
//! Editing may continue between the two steps. Dropping a ticket without
//! completing it also releases the slot.

use crate::store::WorkflowStore;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use wfd_core::{ValidationError, WorkflowDefinition, validate};

// ─── Persistence capability ──────────────────────────────────────────────

/// Successful persistence result: either a record carrying the id, or the
/// bare id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PersistResponse {
    Record { id: String },
    Id(String),
}

impl PersistResponse {
    pub fn id(&self) -> &str {
        match self {
            Self::Record { id } | Self::Id(id) => id,
        }
    }
}

impl From<String> for PersistResponse {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

/// A rejected persistence call. The message, if any, is shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", .message.as_deref().unwrap_or("persistence failed"))]
pub struct PersistError {
    pub message: Option<String>,
}

impl PersistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A rejection that did not say why.
    pub fn unexplained() -> Self {
        Self::default()
    }
}

/// The injected, transport-agnostic save function.
#[async_trait]
pub trait WorkflowPersistence: Send + Sync {
    async fn persist(&self, payload: WorkflowDefinition) -> Result<PersistResponse, PersistError>;
}

#[async_trait]
impl<F, Fut> WorkflowPersistence for F
where
    F: Fn(WorkflowDefinition) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PersistResponse, PersistError>> + Send,
{
    async fn persist(&self, payload: WorkflowDefinition) -> Result<PersistResponse, PersistError> {
        (self)(payload).await
    }
}

// ─── Errors ──────────────────────────────────────────────────────────────

/// Why a save did not complete. `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// Blocked locally; persistence was never called.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Another save has not finished yet.
    #[error("a save is already in progress")]
    InFlight,

    /// Persistence rejected the payload. The store is untouched.
    #[error("{message}")]
    Persistence { message: String },
}

/// A completed save.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedWorkflow {
    /// Id assigned by persistence (or the one the definition already had).
    pub id: String,
    /// The exact payload that was persisted, with `id` filled in.
    pub definition: WorkflowDefinition,
    /// Store generation the payload was built from.
    pub(crate) generation: u64,
}

// ─── Adapter ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SaveAdapter {
    in_flight: Arc<AtomicBool>,
    failure_message: String,
}

impl SaveAdapter {
    /// `failure_message` is shown when persistence rejects without a reason.
    pub fn new(failure_message: impl Into<String>) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            failure_message: failure_message.into(),
        }
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Build and validate the payload, then claim the in-flight slot.
    pub fn prepare(&self, store: &WorkflowStore) -> Result<SaveTicket, SaveError> {
        let payload = store.build();
        if let Err(err) = validate(&payload) {
            warn!("save blocked: {err}");
            return Err(err.into());
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("save blocked: another save is in flight");
            return Err(SaveError::InFlight);
        }
        Ok(SaveTicket {
            payload,
            generation: store.generation(),
            failure_message: self.failure_message.clone(),
            _slot: InFlightSlot(Arc::clone(&self.in_flight)),
        })
    }

    /// Prepare, persist, and on success move the store's saved baseline.
    ///
    /// Holds the store for the whole save; hosts that keep editing during
    /// persistence use `prepare` and `SaveTicket::submit` instead.
    pub async fn save<P>(
        &self,
        store: &mut WorkflowStore,
        persistence: &P,
    ) -> Result<SavedWorkflow, SaveError>
    where
        P: WorkflowPersistence + ?Sized,
    {
        let ticket = self.prepare(store)?;
        let saved = ticket.submit(persistence).await?;
        store.mark_saved(&saved);
        Ok(saved)
    }
}

impl Default for SaveAdapter {
    fn default() -> Self {
        Self::new(crate::config::EditorConfig::default().save_failure_message)
    }
}

/// Releases the in-flight flag when dropped.
#[derive(Debug)]
struct InFlightSlot(Arc<AtomicBool>);

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A validated payload holding the in-flight slot.
#[derive(Debug)]
pub struct SaveTicket {
    payload: WorkflowDefinition,
    generation: u64,
    failure_message: String,
    _slot: InFlightSlot,
}

impl SaveTicket {
    /// The canonical payload that will be persisted.
    pub fn payload(&self) -> &WorkflowDefinition {
        &self.payload
    }

    /// Hand the payload to persistence and finish the save.
    pub async fn submit<P>(self, persistence: &P) -> Result<SavedWorkflow, SaveError>
    where
        P: WorkflowPersistence + ?Sized,
    {
        let result = persistence.persist(self.payload.clone()).await;
        self.complete(result)
    }

    /// Finish the save with a persistence result obtained elsewhere.
    pub fn complete(
        self,
        result: Result<PersistResponse, PersistError>,
    ) -> Result<SavedWorkflow, SaveError> {
        match result {
            Ok(response) => {
                let mut definition = self.payload;
                if !response.id().is_empty() {
                    definition.id = response.id().to_string();
                }
                info!("saved workflow `{}` as {}", definition.name, definition.id);
                Ok(SavedWorkflow {
                    id: definition.id.clone(),
                    definition,
                    generation: self.generation,
                })
            }
            Err(err) => {
                let message = err
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or(self.failure_message);
                warn!("save failed: {message}");
                Err(SaveError::Persistence { message })
            }
        }
    }
}
