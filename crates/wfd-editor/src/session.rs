//! Editor session: the single writer in front of the store.
//!
//! Routes canvas events and property-panel edits into the mutation engine,
//! records undo history for every committed edit, and buffers text fields
//! as drafts until they are committed (blur / Enter).

use crate::commands::CommandStack;
use crate::config::EditorConfig;
use crate::input::CanvasEvent;
use crate::save::{SaveAdapter, SaveError, SaveTicket, SavedWorkflow, WorkflowPersistence};
use crate::selection::{Selection, SelectionTarget};
use crate::shortcuts::{FocusTarget, ShortcutAction, ShortcutMap};
use crate::store::{StatusPatch, TransitionPatch, WorkflowStore};
use log::debug;
use std::collections::HashMap;
use wfd_core::{RoleList, Status, StatusId, TransitionKey, TransitionType, WorkflowDefinition};

// ─── Drafts ──────────────────────────────────────────────────────────────

/// Text fields edited with draft/commit semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    StatusName,
    TransitionLabel,
    TransitionRule,
    WorkflowName,
}

impl DraftField {
    const ALL: [DraftField; 4] = [
        Self::StatusName,
        Self::TransitionLabel,
        Self::TransitionRule,
        Self::WorkflowName,
    ];
}

/// The entity a draft was opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftTarget {
    Status(StatusId),
    Transition(TransitionKey),
    Workflow,
}

impl DraftTarget {
    fn depends_on(&self, gone: Selection) -> bool {
        match (self, gone) {
            (Self::Status(id), Selection::Status(s)) => *id == s,
            (Self::Transition(key), Selection::Status(s)) => key.touches(s),
            (Self::Transition(key), Selection::Transition(k)) => *key == k,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
struct Draft {
    target: DraftTarget,
    text: String,
}

// ─── Session ─────────────────────────────────────────────────────────────

pub struct EditorSession {
    store: WorkflowStore,
    history: CommandStack,
    drafts: HashMap<DraftField, Draft>,
    saver: SaveAdapter,
}

impl EditorSession {
    pub fn new(def: WorkflowDefinition) -> Self {
        Self::with_config(def, EditorConfig::default())
    }

    pub fn with_config(def: WorkflowDefinition, config: EditorConfig) -> Self {
        Self {
            history: CommandStack::new(config.history_depth),
            saver: SaveAdapter::new(config.save_failure_message.clone()),
            drafts: HashMap::new(),
            store: WorkflowStore::with_config(def, config),
        }
    }

    /// Replace the edited workflow. History and drafts start over.
    pub fn load(&mut self, def: WorkflowDefinition) {
        self.store.load(def);
        self.history.clear();
        self.drafts.clear();
    }

    /// Close without saving: revert to the last loaded or saved state.
    pub fn discard(&mut self) {
        self.store.discard();
        self.history.clear();
        self.drafts.clear();
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    pub fn selection(&self) -> Selection {
        self.store.selection()
    }

    pub fn build(&self) -> WorkflowDefinition {
        self.store.build()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// The message to show inline for the committed state, if invalid.
    pub fn validation_message(&self) -> Option<String> {
        wfd_core::validation_message(&self.store.build())
    }

    /// Visual-only hint while the user drags a connection.
    pub fn is_valid_connection(&self, from: StatusId, to: StatusId) -> bool {
        self.store.contains_status(from)
            && self.store.contains_status(to)
            && self.store.can_connect(from, to)
    }

    // ─── Canvas events ───────────────────────────────────────────────────

    /// Route one canvas event. Returns `true` if the canonical state changed.
    pub fn handle_event(&mut self, event: CanvasEvent) -> bool {
        let before = self.store.build();
        match event {
            CanvasEvent::NodeDragEnd { id, x, y } => {
                self.history
                    .execute(&mut self.store, "move status", |s| s.set_position(id, x, y));
            }
            CanvasEvent::Connect { from, to } => {
                self.history.execute(&mut self.store, "add transition", |s| {
                    s.add_transition(from, to, TransitionType::default())
                });
            }
            CanvasEvent::Reconnect { edge, from, to } => {
                let moved = self.history.execute(&mut self.store, "reconnect transition", |s| {
                    s.reconnect_transition(edge, from, to)
                });
                if moved {
                    self.retarget_drafts(edge, TransitionKey::new(from, to));
                }
            }
            CanvasEvent::SelectionChange(target) => {
                self.select(target);
            }
            CanvasEvent::DeleteKey { focus } => {
                if !focus.is_editable() {
                    self.delete_selection();
                }
            }
        }
        self.store.build() != before
    }

    /// Change the selection. Pending drafts are committed first, the way a
    /// blur fires before the click that moved it.
    pub fn select(&mut self, target: Option<SelectionTarget>) -> bool {
        self.commit_all_drafts();
        self.store.select(target)
    }

    /// Drafts opened on a reconnected edge follow it to its new key.
    fn retarget_drafts(&mut self, old: TransitionKey, new: TransitionKey) {
        for draft in self.drafts.values_mut() {
            if draft.target == DraftTarget::Transition(old) {
                draft.target = DraftTarget::Transition(new);
            }
        }
    }

    pub fn add_status(&mut self) -> Status {
        self.history.execute(&mut self.store, "add status", |s| s.add_status())
    }

    /// Delete the selected transition, else the selected status.
    pub fn delete_selection(&mut self) -> bool {
        let selection = self.store.selection();
        let deleted = match selection {
            Selection::None => false,
            Selection::Transition(key) => self
                .history
                .execute(&mut self.store, "delete transition", |s| s.delete_transition(key)),
            Selection::Status(id) => self
                .history
                .execute(&mut self.store, "delete status", |s| s.delete_status(id)),
        };
        if deleted {
            self.drafts.retain(|_, d| !d.target.depends_on(selection));
        }
        deleted
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Resolve and dispatch a key event. Returns the action that fired.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        focus: FocusTarget,
    ) -> Option<ShortcutAction> {
        let action = ShortcutMap::resolve(key, ctrl, shift, alt, meta, focus)?;
        self.dispatch_action(action);
        Some(action)
    }

    /// Perform a shortcut action. Returns `true` if anything changed.
    pub fn dispatch_action(&mut self, action: ShortcutAction) -> bool {
        match action {
            ShortcutAction::DeleteSelection => self.delete_selection(),
            ShortcutAction::Deselect => self.select(None),
            ShortcutAction::Undo => self.undo(),
            ShortcutAction::Redo => self.redo(),
            ShortcutAction::AddStatus => {
                self.add_status();
                true
            }
        }
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.commit_all_drafts();
        match self.history.undo(&mut self.store) {
            Some(desc) => {
                debug!("undo: {desc}");
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.commit_all_drafts();
        match self.history.redo(&mut self.store) {
            Some(desc) => {
                debug!("redo: {desc}");
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Draft fields ────────────────────────────────────────────────────

    /// Buffer a keystroke-level edit. Nothing reaches the store until
    /// `commit_draft`. Returns `false` if the field has nothing to edit
    /// (e.g. a transition label with no transition selected).
    pub fn edit_draft(&mut self, field: DraftField, text: impl Into<String>) -> bool {
        let target = match self.drafts.get(&field) {
            Some(existing) => existing.target,
            None => match self.draft_target(field) {
                Some(target) => target,
                None => return false,
            },
        };
        self.drafts.insert(
            field,
            Draft {
                target,
                text: text.into(),
            },
        );
        true
    }

    /// The buffered text of a field, if it has an uncommitted draft.
    pub fn draft(&self, field: DraftField) -> Option<&str> {
        self.drafts.get(&field).map(|d| d.text.as_str())
    }

    /// What the property panel shows for `field`: the draft if one is
    /// pending, else the committed value.
    pub fn field_value(&self, field: DraftField) -> Option<String> {
        if let Some(text) = self.draft(field) {
            return Some(text.to_string());
        }
        match self.draft_target(field)? {
            DraftTarget::Workflow => Some(self.store.name().to_string()),
            DraftTarget::Status(id) => self.store.status(id).map(|s| s.name),
            DraftTarget::Transition(key) => match field {
                DraftField::TransitionRule => {
                    self.store.transition(key).map(|t| t.rule.unwrap_or_default())
                }
                _ => Some(self.store.label_override(key).unwrap_or_default().to_string()),
            },
        }
    }

    /// Flush a draft into the store (blur / Enter). Returns `true` if the
    /// canonical state changed.
    pub fn commit_draft(&mut self, field: DraftField) -> bool {
        let Some(draft) = self.drafts.remove(&field) else {
            return false;
        };
        let before = self.store.build();
        let text = draft.text;
        match (field, draft.target) {
            (DraftField::StatusName, DraftTarget::Status(id)) => {
                self.history.execute(&mut self.store, "rename status", |s| {
                    s.update_status(id, StatusPatch::name(text))
                });
            }
            (DraftField::TransitionLabel, DraftTarget::Transition(key)) => {
                self.history.execute(&mut self.store, "edit transition label", |s| {
                    s.update_transition(key, TransitionPatch::label(text))
                });
            }
            (DraftField::TransitionRule, DraftTarget::Transition(key)) => {
                self.history.execute(&mut self.store, "edit transition rule", |s| {
                    s.update_transition(key, TransitionPatch::rule(text))
                });
            }
            (DraftField::WorkflowName, DraftTarget::Workflow) => {
                self.history
                    .execute(&mut self.store, "rename workflow", |s| s.set_name(text));
            }
            _ => {}
        }
        self.store.build() != before
    }

    /// Drop a draft without touching the store (Escape).
    pub fn cancel_draft(&mut self, field: DraftField) -> bool {
        self.drafts.remove(&field).is_some()
    }

    /// Flush every pending draft as a single undo step.
    pub fn commit_all_drafts(&mut self) -> bool {
        if self.drafts.is_empty() {
            return false;
        }
        self.history.begin_batch(&self.store, "commit edits");
        let mut changed = false;
        for field in DraftField::ALL {
            changed |= self.commit_draft(field);
        }
        self.history.end_batch(&self.store);
        changed
    }

    fn draft_target(&self, field: DraftField) -> Option<DraftTarget> {
        match field {
            DraftField::WorkflowName => Some(DraftTarget::Workflow),
            DraftField::StatusName => self.store.selection().status().map(DraftTarget::Status),
            DraftField::TransitionLabel | DraftField::TransitionRule => {
                self.store.selection().transition().map(DraftTarget::Transition)
            }
        }
    }

    // ─── Immediate fields ────────────────────────────────────────────────

    fn update_selected_status(&mut self, description: &str, patch: StatusPatch) -> bool {
        let Some(id) = self.store.selection().status() else {
            return false;
        };
        self.history
            .execute(&mut self.store, description, |s| s.update_status(id, patch))
    }

    fn update_selected_transition(&mut self, description: &str, patch: TransitionPatch) -> bool {
        let Some(key) = self.store.selection().transition() else {
            return false;
        };
        self.history
            .execute(&mut self.store, description, |s| s.update_transition(key, patch))
    }

    pub fn set_is_start(&mut self, flag: bool) -> bool {
        self.update_selected_status("set start", StatusPatch::start(flag))
    }

    pub fn set_is_end(&mut self, flag: bool) -> bool {
        self.update_selected_status("set end", StatusPatch::end(flag))
    }

    pub fn set_status_color(&mut self, color: impl Into<String>) -> bool {
        self.update_selected_status("set colour", StatusPatch::color(color))
    }

    pub fn set_status_roles(&mut self, roles: RoleList) -> bool {
        let patch = StatusPatch {
            roles: Some(roles),
            ..Default::default()
        };
        self.update_selected_status("set roles", patch)
    }

    pub fn set_transition_type(&mut self, kind: TransitionType) -> bool {
        self.update_selected_transition("set transition type", TransitionPatch::kind(kind))
    }

    pub fn set_transition_roles(&mut self, roles: RoleList) -> bool {
        let patch = TransitionPatch {
            role_names: Some(roles),
            ..Default::default()
        };
        self.update_selected_transition("set transition roles", patch)
    }

    // ─── Save ────────────────────────────────────────────────────────────

    pub fn is_saving(&self) -> bool {
        self.saver.is_saving()
    }

    /// Commit drafts, then validate and claim the save slot. The returned
    /// ticket is independent of the session, so editing can continue while
    /// it is being persisted.
    pub fn begin_save(&mut self) -> Result<SaveTicket, SaveError> {
        self.commit_all_drafts();
        self.saver.prepare(&self.store)
    }

    /// Record a completed save: adopt its id and move the saved baseline.
    /// Returns `false` if the workflow was reloaded or discarded since the
    /// save began, in which case nothing changes.
    pub fn save_completed(&mut self, saved: &SavedWorkflow) -> bool {
        self.store.mark_saved(saved)
    }

    /// Full save round-trip against an injected persistence function.
    pub async fn save<P>(&mut self, persistence: &P) -> Result<SavedWorkflow, SaveError>
    where
        P: WorkflowPersistence + ?Sized,
    {
        let ticket = self.begin_save()?;
        let saved = ticket.submit(persistence).await?;
        self.save_completed(&saved);
        Ok(saved)
    }
}
