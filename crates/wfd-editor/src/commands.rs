//! Undo/Redo command stack.
//!
//! Every undoable edit is recorded as a **snapshot pair**: the canonical
//! definition before and after the edit. Undo restores `before`, redo
//! restores `after`. The store is small and snapshots are plain values, so
//! there is no per-operation inverse to compute and no way for an inverse
//! to drift from its forward operation.
//!
//! Multi-step gestures can be grouped with `begin_batch` / `end_batch`;
//! everything in between collapses into one undo step.

use crate::store::WorkflowStore;
use log::trace;
use std::collections::VecDeque;
use wfd_core::WorkflowDefinition;

/// One undo step.
#[derive(Debug, Clone)]
pub struct Command {
    before: WorkflowDefinition,
    after: WorkflowDefinition,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping.
pub struct CommandStack {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured when the outermost batch opened.
    batch_snapshot: Option<WorkflowDefinition>,
    batch_description: String,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_depth.min(64)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
            batch_description: String::new(),
        }
    }

    /// Run `op` against the store and record it as one undo step if the
    /// canonical definition changed. Rejected operations leave nothing to
    /// undo. Returns whatever `op` returned.
    pub fn execute<F, R>(&mut self, store: &mut WorkflowStore, description: &str, op: F) -> R
    where
        F: FnOnce(&mut WorkflowStore) -> R,
    {
        if self.batch_depth > 0 {
            return op(store);
        }

        let before = store.build();
        let result = op(store);
        self.record(before, store.build(), description);
        result
    }

    /// Start a batch group. Nested calls join the outermost group.
    pub fn begin_batch(&mut self, store: &WorkflowStore, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(store.build());
            self.batch_description = description.to_string();
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost group closes, push one
    /// snapshot command if the definition changed.
    pub fn end_batch(&mut self, store: &WorkflowStore) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            if let Some(before) = self.batch_snapshot.take() {
                let description = std::mem::take(&mut self.batch_description);
                self.record(before, store.build(), &description);
            }
        }
    }

    fn record(&mut self, before: WorkflowDefinition, after: WorkflowDefinition, description: &str) {
        if before == after {
            return;
        }
        trace!("history: record `{description}`");
        self.undo_stack.push_back(Command {
            before,
            after,
            description: description.to_string(),
        });
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, store: &mut WorkflowStore) -> Option<String> {
        let cmd = self.undo_stack.pop_back()?;
        store.restore(cmd.before.clone());
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, store: &mut WorkflowStore) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        store.restore(cmd.after.clone());
        let desc = cmd.description.clone();
        self.undo_stack.push_back(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Forget all history (after a load).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StatusPatch;
    use pretty_assertions::assert_eq;
    use wfd_core::{StatusId, TransitionType, seed_template};

    fn id(s: &str) -> StatusId {
        StatusId::intern(s)
    }

    #[test]
    fn undo_redo_single_edit() {
        let mut store = WorkflowStore::new(seed_template());
        let mut stack = CommandStack::new(100);
        let original = store.build();

        stack.execute(&mut store, "rename", |s| {
            s.update_status(id("work"), StatusPatch::name("Doing"))
        });
        let edited = store.build();
        assert_ne!(edited, original);

        assert_eq!(stack.undo(&mut store).as_deref(), Some("rename"));
        assert_eq!(store.build(), original);
        assert_eq!(stack.redo(&mut store).as_deref(), Some("rename"));
        assert_eq!(store.build(), edited);
    }

    #[test]
    fn rejected_ops_are_not_recorded() {
        let mut store = WorkflowStore::new(seed_template());
        let mut stack = CommandStack::new(100);
        let applied = stack.execute(&mut store, "connect", |s| {
            s.add_transition(id("start"), id("work"), TransitionType::Success)
        });
        assert!(!applied);
        assert!(!stack.can_undo());

        // Applied but unchanged: also nothing to undo.
        stack.execute(&mut store, "flag", |s| {
            s.update_status(id("start"), StatusPatch::start(true))
        });
        assert!(!stack.can_undo());
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut store = WorkflowStore::new(seed_template());
        let mut stack = CommandStack::new(100);
        stack.execute(&mut store, "a", |s| s.delete_status(id("work")));
        stack.undo(&mut store);
        assert!(stack.can_redo());
        stack.execute(&mut store, "b", |s| s.delete_status(id("done")));
        assert!(!stack.can_redo());
    }

    #[test]
    fn batch_collapses_to_one_step() {
        let mut store = WorkflowStore::new(seed_template());
        let mut stack = CommandStack::new(100);
        let original = store.build();

        stack.begin_batch(&store, "layout");
        stack.execute(&mut store, "move", |s| s.set_position(id("work"), 1.0, 2.0));
        stack.begin_batch(&store, "nested");
        stack.execute(&mut store, "move", |s| s.set_position(id("done"), 3.0, 4.0));
        stack.end_batch(&store);
        stack.end_batch(&store);

        assert_eq!(stack.undo_depth(), 1);
        assert_eq!(stack.undo(&mut store).as_deref(), Some("layout"));
        assert_eq!(store.build(), original);
    }

    #[test]
    fn depth_is_bounded() {
        let mut store = WorkflowStore::new(seed_template());
        let mut stack = CommandStack::new(2);
        for n in 0..5 {
            stack.execute(&mut store, "move", |s| s.set_position(id("work"), n as f64, 0.0));
        }
        assert_eq!(stack.undo_depth(), 2);
    }

    #[test]
    fn undo_keeps_baseline() {
        let mut store = WorkflowStore::new(seed_template());
        let mut stack = CommandStack::new(100);
        stack.execute(&mut store, "delete", |s| s.delete_status(id("work")));
        assert!(store.is_dirty());
        stack.undo(&mut store);
        assert!(!store.is_dirty());
    }
}
