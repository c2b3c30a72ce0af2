//! Graph store and mutation engine.
//!
//! `WorkflowStore` owns the live workflow graph and is the only place it is
//! mutated. Canvas gestures, property-panel commits and keyboard deletes all
//! end up here as one of a small set of synchronous, atomic operations.
//!
//! - **Constructive invariants.** Self-loops, duplicate `(from, to)` pairs
//!   and dangling endpoints can never enter the graph: `add_transition` and
//!   `reconnect_transition` consult the connection guard first, and
//!   `delete_status` cascades to every incident transition.
//! - **Tagged start/end.** Start and End are single `Option<StatusId>`
//!   references, so "exactly one" is an assignment, not a broadcast clear.
//!   They are projected back to `isStart` / `isEnd` flags by `build()`.
//! - **Total operations.** Nothing here returns an error. Illegal requests
//!   are ignored (logged at `trace`) and leave the store unchanged; the
//!   `bool` results only report whether anything was applied.

use crate::config::EditorConfig;
use crate::save::SavedWorkflow;
use crate::selection::{Selection, SelectionTarget};
use log::{debug, trace, warn};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use serde::Deserialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use wfd_core::{
    ConnectRejection, RoleList, Status, StatusId, Transition, TransitionKey, TransitionType,
    WorkflowDefinition,
};

// ─── Graph weights ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StatusNode {
    id: StatusId,
    name: String,
    color_accent: String,
    roles: RoleList,
    /// Last committed canvas position (drag end), unrounded.
    x: f64,
    y: f64,
}

impl From<Status> for StatusNode {
    fn from(s: Status) -> Self {
        Self {
            id: s.id,
            name: s.name,
            color_accent: s.color_accent,
            roles: s.roles,
            x: f64::from(s.x),
            y: f64::from(s.y),
        }
    }
}

#[derive(Debug, Clone)]
struct TransitionEdge {
    kind: TransitionType,
    /// Explicit label. `None` means "derive from `kind`".
    label: Option<String>,
    rule: Option<String>,
    role_names: RoleList,
}

impl TransitionEdge {
    fn new(kind: TransitionType) -> Self {
        Self {
            kind,
            label: None,
            rule: None,
            role_names: SmallVec::new(),
        }
    }

    fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.kind.default_label())
    }
}

impl From<Transition> for TransitionEdge {
    fn from(t: Transition) -> Self {
        Self {
            kind: t.kind,
            label: label_override(t.label, t.kind),
            rule: non_empty(t.rule),
            role_names: t.role_names,
        }
    }
}

/// A label is an override only if it says something the type doesn't.
fn label_override(label: Option<String>, kind: TransitionType) -> Option<String> {
    label.filter(|l| !l.is_empty() && l != kind.default_label())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

fn round_coord(v: f64) -> i32 {
    v.round() as i32
}

// ─── Patches ─────────────────────────────────────────────────────────────

/// Partial update for a status. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatusPatch {
    pub name: Option<String>,
    /// `Some(true)` makes this the Start status (and clears its End flag).
    /// `Some(false)` clears Start if this status holds it.
    pub is_start: Option<bool>,
    /// Symmetric to `is_start`. Applied after it, so `true` on both wins for End.
    pub is_end: Option<bool>,
    pub color_accent: Option<String>,
    pub roles: Option<RoleList>,
}

impl StatusPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn start(flag: bool) -> Self {
        Self {
            is_start: Some(flag),
            ..Default::default()
        }
    }

    pub fn end(flag: bool) -> Self {
        Self {
            is_end: Some(flag),
            ..Default::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color_accent: Some(color.into()),
            ..Default::default()
        }
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: Some(roles.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }
}

/// Partial update for a transition. `None` fields are left alone; an empty
/// `label` or `rule` clears it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionPatch {
    #[serde(rename = "type")]
    pub kind: Option<TransitionType>,
    pub label: Option<String>,
    pub rule: Option<String>,
    pub role_names: Option<RoleList>,
}

impl TransitionPatch {
    pub fn kind(kind: TransitionType) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn rule(rule: impl Into<String>) -> Self {
        Self {
            rule: Some(rule.into()),
            ..Default::default()
        }
    }

    pub fn role_names<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            role_names: Some(roles.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

/// The authoritative workflow graph being edited.
pub struct WorkflowStore {
    id: String,
    name: String,

    /// Statuses are nodes, transitions are edges.
    graph: StableDiGraph<StatusNode, TransitionEdge>,

    /// StatusId → NodeIndex for O(1) lookup.
    index: HashMap<StatusId, NodeIndex>,

    /// Insertion order of statuses, as emitted by `build()`.
    status_order: Vec<StatusId>,

    /// Insertion order of transitions. A reconnect keeps its slot.
    transition_order: Vec<TransitionKey>,

    start: Option<StatusId>,
    end: Option<StatusId>,

    selection: Selection,

    /// Last loaded or saved definition, for `discard()` and `is_dirty()`.
    baseline: WorkflowDefinition,

    /// Bumped by `load()` and `discard()`. A save started under an older
    /// generation no longer applies.
    generation: u64,

    config: EditorConfig,
}

impl WorkflowStore {
    /// Seed a store from a template or a persisted definition.
    pub fn new(def: WorkflowDefinition) -> Self {
        Self::with_config(def, EditorConfig::default())
    }

    pub fn with_config(def: WorkflowDefinition, config: EditorConfig) -> Self {
        let mut store = Self {
            id: String::new(),
            name: String::new(),
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            status_order: Vec::new(),
            transition_order: Vec::new(),
            start: None,
            end: None,
            selection: Selection::None,
            baseline: WorkflowDefinition::default(),
            generation: 0,
            config,
        };
        store.load(def);
        store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Replace everything with `def` and make it the new baseline.
    ///
    /// Transitions that could never have been created through the editor
    /// (self-loops, duplicate pairs, unknown endpoints) are dropped. If more
    /// than one status is flagged Start (or End), the first one wins.
    pub fn load(&mut self, def: WorkflowDefinition) {
        self.replace(def);
        self.selection = Selection::None;
        self.baseline = self.build();
        self.generation = self.generation.wrapping_add(1);
        debug!(
            "loaded workflow `{}`: {} statuses, {} transitions",
            self.name,
            self.status_order.len(),
            self.transition_order.len()
        );
    }

    /// Replace the graph with `def` without moving the baseline. Used by
    /// undo/redo. The selection survives if its entity still exists.
    pub fn restore(&mut self, def: WorkflowDefinition) {
        self.replace(def);
        let still_there = match self.selection {
            Selection::None => true,
            Selection::Status(id) => self.contains_status(id),
            Selection::Transition(key) => self.contains_transition(key),
        };
        if !still_there {
            self.selection = Selection::None;
        }
    }

    /// Throw away all edits since the last load or save.
    pub fn discard(&mut self) {
        let baseline = self.baseline.clone();
        self.replace(baseline);
        self.selection = Selection::None;
        self.generation = self.generation.wrapping_add(1);
        debug!("discarded edits to workflow `{}`", self.name);
    }

    /// Identifies the current load. Save tickets carry it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the canonical state differs from the last load/save.
    pub fn is_dirty(&self) -> bool {
        self.build() != self.baseline
    }

    /// Record a successful save. Adopts the id persistence assigned and
    /// makes the saved payload the new baseline; edits made while the save
    /// was in flight stay dirty.
    ///
    /// A save started before the last `load()` or `discard()` is ignored.
    /// Returns `true` if it was applied.
    pub fn mark_saved(&mut self, saved: &SavedWorkflow) -> bool {
        if saved.generation != self.generation {
            debug!(
                "ignoring save of `{}` as {}: workflow was reloaded",
                saved.definition.name, saved.id
            );
            return false;
        }
        if !saved.id.is_empty() {
            self.id = saved.id.clone();
        }
        self.baseline = saved.definition.clone();
        true
    }

    fn replace(&mut self, def: WorkflowDefinition) {
        self.graph.clear();
        self.index.clear();
        self.status_order.clear();
        self.transition_order.clear();
        self.start = None;
        self.end = None;
        self.id = def.id;
        self.name = def.name;

        for status in def.statuses {
            let id = status.id;
            if self.index.contains_key(&id) {
                warn!("dropping duplicate status `{id}`");
                continue;
            }
            if status.is_start {
                match self.start {
                    None => self.start = Some(id),
                    Some(first) => warn!("`{id}` is flagged Start but `{first}` already is"),
                }
            }
            if status.is_end {
                match self.end {
                    None => self.end = Some(id),
                    Some(first) => warn!("`{id}` is flagged End but `{first}` already is"),
                }
            }
            self.insert_status(StatusNode::from(status));
        }

        for t in def.transitions {
            let key = t.key();
            let (Some(a), Some(b)) = (self.node_index(key.from), self.node_index(key.to)) else {
                warn!("dropping transition {key}: unknown status");
                continue;
            };
            if let Err(reason) = self.check_connection(key.from, key.to) {
                warn!("dropping transition {key}: {reason}");
                continue;
            }
            self.graph.add_edge(a, b, TransitionEdge::from(t));
            self.transition_order.push(key);
        }
    }

    fn insert_status(&mut self, node: StatusNode) {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        self.status_order.push(id);
    }

    // ─── Status operations ───────────────────────────────────────────────

    /// Create a status with a fresh id and default name, placed so it does
    /// not sit exactly on top of an existing node.
    pub fn add_status(&mut self) -> Status {
        let id = loop {
            let candidate = StatusId::fresh();
            if !self.index.contains_key(&candidate) {
                break candidate;
            }
        };
        let (x, y) = self.free_position();
        let node = StatusNode {
            id,
            name: self.config.new_status_name.clone(),
            color_accent: self.config.new_status_color.clone(),
            roles: SmallVec::new(),
            x,
            y,
        };
        let status = self.project_status(&node);
        self.insert_status(node);
        debug!("add status {id} at ({x}, {y})");
        status
    }

    fn free_position(&self) -> (f64, f64) {
        let n = self.status_order.len();
        let attempts = self.config.placement_wrap.max(1) * 2;
        (n..n + attempts)
            .map(|k| self.config.placement(k))
            .find(|&(x, y)| {
                !self.nodes().any(|node| {
                    round_coord(node.x) == round_coord(x) && round_coord(node.y) == round_coord(y)
                })
            })
            .unwrap_or_else(|| self.config.placement(n))
    }

    /// Apply a partial update. Returns `false` if the status is unknown.
    pub fn update_status(&mut self, id: StatusId, patch: StatusPatch) -> bool {
        let Some(node) = self.node_mut(id) else {
            trace!("update_status: unknown status {id}");
            return false;
        };
        if let Some(name) = patch.name {
            node.name = name;
        }
        if let Some(color) = patch.color_accent {
            node.color_accent = color;
        }
        if let Some(roles) = patch.roles {
            node.roles = roles;
        }

        match patch.is_start {
            Some(true) => {
                self.start = Some(id);
                if self.end == Some(id) {
                    self.end = None;
                }
            }
            Some(false) if self.start == Some(id) => self.start = None,
            _ => {}
        }
        match patch.is_end {
            Some(true) => {
                self.end = Some(id);
                if self.start == Some(id) {
                    self.start = None;
                }
            }
            Some(false) if self.end == Some(id) => self.end = None,
            _ => {}
        }

        debug!("update status {id}");
        true
    }

    /// Remove a status and every transition into or out of it.
    ///
    /// Never blocked: deleting the Start or End status is allowed and is
    /// reported by validation at save time.
    pub fn delete_status(&mut self, id: StatusId) -> bool {
        let Some(idx) = self.index.remove(&id) else {
            trace!("delete_status: unknown status {id}");
            return false;
        };
        // Removing a node from the stable graph drops its incident edges.
        self.graph.remove_node(idx);
        self.status_order.retain(|s| *s != id);
        let before = self.transition_order.len();
        self.transition_order.retain(|k| !k.touches(id));

        if self.start == Some(id) {
            self.start = None;
        }
        if self.end == Some(id) {
            self.end = None;
        }
        if self.selection.depends_on_status(id) {
            self.selection = Selection::None;
        }
        debug!(
            "delete status {id} (cascaded {} transitions)",
            before - self.transition_order.len()
        );
        true
    }

    /// Commit a drag-end position. Layout only; never touches invariants.
    pub fn set_position(&mut self, id: StatusId, x: f64, y: f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            trace!("set_position: non-finite position for {id}");
            return false;
        }
        let Some(node) = self.node_mut(id) else {
            trace!("set_position: unknown status {id}");
            return false;
        };
        node.x = x;
        node.y = y;
        true
    }

    // ─── Transition operations ───────────────────────────────────────────

    /// Connect `from → to` if the connection guard allows it. The label is
    /// derived from `kind`.
    pub fn add_transition(&mut self, from: StatusId, to: StatusId, kind: TransitionType) -> bool {
        let (Some(a), Some(b)) = (self.node_index(from), self.node_index(to)) else {
            trace!("add_transition {from}->{to}: unknown status");
            return false;
        };
        if let Err(reason) = self.check_connection(from, to) {
            trace!("add_transition {from}->{to} rejected: {reason}");
            return false;
        }
        self.graph.add_edge(a, b, TransitionEdge::new(kind));
        self.transition_order.push(TransitionKey::new(from, to));
        debug!("add transition {from}->{to} ({kind})");
        true
    }

    /// Apply a partial update to a transition. A `kind` change re-derives
    /// the label unless an explicit label is set.
    pub fn update_transition(&mut self, key: TransitionKey, patch: TransitionPatch) -> bool {
        let Some(edge) = self.edge_mut(key) else {
            trace!("update_transition: unknown transition {key}");
            return false;
        };
        if let Some(kind) = patch.kind {
            edge.kind = kind;
        }
        if let Some(label) = patch.label {
            edge.label = label_override(Some(label), edge.kind);
        }
        if let Some(rule) = patch.rule {
            edge.rule = non_empty(Some(rule));
        }
        if let Some(roles) = patch.role_names {
            edge.role_names = roles;
        }
        debug!("update transition {key}");
        true
    }

    /// Move a transition's endpoints. Checked against every *other*
    /// transition; on rejection the edge keeps its old endpoints.
    pub fn reconnect_transition(
        &mut self,
        old: TransitionKey,
        from: StatusId,
        to: StatusId,
    ) -> bool {
        let Some(edge_idx) = self.edge_index(old) else {
            trace!("reconnect_transition: unknown transition {old}");
            return false;
        };
        let new = TransitionKey::new(from, to);
        if new == old {
            return true;
        }
        let (Some(a), Some(b)) = (self.node_index(from), self.node_index(to)) else {
            trace!("reconnect_transition {old} to {new}: unknown status");
            return false;
        };
        let others = self.transition_order.iter().copied().filter(|k| *k != old);
        if let Err(reason) = wfd_core::check_connection(others, from, to) {
            trace!("reconnect_transition {old} to {new} rejected: {reason}");
            return false;
        }

        let Some(edge) = self.graph.remove_edge(edge_idx) else {
            return false;
        };
        self.graph.add_edge(a, b, edge);
        if let Some(slot) = self.transition_order.iter_mut().find(|k| **k == old) {
            *slot = new;
        }
        if self.selection == Selection::Transition(old) {
            self.selection = Selection::Transition(new);
        }
        debug!("reconnect transition {old} to {new}");
        true
    }

    pub fn delete_transition(&mut self, key: TransitionKey) -> bool {
        let Some(edge_idx) = self.edge_index(key) else {
            trace!("delete_transition: unknown transition {key}");
            return false;
        };
        self.graph.remove_edge(edge_idx);
        self.transition_order.retain(|k| *k != key);
        if self.selection == Selection::Transition(key) {
            self.selection = Selection::None;
        }
        debug!("delete transition {key}");
        true
    }

    /// Connection guard against the current transitions.
    pub fn check_connection(&self, from: StatusId, to: StatusId) -> Result<(), ConnectRejection> {
        wfd_core::check_connection(self.transition_keys(), from, to)
    }

    pub fn can_connect(&self, from: StatusId, to: StatusId) -> bool {
        self.check_connection(from, to).is_ok()
    }

    // ─── Workflow-level fields ───────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        debug!("rename workflow to `{}`", self.name);
    }

    pub fn start(&self) -> Option<StatusId> {
        self.start
    }

    pub fn end(&self) -> Option<StatusId> {
        self.end
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Apply a canvas selection change. Targets that do not exist select
    /// nothing. Returns `true` if the selection changed.
    pub fn select(&mut self, target: Option<SelectionTarget>) -> bool {
        let next = match target {
            Some(SelectionTarget::Status(id)) if self.contains_status(id) => Selection::Status(id),
            Some(SelectionTarget::Transition(key)) if self.contains_transition(key) => {
                Selection::Transition(key)
            }
            _ => Selection::None,
        };
        let changed = next != self.selection;
        self.selection = next;
        changed
    }

    pub fn clear_selection(&mut self) -> bool {
        self.select(None)
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn contains_status(&self, id: StatusId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn contains_transition(&self, key: TransitionKey) -> bool {
        self.edge_index(key).is_some()
    }

    pub fn status_count(&self) -> usize {
        self.status_order.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transition_order.len()
    }

    /// Status ids in display order.
    pub fn status_ids(&self) -> impl Iterator<Item = StatusId> + '_ {
        self.status_order.iter().copied()
    }

    /// Transition keys in display order.
    pub fn transition_keys(&self) -> impl Iterator<Item = TransitionKey> + '_ {
        self.transition_order.iter().copied()
    }

    /// Unrounded committed position of a status.
    pub fn position(&self, id: StatusId) -> Option<(f64, f64)> {
        self.node(id).map(|n| (n.x, n.y))
    }

    /// The explicit label of a transition, if one overrides the derived one.
    pub fn label_override(&self, key: TransitionKey) -> Option<&str> {
        self.edge(key).and_then(|e| e.label.as_deref())
    }

    /// Canonical view of one status.
    pub fn status(&self, id: StatusId) -> Option<Status> {
        self.node(id).map(|n| self.project_status(n))
    }

    /// Canonical view of one transition, label resolved.
    pub fn transition(&self, key: TransitionKey) -> Option<Transition> {
        self.edge(key).map(|e| Transition {
            from_status_id: key.from,
            to_status_id: key.to,
            kind: e.kind,
            label: Some(e.display_label().to_string()),
            rule: e.rule.clone(),
            role_names: e.role_names.clone(),
        })
    }

    /// The save-ready snapshot: latest committed positions, endpoints and
    /// resolved labels, statuses and transitions in display order.
    pub fn build(&self) -> WorkflowDefinition {
        WorkflowDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            statuses: self.status_ids().filter_map(|id| self.status(id)).collect(),
            transitions: self
                .transition_keys()
                .filter_map(|key| self.transition(key))
                .collect(),
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn project_status(&self, n: &StatusNode) -> Status {
        Status {
            id: n.id,
            name: n.name.clone(),
            is_start: self.start == Some(n.id),
            is_end: self.end == Some(n.id),
            color_accent: n.color_accent.clone(),
            roles: n.roles.clone(),
            x: round_coord(n.x),
            y: round_coord(n.y),
        }
    }

    fn nodes(&self) -> impl Iterator<Item = &StatusNode> + '_ {
        self.status_order.iter().filter_map(|id| self.node(*id))
    }

    fn node_index(&self, id: StatusId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    fn node(&self, id: StatusId) -> Option<&StatusNode> {
        self.node_index(id).and_then(|idx| self.graph.node_weight(idx))
    }

    fn node_mut(&mut self, id: StatusId) -> Option<&mut StatusNode> {
        let idx = self.node_index(id)?;
        self.graph.node_weight_mut(idx)
    }

    fn edge_index(&self, key: TransitionKey) -> Option<EdgeIndex> {
        let a = self.node_index(key.from)?;
        let b = self.node_index(key.to)?;
        self.graph.find_edge(a, b)
    }

    fn edge(&self, key: TransitionKey) -> Option<&TransitionEdge> {
        self.edge_index(key).and_then(|idx| self.graph.edge_weight(idx))
    }

    fn edge_mut(&mut self, key: TransitionKey) -> Option<&mut TransitionEdge> {
        let idx = self.edge_index(key)?;
        self.graph.edge_weight_mut(idx)
    }
}
