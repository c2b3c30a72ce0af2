//! WASM bridge for the workflow designer. Exposes the editing engine to
//! the browser canvas layer.
//!
//! Compiled via `wasm-pack build --target web`. The canvas library owns
//! drawing and mid-gesture state; it reports gesture ends here and re-reads
//! `nodes_json()` / `edges_json()` whenever a call returns `true`.
//!
//! Saving is two-phase because persistence is a JS promise:
//!
//! ```js
//! const res = JSON.parse(canvas.begin_save());
//! if (!res.ok) return showError(res.error);
//! try {
//!     const saved = await persist(res.payload);
//!     canvas.finish_save(typeof saved === "string" ? saved : saved.id, undefined);
//! } catch (e) {
//!     canvas.finish_save("", e?.message ?? "");
//! }
//! ```

use serde::Serialize;
use serde_json::json;
use wasm_bindgen::prelude::*;
use wfd_core::{
    LintSeverity, RoleList, StatusId, TransitionKey, TransitionType, WorkflowDefinition,
    lint_workflow, seed_template,
};
use wfd_editor::{
    CanvasEvent, DraftField, EditorConfig, EditorSession, FocusTarget, PersistError,
    PersistResponse, SaveTicket, SelectionTarget, ShortcutAction, ShortcutMap,
};

/// The main WASM-facing designer controller.
///
/// Holds the editor session and the ticket of an in-flight save. All
/// interaction from the page goes through this struct.
#[wasm_bindgen]
pub struct WorkflowCanvas {
    session: EditorSession,
    pending_save: Option<SaveTicket>,
}

impl Default for WorkflowCanvas {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl WorkflowCanvas {
    /// Create a designer seeded with the starter template.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        // Set up panic hook for better error messages in console
        console_error_panic_hook_setup();
        Self {
            session: EditorSession::new(seed_template()),
            pending_save: None,
        }
    }

    /// Create a designer with a JSON `EditorConfig`. Unknown or malformed
    /// config falls back to defaults.
    pub fn with_config(config_json: &str) -> Self {
        console_error_panic_hook_setup();
        let config = EditorConfig::from_json(config_json).unwrap_or_else(|e| {
            log::warn!("ignoring editor config: {e}");
            EditorConfig::default()
        });
        Self {
            session: EditorSession::with_config(seed_template(), config),
            pending_save: None,
        }
    }

    // ─── Load / build ────────────────────────────────────────────────────

    /// Load a persisted definition. Returns `false` on malformed JSON, in
    /// which case the current workflow is kept. A save still in flight keeps
    /// its slot until `finish_save`, but no longer applies.
    pub fn load_json(&mut self, json: &str) -> bool {
        match WorkflowDefinition::from_json(json) {
            Ok(def) => {
                self.session.load(def);
                true
            }
            Err(e) => {
                log::warn!("load_json: {e}");
                false
            }
        }
    }

    pub fn load_template(&mut self) {
        self.session.load(seed_template());
    }

    /// The canonical definition as JSON.
    pub fn build_json(&self) -> String {
        self.session.build().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Nodes to render: `[{id, name, x, y, color, isStart, isEnd, selected}]`.
    pub fn nodes_json(&self) -> String {
        serde_json::to_string(&self.session.store().render_nodes())
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Edges to render: `[{key, source, target, type, label, color, selected}]`.
    pub fn edges_json(&self) -> String {
        serde_json::to_string(&self.session.store().render_edges())
            .unwrap_or_else(|_| "[]".to_string())
    }

    pub fn is_dirty(&self) -> bool {
        self.session.is_dirty()
    }

    /// Close without saving.
    pub fn discard(&mut self) {
        self.session.discard();
    }

    // ─── Canvas events ───────────────────────────────────────────────────

    pub fn on_node_drag_end(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.session.handle_event(CanvasEvent::NodeDragEnd {
            id: StatusId::intern(id),
            x,
            y,
        })
    }

    pub fn on_connect(&mut self, from: &str, to: &str) -> bool {
        self.session.handle_event(CanvasEvent::Connect {
            from: StatusId::intern(from),
            to: StatusId::intern(to),
        })
    }

    /// `edge_key` is the `key` field from `edges_json()`.
    pub fn on_reconnect(&mut self, edge_key: &str, from: &str, to: &str) -> bool {
        let Some(edge) = TransitionKey::parse(edge_key) else {
            return false;
        };
        self.session.handle_event(CanvasEvent::Reconnect {
            edge,
            from: StatusId::intern(from),
            to: StatusId::intern(to),
        })
    }

    pub fn on_select_node(&mut self, id: &str) -> bool {
        self.select(Some(SelectionTarget::Status(StatusId::intern(id))))
    }

    pub fn on_select_edge(&mut self, edge_key: &str) -> bool {
        let target = TransitionKey::parse(edge_key).map(SelectionTarget::Transition);
        self.select(target)
    }

    pub fn on_select_none(&mut self) -> bool {
        self.select(None)
    }

    /// Live hint while a connection is being dragged.
    pub fn is_valid_connection(&self, from: &str, to: &str) -> bool {
        self.session
            .is_valid_connection(StatusId::intern(from), StatusId::intern(to))
    }

    /// Selected entity as JSON: `{"kind":"status","id":..}`,
    /// `{"kind":"transition","key":..}` or `{"kind":"none"}`.
    pub fn selection_json(&self) -> String {
        let sel = self.session.selection();
        let value = if let Some(id) = sel.status() {
            json!({ "kind": "status", "id": id.as_str() })
        } else if let Some(key) = sel.transition() {
            json!({ "kind": "transition", "key": key.to_string() })
        } else {
            json!({ "kind": "none" })
        };
        value.to_string()
    }

    // ─── Keyboard ────────────────────────────────────────────────────────

    /// Handle a keydown. `in_text_input` is whether focus is inside an
    /// input, textarea or contenteditable element.
    ///
    /// Returns JSON `{"changed":bool,"action":"..."}`.
    pub fn on_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        in_text_input: bool,
    ) -> String {
        let focus = if in_text_input {
            FocusTarget::Editable
        } else {
            FocusTarget::Canvas
        };
        let Some(action) = ShortcutMap::resolve(key, ctrl, shift, alt, meta, focus) else {
            return r#"{"changed":false,"action":"none"}"#.to_string();
        };
        let before = self.session.build();
        self.session.dispatch_action(action);
        let changed = self.session.build() != before;
        json!({ "changed": changed, "action": action_to_name(action) }).to_string()
    }

    // ─── Property panel ──────────────────────────────────────────────────

    /// Buffer a text edit. `field` is `statusName`, `transitionLabel`,
    /// `transitionRule` or `workflowName`.
    pub fn edit_draft(&mut self, field: &str, text: &str) -> bool {
        draft_field(field).is_some_and(|f| self.session.edit_draft(f, text))
    }

    /// Blur / Enter.
    pub fn commit_draft(&mut self, field: &str) -> bool {
        draft_field(field).is_some_and(|f| self.session.commit_draft(f))
    }

    /// Escape.
    pub fn cancel_draft(&mut self, field: &str) -> bool {
        draft_field(field).is_some_and(|f| self.session.cancel_draft(f))
    }

    /// Current panel value of a field (draft or committed), or "".
    pub fn field_value(&self, field: &str) -> String {
        draft_field(field)
            .and_then(|f| self.session.field_value(f))
            .unwrap_or_default()
    }

    pub fn set_is_start(&mut self, flag: bool) -> bool {
        self.session.set_is_start(flag)
    }

    pub fn set_is_end(&mut self, flag: bool) -> bool {
        self.session.set_is_end(flag)
    }

    pub fn set_status_color(&mut self, color: &str) -> bool {
        self.session.set_status_color(color)
    }

    /// `roles_json` is a JSON array of strings.
    pub fn set_status_roles(&mut self, roles_json: &str) -> bool {
        parse_roles(roles_json).is_some_and(|roles| self.session.set_status_roles(roles))
    }

    /// `kind` is `success`, `failure` or `optional`.
    pub fn set_transition_type(&mut self, kind: &str) -> bool {
        TransitionType::parse(kind).is_some_and(|k| self.session.set_transition_type(k))
    }

    pub fn set_transition_roles(&mut self, roles_json: &str) -> bool {
        parse_roles(roles_json).is_some_and(|roles| self.session.set_transition_roles(roles))
    }

    /// Add a status; returns its id.
    pub fn add_status(&mut self) -> String {
        self.session.add_status().id.as_str().to_string()
    }

    pub fn delete_selection(&mut self) -> bool {
        self.session.delete_selection()
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.session.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.session.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.session.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.can_redo()
    }

    // ─── Validation / save ───────────────────────────────────────────────

    /// The inline validation message, or "" when the workflow is savable.
    pub fn validate(&self) -> String {
        self.session.validation_message().unwrap_or_default()
    }

    /// Lint findings as JSON `[{statusId, message, severity, rule}]`.
    pub fn lint_json(&self) -> String {
        lint_to_json(&self.session.build())
    }

    pub fn is_saving(&self) -> bool {
        self.session.is_saving()
    }

    /// Phase one of a save. Returns JSON `{"ok":true,"payload":{..}}` and
    /// holds the save slot, or `{"ok":false,"error":".."}`.
    pub fn begin_save(&mut self) -> String {
        match self.session.begin_save() {
            Ok(ticket) => {
                let payload = json!({ "ok": true, "payload": ticket.payload() });
                self.pending_save = Some(ticket);
                payload.to_string()
            }
            Err(e) => json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    /// Phase two. Pass the id persistence returned, or an `error` (possibly
    /// empty) if it rejected. Returns `{"ok":true,"id":..,"applied":..}` or
    /// `{"ok":false,"error":..}`. `applied` is `false` when the workflow was
    /// reloaded or discarded after `begin_save`; the save slot is released
    /// but the current workflow keeps its id and baseline.
    pub fn finish_save(&mut self, id: &str, error: Option<String>) -> String {
        let Some(ticket) = self.pending_save.take() else {
            return json!({ "ok": false, "error": "no save in progress" }).to_string();
        };
        let result = match error {
            Some(message) if message.is_empty() => Err(PersistError::unexplained()),
            Some(message) => Err(PersistError::new(message)),
            None => Ok(PersistResponse::Id(id.to_string())),
        };
        match ticket.complete(result) {
            Ok(saved) => {
                let applied = self.session.save_completed(&saved);
                json!({ "ok": true, "id": saved.id, "applied": applied }).to_string()
            }
            Err(e) => json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }
}

impl WorkflowCanvas {
    /// Returns `true` if the selection moved or a pending draft committed.
    fn select(&mut self, target: Option<SelectionTarget>) -> bool {
        let before = self.session.selection();
        let committed = self.session.handle_event(CanvasEvent::SelectionChange(target));
        committed || self.session.selection() != before
    }
}

fn draft_field(name: &str) -> Option<DraftField> {
    match name {
        "statusName" => Some(DraftField::StatusName),
        "transitionLabel" => Some(DraftField::TransitionLabel),
        "transitionRule" => Some(DraftField::TransitionRule),
        "workflowName" => Some(DraftField::WorkflowName),
        _ => None,
    }
}

fn parse_roles(json: &str) -> Option<RoleList> {
    serde_json::from_str(json)
        .map_err(|e| log::warn!("bad roles JSON: {e}"))
        .ok()
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::DeleteSelection => "deleteSelection",
        ShortcutAction::Deselect => "deselect",
        ShortcutAction::Undo => "undo",
        ShortcutAction::Redo => "redo",
        ShortcutAction::AddStatus => "addStatus",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LintEntry<'a> {
    status_id: &'a str,
    message: &'a str,
    severity: &'static str,
    rule: &'static str,
}

fn lint_to_json(def: &WorkflowDefinition) -> String {
    let diags = lint_workflow(def);
    let entries: Vec<LintEntry<'_>> = diags
        .iter()
        .map(|d| LintEntry {
            status_id: d.status_id.as_str(),
            message: &d.message,
            severity: match d.severity {
                LintSeverity::Warning => "warning",
                LintSeverity::Info => "info",
            },
            rule: d.rule,
        })
        .collect();
    serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("WFD WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone functions (no canvas needed) ─────────────────────────────

/// Validate a definition. Returns JSON `{"ok":true}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_definition(json: &str) -> String {
    let result = WorkflowDefinition::from_json(json)
        .map_err(|e| e.to_string())
        .and_then(|def| wfd_core::validate(&def).map_err(|e| e.to_string()));
    match result {
        Ok(()) => r#"{"ok":true}"#.to_string(),
        Err(error) => json!({ "ok": false, "error": error }).to_string(),
    }
}

/// The starter template as JSON.
#[wasm_bindgen]
pub fn template_json() -> String {
    seed_template().to_json().unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn parse(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[test]
    fn render_lists_follow_store() {
        let mut canvas = WorkflowCanvas::new();
        assert_eq!(parse(&canvas.nodes_json()).as_array().unwrap().len(), 3);
        assert!(canvas.on_connect("start", "done"));
        assert!(!canvas.on_connect("start", "start"));
        let edges = parse(&canvas.edges_json());
        assert_eq!(edges[3]["key"], "start->done");
        assert_eq!(edges[3]["color"], "#22C55E");
    }

    #[test]
    fn reconnect_by_edge_key() {
        let mut canvas = WorkflowCanvas::new();
        assert!(!canvas.on_reconnect("garbage", "work", "start"));
        assert!(canvas.on_reconnect("start->work", "work", "start"));
        assert!(canvas.edges_json().contains("work->start"));
    }

    #[test]
    fn key_in_text_input_is_ignored() {
        let mut canvas = WorkflowCanvas::new();
        canvas.on_select_node("work");
        let res = parse(&canvas.on_key("Backspace", false, false, false, false, true));
        assert_eq!(res["action"], "none");
        let res = parse(&canvas.on_key("Backspace", false, false, false, false, false));
        assert_eq!(res, json!({ "changed": true, "action": "deleteSelection" }));
        assert_eq!(canvas.selection_json(), r#"{"kind":"none"}"#);
    }

    #[test]
    fn draft_fields_by_name() {
        let mut canvas = WorkflowCanvas::new();
        canvas.on_select_edge("done->work");
        assert!(canvas.edit_draft("transitionLabel", "Reopen"));
        assert!(!canvas.edit_draft("statusName", "nope"));
        assert!(!canvas.edit_draft("bogus", "x"));
        assert!(canvas.commit_draft("transitionLabel"));
        assert_eq!(canvas.field_value("transitionLabel"), "Reopen");
        assert!(canvas.edges_json().contains("Reopen"));
    }

    #[test]
    fn two_phase_save() {
        let mut canvas = WorkflowCanvas::new();
        let res = parse(&canvas.begin_save());
        assert_eq!(res["ok"], true);
        assert_eq!(res["payload"]["name"], "New Workflow");
        assert!(canvas.is_saving());

        let res = parse(&canvas.begin_save());
        assert_eq!(res["error"], "a save is already in progress");

        let res = parse(&canvas.finish_save("wf_1", None));
        assert_eq!(res, json!({ "ok": true, "id": "wf_1", "applied": true }));
        assert!(!canvas.is_saving());
        assert!(!canvas.is_dirty());
        assert_eq!(parse(&canvas.build_json())["id"], "wf_1");
    }

    #[test]
    fn late_save_does_not_touch_reloaded_workflow() {
        let mut canvas = WorkflowCanvas::new();
        assert_eq!(parse(&canvas.begin_save())["ok"], true);

        let mut other = seed_template();
        other.id = "wf_B".into();
        other.name = "Other".into();
        assert!(canvas.load_json(&other.to_json().unwrap()));
        assert!(canvas.is_saving(), "slot held until the old save resolves");

        let res = parse(&canvas.finish_save("wf_A", None));
        assert_eq!(res, json!({ "ok": true, "id": "wf_A", "applied": false }));
        assert!(!canvas.is_saving());
        let built = parse(&canvas.build_json());
        assert_eq!(built["id"], "wf_B");
        assert_eq!(built["name"], "Other");
        assert!(!canvas.is_dirty());
    }

    #[test]
    fn failed_save_reports_message() {
        let mut canvas = WorkflowCanvas::new();
        canvas.begin_save();
        let res = parse(&canvas.finish_save("", Some(String::new())));
        assert_eq!(res["error"], "failed to save workflow");
        canvas.begin_save();
        let res = parse(&canvas.finish_save("", Some("offline".into())));
        assert_eq!(res["error"], "offline");
        let res = parse(&canvas.finish_save("", None));
        assert_eq!(res["error"], "no save in progress");
    }

    #[test]
    fn invalid_workflow_blocks_begin_save() {
        let mut canvas = WorkflowCanvas::new();
        canvas.on_select_node("done");
        canvas.delete_selection();
        assert_eq!(canvas.validate(), "a workflow must have exactly one End status");
        let res = parse(&canvas.begin_save());
        assert_eq!(res["ok"], false);
        assert!(!canvas.is_saving());
    }

    #[test]
    fn standalone_validation() {
        assert_eq!(validate_definition(&template_json()), r#"{"ok":true}"#);
        let res = parse(&validate_definition(r#"{"name":"x"}"#));
        assert_eq!(res["error"], "a workflow must have exactly one Start status");
        assert_eq!(parse(&validate_definition("not json"))["ok"], false);
    }

    #[test]
    fn lint_entries() {
        let canvas = WorkflowCanvas::new();
        let lint = parse(&canvas.lint_json());
        assert_eq!(lint[0]["rule"], "end-has-exits");
        assert_eq!(lint[0]["statusId"], "done");
        assert_eq!(lint[0]["severity"], "info");
    }
}
