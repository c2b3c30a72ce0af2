//! Integration tests: structural invariants across store operations
//! (wfd-editor ↔ wfd-core).

use pretty_assertions::assert_eq;
use wfd_core::*;
use wfd_editor::{StatusPatch, TransitionPatch, WorkflowStore};

fn id(s: &str) -> StatusId {
    StatusId::intern(s)
}

fn key(from: &str, to: &str) -> TransitionKey {
    TransitionKey::new(id(from), id(to))
}

fn edge_keys(store: &WorkflowStore) -> Vec<String> {
    store.transition_keys().map(|k| k.to_string()).collect()
}

/// A larger definition with a loaded id and mixed transition attributes.
fn support_desk() -> WorkflowDefinition {
    let json = r##"{
        "id": "wf_support",
        "name": "Support desk",
        "statuses": [
            {"id": "new", "name": "New", "isStart": true, "colorAccent": "#3B82F6", "x": 40, "y": 80},
            {"id": "triage", "name": "Triage", "roles": ["agent"], "x": 240, "y": 80},
            {"id": "waiting", "name": "Waiting on customer", "x": 240, "y": 260},
            {"id": "solved", "name": "Solved", "isEnd": true, "x": 440, "y": 80}
        ],
        "transitions": [
            {"fromStatusId": "new", "toStatusId": "triage", "type": "success", "label": "Success"},
            {"fromStatusId": "triage", "toStatusId": "waiting", "type": "optional", "label": "Ask customer",
             "rule": "needsInfo", "roleNames": ["agent"]},
            {"fromStatusId": "waiting", "toStatusId": "triage", "type": "success", "label": "Success"},
            {"fromStatusId": "triage", "toStatusId": "solved", "type": "success", "label": "Resolve"},
            {"fromStatusId": "solved", "toStatusId": "triage", "type": "failure", "label": "Failure"}
        ]
    }"##;
    WorkflowDefinition::from_json(json).unwrap()
}

// ─── Round trip ─────────────────────────────────────────────────────────

#[test]
fn load_then_build_is_identity() {
    for def in [seed_template(), support_desk()] {
        let store = WorkflowStore::new(def.clone());
        assert_eq!(store.build(), def);
    }
}

#[test]
fn json_round_trip_through_store() {
    let def = support_desk();
    let json = WorkflowStore::new(def.clone()).build().to_json().unwrap();
    assert_eq!(WorkflowDefinition::from_json(&json).unwrap(), def);
}

// ─── Start / End ────────────────────────────────────────────────────────

#[test]
fn valid_builds_have_one_distinct_start_and_end() {
    let mut store = WorkflowStore::new(support_desk());
    store.update_status(id("triage"), StatusPatch::start(true));
    store.update_status(id("waiting"), StatusPatch::end(true));
    store.update_status(id("waiting"), StatusPatch::start(true));
    store.update_status(id("new"), StatusPatch::end(true));

    let def = store.build();
    if validate(&def).is_ok() {
        let starts: Vec<_> = def.statuses.iter().filter(|s| s.is_start).collect();
        let ends: Vec<_> = def.statuses.iter().filter(|s| s.is_end).collect();
        assert_eq!(starts.len(), 1);
        assert_eq!(ends.len(), 1);
        assert_ne!(starts[0].id, ends[0].id);
    }
    assert_eq!(store.start(), Some(id("waiting")));
    assert_eq!(store.end(), Some(id("new")));
}

#[test]
fn moving_start_is_idempotent() {
    let mut store = WorkflowStore::new(support_desk());
    for _ in 0..3 {
        store.update_status(id("triage"), StatusPatch::start(true));
        let def = store.build();
        let starts: Vec<&str> = def
            .statuses
            .iter()
            .filter(|s| s.is_start)
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(starts, ["triage"]);
    }
}

// ─── Connection guard ───────────────────────────────────────────────────

#[test]
fn self_loop_never_created() {
    let mut store = WorkflowStore::new(support_desk());
    for status in ["new", "triage", "waiting", "solved"] {
        for kind in TransitionType::ALL {
            assert!(!store.add_transition(id(status), id(status), kind));
        }
    }
    assert!(store.build().transitions.iter().all(|t| !t.key().is_self_loop()));
}

#[test]
fn second_identical_connect_changes_nothing() {
    let mut store = WorkflowStore::new(support_desk());
    assert!(store.add_transition(id("new"), id("solved"), TransitionType::Success));
    let after_first = store.build();
    assert!(!store.add_transition(id("new"), id("solved"), TransitionType::Success));
    assert_eq!(store.build(), after_first);
    let count = after_first
        .transitions
        .iter()
        .filter(|t| t.key() == key("new", "solved"))
        .count();
    assert_eq!(count, 1);
}

#[test]
fn reconnect_depends_on_existing_pairs() {
    let mut store = WorkflowStore::new(support_desk());
    // waiting->triage already exists.
    assert!(!store.reconnect_transition(key("new", "triage"), id("waiting"), id("triage")));
    assert!(store.contains_transition(key("new", "triage")));

    assert!(store.reconnect_transition(key("new", "triage"), id("new"), id("waiting")));
    assert!(!store.contains_transition(key("new", "triage")));
    assert!(store.contains_transition(key("new", "waiting")));
}

#[test]
fn reconnect_preserves_rule_roles_and_override() {
    let mut store = WorkflowStore::new(support_desk());
    assert!(store.reconnect_transition(key("triage", "waiting"), id("new"), id("waiting")));
    let t = store.transition(key("new", "waiting")).unwrap();
    assert_eq!(t.kind, TransitionType::Optional);
    assert_eq!(t.label.as_deref(), Some("Ask customer"));
    assert_eq!(t.rule.as_deref(), Some("needsInfo"));
    assert_eq!(t.role_names.as_slice(), ["agent".to_string()]);
    assert_eq!(edge_keys(&store)[1], "new->waiting");
}

// ─── Cascade ────────────────────────────────────────────────────────────

#[test]
fn delete_cascades_only_incident_transitions() {
    let mut store = WorkflowStore::new(support_desk());
    assert!(store.delete_status(id("waiting")));
    assert_eq!(
        edge_keys(&store),
        ["new->triage", "triage->solved", "solved->triage"]
    );
    let def = store.build();
    assert!(def.status(id("waiting")).is_none());
    assert!(
        def.transitions
            .iter()
            .all(|t| !t.key().touches(id("waiting")))
    );
}

#[test]
fn deleted_status_can_be_reused_by_load_only() {
    let mut store = WorkflowStore::new(seed_template());
    store.delete_status(id("work"));
    assert!(!store.add_transition(id("start"), id("work"), TransitionType::Success));
    assert!(!store.update_status(id("work"), StatusPatch::name("Ghost")));
    assert!(!store.update_transition(key("start", "work"), TransitionPatch::rule("x")));
}

// ─── Scenarios ──────────────────────────────────────────────────────────

#[test]
fn seed_template_is_valid_without_edits() {
    let store = WorkflowStore::new(seed_template());
    assert_eq!(validate(&store.build()), Ok(()));
}

#[test]
fn deleting_done_breaks_end_count() {
    let mut store = WorkflowStore::new(seed_template());
    store.delete_status(id("done"));
    let err = validate(&store.build()).unwrap_err();
    assert_eq!(err, ValidationError::EndCount);
    assert_eq!(err.to_string(), "a workflow must have exactly one End status");
}

#[test]
fn every_store_output_satisfies_constructive_invariants() {
    let mut store = WorkflowStore::new(support_desk());
    let extra = store.add_status().id;
    store.add_transition(extra, id("solved"), TransitionType::Optional);
    store.add_transition(id("solved"), extra, TransitionType::Failure);
    store.reconnect_transition(key("solved", "triage"), id("solved"), extra);
    store.delete_status(id("triage"));

    let def = store.build();
    let mut seen = std::collections::HashSet::new();
    for t in &def.transitions {
        assert!(!t.key().is_self_loop());
        assert!(seen.insert(t.key()), "duplicate {}", t.key());
        assert!(def.status(t.from_status_id).is_some());
        assert!(def.status(t.to_status_id).is_some());
    }
}
