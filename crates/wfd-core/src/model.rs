//! Workflow definition data model.
//!
//! A workflow is a directed graph: `Status` values are the nodes and
//! `Transition` values are the edges. This module holds the canonical,
//! serializable shape: the one loaded into the editor and the one handed
//! to persistence on save. It is a plain value; the editor's mutation
//! engine owns the live, invariant-preserving representation.
//!
//! Wire format is camelCase JSON:
//!
//! ```json
//! {
//!   "id": "wf_1", "name": "Bug triage",
//!   "statuses": [{ "id": "open", "name": "Open", "isStart": true, "isEnd": false,
//!                  "colorAccent": "#22C55E", "roles": [], "x": 100, "y": 200 }],
//!   "transitions": [{ "fromStatusId": "open", "toStatusId": "fixed", "type": "success",
//!                     "label": "Success", "roleNames": [] }]
//! }
//! ```

use crate::id::StatusId;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Accent used for statuses that do not carry one.
pub const DEFAULT_COLOR_ACCENT: &str = "#64748B";

/// Role names attached to a status or transition. Opaque to this crate.
pub type RoleList = SmallVec<[String; 2]>;

// ─── Transition type ─────────────────────────────────────────────────────

/// Outcome class of a transition. Drives the default label and edge colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    Success,
    Failure,
    Optional,
}

impl TransitionType {
    pub const ALL: [TransitionType; 3] = [Self::Success, Self::Failure, Self::Optional];

    /// Label shown on the edge when no explicit override is set.
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Optional => "Optional",
        }
    }

    /// Edge stroke colour.
    pub fn color(self) -> &'static str {
        match self {
            Self::Success => "#22C55E",
            Self::Failure => "#EF4444",
            Self::Optional => "#94A3B8",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Optional => "optional",
        }
    }

    /// Parse the lowercase wire name.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Transition key ──────────────────────────────────────────────────────

/// Unique key of a transition: the ordered `(from, to)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub from: StatusId,
    pub to: StatusId,
}

impl TransitionKey {
    pub fn new(from: StatusId, to: StatusId) -> Self {
        Self { from, to }
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    pub fn touches(&self, id: StatusId) -> bool {
        self.from == id || self.to == id
    }

    /// Parse the canvas edge key format `from->to`.
    pub fn parse(s: &str) -> Option<Self> {
        let (from, to) = s.split_once("->")?;
        if from.is_empty() || to.is_empty() {
            return None;
        }
        Some(Self::new(StatusId::intern(from), StatusId::intern(to)))
    }
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

// ─── Status ──────────────────────────────────────────────────────────────

/// One state a task can occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: StatusId,
    pub name: String,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_end: bool,
    #[serde(default = "default_color_accent")]
    pub color_accent: String,
    #[serde(default)]
    pub roles: RoleList,
    /// Canvas position. Layout hint only.
    #[serde(default, deserialize_with = "deserialize_coord")]
    pub x: i32,
    #[serde(default, deserialize_with = "deserialize_coord")]
    pub y: i32,
}

impl Status {
    pub fn new(id: StatusId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_start: false,
            is_end: false,
            color_accent: default_color_accent(),
            roles: SmallVec::new(),
            x: 0,
            y: 0,
        }
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}

fn default_color_accent() -> String {
    DEFAULT_COLOR_ACCENT.to_string()
}

/// Accept any JSON number for a coordinate; canvases report fractional
/// drag positions but the persisted layout is integral.
fn deserialize_coord<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let v = f64::deserialize(deserializer)?;
    Ok(v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
}

// ─── Transition ──────────────────────────────────────────────────────────

/// A legal move from one status to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    pub from_status_id: StatusId,
    pub to_status_id: StatusId,
    #[serde(rename = "type", default)]
    pub kind: TransitionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Guard expression. Not interpreted here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(default)]
    pub role_names: RoleList,
}

impl Transition {
    pub fn new(from: StatusId, to: StatusId, kind: TransitionType) -> Self {
        Self {
            from_status_id: from,
            to_status_id: to,
            kind,
            label: None,
            rule: None,
            role_names: SmallVec::new(),
        }
    }

    pub fn key(&self) -> TransitionKey {
        TransitionKey::new(self.from_status_id, self.to_status_id)
    }

    /// The explicit label, or the one derived from `kind`.
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(l) if !l.is_empty() => l,
            _ => self.kind.default_label(),
        }
    }
}

// ─── Workflow definition ─────────────────────────────────────────────────

/// The aggregate root: everything that is loaded into and saved from the
/// designer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    /// Empty until the definition has been persisted once.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<Status>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// Errors from the JSON codec.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid workflow JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkflowDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn status(&self, id: StatusId) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    pub fn transition(&self, key: TransitionKey) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.key() == key)
    }

    /// The unique start status, if exactly one is flagged.
    pub fn start_status(&self) -> Option<&Status> {
        unique(self.statuses.iter().filter(|s| s.is_start))
    }

    /// The unique end status, if exactly one is flagged.
    pub fn end_status(&self) -> Option<&Status> {
        unique(self.statuses.iter().filter(|s| s.is_end))
    }

    pub fn outgoing(&self, id: StatusId) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.from_status_id == id)
    }

    /// Decode from wire JSON.
    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Encode to compact wire JSON.
    pub fn to_json(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn unique<'a>(mut it: impl Iterator<Item = &'a Status>) -> Option<&'a Status> {
    let first = it.next()?;
    if it.next().is_some() { None } else { Some(first) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transition_type_labels_and_colors() {
        assert_eq!(TransitionType::Success.default_label(), "Success");
        assert_eq!(TransitionType::Failure.default_label(), "Failure");
        assert_eq!(TransitionType::Optional.default_label(), "Optional");
        assert_eq!(TransitionType::Failure.color(), "#EF4444");
        assert_eq!(TransitionType::parse("optional"), Some(TransitionType::Optional));
        assert_eq!(TransitionType::parse("Optional"), None);
    }

    #[test]
    fn display_label_prefers_override() {
        let mut t = Transition::new("a".into(), "b".into(), TransitionType::Failure);
        assert_eq!(t.display_label(), "Failure");
        t.label = Some("Reject".into());
        assert_eq!(t.display_label(), "Reject");
        t.label = Some(String::new());
        assert_eq!(t.display_label(), "Failure");
    }

    #[test]
    fn transition_key_parse_and_display() {
        let key = TransitionKey::parse("todo->doing").unwrap();
        assert_eq!(key.from.as_str(), "todo");
        assert_eq!(key.to.as_str(), "doing");
        assert_eq!(key.to_string(), "todo->doing");
        assert!(TransitionKey::parse("todo").is_none());
        assert!(TransitionKey::parse("->doing").is_none());
    }

    #[test]
    fn decodes_camel_case_wire_format() {
        let json = r##"{
            "id": "wf_7",
            "name": "Support",
            "statuses": [
                {"id": "new", "name": "New", "isStart": true, "x": 10.6, "y": -3},
                {"id": "closed", "name": "Closed", "isEnd": true, "colorAccent": "#000000",
                 "roles": ["agent"]}
            ],
            "transitions": [
                {"fromStatusId": "new", "toStatusId": "closed", "type": "optional",
                 "rule": "priority < 3", "roleNames": ["lead"]}
            ]
        }"##;
        let def = WorkflowDefinition::from_json(json).unwrap();
        assert_eq!(def.id, "wf_7");
        let new = def.status("new".into()).unwrap();
        assert!(new.is_start);
        assert_eq!((new.x, new.y), (11, -3));
        assert_eq!(new.color_accent, DEFAULT_COLOR_ACCENT);
        let closed = def.end_status().unwrap();
        assert_eq!(closed.roles.as_slice(), ["agent".to_string()]);
        let t = &def.transitions[0];
        assert_eq!(t.kind, TransitionType::Optional);
        assert_eq!(t.rule.as_deref(), Some("priority < 3"));
        assert_eq!(t.label, None);
    }

    #[test]
    fn encodes_type_field_and_skips_absent_options() {
        let mut def = WorkflowDefinition::new("x");
        def.transitions
            .push(Transition::new("a".into(), "b".into(), TransitionType::Success));
        let json = def.to_json().unwrap();
        assert!(json.contains(r#""type":"success""#));
        assert!(json.contains(r#""fromStatusId":"a""#));
        assert!(!json.contains("\"rule\""));
        assert!(!json.contains("\"label\""));
    }

    #[test]
    fn start_status_requires_uniqueness() {
        let mut def = WorkflowDefinition::new("x");
        let mut a = Status::new("a".into(), "A");
        a.is_start = true;
        let mut b = Status::new("b".into(), "B");
        b.is_start = true;
        def.statuses = vec![a, b];
        assert!(def.start_status().is_none());
        def.statuses[1].is_start = false;
        assert_eq!(def.start_status().map(|s| s.id.as_str()), Some("a"));
    }
}
