//! Render projection: what the canvas draws.
//!
//! The canvas owns mid-gesture visual state and only ever reads these flat
//! lists. Edge colour and label are derived here so every canvas renders
//! transitions the same way.

use crate::selection::Selection;
use crate::store::WorkflowStore;
use serde::Serialize;
use wfd_core::{StatusId, TransitionType};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub id: StatusId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub is_start: bool,
    pub is_end: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderEdge {
    /// `from->to`, the key the canvas hands back on reconnect.
    pub key: String,
    pub source: StatusId,
    pub target: StatusId,
    #[serde(rename = "type")]
    pub kind: TransitionType,
    pub label: String,
    pub color: &'static str,
    pub selected: bool,
}

impl WorkflowStore {
    /// Nodes in display order.
    pub fn render_nodes(&self) -> Vec<RenderNode> {
        let selection = self.selection();
        self.status_ids()
            .filter_map(|id| {
                let status = self.status(id)?;
                let (x, y) = self.position(id)?;
                Some(RenderNode {
                    id,
                    name: status.name,
                    x,
                    y,
                    color: status.color_accent,
                    is_start: status.is_start,
                    is_end: status.is_end,
                    selected: selection == Selection::Status(id),
                })
            })
            .collect()
    }

    /// Edges in display order.
    pub fn render_edges(&self) -> Vec<RenderEdge> {
        let selection = self.selection();
        self.transition_keys()
            .filter_map(|key| {
                let t = self.transition(key)?;
                Some(RenderEdge {
                    key: key.to_string(),
                    source: key.from,
                    target: key.to,
                    kind: t.kind,
                    label: t.display_label().to_string(),
                    color: t.kind.color(),
                    selected: selection == Selection::Transition(key),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionTarget;
    use crate::store::TransitionPatch;
    use pretty_assertions::assert_eq;
    use wfd_core::{TransitionKey, seed_template};

    #[test]
    fn nodes_carry_badges_and_selection() {
        let mut store = WorkflowStore::new(seed_template());
        store.select(Some(SelectionTarget::Status("work".into())));
        let nodes = store.render_nodes();
        let flags: Vec<(&str, bool, bool, bool)> = nodes
            .iter()
            .map(|n| (n.id.as_str(), n.is_start, n.is_end, n.selected))
            .collect();
        assert_eq!(
            flags,
            [
                ("start", true, false, false),
                ("work", false, false, true),
                ("done", false, true, false),
            ]
        );
        assert_eq!((nodes[1].x, nodes[1].y), (350.0, 200.0));
    }

    #[test]
    fn edges_derive_colour_and_label() {
        let mut store = WorkflowStore::new(seed_template());
        let rework = TransitionKey::new("done".into(), "work".into());
        store.update_transition(rework, TransitionPatch::label("Reopen"));
        let edges = store.render_edges();
        assert_eq!(edges[0].color, "#22C55E");
        assert_eq!(edges[0].label, "Success");
        assert_eq!(edges[2].key, "done->work");
        assert_eq!(edges[2].color, "#EF4444");
        assert_eq!(edges[2].label, "Reopen");
    }

    #[test]
    fn serializes_camel_case() {
        let store = WorkflowStore::new(seed_template());
        let json = serde_json::to_string(&store.render_edges()[0]).unwrap();
        assert!(json.contains(r#""type":"success""#));
        assert!(json.contains(r#""source":"start""#));
        let json = serde_json::to_string(&store.render_nodes()[0]).unwrap();
        assert!(json.contains(r#""isStart":true"#));
    }
}
