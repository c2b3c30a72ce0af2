//! The three-status starter workflow offered when creating a new definition.

use crate::id::StatusId;
use crate::model::{Status, Transition, TransitionType, WorkflowDefinition};

pub const TEMPLATE_NAME: &str = "New Workflow";

/// `Start → Work → Done`, with a `Done → Work` failure edge for rework.
///
/// Ids are fixed (`start`, `work`, `done`) so the template is deterministic;
/// statuses added later get generated ids.
#[must_use]
pub fn seed_template() -> WorkflowDefinition {
    let start = StatusId::intern("start");
    let work = StatusId::intern("work");
    let done = StatusId::intern("done");

    let mut s = Status::new(start, "Start").at(100, 200);
    s.is_start = true;
    s.color_accent = "#3B82F6".into();

    let mut w = Status::new(work, "Work").at(350, 200);
    w.color_accent = "#F59E0B".into();

    let mut d = Status::new(done, "Done").at(600, 200);
    d.is_end = true;
    d.color_accent = "#22C55E".into();

    // Labels are spelled out so the template reads back exactly as the
    // editor emits it.
    let edge = |from, to, kind: TransitionType| Transition {
        label: Some(kind.default_label().into()),
        ..Transition::new(from, to, kind)
    };

    WorkflowDefinition {
        id: String::new(),
        name: TEMPLATE_NAME.into(),
        statuses: vec![s, w, d],
        transitions: vec![
            edge(start, work, TransitionType::Success),
            edge(work, done, TransitionType::Success),
            edge(done, work, TransitionType::Failure),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_shape() {
        let def = seed_template();
        let names: Vec<&str> = def.statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Start", "Work", "Done"]);
        assert_eq!(def.start_status().map(|s| s.name.as_str()), Some("Start"));
        assert_eq!(def.end_status().map(|s| s.name.as_str()), Some("Done"));

        let edges: Vec<String> = def
            .transitions
            .iter()
            .map(|t| format!("{}:{}", t.key(), t.kind))
            .collect();
        assert_eq!(
            edges,
            ["start->work:success", "work->done:success", "done->work:failure"]
        );
    }
}
