//! Lint diagnostics for workflow definitions.
//!
//! Reports suspicious-but-legal shapes without modifying the definition.
//! Unlike [`validate`](crate::validate::validate), lint findings never block a save.

use crate::id::StatusId;
use crate::model::WorkflowDefinition;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{HashMap, HashSet};

// ─── Diagnostic types ────────────────────────────────────────────────────

/// Severity of a lint finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintSeverity {
    /// Probably a modelling mistake.
    Warning,
    /// Informational.
    Info,
}

/// A single lint diagnostic for a status.
#[derive(Debug, Clone)]
pub struct LintDiagnostic {
    pub status_id: StatusId,
    pub message: String,
    pub severity: LintSeverity,
    /// Short rule identifier (e.g. "unreachable-status").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run all lint rules and return diagnostics in status order.
#[must_use]
pub fn lint_workflow(def: &WorkflowDefinition) -> Vec<LintDiagnostic> {
    let mut diags = Vec::new();
    lint_unreachable(def, &mut diags);
    lint_dead_ends(def, &mut diags);
    lint_duplicate_names(def, &mut diags);
    lint_end_exits(def, &mut diags);
    diags
}

// ─── Rules ────────────────────────────────────────────────────────────────

/// Warn on statuses a task can never reach from the Start status.
fn lint_unreachable(def: &WorkflowDefinition, diags: &mut Vec<LintDiagnostic>) {
    let Some(start) = def.start_status() else {
        return;
    };

    let mut graph: DiGraph<StatusId, ()> = DiGraph::new();
    let index: HashMap<StatusId, NodeIndex> = def
        .statuses
        .iter()
        .map(|s| (s.id, graph.add_node(s.id)))
        .collect();
    for t in &def.transitions {
        if let (Some(&a), Some(&b)) = (index.get(&t.from_status_id), index.get(&t.to_status_id)) {
            graph.add_edge(a, b, ());
        }
    }

    let mut reached = HashSet::new();
    let mut bfs = Bfs::new(&graph, index[&start.id]);
    while let Some(nx) = bfs.next(&graph) {
        reached.insert(graph[nx]);
    }

    for status in &def.statuses {
        if !reached.contains(&status.id) {
            diags.push(LintDiagnostic {
                status_id: status.id,
                message: format!(
                    "Status `{}` cannot be reached from `{}`.",
                    status.name, start.name
                ),
                severity: LintSeverity::Warning,
                rule: "unreachable-status",
            });
        }
    }
}

/// Warn on non-End statuses with no way out.
fn lint_dead_ends(def: &WorkflowDefinition, diags: &mut Vec<LintDiagnostic>) {
    for status in def.statuses.iter().filter(|s| !s.is_end) {
        if def.outgoing(status.id).next().is_none() {
            diags.push(LintDiagnostic {
                status_id: status.id,
                message: format!(
                    "Status `{}` has no outgoing transitions and is not the End status.",
                    status.name
                ),
                severity: LintSeverity::Warning,
                rule: "dead-end-status",
            });
        }
    }
}

/// Info when two statuses share a display name (case-insensitive).
fn lint_duplicate_names(def: &WorkflowDefinition, diags: &mut Vec<LintDiagnostic>) {
    let mut seen = HashSet::new();
    for status in &def.statuses {
        let key = status.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        if !seen.insert(key) {
            diags.push(LintDiagnostic {
                status_id: status.id,
                message: format!("Another status is already named `{}`.", status.name.trim()),
                severity: LintSeverity::Info,
                rule: "duplicate-status-name",
            });
        }
    }
}

/// Info when the End status has exits. Legal (rework loops), but notable.
fn lint_end_exits(def: &WorkflowDefinition, diags: &mut Vec<LintDiagnostic>) {
    let Some(end) = def.end_status() else {
        return;
    };
    let exits = def.outgoing(end.id).count();
    if exits > 0 {
        diags.push(LintDiagnostic {
            status_id: end.id,
            message: format!(
                "End status `{}` has {exits} outgoing transition(s); tasks can leave it.",
                end.name
            ),
            severity: LintSeverity::Info,
            rule: "end-has-exits",
        });
    }
}
