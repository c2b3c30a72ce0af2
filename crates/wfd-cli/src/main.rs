//! `wfd`: offline workflow tooling.
//!
//! ```text
//! wfd template            print the starter workflow as JSON
//! wfd validate < wf.json  exit 1 with the message if the workflow can't be saved
//! wfd lint < wf.json      print non-blocking findings
//! ```
//!
//! Malformed JSON exits with status 2.

use std::io::Read;
use wfd_core::{LintSeverity, WorkflowDefinition, lint_workflow, seed_template, validate};

const USAGE: &str = "usage: wfd <template|validate|lint>";

/// What a command produced and how the process should exit.
#[derive(Debug, PartialEq)]
enum Outcome {
    /// stdout, exit 0
    Done(String),
    /// stderr, exit 1
    Invalid(String),
    /// stderr, exit 2
    BadInput(String),
}

impl Outcome {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Done(_) => 0,
            Self::Invalid(_) => 1,
            Self::BadInput(_) => 2,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(|s| s.as_str()) else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let mut input = String::new();
    if matches!(command, "validate" | "lint") {
        if let Err(e) = std::io::stdin().read_to_string(&mut input) {
            eprintln!("wfd {command}: failed to read stdin: {e}");
            std::process::exit(2);
        }
    }

    let outcome = run(command, &input);
    match &outcome {
        Outcome::Done(out) => print!("{out}"),
        Outcome::Invalid(msg) | Outcome::BadInput(msg) => eprintln!("wfd {command}: {msg}"),
    }
    std::process::exit(outcome.exit_code());
}

fn run(command: &str, input: &str) -> Outcome {
    match command {
        "template" => match seed_template().to_json_pretty() {
            Ok(json) => Outcome::Done(format!("{json}\n")),
            Err(e) => Outcome::BadInput(e.to_string()),
        },
        "validate" => with_definition(input, |def| match validate(&def) {
            Ok(()) => Outcome::Done(format!("ok: `{}` is valid\n", def.name.trim())),
            Err(e) => Outcome::Invalid(e.to_string()),
        }),
        "lint" => with_definition(input, |def| {
            let out: String = lint_workflow(&def)
                .iter()
                .map(|d| {
                    let severity = match d.severity {
                        LintSeverity::Warning => "warning",
                        LintSeverity::Info => "info",
                    };
                    format!("{severity}[{}] {}: {}\n", d.rule, d.status_id, d.message)
                })
                .collect();
            Outcome::Done(out)
        }),
        other => Outcome::BadInput(format!("unknown command '{other}'\n{USAGE}")),
    }
}

fn with_definition(input: &str, f: impl FnOnce(WorkflowDefinition) -> Outcome) -> Outcome {
    match WorkflowDefinition::from_json(input) {
        Ok(def) => {
            log::debug!(
                "read `{}`: {} statuses, {} transitions",
                def.name,
                def.statuses.len(),
                def.transitions.len()
            );
            f(def)
        }
        Err(e) => Outcome::BadInput(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> String {
        match run("template", "") {
            Outcome::Done(json) => json,
            other => panic!("template failed: {other:?}"),
        }
    }

    #[test]
    fn template_validates() {
        assert_eq!(
            run("validate", &template()),
            Outcome::Done("ok: `New Workflow` is valid\n".into())
        );
    }

    #[test]
    fn invalid_exits_one() {
        let out = run("validate", r#"{"name": "", "statuses": []}"#);
        assert_eq!(out, Outcome::Invalid("workflow name is required".into()));
        assert_eq!(out.exit_code(), 1);
    }

    #[test]
    fn malformed_exits_two() {
        assert_eq!(run("lint", "{").exit_code(), 2);
        assert_eq!(run("frobnicate", "").exit_code(), 2);
    }

    #[test]
    fn lint_lines() {
        assert_eq!(
            run("lint", &template()),
            Outcome::Done(
                "info[end-has-exits] done: End status `Done` has 1 outgoing transition(s); \
                 tasks can leave it.\n"
                    .into()
            )
        );
    }
}
