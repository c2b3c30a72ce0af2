pub mod guard;
pub mod id;
pub mod lint;
pub mod model;
pub mod template;
pub mod validate;

pub use guard::{ConnectRejection, can_connect, check_connection};
pub use id::StatusId;
pub use lint::{LintDiagnostic, LintSeverity, lint_workflow};
pub use model::*;
pub use template::seed_template;
pub use validate::{ValidationError, validate, validation_message};
