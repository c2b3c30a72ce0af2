pub mod commands;
pub mod config;
pub mod input;
pub mod save;
pub mod selection;
pub mod session;
pub mod shortcuts;
pub mod store;
pub mod view;

pub use commands::CommandStack;
pub use config::EditorConfig;
pub use input::CanvasEvent;
pub use save::{
    PersistError, PersistResponse, SaveAdapter, SaveError, SaveTicket, SavedWorkflow,
    WorkflowPersistence,
};
pub use selection::{Selection, SelectionTarget};
pub use session::{DraftField, EditorSession};
pub use shortcuts::{FocusTarget, ShortcutAction, ShortcutMap};
pub use store::{StatusPatch, TransitionPatch, WorkflowStore};
pub use view::{RenderEdge, RenderNode};
