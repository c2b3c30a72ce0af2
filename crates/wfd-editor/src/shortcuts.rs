//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so the WASM bridge and native hosts resolve keys identically.
//!
//! Keys typed into an editable field (input, textarea, contenteditable)
//! never resolve to an action: Backspace in the name field deletes a
//! character, not the selected status.

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Delete the selected status or transition.
    DeleteSelection,
    Deselect,
    Undo,
    Redo,
    AddStatus,
}

/// Where keyboard focus was when the key event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Canvas,
    /// A text input, textarea or contenteditable element.
    Editable,
}

impl FocusTarget {
    /// Classify the DOM element that owns focus.
    ///
    /// `tag` is `Element.tagName` (any case); `content_editable` is
    /// `HTMLElement.isContentEditable`.
    pub fn from_dom(tag: &str, content_editable: bool) -> Self {
        let editable = content_editable
            || tag.eq_ignore_ascii_case("input")
            || tag.eq_ignore_ascii_case("textarea")
            || tag.eq_ignore_ascii_case("select");
        if editable { Self::Editable } else { Self::Canvas }
    }

    pub fn is_editable(self) -> bool {
        self == Self::Editable
    }
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` plays the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the combo has no binding or focus is in an
    /// editable field.
    pub fn resolve(
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        focus: FocusTarget,
    ) -> Option<ShortcutAction> {
        if focus.is_editable() || alt {
            return None;
        }
        let cmd = ctrl || meta;

        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if shift {
            return None;
        }

        match key {
            "Delete" | "Backspace" => Some(ShortcutAction::DeleteSelection),
            "Escape" => Some(ShortcutAction::Deselect),
            "n" | "N" => Some(ShortcutAction::AddStatus),
            _ => None,
        }
    }
}
