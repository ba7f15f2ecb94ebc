//! Editing session
//!
//! Owns the document tree for one editor and runs every mutation through the
//! same synchronous pass: mutate, recompute decorations, serialize, emit.

use log::debug;

use crate::config::Settings;
use crate::document::Document;
use crate::outline::{
    compute_decorations, handle_backspace, handle_enter, indent_list_item, outdent_list_item,
    toggle_heading, Cursor, Decorations, StructuralEdit,
};
use crate::sync::controller::{
    CommonMarkCodec, DocumentHost, Inbound, MarkdownCodec, Outbound, SyncController,
};

// ─────────────────────────────────────────────────────────────────────────────
// Host
// ─────────────────────────────────────────────────────────────────────────────

/// The in-memory editing surface of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionHost {
    pub document: Document,
    pub focused: bool,
}

impl DocumentHost for SessionHost {
    fn document(&self) -> &Document {
        &self.document
    }

    fn replace_document(&mut self, document: Document) {
        self.document = document;
    }

    fn is_focused(&self) -> bool {
        self.focused
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// A live editing session bound to an external markdown value.
pub struct EditorSession<C: MarkdownCodec = CommonMarkCodec> {
    host: SessionHost,
    sync: SyncController<C>,
    decorations: Decorations,
    settings: Settings,
}

impl EditorSession<CommonMarkCodec> {
    /// Start a session from an initial markdown value.
    ///
    /// `on_change` receives every newly emitted value. The initial value is
    /// never echoed back.
    pub fn new(initial: &str, settings: Settings, on_change: impl FnMut(&str) + 'static) -> Self {
        let codec = CommonMarkCodec::new(settings.markdown.clone());
        Self::with_codec(codec, initial, settings, on_change)
    }
}

impl<C: MarkdownCodec> EditorSession<C> {
    pub fn with_codec(
        codec: C,
        initial: &str,
        settings: Settings,
        on_change: impl FnMut(&str) + 'static,
    ) -> Self {
        let mut sync = SyncController::new(codec, settings.focus_policy, on_change);
        let mut host = SessionHost::default();
        if sync.inbound(&mut host, initial) == Inbound::Failed {
            debug!("Starting with an empty document");
        }
        sync.prime(&host);

        let decorations = compute_decorations(&host.document, &settings.collapse);
        Self {
            host,
            sync,
            decorations,
            settings,
        }
    }

    pub fn document(&self) -> &Document {
        &self.host.document
    }

    /// Decorations for the current tree.
    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Placeholder text to show, if the document is empty.
    pub fn placeholder(&self) -> Option<&str> {
        if self.host.document.is_empty() && !self.settings.placeholder.is_empty() {
            Some(&self.settings.placeholder)
        } else {
            None
        }
    }

    pub fn last_emitted(&self) -> Option<&str> {
        self.sync.last_emitted()
    }

    pub fn is_focused(&self) -> bool {
        self.host.focused
    }

    /// Apply an arbitrary local mutation.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Document) -> R) -> R {
        let result = f(&mut self.host.document);
        self.after_mutation();
        result
    }

    /// Feed a new external markdown value into the session.
    pub fn set_external_value(&mut self, value: &str) -> Inbound {
        let outcome = self.sync.inbound(&mut self.host, value);
        if outcome == Inbound::Applied {
            self.refresh_decorations();
        }
        outcome
    }

    pub fn focus(&mut self) {
        self.host.focused = true;
    }

    /// Lose focus, applying any deferred external value.
    pub fn blur(&mut self) -> Option<Inbound> {
        self.host.focused = false;
        let outcome = self.sync.flush_deferred(&mut self.host);
        if outcome == Some(Inbound::Applied) {
            self.refresh_decorations();
        }
        outcome
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Flip a heading's collapse state. Returns the new state.
    pub fn toggle_heading(&mut self, path: &[usize]) -> Option<bool> {
        let collapsed = toggle_heading(&mut self.host.document, path, &self.settings.collapse)?;
        self.after_mutation();
        Some(collapsed)
    }

    pub fn press_enter(&mut self, cursor: &Cursor) -> StructuralEdit {
        let edit = handle_enter(&mut self.host.document, cursor, &self.settings.collapse);
        self.after_edit(edit)
    }

    pub fn press_backspace(&mut self, cursor: &Cursor) -> StructuralEdit {
        let edit = handle_backspace(&mut self.host.document, cursor);
        self.after_edit(edit)
    }

    pub fn indent(&mut self, cursor: &Cursor) -> StructuralEdit {
        let edit = indent_list_item(&mut self.host.document, cursor, self.settings.max_list_indent);
        self.after_edit(edit)
    }

    pub fn outdent(&mut self, cursor: &Cursor) -> StructuralEdit {
        let edit = outdent_list_item(&mut self.host.document, cursor);
        self.after_edit(edit)
    }

    fn after_edit(&mut self, edit: StructuralEdit) -> StructuralEdit {
        if edit.performed {
            self.after_mutation();
        }
        edit
    }

    fn after_mutation(&mut self) -> Outbound {
        self.refresh_decorations();
        self.sync.outbound(&self.host)
    }

    fn refresh_decorations(&mut self) {
        self.decorations = compute_decorations(&self.host.document, &self.settings.collapse);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
