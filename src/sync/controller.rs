//! Bidirectional markdown sync
//!
//! The controller owns the value contract between an external markdown
//! string and a live document tree:
//!
//! - **Outbound**: after a local mutation, serialize the tree and emit it
//!   through the change callback only if it differs from the last emitted
//!   value. That comparison is the only loop-breaker.
//! - **Inbound**: an external value equal to the last emitted value or to
//!   the tree's current serialization is an echo of our own edit. Anything
//!   else replaces the tree, unless the host is focused, in which case the
//!   [`FocusPolicy`] decides.
//!
//! Codec failures never propagate: the tree and the last-known-good value
//! are left untouched and the failure is logged.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::Result;
use crate::markdown::{
    parse_markdown_with_options, serialize_document_with_options, MarkdownOptions,
};

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// The editable document surface the controller synchronizes.
pub trait DocumentHost {
    /// Current tree.
    fn document(&self) -> &Document;

    /// Replace the tree wholesale.
    fn replace_document(&mut self, document: Document);

    /// Whether the user is currently typing into the surface.
    fn is_focused(&self) -> bool;
}

/// Conversion between markdown text and document trees.
pub trait MarkdownCodec {
    fn parse(&self, markdown: &str) -> Result<Document>;
    fn serialize(&self, document: &Document) -> Result<String>;
}

/// The comrak-backed codec with this crate's preservation rules.
#[derive(Debug, Clone, Default)]
pub struct CommonMarkCodec {
    pub options: MarkdownOptions,
}

impl CommonMarkCodec {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }
}

impl MarkdownCodec for CommonMarkCodec {
    fn parse(&self, markdown: &str) -> Result<Document> {
        parse_markdown_with_options(markdown, &self.options)
    }

    fn serialize(&self, document: &Document) -> Result<String> {
        Ok(serialize_document_with_options(document, &self.options))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy and Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// What to do with a genuine external change that arrives while focused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusPolicy {
    /// Discard it; local edits win
    #[default]
    Drop,
    /// Keep the latest one and apply it when focus is lost
    Defer,
    /// Apply it immediately
    Apply,
}

/// Result of an outbound sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outbound {
    /// A new value was emitted
    Emitted,
    /// Serialization equals the last emitted value
    Unchanged,
    /// Serialization failed; nothing emitted
    Failed,
}

/// Result of an inbound sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// The value reflects our own state
    Echo,
    /// Discarded because the host is focused
    Dropped,
    /// Held until the host loses focus
    Deferred,
    /// Parsed and applied to the host
    Applied,
    /// Parsing failed; the tree is untouched
    Failed,
}

/// Callback receiving each newly emitted markdown value.
pub type ChangeCallback = Box<dyn FnMut(&str)>;

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Per-session sync state. Not shared between sessions.
pub struct SyncController<C: MarkdownCodec = CommonMarkCodec> {
    codec: C,
    focus_policy: FocusPolicy,
    last_emitted: Option<String>,
    deferred: Option<String>,
    on_change: ChangeCallback,
}

impl<C: MarkdownCodec> SyncController<C> {
    pub fn new(codec: C, focus_policy: FocusPolicy, on_change: impl FnMut(&str) + 'static) -> Self {
        Self {
            codec,
            focus_policy,
            last_emitted: None,
            deferred: None,
            on_change: Box::new(on_change),
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn focus_policy(&self) -> FocusPolicy {
        self.focus_policy
    }

    pub fn set_focus_policy(&mut self, policy: FocusPolicy) {
        self.focus_policy = policy;
    }

    /// The last value emitted or accepted as current.
    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Record the initial tree's serialization so an unchanged tree is
    /// never emitted.
    pub fn prime(&mut self, host: &impl DocumentHost) {
        match self.codec.serialize(host.document()) {
            Ok(markdown) => self.last_emitted = Some(markdown),
            Err(e) => warn!("Failed to serialize initial document: {}", e),
        }
    }

    /// Serialize the host's tree and emit it if it changed.
    pub fn outbound(&mut self, host: &impl DocumentHost) -> Outbound {
        let markdown = match self.codec.serialize(host.document()) {
            Ok(markdown) => markdown,
            Err(e) => {
                warn!("Serialization failed, keeping last value: {}", e);
                return Outbound::Failed;
            }
        };

        if self.last_emitted.as_deref() == Some(markdown.as_str()) {
            return Outbound::Unchanged;
        }

        debug!("Emitting {} bytes of markdown", markdown.len());
        (self.on_change)(&markdown);
        self.last_emitted = Some(markdown);
        self.discard_deferred();
        Outbound::Emitted
    }

    /// Handle a new external value.
    pub fn inbound(&mut self, host: &mut impl DocumentHost, value: &str) -> Inbound {
        if self.last_emitted.as_deref() == Some(value) {
            self.discard_deferred();
            return Inbound::Echo;
        }
        if let Ok(current) = self.codec.serialize(host.document()) {
            if current == value {
                self.last_emitted = Some(current);
                self.discard_deferred();
                return Inbound::Echo;
            }
        }

        if host.is_focused() {
            match self.focus_policy {
                FocusPolicy::Drop => {
                    warn!("Dropping external update while the editor is focused");
                    return Inbound::Dropped;
                }
                FocusPolicy::Defer => {
                    debug!("Deferring external update until blur");
                    self.deferred = Some(value.to_string());
                    return Inbound::Deferred;
                }
                FocusPolicy::Apply => {}
            }
        }

        self.apply(host, value)
    }

    /// Apply a deferred external value once the host is no longer focused.
    pub fn flush_deferred(&mut self, host: &mut impl DocumentHost) -> Option<Inbound> {
        if host.is_focused() {
            return None;
        }
        let value = self.deferred.take()?;
        Some(self.inbound(host, &value))
    }

    /// A held external value is stale once the store reflects our tree again.
    fn discard_deferred(&mut self) {
        if self.deferred.take().is_some() {
            debug!("Discarding deferred external update superseded by local state");
        }
    }

    fn apply(&mut self, host: &mut impl DocumentHost, value: &str) -> Inbound {
        let document = match self.codec.parse(value) {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to parse external markdown, keeping current document: {}", e);
                return Inbound::Failed;
            }
        };

        host.replace_document(document);
        self.deferred = None;
        // The applied value is current; only later edits are emitted
        self.last_emitted = match self.codec.serialize(host.document()) {
            Ok(markdown) => Some(markdown),
            Err(_) => Some(value.to_string()),
        };
        debug!("Applied external update ({} bytes)", value.len());
        Inbound::Applied
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Heading, HeadingLevel, Paragraph};
    use crate::error::Error;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct TestHost {
        document: Document,
        focused: bool,
    }

    impl DocumentHost for TestHost {
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

    /// Controller whose emissions are recorded.
    fn recording(policy: FocusPolicy) -> (SyncController, Rc<RefCell<Vec<String>>>) {
        let emitted = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&emitted);
        let controller = SyncController::new(CommonMarkCodec::default(), policy, move |value: &str| {
            sink.borrow_mut().push(value.to_string())
        });
        (controller, emitted)
    }

    fn host_with(markdown: &str) -> TestHost {
        TestHost {
            document: CommonMarkCodec::default().parse(markdown).unwrap(),
            focused: false,
        }
    }

    #[test]
    fn test_outbound_twice_emits_once() {
        let (mut sync, emitted) = recording(FocusPolicy::Drop);
        let mut host = host_with("# Title");
        sync.prime(&host);

        host.document
            .blocks
            .push(Block::Paragraph(Paragraph::new("added")));
        assert_eq!(sync.outbound(&host), Outbound::Emitted);
        assert_eq!(sync.outbound(&host), Outbound::Unchanged);
        assert_eq!(*emitted.borrow(), vec!["# Title\n\nadded".to_string()]);
    }

    #[test]
    fn test_primed_controller_does_not_emit_unchanged_tree() {
        let (mut sync, emitted) = recording(FocusPolicy::Drop);
        let host = host_with("plain");
        sync.prime(&host);
        assert_eq!(sync.outbound(&host), Outbound::Unchanged);
        assert!(emitted.borrow().is_empty());
    }

    #[test]
    fn test_inbound_echo_is_ignored() {
        let (mut sync, _) = recording(FocusPolicy::Drop);
        let mut host = host_with("# Title");
        sync.prime(&host);
        host.document.blocks.push(Block::ThematicBreak);
        sync.outbound(&host);

        let echoed = sync.last_emitted().unwrap().to_string();
        assert_eq!(sync.inbound(&mut host, &echoed), Inbound::Echo);
        assert_eq!(sync.inbound(&mut host, "# Title\n\n---"), Inbound::Echo);
    }

    #[test]
    fn test_inbound_applies_when_unfocused() {
        let (mut sync, emitted) = recording(FocusPolicy::Drop);
        let mut host = host_with("old");
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "## New"), Inbound::Applied);
        assert_eq!(
            host.document.blocks,
            vec![Block::Heading(Heading::new(HeadingLevel::H2, "New"))]
        );
        // Applying is not a local edit
        assert_eq!(sync.outbound(&host), Outbound::Unchanged);
        assert!(emitted.borrow().is_empty());
    }

    #[test]
    fn test_non_canonical_external_value_is_not_rewritten() {
        let (mut sync, emitted) = recording(FocusPolicy::Drop);
        let mut host = host_with("");
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "* a\n* b"), Inbound::Applied);
        assert_eq!(sync.outbound(&host), Outbound::Unchanged);
        assert!(emitted.borrow().is_empty());
    }

    #[test]
    fn test_focused_drop_policy() {
        let (mut sync, _) = recording(FocusPolicy::Drop);
        let mut host = host_with("mine");
        host.focused = true;
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "theirs"), Inbound::Dropped);
        assert_eq!(host.document.blocks, vec![Block::Paragraph(Paragraph::new("mine"))]);

        host.focused = false;
        assert_eq!(sync.flush_deferred(&mut host), None);
    }

    #[test]
    fn test_focused_defer_policy_applies_on_blur() {
        let (mut sync, _) = recording(FocusPolicy::Defer);
        let mut host = host_with("mine");
        host.focused = true;
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "first"), Inbound::Deferred);
        assert_eq!(sync.inbound(&mut host, "second"), Inbound::Deferred);
        assert!(sync.has_deferred());
        assert_eq!(sync.flush_deferred(&mut host), None);

        host.focused = false;
        assert_eq!(sync.flush_deferred(&mut host), Some(Inbound::Applied));
        assert_eq!(host.document.blocks, vec![Block::Paragraph(Paragraph::new("second"))]);
        assert!(!sync.has_deferred());
    }

    #[test]
    fn test_local_emit_supersedes_deferred_value() {
        let (mut sync, emitted) = recording(FocusPolicy::Defer);
        let mut host = host_with("mine");
        host.focused = true;
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "theirs"), Inbound::Deferred);
        host.document
            .blocks
            .push(Block::Paragraph(Paragraph::new("typed")));
        assert_eq!(sync.outbound(&host), Outbound::Emitted);
        assert!(!sync.has_deferred());

        host.focused = false;
        assert_eq!(sync.flush_deferred(&mut host), None);
        assert_eq!(emitted.borrow().last().map(String::as_str), Some("mine\n\ntyped"));
        assert_eq!(sync.last_emitted(), Some("mine\n\ntyped"));
    }

    #[test]
    fn test_echo_supersedes_deferred_value() {
        let (mut sync, _) = recording(FocusPolicy::Defer);
        let mut host = host_with("mine");
        host.focused = true;
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "theirs"), Inbound::Deferred);
        assert_eq!(sync.inbound(&mut host, "mine"), Inbound::Echo);
        assert!(!sync.has_deferred());

        host.focused = false;
        assert_eq!(sync.flush_deferred(&mut host), None);
        assert_eq!(host.document.blocks, vec![Block::Paragraph(Paragraph::new("mine"))]);
    }

    #[test]
    fn test_focused_apply_policy() {
        let (mut sync, _) = recording(FocusPolicy::Apply);
        let mut host = host_with("mine");
        host.focused = true;
        sync.prime(&host);

        assert_eq!(sync.inbound(&mut host, "theirs"), Inbound::Applied);
        assert_eq!(host.document.blocks, vec![Block::Paragraph(Paragraph::new("theirs"))]);
    }

    struct BrokenCodec;

    impl MarkdownCodec for BrokenCodec {
        fn parse(&self, _: &str) -> Result<Document> {
            Err(Error::Parse {
                message: "broken".into(),
            })
        }

        fn serialize(&self, _: &Document) -> Result<String> {
            Err(Error::Serialize {
                message: "broken".into(),
            })
        }
    }

    #[test]
    fn test_codec_failures_leave_state_untouched() {
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let mut sync = SyncController::new(BrokenCodec, FocusPolicy::Drop, move |_: &str| {
            *sink.borrow_mut() += 1
        });
        let mut host = TestHost {
            document: Document::new(vec![Block::Paragraph(Paragraph::new("kept"))]),
            focused: false,
        };

        sync.prime(&host);
        assert_eq!(sync.outbound(&host), Outbound::Failed);
        assert_eq!(sync.inbound(&mut host, "anything"), Inbound::Failed);
        assert_eq!(host.document.blocks, vec![Block::Paragraph(Paragraph::new("kept"))]);
        assert_eq!(*count.borrow(), 0);
        assert!(sync.last_emitted().is_none());
    }
}
