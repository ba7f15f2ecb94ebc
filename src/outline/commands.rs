//! Structural keyboard commands
//!
//! Tree-level edits that the collapse model needs to control directly:
//! Enter on headings, Backspace in empty blocks, heading toggles and visual
//! list indentation (Tab / Shift-Tab).
//!
//! # Design
//! Each command takes the document and the cursor, mutates the tree in place
//! and returns a [`StructuralEdit`] describing where the cursor goes. A
//! no-op edit tells the host to fall back to its default key handling.

use log::debug;

use crate::document::{
    Block, Document, Heading, List, ListItem, ListKind, NodePath, Paragraph,
};
use crate::outline::collapse::CollapsePolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Structural Edit Result
// ─────────────────────────────────────────────────────────────────────────────

/// Cursor location: the text block at `path` and a character offset in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub path: NodePath,
    pub offset: usize,
}

impl Cursor {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }

    /// Cursor at the start of the block at `path`.
    pub fn start_of(path: NodePath) -> Self {
        Self::new(path, 0)
    }
}

/// Result of a structural command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuralEdit {
    /// Cursor position after the edit
    pub cursor: Cursor,
    /// Whether the edit was performed
    pub performed: bool,
}

impl StructuralEdit {
    /// Create a no-op edit (nothing changed)
    pub fn no_op() -> Self {
        Self::default()
    }

    /// Create a successful edit with the new cursor position
    pub fn success(cursor: Cursor) -> Self {
        Self {
            cursor,
            performed: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Heading Operations
// ─────────────────────────────────────────────────────────────────────────────

/// Flip a heading's collapse state from its current effective value.
///
/// Returns the new explicit state, or `None` when `path` is not a heading.
pub fn toggle_heading(doc: &mut Document, path: &[usize], policy: &CollapsePolicy) -> Option<bool> {
    let heading = doc.heading_mut(path)?;
    let collapsed = !policy.is_collapsed(heading);
    heading.collapsed = Some(collapsed);
    debug!("Toggled heading at {:?} to collapsed={}", path, collapsed);
    Some(collapsed)
}

/// Handle Enter inside a heading.
///
/// - In an empty heading: promote it one level, or turn an empty H1 into a
///   paragraph.
/// - At the end of a collapsed heading: insert an empty heading of the same
///   level after the heading's hidden region, so nothing is typed into
///   hidden content.
pub fn handle_enter(doc: &mut Document, cursor: &Cursor, policy: &CollapsePolicy) -> StructuralEdit {
    let Some(Block::Heading(heading)) = doc.block(&cursor.path) else {
        return StructuralEdit::no_op();
    };
    let level = heading.level;

    if heading.is_empty() {
        return promote_empty_heading(doc, &cursor.path);
    }
    if policy.is_collapsed(heading) && cursor.offset >= heading.text_len() {
        return insert_heading_after_region(doc, &cursor.path, Heading::empty(level));
    }
    StructuralEdit::no_op()
}

fn promote_empty_heading(doc: &mut Document, path: &[usize]) -> StructuralEdit {
    let Some(block) = doc.block_mut(path) else {
        return StructuralEdit::no_op();
    };
    let promoted = match &*block {
        Block::Heading(heading) => heading.level.promoted(),
        _ => return StructuralEdit::no_op(),
    };

    match promoted {
        Some(level) => {
            if let Block::Heading(heading) = block {
                heading.level = level;
            }
            debug!("Promoted empty heading at {:?} to H{}", path, level.as_u8());
        }
        None => {
            *block = Block::Paragraph(Paragraph::empty());
            debug!("Converted empty H1 at {:?} to paragraph", path);
        }
    }
    StructuralEdit::success(Cursor::start_of(path.to_vec()))
}

/// Insert `heading` before the first following sibling heading at the same
/// or a shallower level, or at the end of the container.
fn insert_heading_after_region(doc: &mut Document, path: &[usize], heading: Heading) -> StructuralEdit {
    let Some((&index, parent)) = path.split_last() else {
        return StructuralEdit::no_op();
    };
    let Some(siblings) = doc.blocks_at_mut(parent) else {
        return StructuralEdit::no_op();
    };

    let insert_at = siblings
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, block)| matches!(block, Block::Heading(h) if h.level <= heading.level))
        .map_or(siblings.len(), |(position, _)| position);

    siblings.insert(insert_at, Block::Heading(heading));
    debug!(
        "Inserted heading after collapsed region of {:?} at index {}",
        path, insert_at
    );

    let mut new_path = parent.to_vec();
    new_path.push(insert_at);
    StructuralEdit::success(Cursor::start_of(new_path))
}

// ─────────────────────────────────────────────────────────────────────────────
// Backspace
// ─────────────────────────────────────────────────────────────────────────────

/// Handle Backspace at the start of a block.
///
/// - In an empty list item: lift the item out of its list, leaving an empty
///   paragraph between the items before and after it.
/// - In an empty paragraph: turn it into an empty heading at the level of
///   the nearest preceding heading.
pub fn handle_backspace(doc: &mut Document, cursor: &Cursor) -> StructuralEdit {
    if let Some(item_path) = enclosing_item_path(doc, &cursor.path) {
        if doc.item(&item_path).is_some_and(ListItem::is_empty) {
            return lift_list_item(doc, &item_path);
        }
    }

    let Some(Block::Paragraph(paragraph)) = doc.block(&cursor.path) else {
        return StructuralEdit::no_op();
    };
    if !paragraph.is_empty() || cursor.offset != 0 {
        return StructuralEdit::no_op();
    }
    let Some((_, previous)) = doc.preceding_heading(&cursor.path) else {
        return StructuralEdit::no_op();
    };
    let level = previous.level;

    let Some(block) = doc.block_mut(&cursor.path) else {
        return StructuralEdit::no_op();
    };
    *block = Block::Heading(Heading::empty(level));
    debug!(
        "Continued outline at {:?} with empty H{}",
        cursor.path,
        level.as_u8()
    );
    StructuralEdit::success(Cursor::start_of(cursor.path.clone()))
}

/// Replace `list` with `[list before] [empty paragraph] [list after]`.
fn lift_list_item(doc: &mut Document, item_path: &[usize]) -> StructuralEdit {
    let Some((&item_index, list_path)) = item_path.split_last() else {
        return StructuralEdit::no_op();
    };
    let Some((&list_index, parent)) = list_path.split_last() else {
        return StructuralEdit::no_op();
    };
    let Some(container) = doc.blocks_at_mut(parent) else {
        return StructuralEdit::no_op();
    };
    if list_index >= container.len() {
        return StructuralEdit::no_op();
    }

    let List { kind, mut items } = match container.remove(list_index) {
        Block::List(list) => list,
        other => {
            container.insert(list_index, other);
            return StructuralEdit::no_op();
        }
    };
    let after = items.split_off((item_index + 1).min(items.len()));
    items.truncate(item_index);

    let mut replacement = Vec::with_capacity(3);
    if !items.is_empty() {
        replacement.push(Block::List(List { kind, items }));
    }
    let paragraph_index = list_index + replacement.len();
    replacement.push(Block::Paragraph(Paragraph::empty()));
    if !after.is_empty() {
        let kind = match kind {
            ListKind::Ordered { start } => ListKind::Ordered {
                start: start.saturating_add(item_index as u32 + 1),
            },
            ListKind::Bullet => ListKind::Bullet,
        };
        replacement.push(Block::List(List { kind, items: after }));
    }
    container.splice(list_index..list_index, replacement);

    debug!("Lifted empty list item {:?} out of its list", item_path);
    let mut new_path = parent.to_vec();
    new_path.push(paragraph_index);
    StructuralEdit::success(Cursor::start_of(new_path))
}

// ─────────────────────────────────────────────────────────────────────────────
// List Item Indentation
// ─────────────────────────────────────────────────────────────────────────────

/// The list item at `path`, or the item directly containing the block at `path`.
fn enclosing_item_path(doc: &Document, path: &[usize]) -> Option<NodePath> {
    if doc.item(path).is_some() {
        return Some(path.to_vec());
    }
    let (_, item_path) = path.split_last()?;
    doc.item(item_path).map(|_| item_path.to_vec())
}

fn item_mut<'d>(doc: &'d mut Document, item_path: &[usize]) -> Option<&'d mut ListItem> {
    let (&index, list_path) = item_path.split_last()?;
    doc.list_mut(list_path)?.items.get_mut(index)
}

/// Increase a list item's visual indent by one step (Tab).
pub fn indent_list_item(doc: &mut Document, cursor: &Cursor, max_indent: u8) -> StructuralEdit {
    shift_indent(doc, cursor, |indent| {
        (indent < max_indent).then(|| indent + 1)
    })
}

/// Decrease a list item's visual indent by one step (Shift-Tab).
pub fn outdent_list_item(doc: &mut Document, cursor: &Cursor) -> StructuralEdit {
    shift_indent(doc, cursor, |indent| indent.checked_sub(1))
}

fn shift_indent(
    doc: &mut Document,
    cursor: &Cursor,
    shift: impl FnOnce(u8) -> Option<u8>,
) -> StructuralEdit {
    let Some(item_path) = enclosing_item_path(doc, &cursor.path) else {
        return StructuralEdit::no_op();
    };
    let Some(item) = item_mut(doc, &item_path) else {
        return StructuralEdit::no_op();
    };
    match shift(item.indent) {
        Some(indent) => {
            item.indent = indent;
            debug!("List item {:?} indent is now {}", item_path, indent);
            StructuralEdit::success(cursor.clone())
        }
        None => StructuralEdit::no_op(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
