//! Document outline and heading-collapse module
//!
//! This module computes visibility over a heading-structured document and
//! provides the structural commands that depend on it.
//!
//! # Features
//! - Collapse decorations (hidden nodes, toggles, depth classes)
//! - Heading outline with effective collapse state and visibility
//! - Enter / Backspace / Tab commands aware of collapsed regions

mod collapse;
mod commands;

pub use collapse::{compute_decorations, CollapsePolicy, Decoration, DecorationKind, Decorations};
pub use commands::{
    handle_backspace, handle_enter, indent_list_item, outdent_list_item, toggle_heading, Cursor,
    StructuralEdit,
};

use serde::Serialize;

use crate::document::{inline_text, Document, NodePath};

// ─────────────────────────────────────────────────────────────────────────────
// OutlineItem
// ─────────────────────────────────────────────────────────────────────────────

/// A single heading in the document outline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineItem {
    /// Path of the heading in the document tree
    pub path: NodePath,
    /// Heading level (1-6 for H1-H6)
    pub level: u8,
    /// Plain heading text
    pub title: String,
    /// Effective collapse state
    pub collapsed: bool,
    /// Whether an enclosing collapsed region hides this heading
    pub hidden: bool,
}

impl OutlineItem {
    /// Get the indentation level (0 for H1, 1 for H2, etc.)
    pub fn indent_level(&self) -> usize {
        usize::from(self.level.saturating_sub(1))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DocumentOutline
// ─────────────────────────────────────────────────────────────────────────────

/// All headings of a document, in document order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentOutline {
    pub items: Vec<OutlineItem>,
    /// Nodes hidden by collapsed regions
    pub hidden_count: usize,
}

impl DocumentOutline {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of headings at each level.
    pub fn level_counts(&self) -> [usize; 6] {
        let mut counts = [0usize; 6];
        for item in &self.items {
            if (1..=6).contains(&item.level) {
                counts[usize::from(item.level - 1)] += 1;
            }
        }
        counts
    }

    /// Get a summary string like "3 H1, 5 H2, 2 H3"
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .level_counts()
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(i, count)| format!("{} H{}", count, i + 1))
            .collect();
        if parts.is_empty() {
            "No headings".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Build the heading outline of a document under a collapse policy.
pub fn extract_outline(doc: &Document, policy: &CollapsePolicy) -> DocumentOutline {
    let decorations = compute_decorations(doc, policy);
    let items = doc
        .headings()
        .into_iter()
        .map(|(path, heading)| OutlineItem {
            level: heading.level.as_u8(),
            title: inline_text(&heading.content).replace('\n', " "),
            collapsed: policy.is_collapsed(heading),
            hidden: decorations.is_hidden(&path),
            path,
        })
        .collect();

    DocumentOutline {
        items,
        hidden_count: decorations.hidden_count(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
