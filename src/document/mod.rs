//! Structured document model
//!
//! This module defines the typed document tree that the markdown converters
//! produce and consume, and that the outline engine decorates.
//!
//! # Shape
//! - A [`Document`] is an ordered sequence of [`Block`]s.
//! - Container blocks (blockquotes, list items) own nested blocks.
//! - Leaf blocks (headings, paragraphs, table cells) own inline content:
//!   a flat sequence of [`TextRun`]s carrying [`Marks`], plus hard breaks.
//!
//! Nodes are addressed by a [`NodePath`]: child indices from the root, where
//! a list's children are its items and an item's children are its blocks.

mod inline;
mod node;
mod path;

pub use inline::{inline_text, normalize_inlines, Inline, Marks, TextRun};
pub use node::{
    Block, BlockQuote, CodeBlock, Document, Heading, HeadingLevel, List, ListItem, ListKind,
    Paragraph, Table, TableCell, TableRow, TextAlign, DEFAULT_COLLAPSED_LEVEL,
};
pub use path::{NodePath, NodeRef};
