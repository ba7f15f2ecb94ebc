//! Block-level node types.

use serde::{Deserialize, Serialize};

use super::inline::{Inline, TextRun};

/// Headings at or below this level start collapsed unless toggled explicitly.
pub const DEFAULT_COLLAPSED_LEVEL: u8 = 4;

// ─────────────────────────────────────────────────────────────────────────────
// Attribute Types
// ─────────────────────────────────────────────────────────────────────────────

/// Heading level (H1-H6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum HeadingLevel {
    H1 = 1,
    H2 = 2,
    H3 = 3,
    H4 = 4,
    H5 = 5,
    H6 = 6,
}

impl From<u8> for HeadingLevel {
    fn from(level: u8) -> Self {
        match level {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            3 => HeadingLevel::H3,
            4 => HeadingLevel::H4,
            5 => HeadingLevel::H5,
            _ => HeadingLevel::H6,
        }
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level as u8
    }
}

impl HeadingLevel {
    /// Numeric level, 1-6.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// One level up the hierarchy, or `None` for H1.
    pub fn promoted(self) -> Option<HeadingLevel> {
        match self {
            HeadingLevel::H1 => None,
            other => Some(HeadingLevel::from(other.as_u8() - 1)),
        }
    }
}

/// Paragraph text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    /// The CSS `text-align` keyword.
    pub fn as_css(self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }

    /// Parse a CSS `text-align` keyword. Unknown values yield `None`.
    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" | "end" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// List type (ordered or unordered)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Ordered { start: u32 },
}

impl ListKind {
    /// Whether two lists would join into one when placed next to each other.
    pub fn same_family(self, other: ListKind) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Types
// ─────────────────────────────────────────────────────────────────────────────

/// A heading with tri-state collapse attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: HeadingLevel,
    /// `Some(true)` explicitly collapsed, `Some(false)` explicitly expanded,
    /// `None` follows the level-based default.
    #[serde(default)]
    pub collapsed: Option<bool>,
    #[serde(default)]
    pub content: Vec<Inline>,
}

impl Heading {
    /// A heading with plain text content and no explicit collapse state.
    pub fn new(level: HeadingLevel, text: &str) -> Self {
        Self {
            level,
            collapsed: None,
            content: plain_content(text),
        }
    }

    /// An empty heading.
    pub fn empty(level: HeadingLevel) -> Self {
        Self::new(level, "")
    }

    pub fn with_collapsed(mut self, collapsed: Option<bool>) -> Self {
        self.collapsed = collapsed;
        self
    }

    /// Collapse state after applying the default policy for unset headings.
    pub fn effective_collapsed(&self, default_collapsed_level: u8) -> bool {
        match self.collapsed {
            Some(explicit) => explicit,
            None => self.level.as_u8() >= default_collapsed_level,
        }
    }

    /// Number of characters in the heading text.
    pub fn text_len(&self) -> usize {
        content_len(&self.content)
    }

    pub fn is_empty(&self) -> bool {
        self.text_len() == 0
    }
}

/// A paragraph with optional alignment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub content: Vec<Inline>,
}

impl Paragraph {
    pub fn new(text: &str) -> Self {
        Self {
            align: TextAlign::Left,
            content: plain_content(text),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    /// Structurally empty: no text, or nothing but line breaks.
    pub fn is_empty(&self) -> bool {
        self.content.iter().all(|inline| match inline {
            Inline::Text(run) => run.text.is_empty(),
            Inline::HardBreak => true,
        })
    }
}

/// A list item. `indent` is a visual offset only and does not nest the item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub indent: u8,
    #[serde(default)]
    pub children: Vec<Block>,
}

impl ListItem {
    /// An item holding a single plain paragraph.
    pub fn new(text: &str) -> Self {
        Self {
            indent: 0,
            children: vec![Block::Paragraph(Paragraph::new(text))],
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// No children, or a single structurally empty paragraph.
    pub fn is_empty(&self) -> bool {
        match self.children.as_slice() {
            [] => true,
            [Block::Paragraph(p)] => p.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

impl List {
    pub fn bullet(items: Vec<ListItem>) -> Self {
        Self {
            kind: ListKind::Bullet,
            items,
        }
    }

    pub fn ordered(start: u32, items: Vec<ListItem>) -> Self {
        Self {
            kind: ListKind::Ordered { start },
            items,
        }
    }
}

/// A blockquote with an optional border color override.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockQuote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default)]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub content: Vec<Inline>,
}

impl TableCell {
    pub fn header(text: &str) -> Self {
        Self {
            header: true,
            content: plain_content(text),
        }
    }

    pub fn data(text: &str) -> Self {
        Self {
            header: false,
            content: plain_content(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

impl TableRow {
    /// A row whose every cell is a header cell.
    pub fn is_header(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|cell| cell.header)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

/// A fenced code block. `literal` carries no trailing newline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub language: String,
    pub literal: String,
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    List(List),
    BlockQuote(BlockQuote),
    Table(Table),
    CodeBlock(CodeBlock),
    ThematicBreak,
    /// Raw HTML the converters do not interpret, kept verbatim
    Html { literal: String },
}

impl Block {
    /// Short lowercase name of the node type, used in logs and outlines.
    pub fn type_name(&self) -> &'static str {
        match self {
            Block::Heading(_) => "heading",
            Block::Paragraph(_) => "paragraph",
            Block::List(_) => "list",
            Block::BlockQuote(_) => "blockquote",
            Block::Table(_) => "table",
            Block::CodeBlock(_) => "code_block",
            Block::ThematicBreak => "thematic_break",
            Block::Html { .. } => "html",
        }
    }

    pub fn as_heading(&self) -> Option<&Heading> {
        match self {
            Block::Heading(heading) => Some(heading),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// The root of a structured document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// No blocks, or a single empty paragraph. Hosts show a placeholder then.
    pub fn is_empty(&self) -> bool {
        match self.blocks.as_slice() {
            [] => true,
            [Block::Paragraph(p)] => p.is_empty(),
            _ => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn plain_content(text: &str) -> Vec<Inline> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Inline::Text(TextRun {
            text: text.to_string(),
            marks: Default::default(),
        })]
    }
}

fn content_len(content: &[Inline]) -> usize {
    content
        .iter()
        .map(|inline| match inline {
            Inline::Text(run) => run.text.chars().count(),
            Inline::HardBreak => 1,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_level_from_u8_clamps() {
        assert_eq!(HeadingLevel::from(0), HeadingLevel::H1);
        assert_eq!(HeadingLevel::from(4), HeadingLevel::H4);
        assert_eq!(HeadingLevel::from(9), HeadingLevel::H6);
    }

    #[test]
    fn test_heading_level_promoted() {
        assert_eq!(HeadingLevel::H3.promoted(), Some(HeadingLevel::H2));
        assert_eq!(HeadingLevel::H1.promoted(), None);
    }

    #[test]
    fn test_effective_collapsed_default_policy() {
        for level in 1..=6u8 {
            let heading = Heading::new(HeadingLevel::from(level), "x");
            assert_eq!(
                heading.effective_collapsed(DEFAULT_COLLAPSED_LEVEL),
                level >= 4,
                "level {}",
                level
            );
        }
    }

    #[test]
    fn test_effective_collapsed_explicit_wins() {
        let h5 = Heading::new(HeadingLevel::H5, "x").with_collapsed(Some(false));
        assert!(!h5.effective_collapsed(DEFAULT_COLLAPSED_LEVEL));

        let h1 = Heading::new(HeadingLevel::H1, "x").with_collapsed(Some(true));
        assert!(h1.effective_collapsed(DEFAULT_COLLAPSED_LEVEL));
    }

    #[test]
    fn test_paragraph_is_empty() {
        assert!(Paragraph::empty().is_empty());
        let only_break = Paragraph {
            align: TextAlign::Left,
            content: vec![Inline::HardBreak],
        };
        assert!(only_break.is_empty());
        assert!(!Paragraph::new("text").is_empty());
    }

    #[test]
    fn test_text_align_css() {
        assert_eq!(TextAlign::from_css(" Center "), Some(TextAlign::Center));
        assert_eq!(TextAlign::from_css("bogus"), None);
        assert_eq!(TextAlign::Justify.as_css(), "justify");
    }

    #[test]
    fn test_document_is_empty() {
        assert!(Document::default().is_empty());
        assert!(Document::new(vec![Block::Paragraph(Paragraph::empty())]).is_empty());
        assert!(!Document::new(vec![Block::ThematicBreak]).is_empty());
    }

    #[test]
    fn test_list_kind_family() {
        assert!(ListKind::Ordered { start: 1 }.same_family(ListKind::Ordered { start: 5 }));
        assert!(!ListKind::Bullet.same_family(ListKind::Ordered { start: 1 }));
    }

    #[test]
    fn test_heading_level_serializes_as_number() {
        let json = serde_json::to_string(&HeadingLevel::H3).unwrap();
        assert_eq!(json, "3");
        let level: HeadingLevel = serde_json::from_str("5").unwrap();
        assert_eq!(level, HeadingLevel::H5);
    }
}
