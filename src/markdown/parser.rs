//! Markdown parser implementation using comrak
//!
//! This module wraps comrak's parser and converts its AST into the typed
//! [`Document`] tree. Raw-HTML fragments written by the serializer's
//! preservation rules (`<p style>`, `<li style>`, `<blockquote
//! data-border-color>`, `<hN data-collapsed>`, `<ul>`/`<ol>`, `<table>`) are
//! recognised and folded back into typed nodes.
//!
//! Parsing never fails on content: unrecognised HTML is kept as a raw block
//! or as literal text, and unbalanced wrapper tags are ignored.

use comrak::{
    nodes::{AstNode, ListType as ComrakListType, NodeList, NodeValue},
    parse_document, Arena, Options,
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::document::{
    Block, BlockQuote, CodeBlock, Document, Heading, HeadingLevel, Inline, List, ListItem,
    ListKind, Paragraph, Table, TableCell, TableRow, TextAlign,
};
use crate::error::Result;
use crate::markdown::html::{self, HtmlToken, Tag};
use crate::markdown::inline::InlineBuilder;

/// Zero-width space, accepted as an empty-paragraph placeholder.
pub const ZERO_WIDTH_PLACEHOLDER: char = '\u{200b}';

/// Non-breaking space, written for empty paragraphs as `&nbsp;`.
pub const NBSP: char = '\u{a0}';

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration options shared by the parser and the serializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Treat a single newline inside a paragraph as a line break
    pub hard_breaks: bool,
    /// Width of one visual list indent step, in rem
    pub indent_step_rem: f32,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: false,
            hard_breaks: true,
            indent_step_rem: 1.5,
        }
    }
}

impl MarkdownOptions {
    /// Convert to comrak Options.
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        options.extension.table = self.tables;
        options.extension.strikethrough = self.strikethrough;
        options.extension.autolink = self.autolink;

        options
    }

    /// Margin for a visual indent, e.g. `3rem` for two steps of 1.5rem.
    pub fn indent_margin(&self, indent: u8) -> String {
        format!("{}rem", f32::from(indent) * self.indent_step_rem)
    }

    /// Number of indent steps a CSS `margin-left` value stands for.
    pub fn indent_from_margin(&self, margin: &str) -> u8 {
        let margin = margin.trim().to_ascii_lowercase();
        let rem = if let Some(value) = margin.strip_suffix("rem") {
            value.trim().parse::<f32>().ok()
        } else if let Some(value) = margin.strip_suffix("px") {
            value.trim().parse::<f32>().ok().map(|px| px / 16.0)
        } else if let Some(value) = margin.strip_suffix("em") {
            value.trim().parse::<f32>().ok()
        } else {
            margin.parse::<f32>().ok()
        };

        match rem {
            Some(rem) if rem > 0.0 && self.indent_step_rem > 0.0 => {
                (rem / self.indent_step_rem).round().min(f32::from(u8::MAX)) as u8
            }
            _ => 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Parse markdown text into a document tree.
///
/// # Example
/// ```
/// let doc = foldmark::markdown::parse_markdown("# Hello\n\nWorld").unwrap();
/// assert_eq!(doc.blocks.len(), 2);
/// ```
pub fn parse_markdown(markdown: &str) -> Result<Document> {
    parse_markdown_with_options(markdown, &MarkdownOptions::default())
}

/// Parse markdown text with custom options.
pub fn parse_markdown_with_options(markdown: &str, options: &MarkdownOptions) -> Result<Document> {
    let converter = Converter::new(options);
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &converter.comrak);

    let blocks = converter.convert_children(root);
    debug!(
        "Parsed {} bytes of markdown into {} top-level blocks",
        markdown.len(),
        blocks.len()
    );
    Ok(Document::new(blocks))
}

// ─────────────────────────────────────────────────────────────────────────────
// Wrapper Fragments
// ─────────────────────────────────────────────────────────────────────────────

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// A raw-HTML start tag that wraps markdown-rendered content.
#[derive(Debug, Clone, PartialEq)]
enum Wrapper {
    Paragraph { align: TextAlign },
    Heading { level: HeadingLevel, collapsed: Option<bool> },
    BlockQuote { border_color: Option<String> },
    ListItem { indent: u8 },
    List { kind: ListKind },
}

impl Wrapper {
    fn from_tag(tag: &Tag, options: &MarkdownOptions) -> Option<Self> {
        if tag.closing {
            return None;
        }
        let wrapper = match tag.name.as_str() {
            "p" => Wrapper::Paragraph {
                align: tag
                    .style("text-align")
                    .and_then(|value| TextAlign::from_css(&value))
                    .unwrap_or_default(),
            },
            "blockquote" => Wrapper::BlockQuote {
                border_color: tag
                    .attr("data-border-color")
                    .map(str::trim)
                    .filter(|color| !color.is_empty())
                    .map(str::to_string),
            },
            "li" => Wrapper::ListItem {
                indent: tag
                    .style("margin-left")
                    .map(|margin| options.indent_from_margin(&margin))
                    .unwrap_or(0),
            },
            "ul" => Wrapper::List {
                kind: ListKind::Bullet,
            },
            "ol" => Wrapper::List {
                kind: ListKind::Ordered {
                    start: tag
                        .attr("start")
                        .and_then(|start| start.trim().parse().ok())
                        .unwrap_or(1),
                },
            },
            name => {
                let index = HEADING_TAGS.iter().position(|h| *h == name)?;
                Wrapper::Heading {
                    level: HeadingLevel::from(index as u8 + 1),
                    collapsed: match tag.attr("data-collapsed").map(str::trim) {
                        Some("true") => Some(true),
                        Some("false") => Some(false),
                        _ => None,
                    },
                }
            }
        };
        Some(wrapper)
    }

    fn tag_name(&self) -> &'static str {
        match self {
            Wrapper::Paragraph { .. } => "p",
            Wrapper::Heading { level, .. } => HEADING_TAGS[usize::from(level.as_u8() - 1)],
            Wrapper::BlockQuote { .. } => "blockquote",
            Wrapper::ListItem { .. } => "li",
            Wrapper::List {
                kind: ListKind::Bullet,
            } => "ul",
            Wrapper::List { .. } => "ol",
        }
    }
}

fn is_wrapper_name(name: &str) -> bool {
    matches!(name, "p" | "blockquote" | "li" | "ul" | "ol") || HEADING_TAGS.contains(&name)
}

/// Intermediate result of converting one comrak block.
#[derive(Debug)]
enum Piece {
    Block(Block),
    Open(Wrapper),
    Close(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Conversion Functions
// ─────────────────────────────────────────────────────────────────────────────

struct Converter<'o> {
    options: &'o MarkdownOptions,
    comrak: Options,
}

impl<'o> Converter<'o> {
    fn new(options: &'o MarkdownOptions) -> Self {
        Self {
            options,
            comrak: options.to_comrak_options(),
        }
    }

    /// Convert the block children of a container node.
    fn convert_children<'a>(&self, node: &'a AstNode<'a>) -> Vec<Block> {
        let pieces = node
            .children()
            .flat_map(|child| self.convert_block(child))
            .collect();
        assemble(pieces)
    }

    /// Parse a markdown fragment found inside a single-block HTML element.
    fn parse_fragment(&self, markdown: &str) -> Vec<Piece> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.comrak);
        root.children()
            .flat_map(|child| self.convert_block(child))
            .collect()
    }

    fn convert_block<'a>(&self, node: &'a AstNode<'a>) -> Vec<Piece> {
        let ast = node.data.borrow();
        let block = match &ast.value {
            NodeValue::Paragraph => Block::Paragraph(self.convert_paragraph(node)),
            NodeValue::Heading(heading) => Block::Heading(Heading {
                level: HeadingLevel::from(heading.level),
                collapsed: None,
                content: self.convert_inlines(node),
            }),
            NodeValue::BlockQuote => Block::BlockQuote(BlockQuote {
                border_color: None,
                children: self.convert_children(node),
            }),
            NodeValue::List(list) => Block::List(List {
                kind: list_kind(list),
                items: node
                    .children()
                    .map(|item| ListItem {
                        indent: 0,
                        children: self.convert_children(item),
                    })
                    .collect(),
            }),
            NodeValue::CodeBlock(code) => Block::CodeBlock(CodeBlock {
                language: code.info.trim().to_string(),
                literal: code
                    .literal
                    .strip_suffix('\n')
                    .unwrap_or(&code.literal)
                    .to_string(),
            }),
            NodeValue::ThematicBreak => Block::ThematicBreak,
            NodeValue::Table(_) => Block::Table(self.convert_table(node)),
            NodeValue::HtmlBlock(html_block) => return self.convert_html_block(&html_block.literal),
            // Anything else degrades to its text
            _ => {
                let content = self.convert_inlines(node);
                if content.is_empty() {
                    return Vec::new();
                }
                Block::Paragraph(Paragraph {
                    align: TextAlign::Left,
                    content,
                })
            }
        };
        vec![Piece::Block(block)]
    }

    fn convert_paragraph<'a>(&self, node: &'a AstNode<'a>) -> Paragraph {
        let content = self.convert_inlines(node);
        if is_placeholder(&content) {
            return Paragraph::empty();
        }
        Paragraph {
            align: TextAlign::Left,
            content,
        }
    }

    fn convert_table<'a>(&self, node: &'a AstNode<'a>) -> Table {
        let rows = node
            .children()
            .map(|row| {
                let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
                TableRow {
                    cells: row
                        .children()
                        .map(|cell| TableCell {
                            header,
                            content: self.convert_inlines(cell),
                        })
                        .collect(),
                }
            })
            .collect();
        Table { rows }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Raw HTML Blocks
    // ─────────────────────────────────────────────────────────────────────────

    fn convert_html_block(&self, literal: &str) -> Vec<Piece> {
        if let Some(pieces) = self.wrapper_tags_only(literal) {
            return pieces;
        }

        if starts_with_tag(literal, "table") {
            if let Some(table) = parse_html_table(literal) {
                return vec![Piece::Block(Block::Table(table))];
            }
        }

        if let Some((open, inner)) = split_single_element(literal) {
            if let Some(wrapper) = Wrapper::from_tag(&open, self.options) {
                let name = wrapper.tag_name().to_string();
                let mut pieces = vec![Piece::Open(wrapper)];
                pieces.extend(self.parse_fragment(inner));
                pieces.push(Piece::Close(name));
                return pieces;
            }
        }

        debug!("Keeping unrecognised HTML block verbatim");
        vec![Piece::Block(Block::Html {
            literal: literal.trim_end().to_string(),
        })]
    }

    /// Tags of a literal made only of wrapper start/end tags and whitespace.
    fn wrapper_tags_only(&self, literal: &str) -> Option<Vec<Piece>> {
        let mut pieces = Vec::new();
        for token in html::tokenize(literal) {
            match token {
                HtmlToken::Text(text) if text.trim().is_empty() => {}
                HtmlToken::Text(_) => return None,
                HtmlToken::Tag(tag) if tag.closing && is_wrapper_name(&tag.name) => {
                    pieces.push(Piece::Close(tag.name));
                }
                HtmlToken::Tag(tag) => {
                    pieces.push(Piece::Open(Wrapper::from_tag(&tag, self.options)?));
                }
            }
        }
        (!pieces.is_empty()).then_some(pieces)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline Content
    // ─────────────────────────────────────────────────────────────────────────

    fn convert_inlines<'a>(&self, node: &'a AstNode<'a>) -> Vec<Inline> {
        let mut builder = InlineBuilder::new();
        self.collect_children(node, &mut builder);
        builder.finish()
    }

    fn collect_children<'a>(&self, node: &'a AstNode<'a>, builder: &mut InlineBuilder) {
        for child in node.children() {
            self.collect_inline(child, builder);
        }
    }

    fn collect_inline<'a>(&self, node: &'a AstNode<'a>, builder: &mut InlineBuilder) {
        let ast = node.data.borrow();
        match &ast.value {
            NodeValue::Text(text) => builder.push_text(text),
            NodeValue::Code(code) => {
                let mut marks = builder.marks().clone();
                marks.code = true;
                builder.push_text_with(&code.literal, marks);
            }
            NodeValue::SoftBreak => {
                if self.options.hard_breaks {
                    builder.push_break();
                } else {
                    builder.push_text(" ");
                }
            }
            NodeValue::LineBreak => builder.push_break(),
            NodeValue::Emph => {
                builder.with_marks(|m| m.italic = true, |b| self.collect_children(node, b))
            }
            NodeValue::Strong => {
                builder.with_marks(|m| m.bold = true, |b| self.collect_children(node, b))
            }
            NodeValue::Strikethrough => {
                builder.with_marks(|m| m.strike = true, |b| self.collect_children(node, b))
            }
            NodeValue::Link(link) => {
                let url = link.url.clone();
                builder.with_marks(|m| m.link = Some(url), |b| self.collect_children(node, b))
            }
            // Images have no node of their own; keep the source text
            NodeValue::Image(image) => {
                builder.push_text("![");
                self.collect_children(node, builder);
                builder.push_text(&format!("]({})", image.url));
            }
            NodeValue::HtmlInline(raw) => match html::parse_tag(raw) {
                Some(tag) if builder.apply_tag(&tag) => {}
                _ => builder.push_text(raw),
            },
            _ => self.collect_children(node, builder),
        }
    }
}

fn list_kind(list: &NodeList) -> ListKind {
    match list.list_type {
        ComrakListType::Bullet => ListKind::Bullet,
        ComrakListType::Ordered => ListKind::Ordered {
            start: u32::try_from(list.start).unwrap_or(1),
        },
    }
}

/// Content that is only placeholder characters stands for an empty paragraph.
fn is_placeholder(content: &[Inline]) -> bool {
    !content.is_empty()
        && content.iter().all(|inline| match inline {
            Inline::Text(run) => run
                .text
                .chars()
                .all(|c| c == NBSP || c == ZERO_WIDTH_PLACEHOLDER),
            Inline::HardBreak => false,
        })
}

fn starts_with_tag(literal: &str, name: &str) -> bool {
    let trimmed = literal.trim_start();
    let Some(rest) = trimmed.strip_prefix('<') else {
        return false;
    };
    rest.get(..name.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(name))
        && rest[name.len()..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c.is_whitespace())
}

/// Split `<tag attrs>inner</tag>` into its start tag and inner text.
fn split_single_element(literal: &str) -> Option<(Tag, &str)> {
    let trimmed = literal.trim();
    let open_end = trimmed.find('>')? + 1;
    let open = html::parse_tag(&trimmed[..open_end])?;
    if open.closing || !is_wrapper_name(&open.name) {
        return None;
    }

    let close = format!("</{}>", open.name);
    let body_end = trimmed.len().checked_sub(close.len())?;
    if body_end < open_end || !trimmed.get(body_end..)?.eq_ignore_ascii_case(&close) {
        return None;
    }
    Some((open, trimmed.get(open_end..body_end)?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Assembly
// ─────────────────────────────────────────────────────────────────────────────

/// Fold wrapper start/end pieces into typed blocks.
fn assemble(pieces: Vec<Piece>) -> Vec<Block> {
    let mut iter = pieces.into_iter();
    assemble_until(&mut iter, None)
}

fn assemble_until(pieces: &mut std::vec::IntoIter<Piece>, closing: Option<&str>) -> Vec<Block> {
    let mut blocks = Vec::new();
    while let Some(piece) = pieces.next() {
        match piece {
            Piece::Block(block) => push_block(&mut blocks, block),
            Piece::Open(Wrapper::ListItem { indent }) => {
                let item = ListItem {
                    indent,
                    children: assemble_until(pieces, Some("li")),
                };
                match blocks.last_mut() {
                    Some(Block::List(list)) => list.items.push(item),
                    _ => blocks.push(Block::List(List::bullet(vec![item]))),
                }
            }
            Piece::Open(wrapper) => {
                let inner = assemble_until(pieces, Some(wrapper.tag_name()));
                for block in build_wrapped(wrapper, inner) {
                    push_block(&mut blocks, block);
                }
            }
            Piece::Close(name) => {
                if closing == Some(name.as_str()) {
                    return blocks;
                }
                debug!("Ignoring unmatched closing tag </{}>", name);
            }
        }
    }
    blocks
}

/// Append a block, joining it to a preceding list of the same family.
fn push_block(blocks: &mut Vec<Block>, block: Block) {
    if let Block::List(list) = block {
        match blocks.last_mut() {
            Some(Block::List(previous)) if previous.kind.same_family(list.kind) => {
                previous.items.extend(list.items);
            }
            _ => blocks.push(Block::List(list)),
        }
        return;
    }
    blocks.push(block);
}

fn build_wrapped(wrapper: Wrapper, inner: Vec<Block>) -> Vec<Block> {
    match wrapper {
        Wrapper::Paragraph { align } => {
            let (content, rest) = take_inline(inner);
            let mut blocks = vec![Block::Paragraph(Paragraph { align, content })];
            blocks.extend(rest);
            blocks
        }
        Wrapper::Heading { level, collapsed } => {
            let (content, rest) = take_inline(inner);
            let mut blocks = vec![Block::Heading(Heading {
                level,
                collapsed,
                content,
            })];
            blocks.extend(rest);
            blocks
        }
        Wrapper::BlockQuote { border_color } => vec![Block::BlockQuote(BlockQuote {
            border_color,
            children: inner,
        })],
        Wrapper::List { kind } => {
            let mut items = Vec::new();
            let mut rest = Vec::new();
            for block in inner {
                match block {
                    Block::List(list) => items.extend(list.items),
                    other => rest.push(other),
                }
            }
            let mut blocks = vec![Block::List(List { kind, items })];
            blocks.extend(rest);
            blocks
        }
        Wrapper::ListItem { indent } => vec![Block::List(List::bullet(vec![ListItem {
            indent,
            children: inner,
        }]))],
    }
}

/// Take the inline content of a leading paragraph or heading.
fn take_inline(mut blocks: Vec<Block>) -> (Vec<Inline>, Vec<Block>) {
    match blocks.first() {
        Some(Block::Paragraph(_)) | Some(Block::Heading(_)) => {}
        _ => return (Vec::new(), blocks),
    }
    let content = match blocks.remove(0) {
        Block::Paragraph(paragraph) => paragraph.content,
        Block::Heading(heading) => heading.content,
        _ => Vec::new(),
    };
    (content, blocks)
}

// ─────────────────────────────────────────────────────────────────────────────
// Raw HTML Tables
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a raw `<table>` block. Returns `None` when no table element opens.
fn parse_html_table(literal: &str) -> Option<Table> {
    let mut table = Table::default();
    let mut cell: Option<(bool, InlineBuilder)> = None;
    let mut saw_table = false;

    for token in html::tokenize(literal) {
        match token {
            HtmlToken::Tag(tag) => match (tag.name.as_str(), tag.closing) {
                ("table", false) => saw_table = true,
                ("table", true) | ("thead" | "tbody" | "tfoot", _) => {
                    finish_cell(&mut table, &mut cell)
                }
                ("tr", false) => {
                    finish_cell(&mut table, &mut cell);
                    table.rows.push(TableRow::default());
                }
                ("tr", true) => finish_cell(&mut table, &mut cell),
                ("th" | "td", false) => {
                    finish_cell(&mut table, &mut cell);
                    if table.rows.is_empty() {
                        table.rows.push(TableRow::default());
                    }
                    cell = Some((tag.name == "th", InlineBuilder::new()));
                }
                ("th" | "td", true) => finish_cell(&mut table, &mut cell),
                _ => {
                    if let Some((_, builder)) = cell.as_mut() {
                        if !builder.apply_tag(&tag) {
                            debug!("Dropping unsupported <{}> inside table cell", tag.name);
                        }
                    }
                }
            },
            HtmlToken::Text(text) => {
                if let Some((_, builder)) = cell.as_mut() {
                    builder.push_text(&html::decode_entities(text).replace('\n', " "));
                }
            }
        }
    }
    finish_cell(&mut table, &mut cell);

    saw_table.then_some(table)
}

fn finish_cell(table: &mut Table, cell: &mut Option<(bool, InlineBuilder)>) {
    let Some((header, builder)) = cell.take() else {
        return;
    };
    if let Some(row) = table.rows.last_mut() {
        row.cells.push(TableCell {
            header,
            content: builder.finish(),
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
