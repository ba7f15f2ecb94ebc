//! Document tree to markdown
//!
//! Produces CommonMark wherever markdown can express the node, and falls back
//! to small raw-HTML wrappers for the attributes it cannot:
//!
//! - aligned paragraphs: `<p style="text-align: …">`
//! - empty paragraphs: `&nbsp;`
//! - headings with an explicit collapse state: `<hN data-collapsed="…">`
//! - blockquotes with a border color: `<blockquote data-border-color="…">`
//! - lists with visually indented items: `<ul>`/`<ol>` around `<li style>`
//! - tables: a single raw `<table>` block
//!
//! Wrappers always surround their markdown content with blank lines so the
//! content is still parsed as markdown. Blocks are joined by one blank line
//! and the output has no trailing newline.

use log::trace;

use crate::document::{
    normalize_inlines, Block, BlockQuote, CodeBlock, Document, Heading, Inline, List, ListItem,
    ListKind, Paragraph, Table, TextAlign,
};
use crate::markdown::html;
use crate::markdown::inline::{longest_run, to_html, to_markdown};
use crate::markdown::parser::MarkdownOptions;

/// Markdown for an empty paragraph.
pub const EMPTY_PARAGRAPH: &str = "&nbsp;";

// ─────────────────────────────────────────────────────────────────────────────
// Public API Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a document to markdown with default options.
///
/// # Example
/// ```
/// use foldmark::document::{Block, Document, Heading, HeadingLevel};
///
/// let doc = Document::new(vec![Block::Heading(Heading::new(HeadingLevel::H2, "Hi"))]);
/// assert_eq!(foldmark::markdown::serialize_document(&doc), "## Hi");
/// ```
pub fn serialize_document(doc: &Document) -> String {
    serialize_document_with_options(doc, &MarkdownOptions::default())
}

/// Serialize a document to markdown.
pub fn serialize_document_with_options(doc: &Document, options: &MarkdownOptions) -> String {
    let markdown = Serializer { options }.blocks(&doc.blocks);
    trace!(
        "Serialized {} top-level blocks into {} bytes",
        doc.blocks.len(),
        markdown.len()
    );
    markdown
}

// ─────────────────────────────────────────────────────────────────────────────
// Block Serialization
// ─────────────────────────────────────────────────────────────────────────────

struct Serializer<'o> {
    options: &'o MarkdownOptions,
}

impl Serializer<'_> {
    fn blocks(&self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|block| self.block(block))
            .filter(|markdown| !markdown.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn block(&self, block: &Block) -> String {
        match block {
            Block::Heading(heading) => self.heading(heading),
            Block::Paragraph(paragraph) => self.paragraph(paragraph),
            Block::List(list) => self.list(list),
            Block::BlockQuote(quote) => self.blockquote(quote),
            Block::Table(table) => self.table(table),
            Block::CodeBlock(code) => code_block(code),
            Block::ThematicBreak => "---".to_string(),
            Block::Html { literal } => literal.trim().to_string(),
        }
    }

    fn heading(&self, heading: &Heading) -> String {
        let level = heading.level.as_u8();
        match heading.collapsed {
            Some(collapsed) => {
                let tag = format!("h{}", level);
                let open = format!("<{} data-collapsed=\"{}\">", tag, collapsed);
                wrap(&open, &to_markdown(&heading.content), &tag)
            }
            None => {
                let hashes = "#".repeat(usize::from(level));
                let text = to_markdown(&breaks_as_spaces(&heading.content));
                if text.is_empty() {
                    hashes
                } else {
                    format!("{} {}", hashes, text)
                }
            }
        }
    }

    fn paragraph(&self, paragraph: &Paragraph) -> String {
        if paragraph.is_empty() {
            return EMPTY_PARAGRAPH.to_string();
        }
        let text = to_markdown(&paragraph.content);
        if text.trim().is_empty() {
            return EMPTY_PARAGRAPH.to_string();
        }
        match paragraph.align {
            TextAlign::Left => text,
            align => {
                let open = format!("<p style=\"text-align: {}\">", align.as_css());
                wrap(&open, &text, "p")
            }
        }
    }

    fn blockquote(&self, quote: &BlockQuote) -> String {
        let inner = self.blocks(&quote.children);
        match &quote.border_color {
            Some(color) => {
                let open = format!(
                    "<blockquote data-border-color=\"{}\">",
                    html::escape_attr(color)
                );
                wrap(&open, &inner, "blockquote")
            }
            None => prefix_lines(&inner, "> ", "> "),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lists
    // ─────────────────────────────────────────────────────────────────────────

    fn list(&self, list: &List) -> String {
        if list.items.is_empty() {
            return String::new();
        }
        if list.items.iter().any(|item| item.indent > 0) {
            return self.html_list(list);
        }

        let tight = list.items.iter().all(|item| item.children.len() <= 1);
        let separator = if tight { "\n" } else { "\n\n" };

        list.items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = match list.kind {
                    ListKind::Bullet => "-".to_string(),
                    ListKind::Ordered { start } => {
                        format!("{}.", u64::from(start) + index as u64)
                    }
                };
                self.native_item(item, &marker)
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn native_item(&self, item: &ListItem, marker: &str) -> String {
        // An item holding an empty paragraph keeps it as `- &nbsp;`
        if item.children.is_empty() {
            return marker.to_string();
        }
        let body = self.blocks(&item.children);
        let continuation = " ".repeat(marker.len() + 1);
        prefix_lines(&body, &format!("{} ", marker), &continuation)
    }

    fn html_list(&self, list: &List) -> String {
        let (open, tag) = match list.kind {
            ListKind::Bullet => ("<ul>".to_string(), "ul"),
            ListKind::Ordered { start: 1 } => ("<ol>".to_string(), "ol"),
            ListKind::Ordered { start } => (format!("<ol start=\"{}\">", start), "ol"),
        };

        let items = list
            .items
            .iter()
            .map(|item| {
                let open = if item.indent > 0 {
                    format!(
                        "<li style=\"margin-left: {}\">",
                        self.options.indent_margin(item.indent)
                    )
                } else {
                    "<li>".to_string()
                };
                wrap(&open, &self.blocks(&item.children), "li")
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        wrap(&open, &items, tag)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tables
    // ─────────────────────────────────────────────────────────────────────────

    fn table(&self, table: &Table) -> String {
        let header_rows = table
            .rows
            .iter()
            .take_while(|row| row.is_header())
            .count();
        let (head, body) = table.rows.split_at(header_rows);

        let mut lines = vec!["<table>".to_string()];
        for (section, rows) in [("thead", head), ("tbody", body)] {
            if rows.is_empty() {
                continue;
            }
            lines.push(format!("<{}>", section));
            for row in rows {
                lines.push("<tr>".to_string());
                for cell in &row.cells {
                    let tag = if cell.header { "th" } else { "td" };
                    lines.push(format!("<{tag}>{}</{tag}>", to_html(&cell.content)));
                }
                lines.push("</tr>".to_string());
            }
            lines.push(format!("</{}>", section));
        }
        lines.push("</table>".to_string());
        lines.join("\n")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn code_block(code: &CodeBlock) -> String {
    let fence_char = if code.language.contains('`') { '~' } else { '`' };
    let fence_len = (longest_run(&code.literal, fence_char) + 1).max(3);
    let fence: String = std::iter::repeat(fence_char).take(fence_len).collect();

    if code.literal.is_empty() {
        format!("{}{}\n{}", fence, code.language, fence)
    } else {
        format!("{}{}\n{}\n{}", fence, code.language, code.literal, fence)
    }
}

/// Surround markdown content with an HTML start and end tag on their own
/// blank-line separated lines.
fn wrap(open: &str, inner: &str, tag: &str) -> String {
    if inner.is_empty() {
        format!("{}\n\n</{}>", open, tag)
    } else {
        format!("{}\n\n{}\n\n</{}>", open, inner, tag)
    }
}

/// Prefix the first line and every following line; empty lines get the
/// prefix without its trailing space.
fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let prefix = if index == 0 { first } else { rest };
        if line.is_empty() {
            out.push_str(prefix.trim_end());
        } else {
            out.push_str(prefix);
            out.push_str(line);
        }
    }
    out
}

/// ATX headings are single-line, so line breaks become spaces.
fn breaks_as_spaces(content: &[Inline]) -> Vec<Inline> {
    normalize_inlines(
        content
            .iter()
            .map(|inline| match inline {
                Inline::HardBreak => Inline::text(" "),
                other => other.clone(),
            })
            .collect(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{HeadingLevel, Marks, TableCell, TableRow};
    use crate::markdown::parse_markdown;

    fn serialize(blocks: Vec<Block>) -> String {
        serialize_document(&Document::new(blocks))
    }

    /// serialize(parse(s)) == s
    fn assert_stable(markdown: &str) {
        let doc = parse_markdown(markdown).unwrap();
        assert_eq!(serialize_document(&doc), markdown, "tree: {:#?}", doc);
    }

    /// parse(serialize(doc)) == doc
    fn assert_round_trip(doc: Document) {
        let markdown = serialize_document(&doc);
        let reparsed = parse_markdown(&markdown).unwrap();
        assert_eq!(reparsed, doc, "markdown:\n{}", markdown);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Native Markdown
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_document() {
        assert_eq!(serialize(vec![]), "");
    }

    #[test]
    fn test_headings_use_atx() {
        let markdown = serialize(vec![
            Block::Heading(Heading::new(HeadingLevel::H1, "Title")),
            Block::Heading(Heading::new(HeadingLevel::H4, "Details")),
            Block::Paragraph(Paragraph::new("Secret info")),
        ]);
        assert_eq!(markdown, "# Title\n\n#### Details\n\nSecret info");
    }

    #[test]
    fn test_empty_heading_is_bare_hashes() {
        assert_eq!(
            serialize(vec![Block::Heading(Heading::empty(HeadingLevel::H3))]),
            "###"
        );
        assert_round_trip(Document::new(vec![Block::Heading(Heading::empty(
            HeadingLevel::H3,
        ))]));
    }

    #[test]
    fn test_heading_breaks_become_spaces() {
        let heading = Heading {
            level: HeadingLevel::H2,
            collapsed: None,
            content: vec![Inline::text("one"), Inline::HardBreak, Inline::text("two")],
        };
        assert_eq!(serialize(vec![Block::Heading(heading)]), "## one two");
    }

    #[test]
    fn test_native_lists() {
        let markdown = serialize(vec![
            Block::List(List::bullet(vec![ListItem::new("a"), ListItem::new("b")])),
            Block::List(List::ordered(3, vec![ListItem::new("c"), ListItem::new("d")])),
        ]);
        assert_eq!(markdown, "- a\n- b\n\n3. c\n4. d");
    }

    #[test]
    fn test_loose_list_and_continuation() {
        let item = ListItem {
            indent: 0,
            children: vec![
                Block::Paragraph(Paragraph::new("first")),
                Block::Paragraph(Paragraph::new("second")),
            ],
        };
        let markdown = serialize(vec![Block::List(List::ordered(
            1,
            vec![item, ListItem::new("next")],
        ))]);
        assert_eq!(markdown, "1. first\n\n   second\n\n2. next");
    }

    #[test]
    fn test_empty_list_item_is_bare_marker() {
        let list = List::bullet(vec![
            ListItem::new("a"),
            ListItem::default(),
            ListItem::new("c"),
        ]);
        assert_eq!(serialize(vec![Block::List(list)]), "- a\n-\n- c");
    }

    #[test]
    fn test_empty_paragraph_in_list_item_is_kept() {
        let holding_empty = ListItem {
            indent: 0,
            children: vec![Block::Paragraph(Paragraph::empty())],
        };
        let list = List::bullet(vec![ListItem::new("a"), holding_empty.clone(), ListItem::new("c")]);
        assert_eq!(serialize(vec![Block::List(list.clone())]), "- a\n- &nbsp;\n- c");
        assert_round_trip(Document::new(vec![Block::List(list)]));

        let indented = List::bullet(vec![ListItem::new("a"), holding_empty.with_indent(1)]);
        assert_round_trip(Document::new(vec![Block::List(indented)]));
    }

    #[test]
    fn test_native_blockquote() {
        let quote = BlockQuote {
            border_color: None,
            children: vec![
                Block::Paragraph(Paragraph::new("one")),
                Block::Paragraph(Paragraph::new("two")),
            ],
        };
        assert_eq!(serialize(vec![Block::BlockQuote(quote)]), "> one\n>\n> two");
    }

    #[test]
    fn test_code_block_fences() {
        let code = CodeBlock {
            language: "md".into(),
            literal: "```\ninner\n```".into(),
        };
        assert_eq!(
            serialize(vec![Block::CodeBlock(code.clone())]),
            "````md\n```\ninner\n```\n````"
        );
        assert_round_trip(Document::new(vec![Block::CodeBlock(code)]));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Preservation Rules
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_aligned_paragraph() {
        let paragraph = Paragraph::new("Centered").with_align(TextAlign::Center);
        assert_eq!(
            serialize(vec![Block::Paragraph(paragraph.clone())]),
            "<p style=\"text-align: center\">\n\nCentered\n\n</p>"
        );
        assert_round_trip(Document::new(vec![Block::Paragraph(paragraph)]));
    }

    #[test]
    fn test_empty_paragraph_placeholder() {
        let doc = Document::new(vec![
            Block::Paragraph(Paragraph::new("before")),
            Block::Paragraph(Paragraph::empty()),
            Block::Paragraph(Paragraph::new("after")),
        ]);
        assert_eq!(serialize_document(&doc), "before\n\n&nbsp;\n\nafter");
        assert_round_trip(doc);
    }

    #[test]
    fn test_empty_placeholder_wins_over_alignment() {
        let paragraph = Paragraph::empty().with_align(TextAlign::Right);
        assert_eq!(serialize(vec![Block::Paragraph(paragraph)]), "&nbsp;");
    }

    #[test]
    fn test_explicit_collapse_state_is_preserved() {
        let doc = Document::new(vec![
            Block::Heading(Heading::new(HeadingLevel::H2, "Closed").with_collapsed(Some(true))),
            Block::Heading(Heading::new(HeadingLevel::H5, "Open").with_collapsed(Some(false))),
            Block::Paragraph(Paragraph::new("body")),
        ]);
        assert_eq!(
            serialize_document(&doc),
            "<h2 data-collapsed=\"true\">\n\nClosed\n\n</h2>\n\n<h5 data-collapsed=\"false\">\n\nOpen\n\n</h5>\n\nbody"
        );
        assert_round_trip(doc);
    }

    #[test]
    fn test_blockquote_border_color() {
        let quote = BlockQuote {
            border_color: Some("#3b82f6".into()),
            children: vec![Block::Paragraph(Paragraph::new("note"))],
        };
        assert_eq!(
            serialize(vec![Block::BlockQuote(quote.clone())]),
            "<blockquote data-border-color=\"#3b82f6\">\n\nnote\n\n</blockquote>"
        );
        assert_round_trip(Document::new(vec![Block::BlockQuote(quote)]));
    }

    #[test]
    fn test_indented_list_items_use_html() {
        let list = List::bullet(vec![
            ListItem::new("flat"),
            ListItem::new("deep").with_indent(2),
        ]);
        let markdown = serialize(vec![Block::List(list.clone())]);
        assert!(markdown.contains("<li style=\"margin-left: 3rem\">"), "{}", markdown);
        assert_eq!(
            markdown,
            "<ul>\n\n<li>\n\nflat\n\n</li>\n\n<li style=\"margin-left: 3rem\">\n\ndeep\n\n</li>\n\n</ul>"
        );
        assert_round_trip(Document::new(vec![Block::List(list)]));
    }

    #[test]
    fn test_indented_ordered_list_keeps_start() {
        let list = List::ordered(
            5,
            vec![ListItem::new("five"), ListItem::new("six").with_indent(1)],
        );
        let markdown = serialize(vec![Block::List(list.clone())]);
        assert!(markdown.starts_with("<ol start=\"5\">"));
        assert!(markdown.contains("<li style=\"margin-left: 1.5rem\">"));
        assert_round_trip(Document::new(vec![Block::List(list)]));
    }

    #[test]
    fn test_table_is_raw_html() {
        let table = Table {
            rows: vec![
                TableRow {
                    cells: vec![TableCell::header("Name"), TableCell::header("Value")],
                },
                TableRow {
                    cells: vec![
                        TableCell::data("a | b"),
                        TableCell {
                            header: false,
                            content: vec![Inline::styled("x<y", Marks::bold())],
                        },
                    ],
                },
            ],
        };
        let markdown = serialize(vec![Block::Table(table.clone())]);
        assert_eq!(
            markdown,
            "<table>\n<thead>\n<tr>\n<th>Name</th>\n<th>Value</th>\n</tr>\n</thead>\n<tbody>\n<tr>\n<td>a | b</td>\n<td><strong>x&lt;y</strong></td>\n</tr>\n</tbody>\n</table>"
        );
        assert!(!markdown.contains("\n\n"));
        assert_round_trip(Document::new(vec![Block::Table(table)]));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Round Trips
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_canonical_markdown_is_stable() {
        let samples = [
            "# Title\n\n#### Details\n\nSecret info",
            "Some **bold** and *italic* and `code` text",
            "- one\n- two\n- three",
            "1. first\n2. second",
            "> quoted\n>\n> more",
            "```rust\nfn main() {}\n```",
            "before\n\n---\n\nafter",
            "line one\\\nline two",
            "<u>under</u> and <span style=\"color: red\">red</span>",
            "[link](https://example.com) and ~~gone~~",
            "&nbsp;",
        ];
        for sample in samples {
            assert_stable(sample);
        }
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let messy = "Title\n=====\n\n* a\n* b\n\n+ c\n\n1) x\n\nsoft\nbreak\n\n| h |\n|---|\n| d |\n\n<p style=\"text-align:right\">right</p>\n\n<div>raw</div>";
        let once = serialize_document(&parse_markdown(messy).unwrap());
        let twice = serialize_document(&parse_markdown(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_preservation_matrix_round_trips() {
        let mut docs = Vec::new();

        for level in 1..=6u8 {
            for collapsed in [Some(true), Some(false), None] {
                docs.push(Document::new(vec![
                    Block::Heading(
                        Heading::new(HeadingLevel::from(level), "Section").with_collapsed(collapsed),
                    ),
                    Block::Paragraph(Paragraph::new("body")),
                ]));
            }
        }

        for indent in 0..=6u8 {
            docs.push(Document::new(vec![Block::List(List::bullet(vec![
                ListItem::new("anchor"),
                ListItem::new("moved").with_indent(indent),
            ]))]));
        }
        docs.push(Document::new(vec![Block::List(List::ordered(
            1,
            (0..=6u8)
                .map(|indent| ListItem::new("step").with_indent(indent))
                .collect(),
        ))]));

        for align in [
            TextAlign::Left,
            TextAlign::Center,
            TextAlign::Right,
            TextAlign::Justify,
        ] {
            docs.push(Document::new(vec![
                Block::Paragraph(Paragraph::new("aligned").with_align(align)),
                Block::Paragraph(Paragraph::new("plain")),
            ]));
        }

        for border_color in [None, Some("#ef4444".to_string())] {
            docs.push(Document::new(vec![Block::BlockQuote(BlockQuote {
                border_color,
                children: vec![
                    Block::Paragraph(Paragraph::new("quoted")),
                    Block::Paragraph(Paragraph::new("right").with_align(TextAlign::Right)),
                ],
            })]));
        }

        docs.push(Document::new(vec![Block::Table(Table {
            rows: vec![
                TableRow {
                    cells: vec![TableCell::header("Key"), TableCell::header("Value")],
                },
                TableRow {
                    cells: vec![TableCell::data("a"), TableCell::data("1")],
                },
                TableRow {
                    cells: vec![TableCell::data("b"), TableCell::data("2")],
                },
            ],
        })]));

        docs.push(Document::new(vec![
            Block::Paragraph(Paragraph::empty()),
            Block::Paragraph(Paragraph::new("between")),
            Block::Paragraph(Paragraph::empty()),
        ]));

        for doc in docs {
            let once = serialize_document(&doc);
            let reparsed = parse_markdown(&once).unwrap();
            assert_eq!(reparsed, doc, "markdown:\n{}", once);
            assert_eq!(serialize_document(&reparsed), once);
        }
    }

    #[test]
    fn test_inline_edge_cases_round_trip() {
        let link = Marks {
            link: Some("https://x.io".into()),
            ..Marks::default()
        };
        let contents = vec![
            vec![Inline::text("see!"), Inline::styled("here", link)],
            vec![Inline::styled("a.", Marks::bold()), Inline::text("b")],
            vec![Inline::text("x"), Inline::styled("(y)", Marks::bold())],
            vec![
                Inline::text("a"),
                Inline::styled(" ", Marks::code()),
                Inline::text("b"),
            ],
            vec![Inline::text("![alt](https://x.io/a.png)")],
        ];
        for content in contents {
            assert_round_trip(Document::new(vec![Block::Paragraph(Paragraph {
                align: TextAlign::Left,
                content,
            })]));
        }
    }

    #[test]
    fn test_nbsp_heading_is_not_dropped() {
        let heading = Heading::new(HeadingLevel::H2, "\u{a0}");
        assert_eq!(serialize(vec![Block::Heading(heading.clone())]), "## \u{a0}");
        assert_round_trip(Document::new(vec![Block::Heading(heading)]));
    }

    #[test]
    fn test_escaped_text_round_trips() {
        let doc = Document::new(vec![
            Block::Paragraph(Paragraph::new("# not a heading")),
            Block::Paragraph(Paragraph::new("- not a list")),
            Block::Paragraph(Paragraph::new("1. not ordered")),
            Block::Paragraph(Paragraph::new("a *b* <c> & [d] `e` |f|")),
        ]);
        assert_round_trip(doc);
    }

    #[test]
    fn test_nested_structure_round_trips() {
        let doc = Document::new(vec![
            Block::Heading(Heading::new(HeadingLevel::H1, "Doc")),
            Block::List(List::bullet(vec![
                ListItem {
                    indent: 0,
                    children: vec![
                        Block::Paragraph(Paragraph::new("parent")),
                        Block::List(List::ordered(1, vec![ListItem::new("child")])),
                    ],
                },
                ListItem::new("sibling"),
            ])),
            Block::BlockQuote(BlockQuote {
                border_color: None,
                children: vec![
                    Block::Paragraph(Paragraph::new("centered").with_align(TextAlign::Center)),
                    Block::Heading(
                        Heading::new(HeadingLevel::H4, "inside").with_collapsed(Some(false)),
                    ),
                ],
            }),
        ]);
        assert_round_trip(doc);
    }

    #[test]
    fn test_styled_content_round_trips() {
        let paragraph = Paragraph {
            align: TextAlign::Justify,
            content: vec![
                Inline::text("plain "),
                Inline::styled("bold", Marks::bold()),
                Inline::text(" "),
                Inline::styled("red", Marks::color("#f00")),
                Inline::HardBreak,
                Inline::styled("code", Marks::code()),
            ],
        };
        assert_round_trip(Document::new(vec![Block::Paragraph(paragraph)]));
    }
}
