//! Markdown conversion module
//!
//! This module converts between markdown text and the typed document tree
//! using the comrak library, a CommonMark + GFM compatible parser.
//!
//! # Features
//! - Parse markdown (including preservation fragments) into a [`Document`]
//! - Serialize a [`Document`] back to markdown
//! - Attributes markdown cannot express are kept as raw-HTML wrappers
//! - Configurable parsing options
//!
//! # Example
//! ```
//! use foldmark::markdown::{parse_markdown, serialize_document};
//!
//! let markdown = "# Hello\n\nThis is **bold** text.";
//! let doc = parse_markdown(markdown).unwrap();
//! assert_eq!(serialize_document(&doc), markdown);
//! ```
//!
//! [`Document`]: crate::document::Document

mod html;
mod inline;
mod parser;
mod serializer;

pub use parser::{parse_markdown, parse_markdown_with_options, MarkdownOptions};
pub use serializer::{serialize_document, serialize_document_with_options, EMPTY_PARAGRAPH};
