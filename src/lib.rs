//! foldmark - Markdown ⇄ document-tree sync with collapsible headings
//!
//! The crate keeps a markdown string and a typed document tree in step:
//!
//! - [`markdown`] parses markdown into a [`document::Document`] and
//!   serializes it back, preserving attributes markdown cannot express as
//!   embedded HTML fragments.
//! - [`outline`] computes heading-collapse decorations and implements the
//!   structural keyboard commands that depend on them.
//! - [`sync`] runs the loop-free bidirectional value contract for a live
//!   editing session.
//! - [`config`] holds the session settings and their persistence.

pub mod config;
pub mod document;
pub mod error;
pub mod markdown;
pub mod outline;
pub mod sync;
