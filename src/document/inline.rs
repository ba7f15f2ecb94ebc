//! Inline content: text runs with formatting marks.

use serde::{Deserialize, Serialize};

/// Formatting marks carried by a run of text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    /// Inline code span
    pub code: bool,
    /// CSS color value, e.g. `#d97706` or `red`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Link destination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Marks {
    /// Whether no mark is set.
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }

    pub fn code() -> Self {
        Self {
            code: true,
            ..Self::default()
        }
    }

    pub fn color(color: impl Into<String>) -> Self {
        Self {
            color: Some(color.into()),
            ..Self::default()
        }
    }
}

/// A run of text sharing one set of marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "Marks::is_plain")]
    pub marks: Marks,
}

/// An inline node inside a heading, paragraph or table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inline {
    Text(TextRun),
    HardBreak,
}

impl Inline {
    /// Plain, unmarked text.
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text(TextRun {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    /// Text carrying the given marks.
    pub fn styled(text: impl Into<String>, marks: Marks) -> Self {
        Inline::Text(TextRun {
            text: text.into(),
            marks,
        })
    }
}

/// Concatenate the text of inline content, rendering hard breaks as `\n`.
pub fn inline_text(content: &[Inline]) -> String {
    let mut text = String::new();
    for inline in content {
        match inline {
            Inline::Text(run) => text.push_str(&run.text),
            Inline::HardBreak => text.push('\n'),
        }
    }
    text
}

/// Bring inline content into canonical form.
///
/// Empty runs are dropped and adjacent runs with identical marks are merged,
/// so two trees with the same visible content and formatting compare equal.
pub fn normalize_inlines(content: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for inline in content {
        match inline {
            Inline::Text(run) if run.text.is_empty() => {}
            Inline::Text(run) => {
                if let Some(Inline::Text(prev)) = out.last_mut() {
                    if prev.marks == run.marks {
                        prev.text.push_str(&run.text);
                        continue;
                    }
                }
                out.push(Inline::Text(run));
            }
            Inline::HardBreak => out.push(Inline::HardBreak),
        }
    }
    out
}
