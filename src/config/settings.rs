//! User settings for foldmark
//!
//! This module defines the `Settings` struct that holds all host-configurable
//! options of an editing session, with serde support for JSON persistence.

use serde::{Deserialize, Serialize};

use crate::markdown::MarkdownOptions;
use crate::outline::CollapsePolicy;
use crate::sync::FocusPolicy;

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Session settings.
///
/// Missing fields take their defaults, so older config files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Host Surface
    // ─────────────────────────────────────────────────────────────────────────
    /// Text shown while the document is empty
    pub placeholder: String,

    /// What to do with external updates while the editor is focused
    pub focus_policy: FocusPolicy,

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────
    /// Upper bound for visual list indentation (Tab)
    pub max_list_indent: u8,

    // ─────────────────────────────────────────────────────────────────────────
    // Engines
    // ─────────────────────────────────────────────────────────────────────────
    /// Heading-collapse tunables
    pub collapse: CollapsePolicy,

    /// Markdown parsing and serialization options
    pub markdown: MarkdownOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            placeholder: String::from("Write something…"),
            focus_policy: FocusPolicy::default(),
            max_list_indent: 8,
            collapse: CollapsePolicy::default(),
            markdown: MarkdownOptions::default(),
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Maximum allowed list indent.
    pub const MAX_LIST_INDENT: u8 = 16;
    /// Minimum indent step, in rem.
    pub const MIN_INDENT_STEP_REM: f32 = 0.25;
    /// Maximum indent step, in rem.
    pub const MAX_INDENT_STEP_REM: f32 = 8.0;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        self.max_list_indent = self.max_list_indent.min(Self::MAX_LIST_INDENT);

        self.collapse.sanitize();

        let step = self.markdown.indent_step_rem;
        self.markdown.indent_step_rem = if step.is_finite() {
            step.clamp(Self::MIN_INDENT_STEP_REM, Self::MAX_INDENT_STEP_REM)
        } else {
            MarkdownOptions::default().indent_step_rem
        };
    }

    /// Deserialize from JSON and sanitize in one step.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
