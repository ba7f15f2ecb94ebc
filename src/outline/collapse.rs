//! Heading-collapse engine
//!
//! Computes which nodes of a heading-structured document are visible and
//! which are suppressed by a collapsed heading, plus the supporting visual
//! decorations (toggle affordances, depth classes).
//!
//! A collapsed heading at level `L` suppresses everything that follows it in
//! document order until the next heading at level `<= L`. Headings nested
//! inside a suppressed region are hidden regardless of their own state.
//!
//! The computation is a pure function of the tree. Nothing is cached between
//! calls; callers recompute after every mutation.

use serde::{Deserialize, Serialize};

use crate::document::{Block, Document, Heading, NodePath, DEFAULT_COLLAPSED_LEVEL};

// ─────────────────────────────────────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Levels accepted for `default_collapsed_level`; 7 disables the default.
const MIN_COLLAPSED_LEVEL: u8 = 1;
const MAX_COLLAPSED_LEVEL: u8 = 7;

/// Tunables of the collapse engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapsePolicy {
    /// Headings with no explicit state start collapsed at this level and deeper
    pub default_collapsed_level: u8,
    /// Horizontal offset of the toggle affordance per heading level, in rem
    pub toggle_offset_rem: f32,
}

impl Default for CollapsePolicy {
    fn default() -> Self {
        Self {
            default_collapsed_level: DEFAULT_COLLAPSED_LEVEL,
            toggle_offset_rem: 1.5,
        }
    }
}

impl CollapsePolicy {
    /// Clamp values into their valid ranges.
    pub fn sanitize(&mut self) {
        self.default_collapsed_level = self
            .default_collapsed_level
            .clamp(MIN_COLLAPSED_LEVEL, MAX_COLLAPSED_LEVEL);
        if !self.toggle_offset_rem.is_finite() || self.toggle_offset_rem < 0.0 {
            self.toggle_offset_rem = Self::default().toggle_offset_rem;
        }
    }

    /// Effective collapsed state of a heading under this policy.
    pub fn is_collapsed(&self, heading: &Heading) -> bool {
        heading.effective_collapsed(self.default_collapsed_level)
    }

    /// Toggle offset for a heading level: `(level - 1) * toggle_offset_rem`.
    pub fn toggle_offset(&self, level: u8) -> f32 {
        f32::from(level.saturating_sub(1)) * self.toggle_offset_rem
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decorations
// ─────────────────────────────────────────────────────────────────────────────

/// What a decoration asks the rendering layer to do with a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecorationKind {
    /// Node (and everything below it) is suppressed by a collapsed heading
    Hidden,
    /// Top-level indentation class, `collapse-depth-{depth}`
    DepthClass { depth: u8 },
    /// Collapse toggle widget for a visible heading
    Toggle {
        level: u8,
        collapsed: bool,
        offset_rem: f32,
    },
}

impl DecorationKind {
    /// CSS class for depth decorations.
    pub fn class_name(&self) -> Option<String> {
        match self {
            DecorationKind::DepthClass { depth } => Some(format!("collapse-depth-{}", depth)),
            _ => None,
        }
    }
}

/// A decoration attached to the node at `path`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoration {
    pub path: NodePath,
    #[serde(flatten)]
    pub kind: DecorationKind,
}

/// Immutable result of one decoration pass, in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Decorations {
    items: Vec<Decoration>,
}

impl Decorations {
    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the node at `path` is hidden, directly or through an ancestor.
    pub fn is_hidden(&self, path: &[usize]) -> bool {
        self.items.iter().any(|decoration| {
            decoration.kind == DecorationKind::Hidden && path.starts_with(&decoration.path)
        })
    }

    /// Toggle decoration of the heading at `path`, as `(collapsed, offset_rem)`.
    pub fn toggle_at(&self, path: &[usize]) -> Option<(bool, f32)> {
        self.items.iter().find_map(|decoration| match decoration.kind {
            DecorationKind::Toggle {
                collapsed,
                offset_rem,
                ..
            } if decoration.path == path => Some((collapsed, offset_rem)),
            _ => None,
        })
    }

    /// Depth class assigned to the top-level node at `path`.
    pub fn depth_class(&self, path: &[usize]) -> Option<u8> {
        self.items.iter().find_map(|decoration| match decoration.kind {
            DecorationKind::DepthClass { depth } if decoration.path == path => Some(depth),
            _ => None,
        })
    }

    /// Number of nodes hidden directly (descendants of hidden nodes not counted).
    pub fn hidden_count(&self) -> usize {
        self.items
            .iter()
            .filter(|decoration| decoration.kind == DecorationKind::Hidden)
            .count()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Traversal
// ─────────────────────────────────────────────────────────────────────────────

/// Compute visibility decorations for a document.
///
/// Single depth-first pass, linear in the number of nodes.
pub fn compute_decorations(doc: &Document, policy: &CollapsePolicy) -> Decorations {
    let mut walker = Walker {
        policy,
        collapsed_level: None,
        current_depth: 0,
        out: Vec::new(),
    };
    let mut path = NodePath::new();
    walker.walk_blocks(&doc.blocks, &mut path);
    Decorations { items: walker.out }
}

struct Walker<'p> {
    policy: &'p CollapsePolicy,
    /// Level of the heading whose region currently suppresses content
    collapsed_level: Option<u8>,
    /// Level of the most recent top-level heading
    current_depth: u8,
    out: Vec<Decoration>,
}

impl Walker<'_> {
    fn push(&mut self, path: &NodePath, kind: DecorationKind) {
        self.out.push(Decoration {
            path: path.clone(),
            kind,
        });
    }

    fn walk_blocks(&mut self, blocks: &[Block], path: &mut NodePath) {
        for (index, block) in blocks.iter().enumerate() {
            path.push(index);
            self.visit(block, path);
            path.pop();
        }
    }

    fn visit(&mut self, block: &Block, path: &mut NodePath) {
        let top_level = path.len() == 1;

        if let Block::Heading(heading) = block {
            self.visit_heading(heading, path, top_level);
            return;
        }

        if self.collapsed_level.is_some() {
            self.push(path, DecorationKind::Hidden);
            return;
        }
        if top_level {
            let depth = self.current_depth;
            self.push(path, DecorationKind::DepthClass { depth });
        }

        match block {
            Block::BlockQuote(quote) => self.walk_blocks(&quote.children, path),
            Block::List(list) => {
                for (index, item) in list.items.iter().enumerate() {
                    path.push(index);
                    if self.collapsed_level.is_some() {
                        self.push(path, DecorationKind::Hidden);
                    } else {
                        self.walk_blocks(&item.children, path);
                    }
                    path.pop();
                }
            }
            _ => {}
        }
    }

    fn visit_heading(&mut self, heading: &Heading, path: &NodePath, top_level: bool) {
        let level = heading.level.as_u8();
        if top_level {
            self.current_depth = level;
        }

        // A heading at or above the suppressing level ends the region
        if self.collapsed_level.is_some_and(|collapsed| level <= collapsed) {
            self.collapsed_level = None;
        }
        if self.collapsed_level.is_some() {
            self.push(path, DecorationKind::Hidden);
            return;
        }

        if top_level {
            self.push(path, DecorationKind::DepthClass { depth: level });
        }
        let collapsed = self.policy.is_collapsed(heading);
        self.push(
            path,
            DecorationKind::Toggle {
                level,
                collapsed,
                offset_rem: self.policy.toggle_offset(level),
            },
        );
        if collapsed {
            self.collapsed_level = Some(level);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockQuote, HeadingLevel, List, ListItem, Paragraph};
    use crate::markdown::parse_markdown;

    fn heading(level: u8, text: &str, collapsed: Option<bool>) -> Block {
        Block::Heading(Heading::new(HeadingLevel::from(level), text).with_collapsed(collapsed))
    }

    fn paragraph(text: &str) -> Block {
        Block::Paragraph(Paragraph::new(text))
    }

    fn decorate(blocks: Vec<Block>) -> Decorations {
        compute_decorations(&Document::new(blocks), &CollapsePolicy::default())
    }

    #[test]
    fn test_collapsed_region_hides_body_and_nested_headings() {
        let decorations = decorate(vec![
            heading(1, "Top", Some(false)),
            heading(2, "Folded", Some(true)),
            paragraph("body"),
            heading(3, "child", Some(false)),
            heading(1, "Next", None),
        ]);

        assert!(!decorations.is_hidden(&[0]));
        assert!(!decorations.is_hidden(&[1]));
        assert!(decorations.is_hidden(&[2]));
        assert!(decorations.is_hidden(&[3]));
        assert!(!decorations.is_hidden(&[4]));

        // Hidden headings get no toggle
        assert!(decorations.toggle_at(&[3]).is_none());
        assert_eq!(decorations.toggle_at(&[1]), Some((true, 1.5)));
        assert_eq!(decorations.toggle_at(&[4]), Some((false, 0.0)));
    }

    #[test]
    fn test_nested_collapse_state_is_ignored_inside_region() {
        for child_state in [None, Some(true), Some(false)] {
            let decorations = decorate(vec![
                heading(2, "Folded", Some(true)),
                heading(3, "child", child_state),
                paragraph("deep"),
                heading(2, "Sibling", Some(false)),
                paragraph("shown"),
            ]);
            assert_eq!(decorations.hidden_count(), 2, "child state {:?}", child_state);
            assert!(!decorations.is_hidden(&[4]));
        }
    }

    #[test]
    fn test_default_policy_by_level() {
        for level in 1..=6u8 {
            let decorations = decorate(vec![heading(level, "h", None), paragraph("body")]);
            assert_eq!(
                decorations.is_hidden(&[1]),
                level >= 4,
                "level {} body visibility",
                level
            );
        }
    }

    #[test]
    fn test_adjacent_equal_heading_closes_region() {
        let decorations = decorate(vec![
            heading(2, "first", Some(true)),
            heading(2, "second", Some(false)),
            paragraph("body"),
        ]);
        assert_eq!(decorations.hidden_count(), 0);
        assert!(decorations.toggle_at(&[1]).is_some());
    }

    #[test]
    fn test_shallower_heading_closes_region() {
        let decorations = decorate(vec![
            heading(4, "deep", None),
            paragraph("hidden"),
            heading(5, "deeper", Some(false)),
            heading(3, "shallower", None),
            paragraph("visible"),
        ]);
        assert!(decorations.is_hidden(&[1]));
        assert!(decorations.is_hidden(&[2]));
        assert!(!decorations.is_hidden(&[3]));
        assert!(!decorations.is_hidden(&[4]));
    }

    #[test]
    fn test_title_details_scenario() {
        let doc = parse_markdown("# Title\n\n#### Details\n\nSecret info").unwrap();
        let policy = CollapsePolicy::default();

        let decorations = compute_decorations(&doc, &policy);
        assert!(!decorations.is_hidden(&[0]));
        assert!(!decorations.is_hidden(&[1]));
        assert_eq!(decorations.toggle_at(&[1]), Some((true, 4.5)));
        assert!(decorations.is_hidden(&[2]));

        let mut doc = doc;
        if let Some(Block::Heading(details)) = doc.blocks.get_mut(1) {
            details.collapsed = Some(false);
        }
        let decorations = compute_decorations(&doc, &policy);
        assert!(!decorations.is_hidden(&[2]));
        assert_eq!(decorations.toggle_at(&[1]), Some((false, 4.5)));
    }

    #[test]
    fn test_depth_classes_follow_top_level_headings() {
        let decorations = decorate(vec![
            paragraph("intro"),
            heading(2, "Section", Some(false)),
            paragraph("body"),
        ]);
        assert_eq!(decorations.depth_class(&[0]), Some(0));
        assert_eq!(decorations.depth_class(&[1]), Some(2));
        assert_eq!(decorations.depth_class(&[2]), Some(2));

        let class = DecorationKind::DepthClass { depth: 2 }.class_name();
        assert_eq!(class.as_deref(), Some("collapse-depth-2"));
    }

    #[test]
    fn test_heading_inside_list_item_suppresses_following_items() {
        let decorations = decorate(vec![
            Block::List(List::bullet(vec![
                ListItem {
                    indent: 0,
                    children: vec![heading(4, "inner", None), paragraph("same item")],
                },
                ListItem::new("next item"),
            ])),
            paragraph("after list"),
            heading(1, "reset", None),
        ]);

        assert!(!decorations.is_hidden(&[0]));
        assert!(!decorations.is_hidden(&[0, 0, 0]));
        assert!(decorations.is_hidden(&[0, 0, 1]));
        assert!(decorations.is_hidden(&[0, 1]));
        assert!(decorations.is_hidden(&[0, 1, 0]));
        assert!(decorations.is_hidden(&[1]));
        assert!(!decorations.is_hidden(&[2]));
        // Nested nodes carry no depth class
        assert!(decorations.depth_class(&[0, 0, 1]).is_none());
    }

    #[test]
    fn test_hidden_container_is_not_descended() {
        let decorations = decorate(vec![
            heading(1, "folded", Some(true)),
            Block::BlockQuote(BlockQuote {
                border_color: None,
                children: vec![heading(1, "quoted", Some(false)), paragraph("x")],
            }),
        ]);
        assert!(decorations.is_hidden(&[1]));
        assert!(decorations.is_hidden(&[1, 1]));
        // Only the quote itself is decorated
        assert_eq!(decorations.hidden_count(), 1);
    }

    #[test]
    fn test_policy_sanitize() {
        let mut policy = CollapsePolicy {
            default_collapsed_level: 0,
            toggle_offset_rem: f32::NAN,
        };
        policy.sanitize();
        assert_eq!(policy.default_collapsed_level, 1);
        assert_eq!(policy.toggle_offset_rem, 1.5);

        policy.default_collapsed_level = 42;
        policy.sanitize();
        assert_eq!(policy.default_collapsed_level, 7);
    }

    #[test]
    fn test_disabled_default_keeps_everything_visible() {
        let policy = CollapsePolicy {
            default_collapsed_level: 7,
            ..CollapsePolicy::default()
        };
        let doc = Document::new(vec![heading(6, "deep", None), paragraph("body")]);
        assert_eq!(compute_decorations(&doc, &policy).hidden_count(), 0);
    }
}
