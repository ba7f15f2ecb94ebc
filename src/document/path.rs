//! Node addressing and traversal.
//!
//! A path is a sequence of child indices starting at the document root.
//! Blockquotes and list items expose their blocks as children; a list
//! exposes its items. Tables, code blocks and leaf blocks have no
//! addressable children.

use super::inline::Inline;
use super::node::{Block, Document, Heading, List, ListItem};

/// Child indices from the document root to a node.
pub type NodePath = Vec<usize>;

/// A borrowed node: either a block or a list item.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Block(&'a Block),
    Item(&'a ListItem),
}

impl Document {
    /// The block sequence owned by the node at `parent`.
    ///
    /// The empty path is the document itself. Returns `None` when the path
    /// does not resolve to the document, a blockquote or a list item.
    pub fn blocks_at(&self, parent: &[usize]) -> Option<&Vec<Block>> {
        let mut blocks = &self.blocks;
        let mut rest = parent;
        while let Some((&index, tail)) = rest.split_first() {
            blocks = match blocks.get(index)? {
                Block::BlockQuote(quote) => {
                    rest = tail;
                    &quote.children
                }
                Block::List(list) => {
                    let (&item_index, tail) = tail.split_first()?;
                    rest = tail;
                    &list.items.get(item_index)?.children
                }
                _ => return None,
            };
        }
        Some(blocks)
    }

    /// Mutable counterpart of [`Document::blocks_at`].
    pub fn blocks_at_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Block>> {
        let mut blocks = &mut self.blocks;
        let mut rest = parent;
        while let Some((&index, tail)) = rest.split_first() {
            let current = blocks;
            blocks = match current.get_mut(index)? {
                Block::BlockQuote(quote) => {
                    rest = tail;
                    &mut quote.children
                }
                Block::List(list) => {
                    let (&item_index, tail) = tail.split_first()?;
                    rest = tail;
                    &mut list.items.get_mut(item_index)?.children
                }
                _ => return None,
            };
        }
        Some(blocks)
    }

    /// The block at `path`, if the path addresses a block.
    pub fn block(&self, path: &[usize]) -> Option<&Block> {
        let (&index, parent) = path.split_last()?;
        self.blocks_at(parent)?.get(index)
    }

    pub fn block_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (&index, parent) = path.split_last()?;
        self.blocks_at_mut(parent)?.get_mut(index)
    }

    /// The list item at `path`, if the path addresses a list item.
    pub fn item(&self, path: &[usize]) -> Option<&ListItem> {
        let (&index, list_path) = path.split_last()?;
        match self.block(list_path)? {
            Block::List(list) => list.items.get(index),
            _ => None,
        }
    }

    pub fn list_mut(&mut self, path: &[usize]) -> Option<&mut List> {
        match self.block_mut(path)? {
            Block::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn heading_mut(&mut self, path: &[usize]) -> Option<&mut Heading> {
        match self.block_mut(path)? {
            Block::Heading(heading) => Some(heading),
            _ => None,
        }
    }

    /// The node at `path`, block or list item.
    pub fn node(&self, path: &[usize]) -> Option<NodeRef<'_>> {
        if let Some(block) = self.block(path) {
            return Some(NodeRef::Block(block));
        }
        self.item(path).map(NodeRef::Item)
    }

    /// Inline content of the heading or paragraph at `path`.
    pub fn inline_content(&self, path: &[usize]) -> Option<&[Inline]> {
        match self.block(path)? {
            Block::Heading(heading) => Some(&heading.content),
            Block::Paragraph(paragraph) => Some(&paragraph.content),
            _ => None,
        }
    }

    /// Every heading in document order, with its path.
    ///
    /// Paths compare lexicographically in document order, so the result is
    /// sorted by path.
    pub fn headings(&self) -> Vec<(NodePath, &Heading)> {
        let mut found = Vec::new();
        let mut path = NodePath::new();
        collect_headings(&self.blocks, &mut path, &mut found);
        found
    }

    /// The last heading that precedes `path` in document order.
    pub fn preceding_heading(&self, path: &[usize]) -> Option<(NodePath, &Heading)> {
        self.headings()
            .into_iter()
            .take_while(|(heading_path, _)| heading_path.as_slice() < path)
            .last()
    }
}

fn collect_headings<'a>(
    blocks: &'a [Block],
    path: &mut NodePath,
    found: &mut Vec<(NodePath, &'a Heading)>,
) {
    for (index, block) in blocks.iter().enumerate() {
        path.push(index);
        match block {
            Block::Heading(heading) => found.push((path.clone(), heading)),
            Block::BlockQuote(quote) => collect_headings(&quote.children, path, found),
            Block::List(list) => {
                for (item_index, item) in list.items.iter().enumerate() {
                    path.push(item_index);
                    collect_headings(&item.children, path, found);
                    path.pop();
                }
            }
            _ => {}
        }
        path.pop();
    }
}
