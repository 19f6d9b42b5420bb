//! The rich-text engine seam.
//!
//! A [`Document`](crate::document::Document) owns exactly one engine and only
//! talks to it through [`RichTextEngine`]. [`HtmlEngine`] is the in-process
//! implementation over a [`ContentTree`].

use pagecore::tree::{self, Block, ContentTree};
use pagecore::{NodeGroup, NodeSpec, Schema};

use crate::error::EngineError;

pub trait RichTextEngine {
    /// Current content in the exchange format.
    fn serialized_content(&self) -> String;

    /// Replace the whole content. The cursor moves to the start.
    fn set_content(&mut self, content: &str);

    fn register_node_type(&mut self, spec: NodeSpec);

    /// Insert an empty node of a registered type at the cursor.
    fn insert_node_at_cursor(&mut self, name: &str) -> Result<(), EngineError>;
}

/// Cursor position: a top-level block index and a text offset inside it.
/// `block == len` is the gap after the last block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub block: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Default)]
pub struct HtmlEngine {
    schema: Schema,
    tree: ContentTree,
    cursor: Cursor,
}

impl HtmlEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn tree(&self) -> &ContentTree {
        &self.tree
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Move the cursor, clamping to the content.
    pub fn set_cursor(&mut self, block: usize, offset: usize) {
        let block = block.min(self.tree.len());
        let max_offset = self.tree.block(block).map_or(0, Block::text_len);
        self.cursor = Cursor {
            block,
            offset: offset.min(max_offset),
        };
    }

    pub fn move_to_end(&mut self) {
        match self.tree.len() {
            0 => self.cursor = Cursor::default(),
            len => {
                let last = len - 1;
                self.set_cursor(last, usize::MAX);
            }
        }
    }

    /// Type text at the cursor. Outside a text block a new paragraph is
    /// opened after the cursor position.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let typed = tree::text_len(&tree::escape_text(text));
        let cursor = self.cursor;

        match self.tree.block_mut(cursor.block) {
            Some(Block::Element { tag, inner, .. }) if !tree::is_void(tag) => {
                *inner = tree::insert_inline(inner, cursor.offset, text);
                self.cursor.offset += typed;
            }
            Some(Block::Text(inner)) => {
                *inner = tree::insert_inline(inner, cursor.offset, text);
                self.cursor.offset += typed;
            }
            Some(_) => {
                let at = cursor.block + 1;
                self.tree.insert(at, Block::paragraph(tree::escape_text(text)));
                self.cursor = Cursor {
                    block: at,
                    offset: typed,
                };
            }
            None => {
                let at = self.tree.len();
                self.tree.insert(at, Block::paragraph(tree::escape_text(text)));
                self.cursor = Cursor {
                    block: at,
                    offset: typed,
                };
            }
        }
    }

    /// Split the current text block at the cursor (Enter).
    pub fn split_block(&mut self) {
        let cursor = self.cursor;
        let Some(block) = self.tree.block(cursor.block).cloned() else {
            self.tree.insert(self.tree.len(), Block::paragraph(""));
            self.cursor = Cursor {
                block: self.tree.len() - 1,
                offset: 0,
            };
            return;
        };

        let (left, right) = match block {
            Block::Element { tag, attrs, inner } if !tree::is_void(&tag) => {
                let (l, r) = tree::split_inline(&inner, cursor.offset);
                (
                    Block::Element {
                        tag: tag.clone(),
                        attrs: attrs.clone(),
                        inner: l,
                    },
                    Block::Element { tag, attrs, inner: r },
                )
            }
            Block::Text(inner) => {
                let (l, r) = tree::split_inline(&inner, cursor.offset);
                (Block::Text(l), Block::paragraph(r))
            }
            _ => {
                self.tree.insert(cursor.block + 1, Block::paragraph(""));
                self.cursor = Cursor {
                    block: cursor.block + 1,
                    offset: 0,
                };
                return;
            }
        };

        if let Some(slot) = self.tree.block_mut(cursor.block) {
            *slot = left;
        }
        self.tree.insert(cursor.block + 1, right);
        self.cursor = Cursor {
            block: cursor.block + 1,
            offset: 0,
        };
    }

    /// Change the current text block's element, e.g. `p` to `h2`.
    pub fn set_block_type(&mut self, new_tag: &str) {
        let new_tag = new_tag.to_ascii_lowercase();
        let Some(block) = self.tree.block_mut(self.cursor.block) else {
            return;
        };
        match block {
            Block::Element { tag, .. } if !tree::is_void(tag) => *tag = new_tag,
            Block::Text(inner) => {
                let inner = std::mem::take(inner);
                *block = Block::Element {
                    tag: new_tag,
                    attrs: Vec::new(),
                    inner,
                };
            }
            _ => log::debug!("No text block at cursor to retag"),
        }
    }

    /// Wrap the current block's inline run in `mark`, or unwrap it when the
    /// run is already wrapped in exactly that mark.
    pub fn toggle_mark(&mut self, mark: &str) {
        let open = format!("<{}>", mark);
        let close = format!("</{}>", mark);
        let inner = match self.tree.block_mut(self.cursor.block) {
            Some(Block::Element { tag, inner, .. }) if !tree::is_void(tag) => inner,
            Some(Block::Text(inner)) => inner,
            _ => return,
        };

        let unwrapped = inner
            .strip_prefix(open.as_str())
            .and_then(|rest| rest.strip_suffix(close.as_str()))
            .map(str::to_string);
        *inner = match unwrapped {
            Some(plain) => plain,
            None => format!("{}{}{}", open, inner, close),
        };
    }

    fn block_spec(&self, name: &str) -> Result<NodeSpec, EngineError> {
        let spec = self
            .schema
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownNode(name.to_string()))?;
        if spec.group != NodeGroup::Block {
            return Err(EngineError::InvalidPlacement {
                name: name.to_string(),
                reason: "only block nodes can be inserted between blocks".to_string(),
            });
        }
        Ok(spec)
    }
}

impl RichTextEngine for HtmlEngine {
    fn serialized_content(&self) -> String {
        self.tree.to_html(&self.schema)
    }

    fn set_content(&mut self, content: &str) {
        self.tree = ContentTree::parse(content, &self.schema);
        self.cursor = Cursor::default();
    }

    fn register_node_type(&mut self, spec: NodeSpec) {
        self.schema.register(spec);
        // already-loaded content may contain elements the new spec claims
        let html = self.tree.to_html(&self.schema);
        self.tree = ContentTree::parse(&html, &self.schema);
        self.set_cursor(self.cursor.block, self.cursor.offset);
    }

    /// Block nodes never sit inside a text block: with the cursor mid-block
    /// the block is split around the node, at either edge the node goes
    /// before or after it, and an empty text block is replaced. The cursor
    /// ends up just after the node.
    fn insert_node_at_cursor(&mut self, name: &str) -> Result<(), EngineError> {
        let spec = self.block_spec(name)?;
        let node = Block::node(spec.name);
        let cursor = self.cursor;

        let index = match self.tree.block(cursor.block).cloned() {
            None => {
                let at = self.tree.len();
                self.tree.insert(at, node);
                at
            }
            Some(Block::Node { .. }) => {
                self.tree.insert(cursor.block + 1, node);
                cursor.block + 1
            }
            Some(block) if !block.is_textblock() => {
                self.tree.insert(cursor.block + 1, node);
                cursor.block + 1
            }
            Some(block) => {
                let len = block.text_len();
                let blank = match &block {
                    Block::Element { inner, .. } | Block::Text(inner) => {
                        tree::is_blank_inline(inner)
                    }
                    Block::Node { .. } => false,
                };

                if blank {
                    if let Some(slot) = self.tree.block_mut(cursor.block) {
                        *slot = node;
                    }
                    cursor.block
                } else if cursor.offset == 0 {
                    self.tree.insert(cursor.block, node);
                    cursor.block
                } else if cursor.offset >= len {
                    self.tree.insert(cursor.block + 1, node);
                    cursor.block + 1
                } else {
                    self.split_block();
                    self.tree.insert(cursor.block + 1, node);
                    cursor.block + 1
                }
            }
        };

        log::debug!("Inserted '{}' node at block {}", name, index);
        self.set_cursor(index + 1, 0);
        Ok(())
    }
}
