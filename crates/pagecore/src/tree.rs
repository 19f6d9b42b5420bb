//! Block-level content tree for a page body.
//!
//! Content is exchanged as an HTML fragment. Only the top level is modelled
//! structurally: each top-level element becomes a [`Block`], and the inline
//! run inside it is kept as markup. Elements accepted by a registered block
//! [`NodeSpec`](crate::schema::NodeSpec) become atom nodes.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::schema::{Attrs, NodeGroup, Schema};

lazy_static! {
    static ref TAG: Regex = Regex::new(
        r#"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#
    )
    .expect("Invalid TAG regex pattern");
    static ref ATTR: Regex =
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("Invalid ATTR regex pattern");
    static ref ENTITY: Regex =
        Regex::new(r"&#?[A-Za-z0-9]+;").expect("Invalid ENTITY regex pattern");
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// One tag occurrence in a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Attrs,
    pub closing: bool,
    pub self_closing: bool,
    pub start: usize,
    pub end: usize,
}

impl Tag {
    fn opens(&self) -> bool {
        !self.closing && !self.self_closing && !is_void(&self.name)
    }
}

/// All tags in `html`, in document order.
pub fn tags(html: &str) -> impl Iterator<Item = Tag> + '_ {
    TAG.captures_iter(html).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(Tag {
            name: caps[2].to_ascii_lowercase(),
            attrs: parse_attrs(caps.get(3).map_or("", |m| m.as_str())),
            closing: !caps[1].is_empty(),
            self_closing: !caps[4].is_empty(),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

pub fn parse_attrs(src: &str) -> Attrs {
    ATTR.captures_iter(src)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or(String::new(), |m| unescape_attr(m.as_str()));
            (caps[1].to_ascii_lowercase(), value)
        })
        .collect()
}

pub fn render_attrs(attrs: &[(String, String)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!(" {}=\"{}\"", k, escape_attr(v)))
        .collect()
}

pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A text block such as `<p>` or `<h1>`; `inner` is its inline markup.
    Element {
        tag: String,
        attrs: Attrs,
        inner: String,
    },
    /// An atom produced by a registered block node spec.
    Node { name: &'static str, attrs: Attrs },
    /// Bare text found between top-level elements.
    Text(String),
}

impl Block {
    pub fn paragraph(inner: impl Into<String>) -> Self {
        Block::Element {
            tag: "p".to_string(),
            attrs: Attrs::new(),
            inner: inner.into(),
        }
    }

    pub fn node(name: &'static str) -> Self {
        Block::Node {
            name,
            attrs: Attrs::new(),
        }
    }

    /// Whether the cursor can sit inside this block's inline run.
    pub fn is_textblock(&self) -> bool {
        match self {
            Block::Element { tag, .. } => !is_void(tag),
            Block::Text(_) => true,
            Block::Node { .. } => false,
        }
    }

    pub fn text_len(&self) -> usize {
        match self {
            Block::Element { inner, .. } => text_len(inner),
            Block::Text(text) => text_len(text),
            Block::Node { .. } => 0,
        }
    }

    pub fn to_html(&self, schema: &Schema) -> String {
        match self {
            Block::Element { tag, attrs, .. } if is_void(tag) => {
                format!("<{}{}>", tag, render_attrs(attrs))
            }
            Block::Element { tag, attrs, inner } => {
                format!("<{}{}>{}</{}>", tag, render_attrs(attrs), inner, tag)
            }
            Block::Node { name, attrs } => match schema.get(name) {
                Some(spec) => (spec.render)(attrs),
                None => {
                    log::warn!("Dropping node '{}' with no registered spec", name);
                    String::new()
                }
            },
            Block::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTree {
    blocks: Vec<Block>,
}

impl ContentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn parse(html: &str, schema: &Schema) -> Self {
        let all: Vec<Tag> = tags(html).collect();
        let mut blocks = Vec::new();
        let mut cursor = 0;
        let mut i = 0;

        while i < all.len() {
            let open = &all[i];
            push_text(&mut blocks, &html[cursor..open.start]);

            if open.closing {
                // stray close at top level
                cursor = open.end;
                i += 1;
                continue;
            }

            if !open.opens() {
                blocks.push(element_block(open, "", schema));
                cursor = open.end;
                i += 1;
                continue;
            }

            let mut depth = 0usize;
            let mut close = None;
            for (j, tag) in all.iter().enumerate().skip(i + 1) {
                if tag.closing {
                    if depth == 0 {
                        close = Some(j);
                        break;
                    }
                    depth -= 1;
                } else if tag.opens() {
                    depth += 1;
                }
            }

            match close {
                Some(j) => {
                    blocks.push(element_block(open, &html[open.end..all[j].start], schema));
                    cursor = all[j].end;
                    i = j + 1;
                }
                None => {
                    blocks.push(element_block(open, &html[open.end..], schema));
                    cursor = html.len();
                    i = all.len();
                }
            }
        }

        if cursor < html.len() {
            push_text(&mut blocks, &html[cursor..]);
        }

        Self { blocks }
    }

    pub fn to_html(&self, schema: &Schema) -> String {
        self.blocks.iter().map(|b| b.to_html(schema)).collect()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.blocks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn insert(&mut self, index: usize, block: Block) {
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
    }

    pub fn remove(&mut self, index: usize) -> Option<Block> {
        if index < self.blocks.len() {
            Some(self.blocks.remove(index))
        } else {
            None
        }
    }

    pub fn count_nodes(&self, name: &str) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Node { name: n, .. } if *n == name))
            .count()
    }
}

fn push_text(blocks: &mut Vec<Block>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        blocks.push(Block::Text(trimmed.to_string()));
    }
}

fn element_block(tag: &Tag, inner: &str, schema: &Schema) -> Block {
    match schema.match_element(&tag.name, &tag.attrs) {
        Some(spec) if spec.group == NodeGroup::Block => Block::node(spec.name),
        _ => Block::Element {
            tag: tag.name.clone(),
            attrs: tag.attrs.clone(),
            inner: inner.to_string(),
        },
    }
}

enum Piece<'a> {
    Open { name: String, raw: &'a str },
    Close,
    Atom,
    Text(&'a str),
}

/// Tokenize an inline run into tags, entities and text, with byte ranges.
fn pieces(inner: &str) -> Vec<(usize, usize, Piece<'_>)> {
    let mut out = Vec::new();
    let mut last = 0;

    for tag in tags(inner) {
        if tag.start > last {
            push_text_pieces(&mut out, inner, last, tag.start);
        }
        let piece = if tag.closing {
            Piece::Close
        } else if tag.opens() {
            Piece::Open {
                name: tag.name.clone(),
                raw: &inner[tag.start..tag.end],
            }
        } else {
            Piece::Atom
        };
        out.push((tag.start, tag.end, piece));
        last = tag.end;
    }
    if last < inner.len() {
        push_text_pieces(&mut out, inner, last, inner.len());
    }
    out
}

fn push_text_pieces<'a>(
    out: &mut Vec<(usize, usize, Piece<'a>)>,
    inner: &'a str,
    start: usize,
    end: usize,
) {
    let mut pos = start;
    for entity in ENTITY.find_iter(&inner[start..end]) {
        let (e_start, e_end) = (start + entity.start(), start + entity.end());
        if e_start > pos {
            out.push((pos, e_start, Piece::Text(&inner[pos..e_start])));
        }
        out.push((e_start, e_end, Piece::Atom));
        pos = e_end;
    }
    if pos < end {
        out.push((pos, end, Piece::Text(&inner[pos..end])));
    }
}

/// Number of user-visible positions in an inline run. Tags are free,
/// entities and void elements count as one, text counts grapheme clusters.
pub fn text_len(inner: &str) -> usize {
    pieces(inner)
        .iter()
        .map(|(_, _, piece)| match piece {
            Piece::Text(text) => text.graphemes(true).count(),
            Piece::Atom => 1,
            Piece::Open { .. } | Piece::Close => 0,
        })
        .sum()
}

/// Byte position for text `offset`, plus the inline tags open there.
/// Closing tags that immediately follow the position are consumed, so a
/// split at the end of a marked run leaves the mark wholly on the left.
fn locate(inner: &str, offset: usize) -> (usize, Vec<(String, String)>) {
    let mut stack: Vec<(String, String)> = Vec::new();
    let mut consumed = 0;
    let mut at = 0;

    for (start, end, piece) in pieces(inner) {
        if consumed >= offset {
            match piece {
                Piece::Close => {
                    stack.pop();
                    at = end;
                    continue;
                }
                _ => break,
            }
        }
        match piece {
            Piece::Open { name, raw } => {
                stack.push((name, raw.to_string()));
                at = end;
            }
            Piece::Close => {
                stack.pop();
                at = end;
            }
            Piece::Atom => {
                consumed += 1;
                at = end;
            }
            Piece::Text(text) => {
                let wanted = offset - consumed;
                match text.grapheme_indices(true).nth(wanted) {
                    Some((idx, _)) => {
                        at = start + idx;
                        return (at, stack);
                    }
                    None => {
                        consumed += text.graphemes(true).count();
                        at = end;
                    }
                }
            }
        }
    }
    (at, stack)
}

/// Split an inline run at a text offset into two well-formed runs.
pub fn split_inline(inner: &str, offset: usize) -> (String, String) {
    let (at, open) = locate(inner, offset);

    let mut left = inner[..at].to_string();
    for (name, _) in open.iter().rev() {
        left.push_str(&format!("</{}>", name));
    }

    let mut right: String = open.iter().map(|(_, raw)| raw.as_str()).collect();
    right.push_str(&inner[at..]);

    (left, right)
}

/// Insert plain text at a text offset, escaping it.
pub fn insert_inline(inner: &str, offset: usize, text: &str) -> String {
    let (at, _) = locate(inner, offset);
    format!("{}{}{}", &inner[..at], escape_text(text), &inner[at..])
}

/// True when an inline run holds no visible content.
pub fn is_blank_inline(inner: &str) -> bool {
    text_len(inner) == 0 || inner.trim().is_empty()
}
