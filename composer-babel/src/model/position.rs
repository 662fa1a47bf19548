//! Flat position addressing over the document tree
//!
//! Positions count tokens of the serialized tree: each text character is one
//! position, a leaf node (including inline atoms) is one position, and every
//! other node adds an open and a close position around its content. The
//! document's own open/close are not counted, so position 0 is the start of
//! the document content.
//!
//! ```text
//! <p> s e e <hashtag> </p>
//! 0  1 2 3 4         5    6
//! ```
//!
//! Positions are only valid for the document they were computed on; after a
//! change they must be mapped through the change's
//! [`StepMap`](crate::editor::transform::StepMap).

use super::node::{Mark, Node};
use crate::schema::Schema;

/// Size of a node in the position space.
pub fn node_size(schema: &Schema, node: &Node) -> usize {
    match &node.text {
        Some(text) => text.chars().count(),
        None if schema.is_leaf(node) => 1,
        None => content_size(schema, &node.content) + 2,
    }
}

pub fn content_size(schema: &Schema, content: &[Node]) -> usize {
    content.iter().map(|child| node_size(schema, child)).sum()
}

/// A textblock located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextblockRef {
    /// Child indices from the document down to the textblock.
    pub path: Vec<usize>,
    /// Position before the textblock's open token.
    pub pos: usize,
    /// First position of its inline content.
    pub start: usize,
    /// Last position of its inline content.
    pub end: usize,
}

impl TextblockRef {
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.start && pos <= self.end
    }
}

/// The textblock whose content range contains `pos`.
pub fn textblock_at(schema: &Schema, doc: &Node, pos: usize) -> Option<TextblockRef> {
    let mut node = doc;
    let mut start = 0;
    let mut path = Vec::new();

    loop {
        if schema.is_textblock(node) {
            let end = start + content_size(schema, &node.content);
            return (pos >= start && pos <= end).then(|| TextblockRef {
                path,
                pos: start - 1,
                start,
                end,
            });
        }

        let mut offset = start;
        let mut next = None;
        for (index, child) in node.content.iter().enumerate() {
            let size = node_size(schema, child);
            if !schema.is_leaf(child) && pos > offset && pos < offset + size {
                next = Some((index, child, offset + 1));
                break;
            }
            offset += size;
        }

        let (index, child, child_start) = next?;
        path.push(index);
        node = child;
        start = child_start;
    }
}

/// Every textblock whose content range intersects `from..=to`, in document
/// order.
pub fn textblocks_between(schema: &Schema, doc: &Node, from: usize, to: usize) -> Vec<TextblockRef> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    collect_textblocks(schema, &doc.content, 0, from, to, &mut path, &mut out);
    out
}

fn collect_textblocks(
    schema: &Schema,
    content: &[Node],
    start: usize,
    from: usize,
    to: usize,
    path: &mut Vec<usize>,
    out: &mut Vec<TextblockRef>,
) {
    let mut offset = start;
    for (index, child) in content.iter().enumerate() {
        let size = node_size(schema, child);
        if offset > to {
            break;
        }
        if !schema.is_leaf(child) {
            let inner_start = offset + 1;
            let inner_end = offset + size - 1;
            if inner_start <= to && inner_end >= from {
                path.push(index);
                if schema.is_textblock(child) {
                    out.push(TextblockRef {
                        path: path.clone(),
                        pos: offset,
                        start: inner_start,
                        end: inner_end,
                    });
                } else {
                    collect_textblocks(schema, &child.content, inner_start, from, to, path, out);
                }
                path.pop();
            }
        }
        offset += size;
    }
}

/// Position before the node at `path`.
pub fn path_position(schema: &Schema, doc: &Node, path: &[usize]) -> Option<usize> {
    let mut pos = 0;
    let mut node = doc;
    for (depth, &index) in path.iter().enumerate() {
        if depth > 0 {
            pos += 1;
        }
        pos += content_size(schema, node.content.get(..index)?);
        node = node.content.get(index)?;
    }
    Some(pos)
}

/// First position inside the first textblock of the document.
pub fn first_text_position(schema: &Schema, doc: &Node) -> usize {
    let size = content_size(schema, &doc.content);
    textblocks_between(schema, doc, 0, size)
        .first()
        .map_or(0, |tb| tb.start)
}

fn split_chars(text: &str, at: usize) -> (String, String) {
    let index = text
        .char_indices()
        .nth(at)
        .map_or(text.len(), |(index, _)| index);
    (text[..index].to_string(), text[index..].to_string())
}

/// Split inline content at a content offset.
pub fn split_inline(schema: &Schema, content: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut acc = 0;
    for node in content {
        let size = node_size(schema, node);
        if acc + size <= offset {
            before.push(node.clone());
        } else if acc >= offset {
            after.push(node.clone());
        } else if let Some(text) = &node.text {
            let (head, tail) = split_chars(text, offset - acc);
            before.push(Node {
                text: Some(head),
                ..node.clone()
            });
            after.push(Node {
                text: Some(tail),
                ..node.clone()
            });
        } else {
            after.push(node.clone());
        }
        acc += size;
    }
    (before, after)
}

/// Drop empty text nodes and merge adjacent text nodes with equal marks.
pub fn normalize_inline(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if node.text.as_deref() == Some("") {
            continue;
        }
        if let (Some(last), Some(text)) = (out.last_mut(), node.text.as_deref()) {
            if last.is_text() && last.marks == node.marks {
                if let Some(existing) = last.text.as_mut() {
                    existing.push_str(text);
                    continue;
                }
            }
        }
        out.push(node);
    }
    out
}

/// Text of inline content between two content offsets. Leaf nodes render as
/// `leaf` when given, or their schema leaf text otherwise.
pub fn inline_text(
    schema: &Schema,
    content: &[Node],
    from: usize,
    to: usize,
    leaf: Option<&str>,
) -> String {
    let mut out = String::new();
    let mut acc = 0;
    for node in content {
        let size = node_size(schema, node);
        let (lo, hi) = (from.max(acc), to.min(acc + size));
        if lo < hi {
            match &node.text {
                Some(text) => out.extend(text.chars().skip(lo - acc).take(hi - lo)),
                None => match leaf {
                    Some(leaf) => out.push_str(leaf),
                    None => out.push_str(&schema.leaf_text(node)),
                },
            }
        }
        acc += size;
        if acc >= to {
            break;
        }
    }
    out
}

/// Text between two document positions, textblocks joined by `block_separator`.
pub fn text_between(
    schema: &Schema,
    doc: &Node,
    from: usize,
    to: usize,
    block_separator: &str,
    leaf: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    for tb in textblocks_between(schema, doc, from, to) {
        let Some(block) = doc.at_path(&tb.path) else {
            continue;
        };
        let lo = from.max(tb.start) - tb.start;
        let hi = to.min(tb.end) - tb.start;
        parts.push(inline_text(schema, &block.content, lo, hi, leaf));
    }
    parts.join(block_separator)
}

/// Marks text typed at `pos` inherits: those of the inline node before the
/// position (or after it at the start of a block), minus non-inclusive marks.
pub fn marks_at(schema: &Schema, doc: &Node, pos: usize) -> Vec<Mark> {
    let Some(tb) = textblock_at(schema, doc, pos) else {
        return Vec::new();
    };
    let Some(block) = doc.at_path(&tb.path) else {
        return Vec::new();
    };
    let offset = pos - tb.start;
    let mut acc = 0;
    let mut found: Option<&Node> = None;
    for node in &block.content {
        let size = node_size(schema, node);
        if offset == 0 || acc + size >= offset {
            found = Some(node);
            break;
        }
        acc += size;
    }
    found
        .map(|node| {
            node.marks
                .iter()
                .filter(|m| schema.mark_spec(&m.mark_type).is_some_and(|s| s.inclusive))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
