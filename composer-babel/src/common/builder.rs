//! Builds a document tree from a flat open/content/close stream.
//!
//! # The High-Level Concept
//!
//! Both importers (markdown tokens and DOM elements) produce a linear
//! sequence of "open X", "content", "close X" instructions. The builder keeps
//! a stack of open frames. Opening pushes a frame, content is appended to the
//! innermost node frame, closing pops the frame, finalizes the node and
//! appends it to its parent.
//!
//! Three kinds of frames exist:
//!
//! - **Node** frames build a document node.
//! - **Mark** frames apply a mark to every inline node added while they are
//!   open.
//! - **Transparent** frames stand for tokens whose children are kept but which
//!   produce nothing themselves (e.g. the inner `<blockquote>` of a quote).
//!
//! # Implicit Paragraphs
//!
//! Inline content arriving directly inside a block container (`<div>Hi</div>`,
//! `<blockquote>Hi</blockquote>`) is wrapped in an implicit paragraph. Implicit
//! frames close themselves when a block opens or their container closes.
//!
//! # Atom Payloads
//!
//! Text arriving while an atom with a text payload is open (`@bob` after the
//! mention open token) is stored in the atom's attribute, minus its sigil,
//! instead of becoming content.
//!
//! # Validation
//!
//! Every close must match the frame on top of the stack and the stack must be
//! empty at the end. Each finished node has its attributes resolved against
//! the schema (missing required attributes fail) and its content checked
//! against its content model. Empty block containers get an empty paragraph.

use crate::error::Malformed;
use crate::model::position::normalize_inline;
use crate::model::{AttrValue, Attrs, Mark, Node};
use crate::schema::{ContentModel, Schema};

#[derive(Debug)]
enum Frame {
    Node {
        node: Node,
        implicit: bool,
        opened_by: String,
    },
    Mark {
        mark: Mark,
        opened_by: String,
    },
    Transparent {
        opened_by: String,
    },
}

impl Frame {
    fn opened_by(&self) -> &str {
        match self {
            Frame::Node { opened_by, .. }
            | Frame::Mark { opened_by, .. }
            | Frame::Transparent { opened_by } => opened_by,
        }
    }

    fn is_implicit(&self) -> bool {
        matches!(self, Frame::Node { implicit: true, .. })
    }
}

pub struct DocumentBuilder<'s> {
    schema: &'s Schema,
    stack: Vec<Frame>,
}

impl<'s> DocumentBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        DocumentBuilder {
            schema,
            stack: vec![Frame::Node {
                node: Node::new("doc"),
                implicit: false,
                opened_by: String::new(),
            }],
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    /// Open a node. Its close instruction must name `opened_by`.
    pub fn open_node(&mut self, node_type: &str, attrs: Attrs, opened_by: &str) -> Result<(), Malformed> {
        let spec = self
            .schema
            .node_spec(node_type)
            .ok_or_else(|| Malformed::UnknownNodeType(node_type.to_string()))?;
        let mut node = Node::new(node_type).with_attrs(attrs);
        if spec.is_inline() {
            self.ensure_inline()?;
            node.marks = self.marks(&[]);
        } else {
            self.close_implicit()?;
        }
        self.stack.push(Frame::Node {
            node,
            implicit: false,
            opened_by: opened_by.to_string(),
        });
        Ok(())
    }

    pub fn open_mark(&mut self, mark: Mark, opened_by: &str) {
        self.stack.push(Frame::Mark {
            mark,
            opened_by: opened_by.to_string(),
        });
    }

    pub fn open_transparent(&mut self, opened_by: &str) {
        self.stack.push(Frame::Transparent {
            opened_by: opened_by.to_string(),
        });
    }

    /// Close the innermost frame, which must have been opened by `name`.
    pub fn close(&mut self, name: &str) -> Result<(), Malformed> {
        self.close_implicit()?;
        if self.stack.len() == 1 {
            return Err(Malformed::UnexpectedClose {
                found: name.to_string(),
            });
        }
        let expected = self.stack.last().map(Frame::opened_by).unwrap_or_default();
        if expected != name {
            return Err(Malformed::MismatchedClose {
                expected: expected.to_string(),
                found: name.to_string(),
            });
        }
        self.pop()
    }

    /// Add text with the open marks plus `marks`.
    pub fn add_text(&mut self, text: &str, marks: &[Mark]) -> Result<(), Malformed> {
        if text.is_empty() {
            return Ok(());
        }

        let schema = self.schema;
        let current = self.current();
        if let Some(payload) = schema
            .node_spec(&current.node_type)
            .and_then(|spec| spec.payload)
        {
            let value = text.strip_prefix(payload.prefix).unwrap_or(text);
            let existing = current.attr_str(payload.attr).unwrap_or_default();
            let joined = format!("{existing}{value}");
            current.attrs.insert(payload.attr.to_string(), AttrValue::Str(joined));
            return Ok(());
        }

        if self.in_block_context() {
            if text.trim().is_empty() {
                return Ok(());
            }
            self.ensure_inline()?;
        }

        let code = schema
            .node_spec(&self.current().node_type)
            .is_some_and(|spec| spec.content == ContentModel::Text);
        let marks = if code { Vec::new() } else { self.marks(marks) };
        self.current().content.push(Node::text(text).with_marks(marks));
        Ok(())
    }

    /// Append a complete node. Inline nodes pick up the open marks.
    pub fn add_node(&mut self, mut node: Node) -> Result<(), Malformed> {
        if self.schema.is_inline(&node) {
            self.ensure_inline()?;
            node.marks = self.marks(&node.marks);
        } else {
            self.close_implicit()?;
        }
        let node = self.finalize(node)?;
        self.current().content.push(node);
        Ok(())
    }

    /// Whether the innermost node holds blocks rather than inline content.
    pub fn in_block_context(&self) -> bool {
        self.current_spec_content()
            .is_some_and(|content| matches!(content, ContentModel::Blocks | ContentModel::ListItems))
    }

    /// Close implicit frames and return the document.
    pub fn finish(mut self) -> Result<Node, Malformed> {
        self.close_implicit()?;
        if self.stack.len() > 1 {
            return Err(Malformed::Unclosed(self.stack.len() - 1));
        }
        match self.stack.pop() {
            Some(Frame::Node { node, .. }) => self.finalize(node),
            _ => Err(Malformed::Unclosed(0)),
        }
    }

    fn current(&mut self) -> &mut Node {
        let index = self
            .stack
            .iter()
            .rposition(|frame| matches!(frame, Frame::Node { .. }))
            .unwrap_or(0);
        match &mut self.stack[index] {
            Frame::Node { node, .. } => node,
            // The bottom frame is always the document node.
            _ => unreachable!("document frame missing"),
        }
    }

    fn current_spec_content(&self) -> Option<ContentModel> {
        self.stack.iter().rev().find_map(|frame| match frame {
            Frame::Node { node, .. } => self.schema.node_spec(&node.node_type).map(|s| s.content),
            _ => None,
        })
    }

    fn marks(&self, extra: &[Mark]) -> Vec<Mark> {
        let mut marks: Vec<Mark> = self
            .stack
            .iter()
            .filter_map(|frame| match frame {
                Frame::Mark { mark, .. } => Some(mark.clone()),
                _ => None,
            })
            .chain(extra.iter().cloned())
            .collect();
        self.schema.normalize_marks(&mut marks);
        marks
    }

    /// Open implicit containers until inline content is allowed. They go
    /// directly above the innermost node frame, so mark frames opened before
    /// the content stay open above them.
    fn ensure_inline(&mut self) -> Result<(), Malformed> {
        loop {
            let implicit = match self.current_spec_content() {
                Some(ContentModel::Blocks) => "paragraph",
                Some(ContentModel::ListItems) => "list_item",
                _ => return Ok(()),
            };
            let at = self
                .stack
                .iter()
                .rposition(|frame| matches!(frame, Frame::Node { .. }))
                .map_or(self.stack.len(), |index| index + 1);
            self.stack.insert(at, Frame::Node {
                node: Node::new(implicit),
                implicit: true,
                opened_by: String::new(),
            });
        }
    }

    fn close_implicit(&mut self) -> Result<(), Malformed> {
        while self.stack.last().is_some_and(Frame::is_implicit) {
            self.pop()?;
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Malformed> {
        if let Some(Frame::Node { node, .. }) = self.stack.pop() {
            let node = self.finalize(node)?;
            self.current().content.push(node);
        }
        Ok(())
    }

    fn finalize(&self, mut node: Node) -> Result<Node, Malformed> {
        if node.is_text() {
            return Ok(node);
        }
        let spec = self
            .schema
            .node_spec(&node.node_type)
            .ok_or_else(|| Malformed::UnknownNodeType(node.node_type.clone()))?;
        node.attrs = spec
            .resolve_attrs(&node.attrs)
            .map_err(|attr| Malformed::MissingAttribute {
                node: node.node_type.clone(),
                attr: attr.to_string(),
            })?;

        match spec.content {
            ContentModel::Blocks if node.content.is_empty() => {
                node.content.push(Node::new("paragraph"));
            }
            ContentModel::ListItems if node.content.is_empty() => {
                node.content
                    .push(Node::new("list_item").with_content(vec![Node::new("paragraph")]));
            }
            ContentModel::Inline | ContentModel::Text => {
                node.content = normalize_inline(std::mem::take(&mut node.content));
            }
            _ => {}
        }

        if let Some(child) = node
            .content
            .iter()
            .find(|child| !self.schema.allows(&node.node_type, child))
        {
            return Err(Malformed::InvalidContent {
                parent: node.node_type.clone(),
                child: child.node_type.clone(),
            });
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::with_defaults()
    }

    #[test]
    fn builds_nested_blocks() {
        let schema = schema();
        let mut builder = DocumentBuilder::new(&schema);
        builder.open_node("blockquote", Attrs::new(), "blockquote").unwrap();
        builder.open_node("paragraph", Attrs::new(), "paragraph").unwrap();
        builder.add_text("Hi", &[]).unwrap();
        builder.close("paragraph").unwrap();
        builder.close("blockquote").unwrap();
        let doc = builder.finish().unwrap();
        assert_eq!(
            doc,
            Node::new("doc").with_content(vec![Node::new("blockquote").with_content(vec![
                Node::new("paragraph").with_content(vec![Node::text("Hi")])
            ])])
        );
    }

    #[test]
    fn wraps_loose_inline_content() {
        let schema = schema();
        let mut builder = DocumentBuilder::new(&schema);
        builder.add_text("  \n", &[]).unwrap();
        builder.add_text("Hi", &[]).unwrap();
        builder.open_node("horizontal_rule", Attrs::new(), "hr").unwrap();
        builder.close("hr").unwrap();
        let doc = builder.finish().unwrap();
        let types: Vec<_> = doc.content.iter().map(|n| n.node_type.as_str()).collect();
        assert_eq!(types, vec!["paragraph", "horizontal_rule"]);
    }

    #[test]
    fn leading_mark_stays_in_one_implicit_paragraph() {
        let schema = schema();
        let mut builder = DocumentBuilder::new(&schema);
        builder.open_node("blockquote", Attrs::new(), "blockquote").unwrap();
        builder.open_mark(Mark::new("strong"), "b");
        builder.add_text("x", &[]).unwrap();
        builder.close("b").unwrap();
        builder.add_text(" y", &[]).unwrap();
        builder.close("blockquote").unwrap();
        let doc = builder.finish().unwrap();
        assert_eq!(
            doc.content[0].content,
            vec![Node::new("paragraph").with_content(vec![
                Node::text("x").with_marks(vec![Mark::new("strong")]),
                Node::text(" y"),
            ])]
        );
    }

    #[test]
    fn atom_text_becomes_payload() {
        let schema = schema();
        let mut builder = DocumentBuilder::new(&schema);
        builder.open_node("paragraph", Attrs::new(), "paragraph").unwrap();
        builder.open_mark(Mark::new("strong"), "strong");
        builder.open_node("mention", Attrs::new(), "mention").unwrap();
        builder.add_text("@bob", &[]).unwrap();
        builder.close("mention").unwrap();
        builder.close("strong").unwrap();
        builder.close("paragraph").unwrap();
        let doc = builder.finish().unwrap();
        assert_eq!(
            doc.content[0].content,
            vec![Node::new("mention")
                .with_attr("name", "bob")
                .with_marks(vec![Mark::new("strong")])]
        );
    }

    #[test]
    fn unbalanced_streams_are_malformed() {
        let schema = schema();
        let mut builder = DocumentBuilder::new(&schema);
        assert_eq!(
            builder.close("paragraph"),
            Err(Malformed::UnexpectedClose {
                found: "paragraph".into()
            })
        );

        builder.open_node("paragraph", Attrs::new(), "paragraph").unwrap();
        assert!(matches!(
            builder.close("heading"),
            Err(Malformed::MismatchedClose { .. })
        ));
        assert_eq!(builder.finish(), Err(Malformed::Unclosed(1)));
    }

    #[test]
    fn missing_payload_is_reported() {
        let schema = schema();
        let mut builder = DocumentBuilder::new(&schema);
        builder.open_node("paragraph", Attrs::new(), "p").unwrap();
        builder.open_node("hashtag", Attrs::new(), "span").unwrap();
        assert_eq!(
            builder.close("span"),
            Err(Malformed::MissingAttribute {
                node: "hashtag".into(),
                attr: "name".into()
            })
        );
    }

    #[test]
    fn empty_containers_get_a_paragraph() {
        let schema = schema();
        let doc = DocumentBuilder::new(&schema).finish().unwrap();
        assert_eq!(doc, Node::new("doc").with_content(vec![Node::new("paragraph")]));
    }
}
