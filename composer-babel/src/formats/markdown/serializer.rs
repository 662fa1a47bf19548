//! Markdown export (document → markdown)
//!
//! Pipeline: Document → Comrak AST → Markdown string
//!
//! Core nodes map onto Comrak nodes and are formatted by Comrak's CommonMark
//! writer. Nodes contributed by extensions are written by the extension's
//! serializer into a [`MarkdownWriter`] and embedded verbatim: inline atoms as
//! raw inline HTML, block containers as raw HTML blocks, so Comrak never
//! escapes them.
//!
//! The writer tells the extension where the node sits ([`WriteContext`]).
//! Atoms whose markdown form would read back differently there (`#tag`
//! followed by a letter, a name the trigger grammar cannot hold, anything
//! inside a link) are written as their HTML instead, and so are quotes inside
//! lists or blockquotes, where BBCode lines are not recognized.
//!
//! Marks are opened in schema rank order. A mark that is still present on the
//! next inline node stays open, so `**a *b***` keeps one strong node around
//! both runs. Inline code is always innermost and becomes a code span.

use super::default_comrak_options;
use crate::error::ExportError;
use crate::formats::html::serializer::render_node_html;
use crate::formats::markdown::tokenizer::trigger_sigils;
use crate::model::{Mark, Node};
use crate::schema::Schema;
use comrak::nodes::{
    Ast, AstNode, ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeLink, NodeList, NodeValue,
};
use comrak::{format_commonmark, Arena};
use std::cell::RefCell;

/// Where an extension node is being written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteContext {
    /// Inside a list item or blockquote rather than at the top level.
    pub nested: bool,
    /// The output before the node does not end in whitespace.
    pub glued_before: bool,
    /// The output after the node starts with a word character or `-`.
    pub glued_after: bool,
    pub in_link: bool,
}

impl WriteContext {
    /// Whether a sigil construct (`#name`, `@name`, `:code:`) is recognized
    /// here on import.
    pub fn delimited(&self) -> bool {
        !self.glued_before && !self.glued_after && !self.in_link
    }

    fn inline(content: &[Node], index: usize) -> Self {
        let glued_before = index
            .checked_sub(1)
            .and_then(|prev| content.get(prev))
            .is_some_and(|prev| match &prev.text {
                Some(text) if !prev.has_mark("code") => !text.ends_with(char::is_whitespace),
                Some(_) => true,
                None => !prev.is("hard_break"),
            });
        let glued_after = content.get(index + 1).is_some_and(|next| match &next.text {
            Some(text) if !next.has_mark("code") => {
                text.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == '-')
            }
            _ => false,
        });
        WriteContext {
            nested: false,
            glued_before,
            glued_after,
            in_link: content[index].has_mark("link"),
        }
    }
}

/// Sink handed to extension serializers.
pub struct MarkdownWriter<'a> {
    schema: &'a Schema,
    context: WriteContext,
    out: String,
}

impl<'a> MarkdownWriter<'a> {
    pub(crate) fn new(schema: &'a Schema, context: WriteContext) -> Self {
        MarkdownWriter {
            schema,
            context,
            out: String::new(),
        }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn context(&self) -> WriteContext {
        self.context
    }

    /// Write literal markdown.
    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }

    /// Write a node, without its marks, as HTML.
    pub fn write_html(&mut self, node: &Node) -> Result<(), ExportError> {
        let html = render_node_html(self.schema, node)?;
        self.out.push_str(&html);
        Ok(())
    }

    /// Write `plain` if it reads back as `node` here, the node's HTML otherwise.
    /// `grammatical` says whether the node's name survives the trigger grammar.
    pub fn write_atom(&mut self, node: &Node, plain: &str, grammatical: bool) -> Result<(), ExportError> {
        if grammatical && self.context.delimited() {
            self.write(plain);
            Ok(())
        } else {
            self.write_html(node)
        }
    }

    /// Write block children as markdown, without a trailing newline.
    pub fn write_blocks(&mut self, blocks: &[Node]) -> Result<(), ExportError> {
        let doc = Node::new("doc").with_content(blocks.to_vec());
        let markdown = export_markdown(self.schema, &doc)?;
        self.out.push_str(markdown.trim_end_matches('\n'));
        Ok(())
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

/// Serialize a document to markdown.
pub fn export_markdown(schema: &Schema, doc: &Node) -> Result<String, ExportError> {
    let arena = Arena::new();
    let root = alloc(&arena, NodeValue::Document);
    for block in &doc.content {
        block_to_ast(schema, &arena, root, block, false)?;
    }

    let mut output = Vec::new();
    format_commonmark(root, &default_comrak_options(), &mut output)
        .map_err(|e| ExportError::Markdown(format!("comrak formatting failed: {e}")))?;
    String::from_utf8(output)
        .map_err(|e| ExportError::Markdown(format!("UTF-8 conversion failed: {e}")))
}

fn alloc<'a>(arena: &'a Arena<AstNode<'a>>, value: NodeValue) -> &'a AstNode<'a> {
    arena.alloc(AstNode::new(RefCell::new(Ast::new(value, (0, 0).into()))))
}

fn append<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, value: NodeValue) -> &'a AstNode<'a> {
    let node = alloc(arena, value);
    parent.append(node);
    node
}

/// Output of an extension's serializer for a node.
fn extension_markdown(
    schema: &Schema,
    node: &Node,
    context: WriteContext,
) -> Result<Option<String>, ExportError> {
    let Some(extension) = schema.extension_for(&node.node_type) else {
        return Ok(None);
    };
    let mut writer = MarkdownWriter::new(schema, context);
    extension.serialize_node(node, &mut writer)?;
    Ok(Some(writer.finish()))
}

fn list_value(node: &Node) -> NodeList {
    let ordered = node.is("ordered_list");
    let tight = node.content.iter().all(|item| item.content.len() <= 1);
    NodeList {
        list_type: if ordered {
            ListType::Ordered
        } else {
            ListType::Bullet
        },
        marker_offset: 0,
        padding: 0,
        start: node
            .attr("order")
            .and_then(|order| order.as_int())
            .and_then(|order| usize::try_from(order).ok())
            .unwrap_or(1),
        delimiter: ListDelimType::Period,
        bullet_char: b'-',
        tight,
    }
}

fn block_to_ast<'a>(
    schema: &Schema,
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    node: &Node,
    nested: bool,
) -> Result<(), ExportError> {
    let context = WriteContext {
        nested,
        ..WriteContext::default()
    };
    if let Some(literal) = extension_markdown(schema, node, context)? {
        append(
            arena,
            parent,
            NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: format!("{literal}\n"),
            }),
        );
        return Ok(());
    }

    match node.node_type.as_str() {
        "paragraph" => {
            let paragraph = append(arena, parent, NodeValue::Paragraph);
            inline_to_ast(schema, arena, paragraph, &node.content)?;
        }
        "heading" => {
            let level = node
                .attr("level")
                .and_then(|level| level.as_int())
                .unwrap_or(1)
                .clamp(1, 6) as u8;
            let heading = append(
                arena,
                parent,
                NodeValue::Heading(NodeHeading {
                    level,
                    setext: false,
                }),
            );
            inline_to_ast(schema, arena, heading, &node.content)?;
        }
        "blockquote" => {
            let quote = append(arena, parent, NodeValue::BlockQuote);
            for child in &node.content {
                block_to_ast(schema, arena, quote, child, true)?;
            }
        }
        "code_block" => {
            let mut literal = node.text_content();
            if !literal.is_empty() {
                literal.push('\n');
            }
            append(
                arena,
                parent,
                NodeValue::CodeBlock(NodeCodeBlock {
                    fenced: true,
                    fence_char: b'`',
                    fence_length: 3,
                    fence_offset: 0,
                    info: node.attr_str("params").unwrap_or_default().to_string(),
                    literal,
                }),
            );
        }
        "horizontal_rule" => {
            append(arena, parent, NodeValue::ThematicBreak);
        }
        "bullet_list" | "ordered_list" => {
            let value = list_value(node);
            let list = append(arena, parent, NodeValue::List(value));
            for item in &node.content {
                let item_node = append(arena, list, NodeValue::Item(value));
                for child in &item.content {
                    block_to_ast(schema, arena, item_node, child, true)?;
                }
            }
        }
        other => return Err(ExportError::UnknownNodeType(other.to_string())),
    }
    Ok(())
}

fn text_to_ast<'a>(arena: &'a Arena<AstNode<'a>>, parent: &'a AstNode<'a>, text: &str) {
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            append(arena, parent, NodeValue::SoftBreak);
        }
        if !line.is_empty() {
            append(arena, parent, NodeValue::Text(line.to_string()));
        }
    }
}

/// A mark that is open while writing inline content.
enum OpenMark<'a> {
    /// Rendered as a Comrak container node.
    Node(&'a AstNode<'a>),
    /// Rendered as literal delimiters; holds the closing one.
    Delimited(String),
}

fn innermost<'a>(open: &[(Mark, OpenMark<'a>)], block: &'a AstNode<'a>) -> &'a AstNode<'a> {
    open.iter()
        .rev()
        .find_map(|(_, opened)| match opened {
            OpenMark::Node(node) => Some(*node),
            OpenMark::Delimited(_) => None,
        })
        .unwrap_or(block)
}

fn inline_to_ast<'a>(
    schema: &Schema,
    arena: &'a Arena<AstNode<'a>>,
    block: &'a AstNode<'a>,
    content: &[Node],
) -> Result<(), ExportError> {
    let mut open: Vec<(Mark, OpenMark<'a>)> = Vec::new();
    let current = |open: &Vec<(Mark, OpenMark<'a>)>| innermost(open, block);

    for (index, node) in content.iter().enumerate() {
        let marks: Vec<_> = node
            .marks
            .iter()
            .filter(|mark| mark.mark_type != "code")
            .collect();

        let keep = open
            .iter()
            .take_while(|(mark, _)| marks.contains(&mark))
            .count();
        while open.len() > keep {
            if let Some((_, OpenMark::Delimited(close))) = open.pop() {
                append(arena, current(&open), NodeValue::HtmlInline(close));
            }
        }

        for mark in marks {
            if open.iter().any(|(opened, _)| opened == mark) {
                continue;
            }
            let parent = current(&open);
            let opened = match mark.mark_type.as_str() {
                "em" => OpenMark::Node(append(arena, parent, NodeValue::Emph)),
                "strong" => OpenMark::Node(append(arena, parent, NodeValue::Strong)),
                "link" => OpenMark::Node(append(
                    arena,
                    parent,
                    NodeValue::Link(NodeLink {
                        url: mark
                            .attrs
                            .get("href")
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                        title: mark
                            .attrs
                            .get("title")
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                    }),
                )),
                other => {
                    let (start, end) = schema
                        .extension_for(other)
                        .and_then(|extension| extension.mark_delimiters(mark))
                        .ok_or_else(|| ExportError::UnknownNodeType(other.to_string()))?;
                    append(arena, parent, NodeValue::HtmlInline(start));
                    OpenMark::Delimited(end)
                }
            };
            open.push((mark.clone(), opened));
        }

        let parent = current(&open);
        inline_node_to_ast(schema, arena, parent, node, WriteContext::inline(content, index))?;
    }

    while let Some((_, opened)) = open.pop() {
        if let OpenMark::Delimited(close) = opened {
            append(arena, current(&open), NodeValue::HtmlInline(close));
        }
    }
    Ok(())
}

fn inline_node_to_ast<'a>(
    schema: &Schema,
    arena: &'a Arena<AstNode<'a>>,
    parent: &'a AstNode<'a>,
    node: &Node,
    context: WriteContext,
) -> Result<(), ExportError> {
    if let Some(text) = &node.text {
        if node.has_mark("code") {
            append(
                arena,
                parent,
                NodeValue::Code(NodeCode {
                    num_backticks: 1,
                    literal: text.clone(),
                }),
            );
            return Ok(());
        }
        // Plain text that would scan as an atom gets its sigil escaped.
        let escapes = if context.in_link {
            Vec::new()
        } else {
            trigger_sigils(text, !context.glued_before)
        };
        let mut start = 0;
        for at in escapes {
            text_to_ast(arena, parent, &text[start..at]);
            append(arena, parent, NodeValue::HtmlInline(format!("\\{}", &text[at..at + 1])));
            start = at + 1;
        }
        text_to_ast(arena, parent, &text[start..]);
        return Ok(());
    }

    if let Some(literal) = extension_markdown(schema, node, context)? {
        append(arena, parent, NodeValue::HtmlInline(literal));
        return Ok(());
    }

    match node.node_type.as_str() {
        "hard_break" => {
            append(arena, parent, NodeValue::LineBreak);
        }
        "image" => {
            let image = append(
                arena,
                parent,
                NodeValue::Image(NodeLink {
                    url: node.attr_str("src").unwrap_or_default().to_string(),
                    title: node.attr_str("title").unwrap_or_default().to_string(),
                }),
            );
            if let Some(alt) = node.attr_str("alt").filter(|alt| !alt.is_empty()) {
                append(arena, image, NodeValue::Text(alt.to_string()));
            }
        }
        other => return Err(ExportError::UnknownNodeType(other.to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(content: Vec<Node>) -> Node {
        Node::new("doc").with_content(vec![Node::new("paragraph").with_content(content)])
    }

    #[test]
    fn atoms_are_written_raw() {
        let schema = Schema::with_defaults();
        let doc = paragraph(vec![
            Node::text("see "),
            Node::new("hashtag").with_attr("name", "topic"),
            Node::text(" and "),
            Node::new("mention").with_attr("name", "bob"),
        ]);
        assert_eq!(export_markdown(&schema, &doc).unwrap(), "see #topic and @bob\n");
    }

    #[test]
    fn glued_or_odd_atoms_are_written_as_html() {
        let schema = Schema::with_defaults();
        let doc = paragraph(vec![
            Node::new("mention").with_attr("name", "bob"),
            Node::text("x"),
        ]);
        assert_eq!(
            export_markdown(&schema, &doc).unwrap(),
            "<a class=\"mention\" data-name=\"bob\">@bob</a>x\n"
        );

        let doc = paragraph(vec![
            Node::text("a"),
            Node::new("hashtag").with_attr("name", "b"),
            Node::text(" and "),
            Node::new("hashtag").with_attr("name", "c d"),
        ]);
        assert_eq!(
            export_markdown(&schema, &doc).unwrap(),
            "a<a class=\"hashtag-cooked\" data-name=\"b\">#b</a> and <a class=\"hashtag-cooked\" data-name=\"c d\">#c d</a>\n"
        );
    }

    #[test]
    fn trigger_like_text_is_escaped() {
        let schema = Schema::with_defaults();
        let doc = paragraph(vec![Node::text("say @bob :x: now")]);
        assert_eq!(
            export_markdown(&schema, &doc).unwrap(),
            "say \\@bob \\:x: now\n"
        );

        let doc = paragraph(vec![
            Node::text("a"),
            Node::text("@b").with_marks(vec![Mark::new("code")]),
            Node::text("@c"),
        ]);
        assert_eq!(export_markdown(&schema, &doc).unwrap(), "a`@b`@c\n");

        let doc = paragraph(vec![Node::text("#topic and C#")]);
        let markdown = export_markdown(&schema, &doc).unwrap();
        assert!(markdown.starts_with("\\#topic"), "{markdown}");
    }

    #[test]
    fn inline_context_looks_at_neighbours() {
        let link = Mark::new("link").with_attr("href", "/u");
        let content = vec![
            Node::text("a "),
            Node::new("mention").with_attr("name", "x"),
            Node::text("-b"),
            Node::new("hard_break"),
            Node::new("mention").with_attr("name", "y").with_marks(vec![link]),
            Node::text("z").with_marks(vec![Mark::new("code")]),
        ];
        let x = WriteContext::inline(&content, 1);
        assert!(!x.glued_before && x.glued_after && !x.delimited());
        let y = WriteContext::inline(&content, 4);
        assert!(!y.glued_before && !y.glued_after && y.in_link);
        assert!(WriteContext::inline(&content, 0).delimited());
    }

    #[test]
    fn quotes_below_the_top_level_are_written_as_html() {
        let schema = Schema::with_defaults();
        let quote = Node::new("quote")
            .with_attr("username", "sam")
            .with_content(vec![Node::new("paragraph").with_content(vec![Node::text("Hi")])]);
        let doc = Node::new("doc").with_content(vec![
            Node::new("blockquote").with_content(vec![quote.clone()]),
            quote,
        ]);
        let markdown = export_markdown(&schema, &doc).unwrap();
        assert!(markdown.starts_with("> <aside class=\"quote\" data-username=\"sam\""), "{markdown}");
        assert_eq!(markdown.matches("[quote=\"sam\"]").count(), 1);
    }

    #[test]
    fn shared_marks_stay_open() {
        let schema = Schema::with_defaults();
        let doc = paragraph(vec![
            Node::text("a").with_marks(vec![Mark::new("strong")]),
            Node::text("b").with_marks(vec![Mark::new("em"), Mark::new("strong")]),
        ]);
        let markdown = export_markdown(&schema, &doc).unwrap();
        assert_eq!(markdown.matches("**").count(), 2);
    }

    #[test]
    fn extension_marks_use_delimiters() {
        let schema = Schema::with_defaults();
        let doc = paragraph(vec![
            Node::text("gone").with_marks(vec![Mark::new("strikethrough")]),
        ]);
        assert_eq!(export_markdown(&schema, &doc).unwrap(), "~~gone~~\n");
    }

    #[test]
    fn unknown_types_are_rejected() {
        let schema = Schema::with_defaults();
        let doc = Node::new("doc").with_content(vec![Node::new("widget")]);
        assert_eq!(
            export_markdown(&schema, &doc),
            Err(ExportError::UnknownNodeType("widget".into()))
        );
    }
}
