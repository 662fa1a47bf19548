//! HTML rendering (document → DOM → HTML)
//!
//! Pipeline: document → RcDom → HTML string
//!
//! Extension nodes and marks are rendered by their descriptor's DOM
//! construction function. Core nodes use the generic mapping below, which is
//! the inverse of the import mapping in [`super::parser`].

use crate::error::ExportError;
use crate::extension::DomOutput;
use crate::model::{AttrValue, Mark, Node};
use crate::schema::Schema;
use html5ever::{
    ns, serialize, serialize::SerializeOpts, serialize::TraversalScope, Attribute, LocalName,
    QualName,
};
use markup5ever_rcdom::{Handle, Node as DomNode, NodeData, SerializableHandle};
use std::cell::{Cell, RefCell};
use std::default::Default;
use std::rc::Rc;

/// Render a document to an HTML fragment (the blocks, without a wrapper).
pub fn render_html(schema: &Schema, doc: &Node) -> Result<String, ExportError> {
    let container = create_element("div", Vec::new());
    for block in &doc.content {
        render_node(schema, block, &container)?;
    }
    serialize_children(&container)
}

/// Render one node, without its marks.
pub(crate) fn render_node_html(schema: &Schema, node: &Node) -> Result<String, ExportError> {
    let container = create_element("div", Vec::new());
    let mut bare = node.clone();
    bare.marks.clear();
    render_node(schema, &bare, &container)?;
    serialize_children(&container)
}

fn render_node(schema: &Schema, node: &Node, parent: &Handle) -> Result<(), ExportError> {
    if let Some(text) = &node.text {
        return render_text(schema, text, &node.marks, parent);
    }

    let output = match schema.extension_for(&node.node_type) {
        Some(extension) => extension
            .to_dom(node)
            .ok_or_else(|| ExportError::UnknownNodeType(node.node_type.clone()))?,
        None => core_dom(node)?,
    };

    // Inline nodes other than text carry their marks as wrappers.
    let target = wrap_marks(schema, &node.marks, parent)?;
    build(&output, &target, &mut |hole| {
        for child in &node.content {
            render_node(schema, child, hole)?;
        }
        Ok(())
    })
}

fn render_text(schema: &Schema, text: &str, marks: &[Mark], parent: &Handle) -> Result<(), ExportError> {
    let target = wrap_marks(schema, marks, parent)?;
    append(&target, create_text(text));
    Ok(())
}

/// Nest one element per mark, outermost first, and return the innermost.
fn wrap_marks(schema: &Schema, marks: &[Mark], parent: &Handle) -> Result<Handle, ExportError> {
    let mut target = parent.clone();
    for mark in marks {
        let output = match schema.extension_for(&mark.mark_type) {
            Some(extension) => extension
                .mark_to_dom(mark)
                .ok_or_else(|| ExportError::UnknownNodeType(mark.mark_type.clone()))?,
            None => core_mark_dom(mark)?,
        };
        let mut inner = None;
        build(&output, &target, &mut |hole| {
            inner = Some(hole.clone());
            Ok(())
        })?;
        target = inner.unwrap_or(target);
    }
    Ok(target)
}

/// Materialize a DOM description under `parent`. `fill` is called with the
/// element holding the hole.
fn build(
    output: &DomOutput,
    parent: &Handle,
    fill: &mut dyn FnMut(&Handle) -> Result<(), ExportError>,
) -> Result<(), ExportError> {
    match output {
        DomOutput::Element {
            tag,
            attrs,
            children,
        } => {
            let element = create_element(
                tag,
                attrs
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect(),
            );
            append(parent, element.clone());
            for child in children {
                build(child, &element, fill)?;
            }
            Ok(())
        }
        DomOutput::Text(text) => {
            append(parent, create_text(text));
            Ok(())
        }
        DomOutput::Hole => fill(parent),
    }
}

fn core_dom(node: &Node) -> Result<DomOutput, ExportError> {
    let hole = || vec![DomOutput::Hole];
    let output = match node.node_type.as_str() {
        "paragraph" => DomOutput::element("p", Vec::new(), hole()),
        "heading" => {
            let tag = match node.attr("level").and_then(AttrValue::as_int) {
                Some(2) => "h2",
                Some(3) => "h3",
                Some(4) => "h4",
                Some(5) => "h5",
                Some(level) if level >= 6 => "h6",
                _ => "h1",
            };
            DomOutput::element(tag, Vec::new(), hole())
        }
        "blockquote" => DomOutput::element("blockquote", Vec::new(), hole()),
        "code_block" => {
            let attrs = match node.attr_str("params") {
                Some(params) if !params.is_empty() => vec![("class", format!("lang-{params}"))],
                _ => Vec::new(),
            };
            DomOutput::element("pre", Vec::new(), vec![DomOutput::element("code", attrs, hole())])
        }
        "horizontal_rule" => DomOutput::element("hr", Vec::new(), Vec::new()),
        "bullet_list" => DomOutput::element("ul", Vec::new(), hole()),
        "ordered_list" => {
            let attrs = match node.attr("order").and_then(AttrValue::as_int) {
                Some(order) if order != 1 => vec![("start", order.to_string())],
                _ => Vec::new(),
            };
            DomOutput::element("ol", attrs, hole())
        }
        "list_item" => DomOutput::element("li", Vec::new(), hole()),
        "image" => {
            let attrs = ["src", "alt", "title"]
                .into_iter()
                .filter_map(|name| node.attr_str(name).map(|value| (name, value.to_string())))
                .collect();
            DomOutput::element("img", attrs, Vec::new())
        }
        "hard_break" => DomOutput::element("br", Vec::new(), Vec::new()),
        other => return Err(ExportError::UnknownNodeType(other.to_string())),
    };
    Ok(output)
}

fn core_mark_dom(mark: &Mark) -> Result<DomOutput, ExportError> {
    let hole = vec![DomOutput::Hole];
    let output = match mark.mark_type.as_str() {
        "em" => DomOutput::element("em", Vec::new(), hole),
        "strong" => DomOutput::element("strong", Vec::new(), hole),
        "code" => DomOutput::element("code", Vec::new(), hole),
        "link" => {
            let attrs = ["href", "title"]
                .into_iter()
                .filter_map(|name| {
                    mark.attrs
                        .get(name)
                        .and_then(AttrValue::as_str)
                        .map(|value| (name, value.to_string()))
                })
                .collect();
            DomOutput::element("a", attrs, hole)
        }
        other => return Err(ExportError::UnknownNodeType(other.to_string())),
    };
    Ok(output)
}

fn append(parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child);
}

/// Create an HTML element with attributes
fn create_element(tag: &str, attrs: Vec<(&str, &str)>) -> Handle {
    let qual_name = QualName::new(None, ns!(html), LocalName::from(tag));
    let attributes = attrs
        .into_iter()
        .map(|(name, value)| Attribute {
            name: QualName::new(None, ns!(), LocalName::from(name)),
            value: value.to_string().into(),
        })
        .collect();

    Rc::new(DomNode {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Element {
            name: qual_name,
            attrs: RefCell::new(attributes),
            template_contents: Default::default(),
            mathml_annotation_xml_integration_point: false,
        },
    })
}

/// Create a text node
fn create_text(text: &str) -> Handle {
    Rc::new(DomNode {
        parent: Cell::new(None),
        children: RefCell::new(Vec::new()),
        data: NodeData::Text {
            contents: RefCell::new(text.to_string().into()),
        },
    })
}

/// Serialize the children of `container` (the container itself is not written)
fn serialize_children(container: &Handle) -> Result<String, ExportError> {
    let mut output = Vec::new();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };

    for child in container.children.borrow().iter() {
        let serializable = SerializableHandle::from(child.clone());
        serialize(&mut output, &serializable, opts.clone())
            .map_err(|e| ExportError::Html(format!("HTML serialization failed: {e}")))?;
    }

    String::from_utf8(output).map_err(|e| ExportError::Html(format!("UTF-8 conversion failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::emoji;

    fn schema() -> Schema {
        Schema::with_defaults()
    }

    fn paragraph(content: Vec<Node>) -> Node {
        Node::new("doc").with_content(vec![Node::new("paragraph").with_content(content)])
    }

    #[test]
    fn renders_extension_atoms() {
        let doc = paragraph(vec![
            Node::text("hi "),
            Node::new("hashtag").with_attr("name", "topic"),
            Node::text(" "),
            emoji("smile"),
        ]);
        insta::assert_snapshot!(
            render_html(&schema(), &doc).unwrap(),
            @r#"<p>hi <a class="hashtag-cooked" data-name="topic">#topic</a> <img class="emoji" alt=":smile:" data-code="smile"></p>"#
        );
    }

    #[test]
    fn renders_marks_outermost_first() {
        let doc = paragraph(vec![Node::text("x").with_marks(vec![
            Mark::new("em"),
            Mark::new("link").with_attr("href", "/t/1"),
        ])]);
        insta::assert_snapshot!(
            render_html(&schema(), &doc).unwrap(),
            @r#"<p><em><a href="/t/1">x</a></em></p>"#
        );
    }

    #[test]
    fn renders_code_block_language() {
        let doc = Node::new("doc").with_content(vec![Node::new("code_block")
            .with_attr("params", "rust")
            .with_content(vec![Node::text("let a = 1 < 2;")])]);
        insta::assert_snapshot!(
            render_html(&schema(), &doc).unwrap(),
            @r#"<pre><code class="lang-rust">let a = 1 &lt; 2;</code></pre>"#
        );
    }

    #[test]
    fn unknown_node_type_is_an_error() {
        let doc = Node::new("doc").with_content(vec![Node::new("table")]);
        assert_eq!(
            render_html(&schema(), &doc),
            Err(ExportError::UnknownNodeType("table".into()))
        );
    }
}
