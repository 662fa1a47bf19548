//! HTML import (DOM → document)
//!
//! Pipeline: HTML string → RcDom (html5ever) → builder instructions → document
//!
//! Every element is first offered to the schema's DOM rules in registration
//! order. The first rule that matches decides the node or mark type and where
//! its content comes from. Elements no rule claims fall back to the generic
//! mapping of core nodes below; anything else is transparent (its children
//! are imported in its place).
//!
//! | Element                   | Result                                  |
//! |---------------------------|-----------------------------------------|
//! | `p`                       | paragraph                               |
//! | `h1` .. `h6`              | heading with level                      |
//! | `blockquote`              | blockquote                              |
//! | `ul` / `ol[start]`        | bullet_list / ordered_list with order   |
//! | `li`                      | list_item                               |
//! | `pre`                     | code_block, params from `lang-*` class  |
//! | `hr` / `br`               | horizontal_rule / hard_break            |
//! | `img[src]`                | image                                   |
//! | `em`, `i` / `strong`, `b` | em / strong mark                        |
//! | `a[href]`                 | link mark                               |
//! | `code`                    | code mark                               |
//!
//! Comments, `script`, `style` and `template` content are dropped, and so is
//! whitespace-only text at the start or end of a block element.

use crate::common::builder::DocumentBuilder;
use crate::error::ImportError;
use crate::extension::{DomContent, DomElement};
use crate::model::{AttrValue, Attrs, Mark, Node};
use crate::schema::Schema;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const SKIPPED: [&str; 4] = ["script", "style", "template", "head"];
const INLINE_TAGS: [&str; 14] = [
    "a", "abbr", "b", "code", "del", "em", "i", "kbd", "s", "small", "span", "strike", "strong", "u",
];

/// Parse an HTML fragment into a document.
pub fn parse_html(schema: &Schema, html: &str) -> Result<Node, ImportError> {
    let mut builder = DocumentBuilder::new(schema);
    import_fragment(&mut builder, html)?;
    Ok(builder.finish()?)
}

/// Import an HTML fragment at the builder's current position.
pub(crate) fn import_fragment(builder: &mut DocumentBuilder<'_>, html: &str) -> Result<(), ImportError> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    match find_element(&dom.document, "body") {
        Some(body) => walk_children(builder, &body),
        None => Ok(()),
    }
}

/// Import inline HTML whose elements are all claimed by DOM rules for inline
/// types. Returns `false`, importing nothing, for anything else.
pub(crate) fn import_inline_fragment(
    builder: &mut DocumentBuilder<'_>,
    html: &str,
) -> Result<bool, ImportError> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let Some(body) = find_element(&dom.document, "body") else {
        return Ok(false);
    };
    let schema = builder.schema();
    let children = body.children.borrow();
    let claimed = |handle: &Handle| {
        dom_element(handle).is_some_and(|element| {
            schema.dom_rules().any(|(type_name, rule)| {
                rule.matches(&element).is_some()
                    && (schema.has_mark(type_name)
                        || schema.node_spec(type_name).is_some_and(|spec| spec.is_inline()))
            })
        })
    };
    let elements = children
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .count();
    if elements == 0 || !children.iter().all(|child| is_text(child) || claimed(child)) {
        return Ok(false);
    }
    for child in children.iter() {
        walk(builder, child)?;
    }
    Ok(true)
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name, .. } = &child.data {
            if &*name.local == tag {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_element(child, tag) {
            return Some(found);
        }
    }
    None
}

fn walk_children(builder: &mut DocumentBuilder<'_>, handle: &Handle) -> Result<(), ImportError> {
    let block = match &handle.data {
        NodeData::Element { name, .. } => !INLINE_TAGS.contains(&&*name.local),
        _ => true,
    };
    let children = handle.children.borrow();
    let last = children.len().saturating_sub(1);
    for (index, child) in children.iter().enumerate() {
        if block && (index == 0 || index == last) && is_blank(child) {
            continue;
        }
        walk(builder, child)?;
    }
    Ok(())
}

fn is_text(handle: &Handle) -> bool {
    matches!(handle.data, NodeData::Text { .. })
}

fn is_blank(handle: &Handle) -> bool {
    matches!(&handle.data, NodeData::Text { contents } if contents.borrow().trim().is_empty())
}

fn dom_element(handle: &Handle) -> Option<DomElement> {
    let NodeData::Element { name, attrs, .. } = &handle.data else {
        return None;
    };
    Some(DomElement {
        tag: name.local.to_string(),
        attrs: attrs
            .borrow()
            .iter()
            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
            .collect(),
    })
}

fn walk(builder: &mut DocumentBuilder<'_>, handle: &Handle) -> Result<(), ImportError> {
    match &handle.data {
        NodeData::Text { contents } => {
            builder.add_text(&contents.borrow(), &[])?;
            Ok(())
        }
        NodeData::Element { .. } => {
            let Some(element) = dom_element(handle) else {
                return Ok(());
            };
            if SKIPPED.contains(&element.tag.as_str()) {
                return Ok(());
            }
            if matched(builder, handle, &element)? {
                return Ok(());
            }
            element_default(builder, handle, &element)
        }
        _ => Ok(()),
    }
}

/// Offer the element to the schema's DOM rules. Returns whether one matched.
fn matched(
    builder: &mut DocumentBuilder<'_>,
    handle: &Handle,
    element: &DomElement,
) -> Result<bool, ImportError> {
    let schema = builder.schema();
    let Some((type_name, rule, attrs)) = schema
        .dom_rules()
        .find_map(|(type_name, rule)| rule.matches(element).map(|attrs| (type_name, rule, attrs)))
    else {
        return Ok(false);
    };
    tracing::debug!(tag = %element.tag, node = type_name, "dom rule matched");

    if schema.has_mark(type_name) {
        let mut mark = Mark::new(type_name);
        mark.attrs = attrs;
        builder.open_mark(mark, &element.tag);
        walk_children(builder, handle)?;
        builder.close(&element.tag)?;
        return Ok(true);
    }

    match rule.content {
        DomContent::Leaf => builder.add_node(Node::new(type_name).with_attrs(attrs))?,
        DomContent::Children => {
            builder.open_node(type_name, attrs, &element.tag)?;
            walk_children(builder, handle)?;
            builder.close(&element.tag)?;
        }
        DomContent::Element(content_tag) => {
            builder.open_node(type_name, attrs, &element.tag)?;
            if let Some(content) = find_element(handle, content_tag) {
                walk_children(builder, &content)?;
            }
            builder.close(&element.tag)?;
        }
    }
    Ok(true)
}

fn element_default(
    builder: &mut DocumentBuilder<'_>,
    handle: &Handle,
    element: &DomElement,
) -> Result<(), ImportError> {
    let tag = element.tag.as_str();
    let node = |builder: &mut DocumentBuilder<'_>, node_type: &str, attrs: Attrs| {
        builder.open_node(node_type, attrs, tag)?;
        walk_children(builder, handle)?;
        builder.close(tag)?;
        Ok::<(), ImportError>(())
    };
    let mark = |builder: &mut DocumentBuilder<'_>, mark: Mark| {
        builder.open_mark(mark, tag);
        walk_children(builder, handle)?;
        builder.close(tag)?;
        Ok::<(), ImportError>(())
    };

    match tag {
        "p" => node(builder, "paragraph", Attrs::new()),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<i64>().unwrap_or(1);
            node(builder, "heading", single("level", AttrValue::Int(level)))
        }
        "blockquote" => node(builder, "blockquote", Attrs::new()),
        "ul" => node(builder, "bullet_list", Attrs::new()),
        "ol" => {
            let order = element
                .attr("start")
                .and_then(|start| start.trim().parse::<i64>().ok())
                .unwrap_or(1);
            node(builder, "ordered_list", single("order", AttrValue::Int(order)))
        }
        "li" => node(builder, "list_item", Attrs::new()),
        "pre" => {
            let params = find_element(handle, "code")
                .and_then(|code| code_language(&code))
                .unwrap_or_default();
            let text = text_of(handle);
            let content = if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(text)]
            };
            let code = builder
                .schema()
                .node("code_block", single("params", AttrValue::Str(params)), content);
            builder.add_node(code)?;
            Ok(())
        }
        "hr" => Ok(builder.add_node(Node::new("horizontal_rule"))?),
        "br" => Ok(builder.add_node(Node::new("hard_break"))?),
        "img" => {
            let Some(src) = element.attr("src") else {
                tracing::debug!("dropping image without src");
                return Ok(());
            };
            let mut image = Node::new("image").with_attr("src", src);
            for name in ["alt", "title"] {
                if let Some(value) = element.attr(name) {
                    image = image.with_attr(name, value);
                }
            }
            Ok(builder.add_node(image)?)
        }
        "em" | "i" => mark(builder, Mark::new("em")),
        "strong" | "b" => mark(builder, Mark::new("strong")),
        "code" => mark(builder, Mark::new("code")),
        "a" => match element.attr("href") {
            Some(href) => {
                let mut link = Mark::new("link").with_attr("href", href);
                if let Some(title) = element.attr("title") {
                    link = link.with_attr("title", title);
                }
                mark(builder, link)
            }
            None => walk_children(builder, handle),
        },
        _ => walk_children(builder, handle),
    }
}

fn single(name: &str, value: AttrValue) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert(name.to_string(), value);
    attrs
}

fn code_language(code: &Handle) -> Option<String> {
    let NodeData::Element { attrs, .. } = &code.data else {
        return None;
    };
    let attrs = attrs.borrow();
    let class = attrs
        .iter()
        .find(|attr| &*attr.name.local == "class")?;
    class.value.split_whitespace().find_map(|class| {
        class
            .strip_prefix("lang-")
            .or_else(|| class.strip_prefix("language-"))
            .map(str::to_string)
    })
}

fn text_of(handle: &Handle) -> String {
    let mut text = String::new();
    collect_text(handle, &mut text);
    text
}

fn collect_text(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => collect_text(child, out),
            _ => {}
        }
    }
}
