//! Quoted replies
//!
//! A block container holding the quoted post's blocks. Its metadata (who is
//! quoted, which post and topic, whether the whole post is quoted) lives only
//! in attributes. The header shown above the quote in the DOM and the header
//! line of the markdown form are both rebuilt from those attributes, so
//! decorative children are dropped on import and never written back.
//!
//! Markdown form:
//!
//! ```text
//! [quote="sam, post:3, topic:42, full:true"]
//! Hi
//! [/quote]
//! ```

use crate::error::ExportError;
use crate::extension::{
    DomContent, DomElement, DomOutput, DomRule, Extension, TokenAction, TokenHandler,
};
use crate::formats::markdown::serializer::MarkdownWriter;
use crate::formats::markdown::token::Token;
use crate::model::{AttrKind, AttrValue, Attrs, Node};
use crate::schema::{AttrSpec, ContentModel, NodeGroup, NodeSpec, TypeSpec};

#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteExtension;

/// Node attribute, DOM attribute and kind for each piece of quote metadata.
const FIELDS: [(&str, &str, AttrKind); 4] = [
    ("username", "data-username", AttrKind::Str),
    ("post_number", "data-post", AttrKind::Int),
    ("topic_id", "data-topic", AttrKind::Int),
    ("full", "data-full", AttrKind::Bool),
];

fn attrs_from(lookup: impl Fn(&str) -> Option<String>) -> Attrs {
    FIELDS
        .iter()
        .map(|(attr, data, kind)| {
            let raw = lookup(data);
            (attr.to_string(), AttrValue::parse_as(*kind, raw.as_deref()))
        })
        .collect()
}

fn dom_attrs(element: &DomElement) -> Option<Attrs> {
    Some(attrs_from(|name| element.attr(name).map(str::to_string)))
}

fn open_bbcode(token: &Token) -> TokenAction {
    match token.tag.as_str() {
        "aside" if token.has_class("quote") => TokenAction::Open {
            node_type: "quote",
            attrs: attrs_from(|name| token.attr(name).map(str::to_string)),
        },
        "blockquote" => TokenAction::Passthrough,
        _ => TokenAction::Decline,
    }
}

fn drop_decoration(_token: &Token) -> TokenAction {
    TokenAction::Ignore
}

/// Split the header metadata (`sam, post:3, topic:42, full:true`) into the
/// DOM-style attributes carried by the `bbcode` open token.
pub fn header_attrs(meta: &str) -> Vec<(String, String)> {
    let mut attrs = vec![("class".to_string(), "quote".to_string())];
    for (index, part) in meta.split(',').map(str::trim).enumerate() {
        if part.is_empty() {
            continue;
        }
        let data = match part.split_once(':') {
            Some(("post", value)) => Some(("data-post", value)),
            Some(("topic", value)) => Some(("data-topic", value)),
            Some(("full", value)) => Some(("data-full", value)),
            Some(_) => None,
            None if index == 0 => Some(("data-username", part)),
            None => None,
        };
        if let Some((name, value)) = data {
            attrs.push((name.to_string(), value.trim().to_string()));
        }
    }
    attrs
}

/// The header metadata for a quote node; empty when it carries none.
pub fn header_meta(node: &Node) -> String {
    let mut parts = Vec::new();
    if let Some(username) = node.attr_str("username") {
        parts.push(username.to_string());
    }
    if let Some(post) = node.attr("post_number").and_then(AttrValue::as_int) {
        parts.push(format!("post:{post}"));
    }
    if let Some(topic) = node.attr("topic_id").and_then(AttrValue::as_int) {
        parts.push(format!("topic:{topic}"));
    }
    if node.attr("full").and_then(AttrValue::as_bool) == Some(true) {
        parts.push("full:true".to_string());
    }
    parts.join(", ")
}

impl Extension for QuoteExtension {
    fn name(&self) -> &'static str {
        "quote"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(
            NodeSpec::new("quote", Some(NodeGroup::Block), ContentModel::Blocks)
                .attr(AttrSpec::optional("username", AttrKind::Str, AttrValue::Null))
                .attr(AttrSpec::optional("post_number", AttrKind::Int, AttrValue::Null))
                .attr(AttrSpec::optional("topic_id", AttrKind::Int, AttrValue::Null))
                .attr(AttrSpec::optional("full", AttrKind::Bool, false))
                .defining(),
        )
    }

    fn parse_dom(&self) -> Vec<DomRule> {
        vec![DomRule {
            tag: "aside",
            class: Some("quote"),
            get_attrs: dom_attrs,
            content: DomContent::Element("blockquote"),
        }]
    }

    fn to_dom(&self, node: &Node) -> Option<DomOutput> {
        let mut attrs = vec![("class", "quote".to_string())];
        for (attr, data, _) in FIELDS {
            match node.attr(attr) {
                Some(value) if !value.is_null() => attrs.push((data, value.to_string())),
                _ => {}
            }
        }
        let header = match node.attr_str("username") {
            Some(username) => vec![DomOutput::Text(format!("{username}:"))],
            None => Vec::new(),
        };
        Some(DomOutput::element(
            "aside",
            attrs,
            vec![
                DomOutput::element("div", vec![("class", "quote-header".to_string())], header),
                DomOutput::element("blockquote", Vec::new(), vec![DomOutput::Hole]),
            ],
        ))
    }

    fn token_handlers(&self) -> Vec<TokenHandler> {
        vec![
            TokenHandler {
                token: "bbcode",
                handle: open_bbcode,
            },
            TokenHandler {
                token: "quote_header",
                handle: drop_decoration,
            },
            TokenHandler {
                token: "quote_controls",
                handle: drop_decoration,
            },
        ]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_node(&self, node: &Node, out: &mut MarkdownWriter<'_>) -> Result<(), ExportError> {
        if out.context().nested {
            return out.write_html(node);
        }
        let meta = header_meta(node);
        if meta.is_empty() {
            out.write("[quote]\n");
        } else {
            out.write(&format!("[quote=\"{meta}\"]\n"));
        }
        out.write_blocks(&node.content)?;
        out.write("\n[/quote]");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote() -> Node {
        Node::new("quote")
            .with_attr("username", "sam")
            .with_attr("post_number", 3i64)
            .with_attr("topic_id", 42i64)
            .with_attr("full", true)
    }

    #[test]
    fn header_metadata_roundtrips_through_token_attrs() {
        assert_eq!(header_meta(&quote()), "sam, post:3, topic:42, full:true");

        let attrs = header_attrs("sam, post:3, topic:42, full:true");
        let token = attrs
            .into_iter()
            .fold(Token::open("bbcode", "aside"), |t, (k, v)| t.with_attr(k, v));
        let TokenAction::Open { attrs, .. } = open_bbcode(&token) else {
            panic!("quote token should open a node");
        };
        assert_eq!(attrs, quote().attrs);
    }

    #[test]
    fn header_without_metadata_is_bare() {
        let node = Node::new("quote").with_attr("full", false);
        assert_eq!(header_meta(&node), "");
        assert_eq!(header_attrs(""), vec![("class".to_string(), "quote".to_string())]);
    }

    #[test]
    fn unknown_header_keys_are_skipped() {
        let attrs = header_attrs("sam, post:3, color:red");
        assert_eq!(attrs.len(), 3);
        assert!(!attrs.iter().any(|(k, _)| k.contains("color")));
    }

    #[test]
    fn dom_attrs_parse_typed_values() {
        let element = DomElement::new("aside")
            .with_attr("class", "quote")
            .with_attr("data-username", "sam")
            .with_attr("data-post", "3")
            .with_attr("data-topic", "42")
            .with_attr("data-full", "true");
        assert_eq!(QuoteExtension.parse_dom()[0].matches(&element), Some(quote().attrs));
    }

    #[test]
    fn inner_blockquote_token_passes_through() {
        assert_eq!(
            open_bbcode(&Token::open("bbcode", "blockquote")),
            TokenAction::Passthrough
        );
        assert_eq!(open_bbcode(&Token::open("bbcode", "aside")), TokenAction::Decline);
    }
}
