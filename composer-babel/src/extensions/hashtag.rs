//! Hashtags (`#name`)
//!
//! An inline atom carrying the tag name. Cooked posts render it as
//! `<a class="hashtag-cooked" data-name="...">#name</a>`; the tokenizer marks
//! raw `#name` text with a `span.hashtag-raw` pair.

use crate::error::ExportError;
use crate::extension::{
    lead_text, DomContent, DomElement, DomOutput, DomRule, Extension, InputRule, TokenAction,
    TokenHandler,
};
use crate::formats::markdown::serializer::MarkdownWriter;
use crate::formats::markdown::token::Token;
use crate::formats::markdown::tokenizer::is_trigger_name;
use crate::model::{AttrKind, Attrs, Node};
use crate::schema::{AttrSpec, NodeSpec, TypeSpec};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Class the tokenizer puts on raw hashtag spans.
pub const RAW_CLASS: &str = "hashtag-raw";
/// Class of cooked hashtag anchors.
pub const COOKED_CLASS: &str = "hashtag-cooked";

static TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<lead>^|\s)#(?P<name>\w+) $").expect("valid hashtag trigger"));

#[derive(Debug, Clone, Copy, Default)]
pub struct HashtagExtension;

fn name_of(node: &Node) -> &str {
    node.attr_str("name").unwrap_or_default()
}

fn dom_attrs(element: &DomElement) -> Option<Attrs> {
    let name = element.attr("data-name")?;
    let mut attrs = Attrs::new();
    attrs.insert("name".into(), name.into());
    Some(attrs)
}

fn open_raw_span(token: &Token) -> TokenAction {
    if token.has_class(RAW_CLASS) {
        TokenAction::Open {
            node_type: "hashtag",
            attrs: Attrs::new(),
        }
    } else {
        TokenAction::Decline
    }
}

fn on_trigger(captures: &Captures<'_>) -> Result<Vec<Node>, crate::error::InputRuleError> {
    let name = captures
        .name("name")
        .map(|m| m.as_str())
        .ok_or_else(|| crate::error::InputRuleError {
            rule: "hashtag".into(),
            reason: "missing name".into(),
        })?;
    let mut nodes: Vec<Node> = lead_text(captures).into_iter().collect();
    nodes.push(Node::new("hashtag").with_attr("name", name));
    nodes.push(Node::text(" "));
    Ok(nodes)
}

impl Extension for HashtagExtension {
    fn name(&self) -> &'static str {
        "hashtag"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(
            NodeSpec::inline_atom("hashtag")
                .attr(AttrSpec::required("name", AttrKind::Str))
                .draggable(true)
                .selectable(false)
                .payload("name", "#"),
        )
    }

    fn parse_dom(&self) -> Vec<DomRule> {
        vec![DomRule {
            tag: "a",
            class: Some(COOKED_CLASS),
            get_attrs: dom_attrs,
            content: DomContent::Leaf,
        }]
    }

    fn to_dom(&self, node: &Node) -> Option<DomOutput> {
        let name = name_of(node);
        Some(DomOutput::element(
            "a",
            vec![("class", COOKED_CLASS.to_string()), ("data-name", name.to_string())],
            vec![DomOutput::Text(format!("#{name}"))],
        ))
    }

    fn leaf_text(&self, node: &Node) -> Option<String> {
        Some(format!("#{}", name_of(node)))
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![InputRule {
            name: "hashtag",
            pattern: TRIGGER.clone(),
            handler: on_trigger,
            undoable: false,
        }]
    }

    fn token_handlers(&self) -> Vec<TokenHandler> {
        vec![TokenHandler {
            token: "span",
            handle: open_raw_span,
        }]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_node(&self, node: &Node, out: &mut MarkdownWriter<'_>) -> Result<(), ExportError> {
        let name = name_of(node);
        out.write_atom(node, &format!("#{name}"), is_trigger_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_keeps_lead_and_adds_space() {
        let caps = TRIGGER.captures("see #topic ").unwrap();
        let nodes = on_trigger(&caps).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::text(" "),
                Node::new("hashtag").with_attr("name", "topic"),
                Node::text(" "),
            ]
        );
    }

    #[test]
    fn trigger_needs_a_word_boundary() {
        assert!(TRIGGER.captures("a#topic ").is_none());
        assert!(TRIGGER.captures("#topic").is_none());
        assert!(TRIGGER.captures("#topic ").is_some());
    }

    #[test]
    fn raw_span_routes_only_sentinel_class() {
        let raw = Token::open("span", "span").with_attr("class", RAW_CLASS);
        assert!(matches!(
            open_raw_span(&raw),
            TokenAction::Open { node_type: "hashtag", .. }
        ));
        let other = Token::open("span", "span").with_attr("class", "other");
        assert_eq!(open_raw_span(&other), TokenAction::Decline);
    }

    #[test]
    fn dom_contract() {
        let node = Node::new("hashtag").with_attr("name", "rust");
        let dom = HashtagExtension.to_dom(&node).unwrap();
        assert_eq!(
            dom,
            DomOutput::Element {
                tag: "a",
                attrs: vec![
                    ("class".into(), "hashtag-cooked".into()),
                    ("data-name".into(), "rust".into()),
                ],
                children: vec![DomOutput::Text("#rust".into())],
            }
        );
        let element = DomElement::new("a")
            .with_attr("class", "hashtag-cooked")
            .with_attr("data-name", "rust");
        assert_eq!(
            HashtagExtension.parse_dom()[0].matches(&element),
            Some(node.attrs.clone())
        );
    }
}
