//! User mentions (`@name`)

use crate::error::{ExportError, InputRuleError};
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

static TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<lead>^|\s)@(?P<name>\w+) $").expect("valid mention trigger"));

#[derive(Debug, Clone, Copy, Default)]
pub struct MentionExtension;

fn name_of(node: &Node) -> &str {
    node.attr_str("name").unwrap_or_default()
}

fn dom_attrs(element: &DomElement) -> Option<Attrs> {
    let name = element.attr("data-name")?;
    let mut attrs = Attrs::new();
    attrs.insert("name".into(), name.into());
    Some(attrs)
}

fn open_mention(_token: &Token) -> TokenAction {
    TokenAction::Open {
        node_type: "mention",
        attrs: Attrs::new(),
    }
}

fn on_trigger(captures: &Captures<'_>) -> Result<Vec<Node>, InputRuleError> {
    let name = captures.name("name").ok_or_else(|| InputRuleError {
        rule: "mention".into(),
        reason: "missing name".into(),
    })?;
    let mut nodes: Vec<Node> = lead_text(captures).into_iter().collect();
    nodes.push(Node::new("mention").with_attr("name", name.as_str()));
    Ok(nodes)
}

impl Extension for MentionExtension {
    fn name(&self) -> &'static str {
        "mention"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(
            NodeSpec::inline_atom("mention")
                .attr(AttrSpec::required("name", AttrKind::Str))
                .draggable(true)
                .selectable(false)
                .payload("name", "@"),
        )
    }

    fn parse_dom(&self) -> Vec<DomRule> {
        vec![DomRule {
            tag: "a",
            class: Some("mention"),
            get_attrs: dom_attrs,
            content: DomContent::Leaf,
        }]
    }

    fn to_dom(&self, node: &Node) -> Option<DomOutput> {
        let name = name_of(node);
        Some(DomOutput::element(
            "a",
            vec![("class", "mention".to_string()), ("data-name", name.to_string())],
            vec![DomOutput::Text(format!("@{name}"))],
        ))
    }

    fn leaf_text(&self, node: &Node) -> Option<String> {
        Some(format!("@{}", name_of(node)))
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![InputRule {
            name: "mention",
            pattern: TRIGGER.clone(),
            handler: on_trigger,
            undoable: false,
        }]
    }

    fn token_handlers(&self) -> Vec<TokenHandler> {
        vec![TokenHandler {
            token: "mention",
            handle: open_mention,
        }]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_node(&self, node: &Node, out: &mut MarkdownWriter<'_>) -> Result<(), ExportError> {
        let name = name_of(node);
        out.write_atom(node, &format!("@{name}"), is_trigger_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_consumes_trailing_space() {
        let caps = TRIGGER.captures("hi @bob ").unwrap();
        assert_eq!(
            on_trigger(&caps).unwrap(),
            vec![Node::text(" "), Node::new("mention").with_attr("name", "bob")]
        );
    }

    #[test]
    fn leaf_text_is_sigil_and_name() {
        let node = Node::new("mention").with_attr("name", "bob");
        assert_eq!(MentionExtension.leaf_text(&node).as_deref(), Some("@bob"));
    }
}
