//! Emoji (`:code:`)

use crate::error::{ExportError, InputRuleError};
use crate::extension::{
    lead_text, DomContent, DomElement, DomOutput, DomRule, Extension, InputRule, TokenAction,
    TokenHandler,
};
use crate::formats::markdown::serializer::MarkdownWriter;
use crate::formats::markdown::token::Token;
use crate::formats::markdown::tokenizer::is_emoji_code;
use crate::model::{AttrKind, Attrs, Node};
use crate::schema::{AttrSpec, NodeSpec, TypeSpec};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<lead>^|\s):(?P<code>[\w+-]+):$").expect("valid emoji trigger"));

#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiExtension;

/// An emoji node for a code, without colons.
pub fn emoji(code: &str) -> Node {
    Node::new("emoji").with_attr("code", code)
}

fn code_of(node: &Node) -> &str {
    node.attr_str("code").unwrap_or_default()
}

fn dom_attrs(element: &DomElement) -> Option<Attrs> {
    let code = element
        .attr("data-code")
        .or_else(|| element.attr("alt").map(|alt| alt.trim_matches(':')))
        .filter(|code| !code.is_empty())?;
    let mut attrs = Attrs::new();
    attrs.insert("code".into(), code.into());
    Some(attrs)
}

fn emoji_token(token: &Token) -> TokenAction {
    TokenAction::Leaf(emoji(&token.markup))
}

fn on_trigger(captures: &Captures<'_>) -> Result<Vec<Node>, InputRuleError> {
    let code = captures.name("code").ok_or_else(|| InputRuleError {
        rule: "emoji".into(),
        reason: "missing code".into(),
    })?;
    let mut nodes: Vec<Node> = lead_text(captures).into_iter().collect();
    nodes.push(emoji(code.as_str()));
    Ok(nodes)
}

impl Extension for EmojiExtension {
    fn name(&self) -> &'static str {
        "emoji"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(
            NodeSpec::inline_atom("emoji").attr(AttrSpec::required("code", AttrKind::Str)),
        )
    }

    fn parse_dom(&self) -> Vec<DomRule> {
        vec![DomRule {
            tag: "img",
            class: Some("emoji"),
            get_attrs: dom_attrs,
            content: DomContent::Leaf,
        }]
    }

    fn to_dom(&self, node: &Node) -> Option<DomOutput> {
        let code = code_of(node);
        Some(DomOutput::element(
            "img",
            vec![
                ("class", "emoji".to_string()),
                ("alt", format!(":{code}:")),
                ("data-code", code.to_string()),
            ],
            Vec::new(),
        ))
    }

    fn leaf_text(&self, node: &Node) -> Option<String> {
        Some(format!(":{}:", code_of(node)))
    }

    fn input_rules(&self) -> Vec<InputRule> {
        vec![InputRule {
            name: "emoji",
            pattern: TRIGGER.clone(),
            handler: on_trigger,
            undoable: false,
        }]
    }

    fn token_handlers(&self) -> Vec<TokenHandler> {
        vec![TokenHandler {
            token: "emoji",
            handle: emoji_token,
        }]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_node(&self, node: &Node, out: &mut MarkdownWriter<'_>) -> Result<(), ExportError> {
        let code = code_of(node);
        out.write_atom(node, &format!(":{code}:"), is_emoji_code(code))
    }
}
