//! Extension descriptors
//!
//! An [`Extension`] is everything the composer needs to know about one custom
//! construct (a hashtag, a mention, a quoted reply): the node or mark type it
//! adds to the schema, how it is recognized in the DOM and in the markdown
//! token stream, how it is rendered, how it is written back to markdown and
//! which typing patterns produce it.
//!
//! Extensions are plain values registered on a
//! [`SchemaBuilder`](crate::schema::SchemaBuilder). Matching is done through
//! explicit predicates tried in registration order, so the first registered
//! extension wins when two could handle the same element or token.
//!
//! # Examples
//!
//! ```ignore
//! struct Spoiler;
//!
//! impl Extension for Spoiler {
//!     fn name(&self) -> &'static str {
//!         "spoiler"
//!     }
//!
//!     fn spec(&self) -> TypeSpec {
//!         TypeSpec::Mark(MarkSpec::new("spoiler"))
//!     }
//!
//!     fn supports_serialization(&self) -> bool {
//!         true
//!     }
//!
//!     fn mark_delimiters(&self, _mark: &Mark) -> Option<(String, String)> {
//!         Some(("[spoiler]".into(), "[/spoiler]".into()))
//!     }
//! }
//! ```

use crate::error::{ExportError, InputRuleError};
use crate::formats::markdown::serializer::MarkdownWriter;
use crate::formats::markdown::token::Token;
use crate::model::{Attrs, Mark, Node};
use crate::schema::TypeSpec;
use regex::{Captures, Regex};
use std::fmt;

/// Trait for custom constructs
///
/// Only [`Extension::name`] and [`Extension::spec`] are mandatory. Every
/// extension that declares token handlers or DOM rules must also support
/// serialization, otherwise building the schema fails.
pub trait Extension: Send + Sync {
    /// Name used in diagnostics and ambiguity reports.
    fn name(&self) -> &'static str;

    /// The node or mark type this extension adds.
    fn spec(&self) -> TypeSpec;

    /// DOM matchers, tried in order.
    fn parse_dom(&self) -> Vec<DomRule> {
        Vec::new()
    }

    /// On-screen representation of a node of this type.
    fn to_dom(&self, _node: &Node) -> Option<DomOutput> {
        None
    }

    /// On-screen representation of a mark of this type.
    fn mark_to_dom(&self, _mark: &Mark) -> Option<DomOutput> {
        None
    }

    /// Text contributed to plain-text extraction.
    fn leaf_text(&self, _node: &Node) -> Option<String> {
        None
    }

    /// Typing triggers.
    fn input_rules(&self) -> Vec<InputRule> {
        Vec::new()
    }

    /// Handlers for markdown tokens, keyed by token name.
    fn token_handlers(&self) -> Vec<TokenHandler> {
        Vec::new()
    }

    /// Whether [`Extension::serialize_node`] or [`Extension::mark_delimiters`]
    /// is implemented.
    fn supports_serialization(&self) -> bool {
        false
    }

    /// Write the markdown form of a node of this type.
    fn serialize_node(&self, node: &Node, _out: &mut MarkdownWriter<'_>) -> Result<(), ExportError> {
        Err(ExportError::UnknownNodeType(node.node_type.clone()))
    }

    /// Opening and closing markdown delimiters for a mark of this type.
    fn mark_delimiters(&self, _mark: &Mark) -> Option<(String, String)> {
        None
    }
}

/// A simplified view of a DOM element handed to matchers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        DomElement {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Where a matched element's content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomContent {
    /// Children are ignored (atoms keep their payload in attributes).
    Leaf,
    /// Children are imported as the node's content.
    Children,
    /// Content is taken from the first descendant element with this tag;
    /// everything else (decorative headers, controls) is dropped.
    Element(&'static str),
}

/// A DOM pattern: tag plus optional class, refined by `get_attrs` returning
/// `None` to reject the element.
#[derive(Clone)]
pub struct DomRule {
    pub tag: &'static str,
    pub class: Option<&'static str>,
    pub get_attrs: fn(&DomElement) -> Option<Attrs>,
    pub content: DomContent,
}

impl DomRule {
    pub fn matches(&self, element: &DomElement) -> Option<Attrs> {
        if !element.tag.eq_ignore_ascii_case(self.tag) {
            return None;
        }
        if let Some(class) = self.class {
            if !element.has_class(class) {
                return None;
            }
        }
        (self.get_attrs)(element)
    }

    /// Two rules with the same tag and class cannot be told apart without
    /// running their attribute functions.
    pub fn overlaps(&self, other: &DomRule) -> bool {
        self.tag.eq_ignore_ascii_case(other.tag) && self.class == other.class
    }
}

impl fmt::Debug for DomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomRule")
            .field("tag", &self.tag)
            .field("class", &self.class)
            .field("content", &self.content)
            .finish()
    }
}

/// Output of a DOM-construction function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomOutput {
    Element {
        tag: &'static str,
        attrs: Vec<(String, String)>,
        children: Vec<DomOutput>,
    },
    Text(String),
    /// Where the node's own content is rendered.
    Hole,
}

impl DomOutput {
    pub fn element(tag: &'static str, attrs: Vec<(&str, String)>, children: Vec<DomOutput>) -> Self {
        DomOutput::Element {
            tag,
            attrs: attrs
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
            children,
        }
    }
}

/// What the document builder should do with a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAction {
    /// Open a node; the matching close token finishes it.
    Open {
        node_type: &'static str,
        attrs: Attrs,
    },
    /// Apply a mark to inline content until the matching close token.
    OpenMark(Mark),
    /// Insert a complete leaf node.
    Leaf(Node),
    /// Drop the token and, for an open token, everything up to its close.
    Ignore,
    /// Keep the children, drop the token itself.
    Passthrough,
    /// This handler does not apply; try the next one.
    Decline,
}

/// Maps tokens with a given name to a builder action.
#[derive(Clone)]
pub struct TokenHandler {
    pub token: &'static str,
    pub handle: fn(&Token) -> TokenAction,
}

impl fmt::Debug for TokenHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenHandler")
            .field("token", &self.token)
            .finish()
    }
}

/// A typing trigger.
///
/// `pattern` is matched against the text before the caret (bounded to the
/// current textblock) with the just-typed text appended; it should be
/// anchored with `$`. The handler turns the captures into the nodes that
/// replace the whole match.
#[derive(Clone)]
pub struct InputRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub handler: fn(&Captures<'_>) -> Result<Vec<Node>, InputRuleError>,
    /// When false the replacement is folded into the keystroke's history
    /// entry, so one undo restores the text from before the keystroke.
    pub undoable: bool,
}

impl fmt::Debug for InputRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("undoable", &self.undoable)
            .finish()
    }
}

/// Leading whitespace captured by an input rule, kept in front of the
/// produced node.
pub fn lead_text(captures: &Captures<'_>) -> Option<Node> {
    captures
        .name("lead")
        .map(|m| m.as_str())
        .filter(|lead| !lead.is_empty())
        .map(Node::text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_attrs(_: &DomElement) -> Option<Attrs> {
        Some(Attrs::new())
    }

    #[test]
    fn dom_rule_requires_tag_and_class() {
        let rule = DomRule {
            tag: "a",
            class: Some("mention"),
            get_attrs: no_attrs,
            content: DomContent::Leaf,
        };
        let element = DomElement::new("A").with_attr("class", "user mention");
        assert!(rule.matches(&element).is_some());
        assert!(rule.matches(&DomElement::new("a")).is_none());
        assert!(rule
            .matches(&DomElement::new("span").with_attr("class", "mention"))
            .is_none());
    }

    #[test]
    fn lead_text_skips_empty_lead() {
        let re = Regex::new(r"(?P<lead>^|\s)#(\w+) $").unwrap();
        let caps = re.captures("#a ").unwrap();
        assert_eq!(lead_text(&caps), None);
        let caps = re.captures("x #a ").unwrap();
        assert_eq!(lead_text(&caps), Some(Node::text(" ")));
    }
}
