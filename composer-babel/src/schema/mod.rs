//! Schema registry
//!
//! Aggregates the core node/mark table and registered [`Extension`]s into one
//! immutable [`Schema`] shared by the import, export and editing paths.
//!
//! Registration order is significant: it is the priority used when more than
//! one extension could claim the same DOM element or markdown token (first
//! registered wins) and the order in which input rules are tried. Such
//! overlaps are legal but recorded as [`Ambiguity`] entries on the built
//! schema and logged, since they are almost always a configuration mistake.

mod spec;

pub use spec::{
    AttrSpec, ContentModel, MarkSpec, NodeGroup, NodeSpec, TextPayload, TypeSpec,
};

use crate::error::SchemaError;
use crate::extension::{DomRule, Extension, InputRule, TokenHandler};
use crate::model::{Attrs, Mark, Node};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const CORE: &str = "core";

/// Two extensions whose matchers overlap. The `first` one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub first: &'static str,
    pub second: &'static str,
    /// Human readable description of the shared matcher (`a.mention`, `token span`).
    pub matcher: String,
}

/// Immutable node/mark type table.
pub struct Schema {
    nodes: Vec<NodeSpec>,
    marks: Vec<MarkSpec>,
    node_index: HashMap<&'static str, usize>,
    mark_index: HashMap<&'static str, usize>,
    extensions: Vec<Arc<dyn Extension>>,
    /// Type name contributed by each extension, by registration index.
    provided: Vec<&'static str>,
    owners: HashMap<&'static str, usize>,
    dom_rules: Vec<(usize, DomRule)>,
    token_handlers: Vec<(usize, TokenHandler)>,
    input_rules: Vec<InputRule>,
    ambiguities: Vec<Ambiguity>,
}

impl Schema {
    /// Schema with the core types and the built-in extensions.
    pub fn with_defaults() -> Self {
        // The built-in set is known to be conflict free.
        match SchemaBuilder::with_defaults().build() {
            Ok(schema) => schema,
            Err(err) => unreachable!("built-in extensions conflict: {err}"),
        }
    }

    pub fn node_spec(&self, name: &str) -> Option<&NodeSpec> {
        self.node_index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn mark_spec(&self, name: &str) -> Option<&MarkSpec> {
        self.mark_index.get(name).map(|&i| &self.marks[i])
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn has_mark(&self, name: &str) -> bool {
        self.mark_index.contains_key(name)
    }

    /// All node types, core first, then extensions in registration order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeSpec> {
        self.nodes.iter()
    }

    /// Names of the node types in a group.
    pub fn group(&self, group: NodeGroup) -> Vec<&'static str> {
        self.nodes
            .iter()
            .filter(|n| n.group == Some(group))
            .map(|n| n.name)
            .collect()
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    /// The extension that registered a node or mark type, if any.
    pub fn extension_for(&self, type_name: &str) -> Option<&dyn Extension> {
        self.owners
            .get(type_name)
            .map(|&i| self.extensions[i].as_ref())
    }

    /// DOM rules paired with the node or mark type they produce, in
    /// priority order.
    pub fn dom_rules(&self) -> impl Iterator<Item = (&'static str, &DomRule)> {
        self.dom_rules
            .iter()
            .map(|(owner, rule)| (self.provided[*owner], rule))
    }

    /// Extension token handlers for a token name, in priority order.
    pub fn token_handlers<'a>(
        &'a self,
        token: &'a str,
    ) -> impl Iterator<Item = &'a TokenHandler> + 'a {
        self.token_handlers
            .iter()
            .filter(move |(_, h)| h.token == token)
            .map(|(_, h)| h)
    }

    pub fn input_rules(&self) -> &[InputRule] {
        &self.input_rules
    }

    pub fn ambiguities(&self) -> &[Ambiguity] {
        &self.ambiguities
    }

    /// Leaf nodes count as one position. Unknown types are treated as leaves.
    pub fn is_leaf(&self, node: &Node) -> bool {
        node.is_text() || self.node_spec(&node.node_type).map_or(true, NodeSpec::is_leaf)
    }

    pub fn is_textblock(&self, node: &Node) -> bool {
        self.node_spec(&node.node_type)
            .is_some_and(NodeSpec::is_textblock)
    }

    pub fn is_inline(&self, node: &Node) -> bool {
        node.is_text() || self.node_spec(&node.node_type).is_some_and(NodeSpec::is_inline)
    }

    /// Whether `child` may appear directly inside a `parent` node.
    pub fn allows(&self, parent: &str, child: &Node) -> bool {
        let Some(parent_spec) = self.node_spec(parent) else {
            return false;
        };
        let child_spec = self.node_spec(&child.node_type);
        if child_spec.is_none() && !child.is_text() {
            return false;
        }
        parent_spec.allows(child, child_spec)
            && child.marks.iter().all(|m| self.has_mark(&m.mark_type))
    }

    /// Nesting rank of a mark type; lower ranks wrap higher ones.
    pub fn mark_rank(&self, name: &str) -> usize {
        self.mark_index.get(name).copied().unwrap_or(usize::MAX)
    }

    /// Sort marks by rank and keep one mark per type (the last given wins).
    pub fn normalize_marks(&self, marks: &mut Vec<Mark>) {
        let mut unique: Vec<Mark> = Vec::with_capacity(marks.len());
        for mark in marks.drain(..) {
            if let Some(existing) = unique.iter_mut().find(|m| m.mark_type == mark.mark_type) {
                *existing = mark;
            } else {
                unique.push(mark);
            }
        }
        unique.sort_by_key(|m| self.mark_rank(&m.mark_type));
        *marks = unique;
    }

    /// Plain-text contribution of a leaf node.
    pub fn leaf_text(&self, node: &Node) -> String {
        if let Some(text) = &node.text {
            return text.clone();
        }
        if let Some(text) = self
            .extension_for(&node.node_type)
            .and_then(|ext| ext.leaf_text(node))
        {
            return text;
        }
        match node.node_type.as_str() {
            "hard_break" => "\n".to_string(),
            "image" => node.attr_str("alt").unwrap_or_default().to_string(),
            _ => String::new(),
        }
    }

    /// Fill defaults for a node type's attributes.
    pub fn node_attrs(&self, node_type: &str, given: &Attrs) -> Option<Result<Attrs, &'static str>> {
        self.node_spec(node_type).map(|spec| spec.resolve_attrs(given))
    }

    /// Create a node of a type, filling attribute defaults.
    pub fn node(&self, node_type: &str, attrs: Attrs, content: Vec<Node>) -> Node {
        let attrs = match self.node_attrs(node_type, &attrs) {
            Some(Ok(resolved)) => resolved,
            _ => attrs,
        };
        Node::new(node_type).with_attrs(attrs).with_content(content)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.nodes.iter().map(|n| n.name).collect::<Vec<_>>())
            .field("marks", &self.marks.iter().map(|m| m.name).collect::<Vec<_>>())
            .field("ambiguities", &self.ambiguities)
            .finish()
    }
}

/// Collects extensions and builds a [`Schema`].
///
/// # Examples
///
/// ```ignore
/// let mut builder = SchemaBuilder::new();
/// builder.register(HashtagExtension).register(MentionExtension);
/// let schema = builder.build()?;
/// ```
#[derive(Clone, Default)]
pub struct SchemaBuilder {
    extensions: Vec<Arc<dyn Extension>>,
}

impl SchemaBuilder {
    /// A builder holding only the core types.
    pub fn new() -> Self {
        SchemaBuilder {
            extensions: Vec::new(),
        }
    }

    /// A builder with the built-in extensions registered.
    pub fn with_defaults() -> Self {
        let mut builder = Self::new();
        for ext in crate::extensions::defaults() {
            builder.register_arc(ext);
        }
        builder
    }

    /// Add one construct. Conflicts are reported by [`SchemaBuilder::build`].
    pub fn register<E: Extension + 'static>(&mut self, extension: E) -> &mut Self {
        self.register_arc(Arc::new(extension))
    }

    pub fn register_arc(&mut self, extension: Arc<dyn Extension>) -> &mut Self {
        self.extensions.push(extension);
        self
    }

    pub fn build(&self) -> Result<Schema, SchemaError> {
        let mut nodes = spec::core_nodes();
        let mut marks = spec::core_marks();
        let mut registered_by: HashMap<&'static str, &'static str> = nodes
            .iter()
            .map(|n| n.name)
            .chain(marks.iter().map(|m| m.name))
            .map(|name| (name, CORE))
            .collect();
        let mut owners = HashMap::new();
        let mut provided = Vec::with_capacity(self.extensions.len());

        for (index, ext) in self.extensions.iter().enumerate() {
            let spec = ext.spec();
            let name = spec.name();
            if let Some(first) = registered_by.get(name) {
                return Err(SchemaError::SchemaConflict {
                    name: name.to_string(),
                    first: first.to_string(),
                    second: ext.name().to_string(),
                });
            }
            let parses = !ext.token_handlers().is_empty() || !ext.parse_dom().is_empty();
            if parses && !ext.supports_serialization() {
                return Err(SchemaError::MissingSerializer {
                    extension: ext.name().to_string(),
                    name: name.to_string(),
                });
            }
            registered_by.insert(name, ext.name());
            owners.insert(name, index);
            provided.push(name);
            match spec {
                TypeSpec::Node(node) => nodes.push(node),
                TypeSpec::Mark(mark) => {
                    // Extension marks nest inside links but outside inline code.
                    let code = marks.len() - 1;
                    marks.insert(code, mark);
                }
            }
        }

        let mut dom_rules: Vec<(usize, DomRule)> = Vec::new();
        let mut token_handlers: Vec<(usize, TokenHandler)> = Vec::new();
        let mut input_rules = Vec::new();
        let mut ambiguities = Vec::new();

        for (index, ext) in self.extensions.iter().enumerate() {
            for rule in ext.parse_dom() {
                if let Some((first, _)) = dom_rules
                    .iter()
                    .find(|(owner, existing)| *owner != index && existing.overlaps(&rule))
                {
                    ambiguities.push(Ambiguity {
                        first: self.extensions[*first].name(),
                        second: ext.name(),
                        matcher: match rule.class {
                            Some(class) => format!("{}.{}", rule.tag, class),
                            None => rule.tag.to_string(),
                        },
                    });
                }
                dom_rules.push((index, rule));
            }
            for handler in ext.token_handlers() {
                if let Some((first, _)) = token_handlers
                    .iter()
                    .find(|(owner, existing)| *owner != index && existing.token == handler.token)
                {
                    ambiguities.push(Ambiguity {
                        first: self.extensions[*first].name(),
                        second: ext.name(),
                        matcher: format!("token {}", handler.token),
                    });
                }
                token_handlers.push((index, handler));
            }
            input_rules.extend(ext.input_rules());
        }

        for ambiguity in &ambiguities {
            tracing::warn!(
                first = ambiguity.first,
                second = ambiguity.second,
                matcher = %ambiguity.matcher,
                "ambiguous extension registration, first registered wins"
            );
        }

        let node_index = nodes.iter().enumerate().map(|(i, n)| (n.name, i)).collect();
        let mark_index = marks.iter().enumerate().map(|(i, m)| (m.name, i)).collect();

        tracing::debug!(
            nodes = nodes.len(),
            marks = marks.len(),
            extensions = self.extensions.len(),
            "schema built"
        );

        Ok(Schema {
            nodes,
            marks,
            node_index,
            mark_index,
            extensions: self.extensions.clone(),
            provided,
            owners,
            dom_rules,
            token_handlers,
            input_rules,
            ambiguities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{DomContent, DomElement, TokenAction};
    use crate::extensions::{HashtagExtension, MentionExtension};
    use crate::formats::markdown::token::Token;

    struct Shadow;

    impl Extension for Shadow {
        fn name(&self) -> &'static str {
            "shadow"
        }

        fn spec(&self) -> TypeSpec {
            TypeSpec::Node(NodeSpec::inline_atom("shadow_mention"))
        }

        fn parse_dom(&self) -> Vec<DomRule> {
            fn attrs(_: &DomElement) -> Option<Attrs> {
                Some(Attrs::new())
            }
            vec![DomRule {
                tag: "a",
                class: Some("mention"),
                get_attrs: attrs,
                content: DomContent::Leaf,
            }]
        }

        fn token_handlers(&self) -> Vec<TokenHandler> {
            fn handle(_: &Token) -> TokenAction {
                TokenAction::Decline
            }
            vec![TokenHandler {
                token: "mention",
                handle,
            }]
        }

        fn supports_serialization(&self) -> bool {
            true
        }
    }

    #[test]
    fn duplicate_type_is_a_conflict() {
        let mut builder = SchemaBuilder::new();
        builder.register(HashtagExtension).register(HashtagExtension);
        let err = builder.build().unwrap_err();
        assert_eq!(
            err,
            SchemaError::SchemaConflict {
                name: "hashtag".into(),
                first: "hashtag".into(),
                second: "hashtag".into(),
            }
        );
    }

    #[test]
    fn shadowing_a_core_type_is_a_conflict() {
        struct FakeParagraph;
        impl Extension for FakeParagraph {
            fn name(&self) -> &'static str {
                "fake"
            }
            fn spec(&self) -> TypeSpec {
                TypeSpec::Node(NodeSpec::new(
                    "paragraph",
                    Some(NodeGroup::Block),
                    ContentModel::Inline,
                ))
            }
        }

        let mut builder = SchemaBuilder::new();
        builder.register(FakeParagraph);
        assert!(matches!(
            builder.build(),
            Err(SchemaError::SchemaConflict { first, .. }) if first == "core"
        ));
    }

    #[test]
    fn parsing_without_serializer_is_rejected() {
        struct ParseOnly;
        impl Extension for ParseOnly {
            fn name(&self) -> &'static str {
                "parse-only"
            }
            fn spec(&self) -> TypeSpec {
                TypeSpec::Node(NodeSpec::inline_atom("parse_only"))
            }
            fn token_handlers(&self) -> Vec<TokenHandler> {
                fn handle(_: &Token) -> TokenAction {
                    TokenAction::Ignore
                }
                vec![TokenHandler {
                    token: "parse_only",
                    handle,
                }]
            }
        }

        let mut builder = SchemaBuilder::new();
        builder.register(ParseOnly);
        assert!(matches!(
            builder.build(),
            Err(SchemaError::MissingSerializer { .. })
        ));
    }

    #[test]
    fn overlapping_matchers_are_flagged() {
        let mut builder = SchemaBuilder::new();
        builder.register(MentionExtension).register(Shadow);
        let schema = builder.build().unwrap();

        let matchers: Vec<_> = schema
            .ambiguities()
            .iter()
            .map(|a| (a.first, a.second, a.matcher.as_str()))
            .collect();
        assert_eq!(
            matchers,
            vec![
                ("mention", "shadow", "a.mention"),
                ("mention", "shadow", "token mention"),
            ]
        );
        // Registration order decides priority.
        let first = schema.token_handlers("mention").next().unwrap();
        let token = Token::open("mention", "span");
        assert!(matches!(
            (first.handle)(&token),
            TokenAction::Open { node_type: "mention", .. }
        ));
    }

    #[test]
    fn handlers_are_looked_up_by_owned_token_names() {
        let schema = Schema::with_defaults();
        let names: Vec<String> = ["span", "mention", "emoji", "bbcode"]
            .iter()
            .map(|name| name.to_string())
            .collect();
        let found: Vec<_> = names
            .iter()
            .map(|name| schema.token_handlers(name).map(|h| h.token).collect::<Vec<_>>())
            .collect();
        assert_eq!(
            found,
            vec![vec!["span"], vec!["mention"], vec!["emoji"], vec!["bbcode"]]
        );
        assert_eq!(schema.token_handlers(&String::from("paragraph")).count(), 0);
    }

    #[test]
    fn inline_atoms_join_the_inline_group() {
        let schema = Schema::with_defaults();
        let inline = schema.group(NodeGroup::Inline);
        for name in ["text", "image", "hashtag", "mention", "emoji"] {
            assert!(inline.contains(&name), "{name} should be inline");
        }
        let hashtag = Node::new("hashtag").with_attr("name", "x");
        assert!(schema.allows("paragraph", &hashtag));
        assert!(!schema.allows("doc", &hashtag));
        assert!(!schema.allows("code_block", &hashtag));
    }

    #[test]
    fn extension_marks_rank_before_code() {
        let schema = Schema::with_defaults();
        assert!(schema.mark_rank("link") < schema.mark_rank("strikethrough"));
        assert!(schema.mark_rank("strikethrough") < schema.mark_rank("code"));

        let mut marks = vec![Mark::new("code"), Mark::new("em"), Mark::new("em")];
        schema.normalize_marks(&mut marks);
        assert_eq!(marks, vec![Mark::new("em"), Mark::new("code")]);
    }
}
