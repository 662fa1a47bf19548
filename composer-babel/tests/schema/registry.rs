//! Schema registry: extension registration and validation

use composer_babel::extension::{DomContent, DomElement, DomRule, Extension};
use composer_babel::extensions::{HashtagExtension, MentionExtension};
use composer_babel::model::{AttrKind, Attrs};
use composer_babel::schema::{AttrSpec, MarkSpec, NodeSpec, SchemaBuilder, TypeSpec};
use composer_babel::{export_markdown, Mark, Node, SchemaError};

/// A second extension claiming the `mention` name.
#[derive(Debug)]
struct OtherMention;

impl Extension for OtherMention {
    fn name(&self) -> &'static str {
        "other-mention"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(NodeSpec::inline_atom("mention").attr(AttrSpec::required("name", AttrKind::Str)))
    }
}

/// Parses `a.mention` into its own node type but cannot write it back.
#[derive(Debug)]
struct ParseOnly;

fn any_attrs(_: &DomElement) -> Option<Attrs> {
    Some(Attrs::new())
}

impl Extension for ParseOnly {
    fn name(&self) -> &'static str {
        "parse-only"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(NodeSpec::inline_atom("user_link"))
    }

    fn parse_dom(&self) -> Vec<DomRule> {
        vec![DomRule {
            tag: "a",
            class: Some("mention"),
            get_attrs: any_attrs,
            content: DomContent::Leaf,
        }]
    }
}

#[test]
fn test_duplicate_name_is_a_conflict() {
    let mut builder = SchemaBuilder::new();
    builder.register(MentionExtension).register(OtherMention);
    match builder.build() {
        Err(SchemaError::SchemaConflict { name, first, second }) => {
            assert_eq!(name, "mention");
            assert_eq!(first, "mention");
            assert_eq!(second, "other-mention");
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
}

/// A custom mark written back with bbcode-style delimiters.
#[derive(Debug)]
struct Spoiler;

impl Extension for Spoiler {
    fn name(&self) -> &'static str {
        "spoiler"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Mark(MarkSpec::new("spoiler"))
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn mark_delimiters(&self, _mark: &Mark) -> Option<(String, String)> {
        Some(("[spoiler]".into(), "[/spoiler]".into()))
    }
}

#[test]
fn test_custom_mark_exports_with_delimiters() {
    let mut builder = SchemaBuilder::with_defaults();
    builder.register(Spoiler);
    let schema = builder.build().unwrap();
    assert!(schema.has_mark("spoiler"));

    let doc = Node::new("doc").with_content(vec![Node::new("paragraph").with_content(vec![
        Node::text("the end: "),
        Node::text("they win").with_marks(vec![Mark::new("spoiler")]),
    ])]);
    assert_eq!(
        export_markdown(&schema, &doc).unwrap(),
        "the end: [spoiler]they win[/spoiler]\n"
    );
}

#[test]
fn test_parser_without_serializer_is_rejected() {
    let mut builder = SchemaBuilder::new();
    builder.register(ParseOnly);
    assert!(matches!(
        builder.build(),
        Err(SchemaError::MissingSerializer { .. })
    ));
}

#[test]
fn test_registration_order_is_priority() {
    let mut builder = SchemaBuilder::new();
    builder.register(HashtagExtension).register(MentionExtension);
    let schema = builder.build().unwrap();
    let names: Vec<_> = schema.input_rules().iter().map(|rule| rule.name).collect();
    assert_eq!(names, vec!["hashtag", "mention"]);
    assert!(schema.ambiguities().is_empty());
}
