//! Export tests for the markdown dialect (document → markdown)

use crate::common::{doc, export, hashtag, mention, para, schema};
use composer_babel::extensions::{emoji, placeholder};
use composer_babel::{export_markdown, ExportError, Mark, Node};
use insta::assert_snapshot;

#[test]
fn test_atoms_are_written_verbatim() {
    let doc = doc(vec![para(vec![
        Node::text("ping "),
        mention("bob"),
        Node::text(" about "),
        hashtag("release"),
        Node::text(" "),
        emoji("tada"),
    ])]);
    assert_snapshot!(export(&doc), @"ping @bob about #release :tada:");
}

#[test]
fn test_marks_nest() {
    let strong = Mark::new("strong");
    let doc = doc(vec![para(vec![
        Node::text("a").with_marks(vec![strong.clone()]),
        Node::text("b").with_marks(vec![strong, Mark::new("em")]),
    ])]);
    assert_snapshot!(export(&doc), @"**a*b***");
}

#[test]
fn test_quote_header_from_attrs() {
    let quote = Node::new("quote")
        .with_attr("username", "sam")
        .with_attr("post_number", 3i64)
        .with_attr("topic_id", 42i64)
        .with_attr("full", true)
        .with_content(vec![para(vec![Node::text("Hi")])]);
    assert_snapshot!(export(&doc(vec![quote])), @r#"
    [quote="sam, post:3, topic:42, full:true"]
    Hi
    [/quote]
    "#);
}

#[test]
fn test_pending_placeholder_is_readable() {
    let doc = doc(vec![para(vec![placeholder("u1", "cat.png", "Uploading: cat.png…")])]);
    assert_eq!(export(&doc), "[Uploading: cat.png…]()\n");
}

#[test]
fn test_unknown_node_type_is_an_error() {
    let doc = doc(vec![Node::new("table")]);
    assert_eq!(
        export_markdown(&schema(), &doc),
        Err(ExportError::UnknownNodeType("table".into()))
    );
}
