//! Import tests for the markdown dialect (markdown → document)

use crate::common::{doc, hashtag, import, mention, para};
use composer_babel::formats::markdown::parser::import_tokens;
use composer_babel::formats::markdown::token::Token;
use composer_babel::{import_markdown, AttrValue, ImportError, Node, Schema, TokenizerOptions};

#[test]
fn test_paragraph_with_atoms() {
    let doc = import("see #topic and @bob\n");
    assert_eq!(
        doc.content[0].content,
        vec![
            Node::text("see "),
            hashtag("topic"),
            Node::text(" and "),
            mention("bob"),
        ]
    );
}

#[test]
fn test_hashtag_inside_code_is_text() {
    let doc = import("`#topic` and\n\n```\n@bob\n```\n");
    assert_eq!(doc.count("hashtag"), 0);
    assert_eq!(doc.count("mention"), 0);
    assert_eq!(doc.content[1].node_type, "code_block");
    assert_eq!(doc.content[1].text_content(), "@bob");
}

#[test]
fn test_quote_from_aside_html() {
    let doc = import(
        r#"<aside class="quote" data-username="sam" data-post="3" data-topic="42" data-full="true"><blockquote><p>Hi</p></blockquote></aside>"#,
    );
    let quote = &doc.content[0];
    assert_eq!(quote.node_type, "quote");
    assert_eq!(quote.attrs.len(), 4);
    assert_eq!(quote.attr_str("username"), Some("sam"));
    assert_eq!(quote.attr("post_number"), Some(&AttrValue::Int(3)));
    assert_eq!(quote.attr("topic_id"), Some(&AttrValue::Int(42)));
    assert_eq!(quote.attr("full"), Some(&AttrValue::Bool(true)));
    assert_eq!(quote.content, vec![para(vec![Node::text("Hi")])]);
}

#[test]
fn test_quote_from_bbcode() {
    let doc = import("[quote=\"sam, post:3, topic:42\"]\nHi **there**\n[/quote]\n");
    let quote = &doc.content[0];
    assert_eq!(quote.node_type, "quote");
    assert_eq!(quote.attr("full"), Some(&AttrValue::Bool(false)));
    assert_eq!(quote.content[0].text_content(), "Hi there");
}

#[test]
fn test_ordered_list_keeps_start() {
    let doc = import("3. one\n4. two\n");
    let list = &doc.content[0];
    assert_eq!(list.node_type, "ordered_list");
    assert_eq!(list.attr("order"), Some(&AttrValue::Int(3)));
    assert_eq!(list.content.len(), 2);
}

#[test]
fn test_dialect_options_disable_atoms() {
    let schema = Schema::with_defaults();
    let options = TokenizerOptions {
        hashtags: false,
        ..TokenizerOptions::default()
    };
    let doc = import_markdown(&schema, "see #topic @bob\n", &options).unwrap();
    assert_eq!(doc.count("hashtag"), 0);
    assert_eq!(doc.count("mention"), 1);
}

#[test]
fn test_unclosed_bbcode_quote_stays_text() {
    let doc = import("[quote]\nno end\n");
    assert_eq!(doc.count("quote"), 0);
    assert_eq!(doc.content[0].text_content(), "[quote]\nno end");
}

#[test]
fn test_unbalanced_token_stream_is_malformed() {
    let schema = Schema::with_defaults();
    let tokens = vec![
        Token::open("blockquote", "blockquote"),
        Token::open("paragraph", "p"),
        Token::text("x"),
        Token::close("paragraph", "p"),
    ];
    assert!(matches!(
        import_tokens(&schema, &tokens),
        Err(ImportError::MalformedDocument(_))
    ));
}

#[test]
fn test_empty_input_has_one_paragraph() {
    assert_eq!(import(""), doc(vec![para(Vec::new())]));
}
