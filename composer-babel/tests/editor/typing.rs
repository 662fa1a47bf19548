//! Typing triggers and undo

use crate::common::{editor_at_end, hashtag, mention, schema};
use composer_babel::{Editor, Node, Selection};

#[test]
fn test_hashtag_keeps_trailing_space() {
    let mut editor = Editor::empty(schema());
    editor.type_text("see ").unwrap();
    editor.type_text("#topic ").unwrap();
    assert_eq!(
        editor.doc().content[0].content,
        vec![Node::text("see "), hashtag("topic"), Node::text(" ")]
    );
}

#[test]
fn test_mention_consumes_trailing_space() {
    let mut editor = Editor::empty(schema());
    editor.type_text("hi ").unwrap();
    editor.type_text("@bob ").unwrap();
    assert_eq!(
        editor.doc().content[0].content,
        vec![Node::text("hi "), mention("bob")]
    );
}

#[test]
fn test_single_undo_restores_text_before_keystroke() {
    let mut editor = Editor::empty(schema());
    editor.type_text("see #topic").unwrap();
    let before = editor.doc().clone();

    editor.type_text(" ").unwrap();
    assert_eq!(editor.doc().count("hashtag"), 1);

    assert!(editor.undo());
    assert_eq!(editor.doc(), &before);
    assert_eq!(editor.doc().count("hashtag"), 0);
}

#[test]
fn test_rule_does_not_fire_mid_word() {
    let mut editor = Editor::empty(schema());
    editor.type_text("issue#12 ").unwrap();
    assert_eq!(editor.doc().content[0].content, vec![Node::text("issue#12 ")]);
}

#[test]
fn test_emoji_code_converts_on_closing_colon() {
    let mut editor = editor_at_end("nice\n");
    editor.type_text(" :tada:").unwrap();
    assert_eq!(editor.markdown().unwrap(), "nice :tada:\n");
    assert_eq!(editor.doc().count("emoji"), 1);
}

#[test]
fn test_typing_replaces_selection() {
    let mut editor = editor_at_end("hello world\n");
    editor.set_selection(Selection::range(7, 12));
    editor.type_text("#there ").unwrap();
    assert_eq!(
        editor.doc().content[0].content,
        vec![Node::text("hello "), hashtag("there"), Node::text(" ")]
    );
}
