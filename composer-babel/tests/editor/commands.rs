//! Toolbar commands through the public API

use crate::common::{editor_at_end, hashtag, schema};
use composer_babel::{Editor, Node, Selection};

#[test]
fn test_format_code_toggles_inline_code_within_block() {
    let mut editor = editor_at_end("run make now\n");
    editor.set_selection(Selection::range(5, 9));
    assert!(editor.format_code());
    assert_eq!(editor.markdown().unwrap(), "run `make` now\n");

    editor.set_selection(Selection::range(5, 9));
    assert!(editor.format_code());
    assert_eq!(editor.markdown().unwrap(), "run make now\n");
}

#[test]
fn test_format_code_turns_paragraph_into_code_block() {
    let mut editor = editor_at_end("let x = 1;\n");
    assert!(editor.format_code());
    assert_eq!(editor.doc().content[0].node_type, "code_block");
    assert_eq!(editor.doc().content[0].text_content(), "let x = 1;");
}

#[test]
fn test_format_code_inside_code_block_becomes_paragraph() {
    let mut editor = editor_at_end("```\nlet x = 1;\n```\n");
    assert!(editor.format_code());
    assert_eq!(editor.doc().content[0].node_type, "paragraph");
    assert_eq!(editor.markdown().unwrap(), "let x = 1;\n");
}

#[test]
fn test_surround_and_list_commands() {
    let mut editor = editor_at_end("make this bold\n");
    editor.set_selection(Selection::range(11, 15));
    assert!(editor.apply_surround("bold_text"));
    assert_eq!(editor.markdown().unwrap(), "make this **bold**\n");

    assert!(editor.apply_list("* ", "list_item"));
    assert_eq!(editor.doc().content[0].node_type, "bullet_list");
    assert!(!editor.apply_surround("no_such_key"));
}

#[test]
fn test_insert_emoji_spaces_after_word() {
    let mut editor = editor_at_end("great\n");
    assert!(editor.insert_emoji("tada"));
    assert_eq!(editor.markdown().unwrap(), "great :tada:\n");
}

#[test]
fn test_insert_emoji_replaces_partial_code() {
    let mut editor = editor_at_end("great :ta\n");
    assert!(editor.insert_emoji("tada"));
    assert_eq!(editor.markdown().unwrap(), "great :tada:\n");
}

#[test]
fn test_autocomplete_replaces_term_with_hashtag() {
    let mut editor = Editor::empty(schema());
    editor.type_text("see #rel").unwrap();
    assert_eq!(editor.doc().content[0].content, vec![Node::text("see #rel")]);
    let converted = editor.replace_autocomplete_term(4..8, "#release ").unwrap();
    assert!(converted);
    assert_eq!(
        editor.doc().content[0].content,
        vec![Node::text("see "), hashtag("release"), Node::text(" ")]
    );
}

#[test]
fn test_async_content_inline_and_blocks() {
    let mut editor = Editor::empty(schema());
    editor.insert_text("see ").unwrap();
    editor.insert_async_content("**this**").unwrap();
    assert_eq!(editor.markdown().unwrap(), "see **this**\n");

    editor.insert_async_content("one\n\ntwo").unwrap();
    assert_eq!(editor.doc().content.len(), 3);
}
