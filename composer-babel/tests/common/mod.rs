//! Shared helpers for the integration tests.

#![allow(dead_code)]

use composer_babel::{
    export_markdown, import_markdown, Editor, Node, Schema, TokenizerOptions,
};
use std::sync::Arc;

pub fn schema() -> Arc<Schema> {
    Arc::new(Schema::with_defaults())
}

pub fn doc(blocks: Vec<Node>) -> Node {
    Node::new("doc").with_content(blocks)
}

pub fn para(content: Vec<Node>) -> Node {
    Node::new("paragraph").with_content(content)
}

pub fn hashtag(name: &str) -> Node {
    Node::new("hashtag").with_attr("name", name)
}

pub fn mention(name: &str) -> Node {
    Node::new("mention").with_attr("name", name)
}

/// Markdown → document with the default schema.
pub fn import(markdown: &str) -> Node {
    import_markdown(&schema(), markdown, &TokenizerOptions::default())
        .unwrap_or_else(|e| panic!("failed to import {markdown:?}: {e}"))
}

/// Document → markdown with the default schema.
pub fn export(doc: &Node) -> String {
    export_markdown(&schema(), doc).unwrap_or_else(|e| panic!("failed to export {doc:?}: {e}"))
}

/// An editor over `markdown` with the caret at the end of the last block.
pub fn editor_at_end(markdown: &str) -> Editor {
    let mut editor = Editor::from_markdown(schema(), markdown).expect("valid markdown");
    let size = composer_babel::model::position::content_size(editor.schema(), &editor.doc().content);
    let end = composer_babel::model::position::textblocks_between(editor.schema(), editor.doc(), 0, size)
        .last()
        .map_or(0, |tb| tb.end);
    editor.set_selection(composer_babel::Selection::cursor(end));
    editor
}
