//! Upload placeholder lifecycle

use crate::common::{editor_at_end, schema};
use composer_babel::{Editor, PlaceholderError, UploadEvent};

#[test]
fn test_resolved_placeholder_becomes_image() {
    let mut editor = editor_at_end("look:\n");
    editor.insert_placeholder("u1", "x.png").unwrap();
    assert_eq!(editor.doc().count("upload_placeholder"), 1);

    editor.resolve_placeholder("u1", "![img](/x.png)").unwrap();
    assert_eq!(editor.doc().count("image"), 1);
    assert_eq!(editor.doc().count("upload_placeholder"), 0);
}

#[test]
fn test_one_placeholder_per_id() {
    let mut editor = Editor::empty(schema());
    editor.insert_placeholder("u1", "a.png").unwrap();
    assert_eq!(
        editor.insert_placeholder("u1", "a.png"),
        Err(PlaceholderError::DuplicatePlaceholder("u1".into()))
    );
    assert_eq!(editor.doc().count("upload_placeholder"), 1);
}

#[test]
fn test_cancel_twice_is_noop() {
    let mut editor = Editor::empty(schema());
    editor.insert_placeholder("u1", "a.png").unwrap();
    editor.handle_upload(UploadEvent::Cancelled { id: "u1".into() }).unwrap();
    let after = editor.doc().clone();
    editor.handle_upload(UploadEvent::Cancelled { id: "u1".into() }).unwrap();
    assert_eq!(editor.doc(), &after);
}

#[test]
fn test_resolve_after_cancel_is_not_found() {
    let mut editor = Editor::empty(schema());
    editor.insert_placeholder("u1", "a.png").unwrap();
    assert!(editor.cancel_placeholder("u1"));
    assert_eq!(
        editor.handle_upload(UploadEvent::Completed {
            id: "u1".into(),
            markdown: "![a](/a.png)".into(),
        }),
        Err(PlaceholderError::PlaceholderNotFound("u1".into()))
    );
}
