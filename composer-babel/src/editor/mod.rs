//! Editing layer
//!
//! An [`Editor`] owns an [`EditorState`] over a shared [`Schema`] and applies
//! every change as a [`Transaction`]. Changes are recorded in a snapshot
//! [`History`] unless the transaction opts out.
//!
//! | Module          | Responsibility                                        |
//! |-----------------|-------------------------------------------------------|
//! | `transform`     | steps, position maps and transactions                 |
//! | `state`         | document, selection and stored marks                  |
//! | `history`       | undo/redo snapshots                                   |
//! | `input_rules`   | typing triggers                                       |
//! | `commands`      | toolbar and composer commands                         |
//! | `placeholder`   | upload placeholders: insert, resolve, cancel          |
//! | `text`          | plain-text views of the caret's block and selection  |
//!
//! Every operation runs against the editor's own state; there is no shared
//! mutable document. Commands return `false` when they do not apply at the
//! current selection, mirroring how a toolbar greys out a button.

pub mod commands;
pub mod history;
pub mod input_rules;
pub mod placeholder;
pub mod state;
pub mod text;
pub mod transform;

pub use commands::{ListKind, SurroundStyle};
pub use history::{History, Snapshot};
pub use input_rules::{find_match, RuleMatch, DEFAULT_LOOKBEHIND};
pub use placeholder::UploadEvent;
pub use state::{EditorState, Selection};
pub use text::SelectedText;
pub use transform::{Assoc, Step, StepMap, Transaction};

use crate::error::{ExportError, ImportError};
use crate::formats::markdown::{export_markdown, import_markdown, TokenizerOptions};
use crate::i18n::{DefaultTranslator, Translate};
use crate::model::position::{first_text_position, marks_at, textblock_at};
use crate::model::{Mark, Node};
use crate::schema::Schema;
use std::fmt;
use std::sync::Arc;

/// Default number of undo levels.
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Editor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    /// Undo levels kept (0 keeps everything).
    pub history_depth: usize,
    /// Characters before the caret input rules see.
    pub input_rule_lookbehind: usize,
    /// Markdown dialect used for async content and resolved placeholders.
    pub tokenizer: TokenizerOptions,
}

impl Default for EditorOptions {
    fn default() -> Self {
        EditorOptions {
            history_depth: DEFAULT_HISTORY_DEPTH,
            input_rule_lookbehind: DEFAULT_LOOKBEHIND,
            tokenizer: TokenizerOptions::default(),
        }
    }
}

impl EditorOptions {
    /// Options whose markdown dialect matches the schema's extensions.
    pub fn for_schema(schema: &Schema) -> Self {
        EditorOptions {
            tokenizer: TokenizerOptions::for_schema(schema),
            ..EditorOptions::default()
        }
    }
}

/// A rich-text editing session.
pub struct Editor {
    schema: Arc<Schema>,
    state: EditorState,
    history: History,
    options: EditorOptions,
    translator: Box<dyn Translate>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("options", &self.options)
            .finish()
    }
}

impl Editor {
    /// Start editing `doc` with the caret at the start of its first textblock.
    pub fn new(schema: Arc<Schema>, doc: Node) -> Self {
        let options = EditorOptions::for_schema(&schema);
        let caret = first_text_position(&schema, &doc);
        Editor {
            history: History::with_max_levels(options.history_depth),
            state: EditorState::new(doc, Selection::cursor(caret)),
            schema,
            options,
            translator: Box::new(DefaultTranslator),
        }
    }

    /// An editor over an empty document (one empty paragraph).
    pub fn empty(schema: Arc<Schema>) -> Self {
        let doc = Node::new("doc").with_content(vec![Node::new("paragraph")]);
        Self::new(schema, doc)
    }

    pub fn from_markdown(schema: Arc<Schema>, source: &str) -> Result<Self, ImportError> {
        let options = TokenizerOptions::for_schema(&schema);
        let mut doc = import_markdown(&schema, source, &options)?;
        if doc.content.is_empty() {
            doc.content.push(Node::new("paragraph"));
        }
        Ok(Self::new(schema, doc))
    }

    pub fn with_options(mut self, options: EditorOptions) -> Self {
        self.history = History::with_max_levels(options.history_depth);
        self.options = options;
        self
    }

    pub fn with_translator(mut self, translator: impl Translate + 'static) -> Self {
        self.translator = Box::new(translator);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        &self.state.doc
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Current document as markdown.
    pub fn markdown(&self) -> Result<String, ExportError> {
        export_markdown(&self.schema, &self.state.doc)
    }

    /// Move the selection. Not recorded in history.
    pub fn set_selection(&mut self, selection: Selection) {
        self.state.selection = selection;
        self.state.stored_marks = None;
    }

    /// Start a transaction on the current state.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.schema.clone(), &self.state)
    }

    /// Apply a transaction and record it in history.
    pub fn dispatch(&mut self, tr: Transaction) {
        let changed = tr.doc_changed();
        let add_to_history = tr.add_to_history();
        let before = self.snapshot();
        self.state = tr.into_state();
        if changed {
            self.history.record(before, self.snapshot(), add_to_history);
        }
    }

    /// Group the changes made by `f` into one history entry.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.history.begin_batch();
        let result = f(self);
        self.history.end_batch();
        result
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            doc: self.state.doc.clone(),
            selection: self.state.selection,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.state = EditorState::new(snapshot.doc, snapshot.selection);
    }

    /// Marks typed text gets at `pos`: stored marks, or those at the
    /// position. Code blocks take none.
    pub(crate) fn typing_marks(&self, pos: usize) -> Vec<Mark> {
        if self.in_code_block() {
            return Vec::new();
        }
        match &self.state.stored_marks {
            Some(marks) => marks.clone(),
            None => marks_at(&self.schema, &self.state.doc, pos),
        }
    }

    pub(crate) fn translator(&self) -> &dyn Translate {
        self.translator.as_ref()
    }

    /// The node type of the textblock holding `pos`.
    pub(crate) fn block_type_at(&self, pos: usize) -> Option<&str> {
        let tb = textblock_at(&self.schema, &self.state.doc, pos)?;
        self.state
            .doc
            .at_path(&tb.path)
            .map(|block| block.node_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(markdown: &str) -> Editor {
        Editor::from_markdown(Arc::new(Schema::with_defaults()), markdown).unwrap()
    }

    fn end_of_block(editor: &mut Editor) {
        let tb = textblock_at(editor.schema(), editor.doc(), editor.selection().from()).unwrap();
        editor.set_selection(Selection::cursor(tb.end));
    }

    #[test]
    fn typing_hashtag_converts_and_one_undo_restores() {
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        editor.type_text("see ").unwrap();
        editor.type_text("#topic ").unwrap();

        let paragraph = &editor.doc().content[0];
        assert_eq!(
            paragraph.content,
            vec![
                Node::text("see "),
                Node::new("hashtag").with_attr("name", "topic"),
                Node::text(" "),
            ]
        );
        assert_eq!(editor.selection(), Selection::cursor(7));

        assert!(editor.undo());
        assert_eq!(editor.doc().content[0].content, vec![Node::text("see #topic")]);
        assert_eq!(editor.selection(), Selection::cursor(11));
    }

    #[test]
    fn typing_mention_leaves_no_trailing_text() {
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        editor.type_text("hi ").unwrap();
        editor.type_text("@bob ").unwrap();

        assert_eq!(
            editor.doc().content[0].content,
            vec![Node::text("hi "), Node::new("mention").with_attr("name", "bob")]
        );
        assert_eq!(editor.markdown().unwrap(), "hi @bob\n");
    }

    #[test]
    fn programmatic_insert_does_not_trigger_rules() {
        let mut editor = editor("see\n");
        end_of_block(&mut editor);
        editor.insert_text(" #topic ").unwrap();
        assert_eq!(editor.doc().content[0].content, vec![Node::text("see #topic ")]);
    }

    #[test]
    fn typing_in_code_block_stays_text() {
        let mut editor = editor("```\nx\n```\n");
        end_of_block(&mut editor);
        editor.type_text(" #topic ").unwrap();
        assert_eq!(editor.doc().content[0].text_content(), "x #topic ");
    }

    #[test]
    fn redo_after_undo_reapplies_conversion() {
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        editor.type_text("#a ").unwrap();
        let converted = editor.doc().clone();
        editor.undo();
        assert!(editor.redo());
        assert_eq!(editor.doc(), &converted);
    }

    #[test]
    fn batch_groups_changes() {
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        editor
            .batch(|editor| {
                editor.insert_text("a")?;
                editor.insert_text("b")
            })
            .unwrap();
        assert_eq!(editor.history().undo_depth(), 1);
        editor.undo();
        assert_eq!(editor.doc().content[0].content, Vec::<Node>::new());
    }

    #[test]
    fn history_depth_is_bounded() {
        let options = EditorOptions {
            history_depth: 2,
            ..EditorOptions::default()
        };
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults())).with_options(options);
        editor.type_text("abc").unwrap();
        assert_eq!(editor.history().undo_depth(), 2);
    }
}
