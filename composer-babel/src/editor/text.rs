//! Plain-text views of the caret's textblock and the selection

use super::input_rules::LEAF_CHAR;
use super::Editor;
use crate::model::position::{content_size, inline_text, text_between, textblock_at};

/// The selected text, with its surrounding whitespace split off.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectedText {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub trimmed: String,
    pub leading: String,
    pub trailing: String,
}

impl SelectedText {
    fn new(start: usize, end: usize, text: String) -> Self {
        let trimmed = text.trim().to_string();
        let leading_len = text.len() - text.trim_start().len();
        let trailing_len = text.len() - text.trim_end().len();
        let leading = text[..leading_len].to_string();
        let trailing = if trimmed.is_empty() {
            String::new()
        } else {
            text[text.len() - trailing_len..].to_string()
        };
        SelectedText {
            start,
            end,
            text,
            trimmed,
            leading,
            trailing,
        }
    }
}

impl Editor {
    /// Text of the textblock holding the caret. Inline atoms read as
    /// U+FFFC so offsets line up with positions.
    pub fn block_text(&self) -> String {
        let doc = &self.state.doc;
        textblock_at(self.schema(), doc, self.state.selection.head)
            .and_then(|tb| doc.at_path(&tb.path))
            .map(|block| {
                let size = content_size(self.schema(), &block.content);
                inline_text(self.schema(), &block.content, 0, size, Some(LEAF_CHAR))
            })
            .unwrap_or_default()
    }

    /// Caret offset within [`Editor::block_text`].
    pub fn caret_offset(&self) -> usize {
        let head = self.state.selection.head;
        textblock_at(self.schema(), &self.state.doc, head).map_or(0, |tb| head - tb.start)
    }

    /// Selected text; blocks are separated by newlines and atoms give their
    /// plain-text form.
    pub fn selected_text(&self) -> SelectedText {
        let selection = self.state.selection;
        let text = text_between(
            self.schema(),
            &self.state.doc,
            selection.from(),
            selection.to(),
            "\n",
            None,
        );
        SelectedText::new(selection.from(), selection.to(), text)
    }

    /// Whether the caret is inside a code block.
    pub fn in_code_block(&self) -> bool {
        self.block_type_at(self.state.selection.from())
            .and_then(|name| self.schema().node_spec(name))
            .is_some_and(|spec| spec.code)
    }
}
