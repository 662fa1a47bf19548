//! Composer commands
//!
//! Toolbar and composer actions expressed as transactions. Each command
//! either applies in full as one history entry or returns `false` without
//! touching the document.

use super::input_rules::{find_match, replace_with_text, LEAF_CHAR};
use super::state::Selection;
use super::transform::{Assoc, Transaction};
use super::Editor;
use crate::error::{CommandError, ImportError, TransformError};
use crate::extensions::emoji;
use crate::formats::markdown::import_markdown;
use crate::model::position::{
    content_size, inline_text, node_size, path_position, split_inline, textblock_at,
    textblocks_between,
};
use crate::model::{Attrs, Mark, Node};
use crate::schema::ContentModel;
use once_cell::sync::Lazy;
use regex::Regex;

static EMOJI_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\B:(\w*)$").expect("valid emoji prefix"));

/// Inline styles the composer toolbar toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurroundStyle {
    Emphasis,
    Strong,
    InlineCode,
}

impl SurroundStyle {
    /// Style for a toolbar key (`italic_text`, `bold_text`, `code_title`).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "italic_text" => Some(SurroundStyle::Emphasis),
            "bold_text" => Some(SurroundStyle::Strong),
            "code_title" => Some(SurroundStyle::InlineCode),
            _ => None,
        }
    }

    pub fn mark_type(self) -> &'static str {
        match self {
            SurroundStyle::Emphasis => "em",
            SurroundStyle::Strong => "strong",
            SurroundStyle::InlineCode => "code",
        }
    }
}

/// Block wrappers the composer toolbar applies to the selected lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered(i64),
    Blockquote,
}

impl ListKind {
    /// Wrapper for a toolbar key and line marker: `list_item` with `* ` or
    /// `- ` gives a bullet list, any other marker an ordered list starting at
    /// its number; `blockquote_text` gives a blockquote.
    pub fn from_key(key: &str, marker: &str) -> Option<Self> {
        match key {
            "list_item" => {
                let marker = marker.trim_start();
                if marker.starts_with("* ") || marker.starts_with("- ") {
                    return Some(ListKind::Bullet);
                }
                let order = marker
                    .trim_end()
                    .trim_end_matches(['.', ')'])
                    .parse::<i64>()
                    .unwrap_or(1);
                Some(ListKind::Ordered(order))
            }
            "blockquote_text" => Some(ListKind::Blockquote),
            _ => None,
        }
    }

    fn wrapper(self) -> (Node, Option<Node>) {
        match self {
            ListKind::Bullet => (Node::new("bullet_list"), Some(Node::new("list_item"))),
            ListKind::Ordered(order) => (
                Node::new("ordered_list").with_attr("order", order),
                Some(Node::new("list_item")),
            ),
            ListKind::Blockquote => (Node::new("blockquote"), None),
        }
    }
}

impl Editor {
    /// Toggle the inline style for a toolbar key. Unknown keys do nothing.
    pub fn apply_surround(&mut self, key: &str) -> bool {
        match SurroundStyle::from_key(key) {
            Some(style) => self.toggle_mark(Mark::new(style.mark_type())),
            None => {
                tracing::debug!(key, "unknown surround style");
                false
            }
        }
    }

    /// Toggle a mark over the selection. With an empty selection the stored
    /// marks for the next typed text are toggled instead.
    pub fn toggle_mark(&mut self, mark: Mark) -> bool {
        if !self.schema().has_mark(&mark.mark_type) {
            return false;
        }
        let selection = self.state.selection;
        let mut tr = self.transaction();

        if selection.is_empty() {
            if self.in_code_block() {
                return false;
            }
            let mut marks = self.typing_marks(selection.from());
            if marks.iter().any(|m| m.mark_type == mark.mark_type) {
                marks.retain(|m| m.mark_type != mark.mark_type);
            } else {
                marks.push(mark);
                self.schema().normalize_marks(&mut marks);
            }
            tr.set_stored_marks(Some(marks));
            self.dispatch(tr);
            return true;
        }

        let (from, to) = (selection.from(), selection.to());
        let result = if self.range_has_mark(from, to, &mark.mark_type) {
            tr.remove_mark(from, to, &mark.mark_type).map(|_| ())
        } else {
            tr.add_mark(from, to, mark).map(|_| ())
        };
        self.finish(tr, result)
    }

    fn range_has_mark(&self, from: usize, to: usize, mark_type: &str) -> bool {
        let schema = self.schema();
        let doc = &self.state.doc;
        textblocks_between(schema, doc, from, to).iter().any(|tb| {
            let Some(block) = doc.at_path(&tb.path) else {
                return false;
            };
            let mut pos = tb.start;
            block.content.iter().any(|node| {
                let size = node_size(schema, node);
                let overlaps = pos < to && pos + size > from;
                pos += size;
                overlaps && node.has_mark(mark_type)
            })
        })
    }

    /// Wrap the selected blocks for a toolbar key and line marker. Unknown
    /// keys do nothing.
    pub fn apply_list(&mut self, marker: &str, key: &str) -> bool {
        match ListKind::from_key(key, marker) {
            Some(kind) => self.wrap_in(kind),
            None => {
                tracing::debug!(key, "unknown list kind");
                false
            }
        }
    }

    /// Wrap the blocks the selection touches. Lists get one item per block.
    pub fn wrap_in(&mut self, kind: ListKind) -> bool {
        let selection = self.state.selection;
        let Some((parent, from, to)) = self.block_range(selection.from(), selection.to()) else {
            return false;
        };
        let (wrapper, item) = kind.wrapper();
        let wrapper = self.schema().node(&wrapper.node_type, wrapper.attrs, Vec::new());
        let mut tr = self.transaction();
        let result = tr.wrap(parent, from, to, wrapper, item).map(|_| ());
        self.finish(tr, result)
    }

    /// Sibling range `(parent path, from, to)` covering the textblocks in
    /// `from..to`. A range of list items is lifted to the list holding them.
    fn block_range(&self, from: usize, to: usize) -> Option<(Vec<usize>, usize, usize)> {
        let blocks = textblocks_between(self.schema(), &self.state.doc, from, to);
        let first = &blocks.first()?.path;
        let last = &blocks.last()?.path;
        let shared = first.iter().zip(last).take_while(|(a, b)| a == b).count();
        let mut depth = shared.min(first.len() - 1);
        while depth > 0 {
            let parent = self.state.doc.at_path(&first[..depth])?;
            let holds_items = self
                .schema()
                .node_spec(&parent.node_type)
                .is_some_and(|spec| spec.content == ContentModel::ListItems);
            if !holds_items {
                break;
            }
            depth -= 1;
        }
        Some((first[..depth].to_vec(), first[depth], last[depth] + 1))
    }

    /// Inline code over a selection inside one block. Otherwise the selected
    /// blocks become code blocks, or paragraphs when the caret is already in
    /// a code block.
    pub fn format_code(&mut self) -> bool {
        let selection = self.state.selection;
        let Some(tb) = textblock_at(self.schema(), &self.state.doc, selection.from()) else {
            return false;
        };

        if self.in_code_block() {
            return self.set_block_type(selection.from(), selection.to(), "paragraph");
        }
        if !selection.is_empty() && tb.contains(selection.to()) {
            return self.toggle_mark(Mark::new("code"));
        }
        self.set_block_type(selection.from(), selection.to(), "code_block")
    }

    /// Change every textblock in `from..to` to `node_type`.
    pub fn set_block_type(&mut self, from: usize, to: usize, node_type: &str) -> bool {
        let blocks = textblocks_between(self.schema(), &self.state.doc, from, to);
        let mut tr = self.transaction();
        let result = blocks
            .iter()
            .filter(|tb| {
                self.state
                    .doc
                    .at_path(&tb.path)
                    .is_some_and(|block| block.node_type != node_type)
            })
            .try_for_each(|tb| tr.set_block_type(tb.path.clone(), node_type, Attrs::new()).map(|_| ()));
        if !tr.doc_changed() && result.is_ok() {
            return false;
        }
        self.finish(tr, result)
    }

    /// Insert an emoji at the caret. A `:partial` code typed before the caret
    /// is replaced; otherwise a space is added first when the caret follows
    /// a non-whitespace character.
    pub fn insert_emoji(&mut self, code: &str) -> bool {
        if !self.schema().has_node("emoji") || self.in_code_block() {
            return false;
        }
        let selection = self.state.selection;
        let from = selection.from();
        let Some(tb) = textblock_at(self.schema(), &self.state.doc, from) else {
            return false;
        };
        let before = self
            .state
            .doc
            .at_path(&tb.path)
            .map(|block| inline_text(self.schema(), &block.content, 0, from - tb.start, Some(LEAF_CHAR)))
            .unwrap_or_default();

        let mut tr = self.transaction();
        let result = (|| {
            tr.delete(from, selection.to())?;
            let mut at = from;
            match EMOJI_PREFIX.find(&before) {
                Some(partial) => {
                    let typed = partial.as_str().chars().count();
                    tr.replace_inline(at - typed, at, Vec::new())?;
                    at -= typed;
                }
                None if before.chars().last().is_some_and(|ch| !ch.is_whitespace()) => {
                    tr.insert_text(at, " ", Vec::new())?;
                    at += 1;
                }
                None => {}
            }
            tr.insert_inline(at, emoji(code))?;
            tr.set_selection(Selection::cursor(at + 1));
            Ok::<(), TransformError>(())
        })();
        self.finish(tr, result)
    }

    /// Replace the selection with content parsed from markdown. A single
    /// paragraph is spliced inline; other content is inserted as blocks,
    /// splitting the caret's textblock.
    pub fn insert_async_content(&mut self, markdown: &str) -> Result<(), CommandError> {
        let parsed = self.parse_markdown(markdown)?;
        let selection = self.state.selection;
        let mut tr = self.transaction();
        tr.delete(selection.from(), selection.to())?;
        let at = tr.map(selection.from(), Assoc::Before);
        splice(&mut tr, at, at, parsed.content)?;
        self.dispatch(tr);
        Ok(())
    }

    /// Replace `span` (character offsets in [`Editor::block_text`]) with an
    /// autocomplete `term`. The term goes through the input rules as if
    /// typed, so `#topic ` becomes a hashtag; without a matching rule it is
    /// inserted as plain text. Returns whether a rule converted it.
    pub fn replace_autocomplete_term(
        &mut self,
        span: std::ops::Range<usize>,
        term: &str,
    ) -> Result<bool, TransformError> {
        let head = self.state.selection.head;
        let tb = textblock_at(self.schema(), &self.state.doc, head)
            .ok_or(TransformError::NotInTextblock(head))?;
        let (from, to) = (tb.start + span.start, tb.start + span.end);
        if span.start > span.end || to > tb.end {
            return Err(TransformError::OutOfRange {
                pos: to,
                size: tb.end,
            });
        }

        let found = find_match(
            self.schema(),
            &self.state.doc,
            from,
            to,
            term,
            self.options.input_rule_lookbehind,
        );
        let mut tr = self.transaction();
        let converted = match found {
            Some(rule) => {
                let size = content_size(self.schema(), &rule.nodes);
                tr.replace_inline(rule.start, to, rule.nodes)?;
                tr.set_selection(Selection::cursor(rule.start + size));
                true
            }
            None => {
                let marks = self.typing_marks(from);
                replace_with_text(&mut tr, from, to, term, marks)?;
                false
            }
        };
        self.dispatch(tr);
        Ok(converted)
    }

    pub(crate) fn parse_markdown(&self, markdown: &str) -> Result<Node, ImportError> {
        import_markdown(self.schema(), markdown, &self.options.tokenizer)
    }

    /// Dispatch on success; log and drop the transaction on failure.
    fn finish(&mut self, tr: Transaction, result: Result<(), TransformError>) -> bool {
        match result {
            Ok(()) => {
                self.dispatch(tr);
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "command does not apply");
                false
            }
        }
    }
}

/// Insert parsed blocks over `from..to` (inside one textblock). A single
/// paragraph goes in as inline content; otherwise the textblock is split and
/// the blocks placed between its halves, empty halves dropped.
pub(crate) fn splice(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    blocks: Vec<Node>,
) -> Result<(), TransformError> {
    if let [single] = blocks.as_slice() {
        if single.node_type == "paragraph" {
            let size = content_size(tr.schema(), &single.content);
            tr.replace_inline(from, to, single.content.clone())?;
            tr.set_selection(Selection::cursor(from + size));
            return Ok(());
        }
    }
    if blocks.is_empty() {
        tr.replace_inline(from, to, Vec::new())?;
        return Ok(());
    }

    let tb = textblock_at(tr.schema(), tr.doc(), from).ok_or(TransformError::NotInTextblock(from))?;
    if !tb.contains(to) {
        return Err(TransformError::NotInTextblock(to));
    }
    let block = tr
        .doc()
        .at_path(&tb.path)
        .cloned()
        .ok_or(TransformError::NotInTextblock(from))?;
    let schema = tr.schema();
    let (head, _) = split_inline(schema, &block.content, from - tb.start);
    let (_, tail) = split_inline(schema, &block.content, to - tb.start);

    let (index, parent) = tb
        .path
        .split_last()
        .map(|(index, parent)| (*index, parent.to_vec()))
        .ok_or(TransformError::NotInTextblock(from))?;
    let first_new = index + usize::from(!head.is_empty());
    let inserted = blocks.len();

    let mut nodes = Vec::with_capacity(inserted + 2);
    if !head.is_empty() {
        nodes.push(block.clone().with_content(head));
    }
    nodes.extend(blocks);
    if !tail.is_empty() {
        nodes.push(block.with_content(tail));
    }
    tr.replace_children(parent.clone(), index, index + 1, nodes)?;

    // Caret at the end of the last inserted textblock.
    let mut path = parent;
    path.push(first_new + inserted - 1);
    let schema = tr.schema();
    let end = path_position(schema, tr.doc(), &path).and_then(|pos| {
        let size = tr.doc().at_path(&path).map(|node| node_size(schema, node))?;
        textblocks_between(schema, tr.doc(), pos, pos + size)
            .last()
            .map(|tb| tb.end)
    });
    if let Some(end) = end {
        tr.set_selection(Selection::cursor(end));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttrValue;
    use crate::schema::Schema;
    use std::sync::Arc;

    fn editor(markdown: &str) -> Editor {
        Editor::from_markdown(Arc::new(Schema::with_defaults()), markdown).unwrap()
    }

    fn block_end(editor: &Editor) -> usize {
        textblock_at(editor.schema(), editor.doc(), editor.selection().from())
            .unwrap()
            .end
    }

    #[test]
    fn surround_toggles_strong() {
        let mut editor = editor("make it bold\n");
        editor.set_selection(Selection::range(9, 13));
        assert!(editor.apply_surround("bold_text"));
        assert_eq!(editor.markdown().unwrap(), "make it **bold**\n");
        assert!(editor.apply_surround("bold_text"));
        assert_eq!(editor.markdown().unwrap(), "make it bold\n");
    }

    #[test]
    fn surround_unknown_key_is_noop() {
        let mut editor = editor("text\n");
        editor.set_selection(Selection::range(1, 5));
        assert!(!editor.apply_surround("heading_text"));
        assert!(!editor.history().can_undo());
    }

    #[test]
    fn surround_on_caret_sets_stored_marks() {
        let mut editor = editor("a\n");
        editor.set_selection(Selection::cursor(2));
        assert!(editor.apply_surround("italic_text"));
        editor.insert_text("b").unwrap();
        assert_eq!(editor.markdown().unwrap(), "a*b*\n");
    }

    #[test]
    fn format_code_on_selection_in_one_block_toggles_mark() {
        let mut editor = editor("run ls now\n");
        editor.set_selection(Selection::range(5, 7));
        assert!(editor.format_code());
        assert_eq!(editor.markdown().unwrap(), "run `ls` now\n");
    }

    #[test]
    fn format_code_on_caret_makes_code_block() {
        let mut editor = editor("let x\n");
        editor.set_selection(Selection::cursor(3));
        assert!(editor.format_code());
        assert_eq!(editor.doc().content[0].node_type, "code_block");
        assert_eq!(editor.doc().content[0].text_content(), "let x");
        assert_eq!(editor.selection(), Selection::cursor(3));
    }

    #[test]
    fn format_code_inside_code_block_makes_paragraph() {
        let mut editor = editor("```\nlet x\n```\n");
        editor.set_selection(Selection::cursor(2));
        assert!(editor.format_code());
        assert_eq!(editor.doc().content[0].node_type, "paragraph");
        assert_eq!(editor.doc().content[0].text_content(), "let x");
    }

    #[test]
    fn format_code_across_blocks_makes_code_blocks() {
        let mut editor = editor("one\n\ntwo\n");
        editor.set_selection(Selection::range(2, 8));
        assert!(editor.format_code());
        assert_eq!(editor.doc().content[0].node_type, "code_block");
        assert_eq!(editor.doc().content[1].node_type, "code_block");
        assert_eq!(editor.history().undo_depth(), 1);
    }

    #[test]
    fn list_key_wraps_each_block() {
        let mut editor = editor("one\n\ntwo\n");
        editor.set_selection(Selection::range(2, 8));
        assert!(editor.apply_list("* ", "list_item"));
        assert_eq!(editor.markdown().unwrap(), "- one\n- two\n");
    }

    #[test]
    fn numbered_marker_makes_ordered_list() {
        assert_eq!(ListKind::from_key("list_item", "1. "), Some(ListKind::Ordered(1)));
        assert_eq!(ListKind::from_key("list_item", "3. "), Some(ListKind::Ordered(3)));
        assert_eq!(ListKind::from_key("blockquote_text", "> "), Some(ListKind::Blockquote));
        assert_eq!(ListKind::from_key("heading", "# "), None);
    }

    #[test]
    fn blockquote_key_wraps_block() {
        let mut editor = editor("quoted\n");
        assert!(editor.apply_list("> ", "blockquote_text"));
        assert_eq!(editor.doc().content[0].node_type, "blockquote");
        assert_eq!(editor.markdown().unwrap(), "> quoted\n");
    }

    #[test]
    fn emoji_after_word_gets_space() {
        let mut editor = editor("nice\n");
        let end = block_end(&editor);
        editor.set_selection(Selection::cursor(end));
        assert!(editor.insert_emoji("smile"));
        assert_eq!(editor.markdown().unwrap(), "nice :smile:\n");
    }

    #[test]
    fn emoji_replaces_partial_code() {
        let mut editor = editor("nice :smi\n");
        let end = block_end(&editor);
        editor.set_selection(Selection::cursor(end));
        assert!(editor.insert_emoji("smile"));
        assert_eq!(
            editor.doc().content[0].content,
            vec![Node::text("nice "), emoji("smile")]
        );
    }

    #[test]
    fn emoji_after_space_or_at_start() {
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        editor.insert_text("nice ").unwrap();
        assert!(editor.insert_emoji("smile"));
        assert_eq!(
            editor.doc().content[0].content,
            vec![Node::text("nice "), emoji("smile")]
        );

        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        assert!(editor.insert_emoji("wave"));
        assert_eq!(editor.doc().content[0].content, vec![emoji("wave")]);
    }

    #[test]
    fn async_content_inline() {
        let mut editor = editor("see here\n");
        editor.set_selection(Selection::range(5, 9));
        editor.insert_async_content("[link](/t/1)").unwrap();
        assert_eq!(editor.markdown().unwrap(), "see [link](/t/1)\n");
    }

    #[test]
    fn async_content_blocks_split_paragraph() {
        let mut editor = editor("ab\n");
        editor.set_selection(Selection::cursor(2));
        editor.insert_async_content("# Title\n\nbody").unwrap();
        let types: Vec<_> = editor.doc().content.iter().map(|n| n.node_type.as_str()).collect();
        assert_eq!(types, vec!["paragraph", "heading", "paragraph", "paragraph"]);
        assert_eq!(editor.doc().content[0].text_content(), "a");
        assert_eq!(editor.doc().content[3].text_content(), "b");
    }

    #[test]
    fn autocomplete_term_runs_input_rules() {
        let mut editor = Editor::empty(Arc::new(Schema::with_defaults()));
        editor.type_text("hi @bo").unwrap();
        assert_eq!(editor.selection(), Selection::cursor(7));
        let converted = editor.replace_autocomplete_term(3..6, "@bob ").unwrap();
        assert!(converted);
        assert_eq!(
            editor.doc().content[0].content,
            vec![Node::text("hi "), Node::new("mention").with_attr("name", "bob")]
        );
    }

    #[test]
    fn autocomplete_falls_back_to_text() {
        let mut editor = editor("go to ca\n");
        editor.set_selection(Selection::cursor(9));
        let converted = editor.replace_autocomplete_term(6..8, "category").unwrap();
        assert!(!converted);
        assert_eq!(editor.doc().content[0].content, vec![Node::text("go to category")]);
        assert_eq!(editor.selection(), Selection::cursor(15));
    }

    #[test]
    fn commands_are_single_history_entries() {
        let mut editor = editor("x\n");
        editor.set_selection(Selection::cursor(2));
        editor.insert_emoji("smile");
        assert_eq!(editor.history().undo_depth(), 1);
        editor.undo();
        assert_eq!(editor.markdown().unwrap(), "x\n");
    }

    #[test]
    fn attr_value_order_is_stored() {
        let mut editor = editor("a\n");
        assert!(editor.wrap_in(ListKind::Ordered(4)));
        assert_eq!(
            editor.doc().content[0].attr("order"),
            Some(&AttrValue::Int(4))
        );
    }
}
