//! Input-rule engine
//!
//! Typed text is checked against the schema's input rules. A rule sees the
//! text of the current textblock before the caret (inline atoms read as
//! U+FFFC, at most `lookbehind` characters) with the typed text appended, and
//! the first rule whose pattern matches replaces the matched range with the
//! nodes its handler returns.
//!
//! Rules only run for user keystrokes ([`Editor::handle_text_input`],
//! [`Editor::type_text`]). Programmatic inserts ([`Editor::insert_text`]) and
//! text typed inside code blocks never trigger them.
//!
//! A keystroke is recorded in history first. The replacement is a second
//! change: for rules that are not undoable it is folded into the keystroke's
//! entry, so a single undo restores the text from before the keystroke.

use super::state::Selection;
use super::transform::{Assoc, Transaction};
use super::Editor;
use crate::error::TransformError;
use crate::model::position::{content_size, inline_text, textblock_at};
use crate::model::{Mark, Node};
use crate::schema::Schema;

/// Character atoms contribute to the text rules see.
pub const LEAF_CHAR: &str = "\u{fffc}";

/// Default number of characters before the caret rules see.
pub const DEFAULT_LOOKBEHIND: usize = 500;

/// A rule that matched typed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: &'static str,
    /// Start of the replaced range, in positions before the typed text is
    /// inserted. The range ends at the end of the typed range.
    pub start: usize,
    pub nodes: Vec<Node>,
    pub undoable: bool,
}

/// Find the first input rule matching `text` typed over `from..to`.
pub fn find_match(
    schema: &Schema,
    doc: &Node,
    from: usize,
    to: usize,
    text: &str,
    lookbehind: usize,
) -> Option<RuleMatch> {
    let tb = textblock_at(schema, doc, from)?;
    if !tb.contains(to) {
        return None;
    }
    let block = doc.at_path(&tb.path)?;
    if schema.node_spec(&block.node_type).is_some_and(|spec| spec.code) {
        return None;
    }

    let offset = from - tb.start;
    let window = offset.saturating_sub(lookbehind);
    let mut before = inline_text(schema, &block.content, window, offset, Some(LEAF_CHAR));
    before.push_str(text);
    let typed = text.chars().count();

    for rule in schema.input_rules() {
        let Some(captures) = rule.pattern.captures(&before) else {
            continue;
        };
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let matched = whole.as_str().chars().count();
        if matched < typed {
            continue;
        }
        match (rule.handler)(&captures) {
            Ok(nodes) => {
                tracing::debug!(rule = rule.name, matched = whole.as_str(), "input rule fired");
                return Some(RuleMatch {
                    rule: rule.name,
                    start: from - (matched - typed),
                    nodes,
                    undoable: rule.undoable,
                });
            }
            Err(err) => {
                tracing::warn!(rule = rule.name, error = %err, "input rule handler failed");
            }
        }
    }
    None
}

impl Editor {
    /// Handle one text-input event replacing `from..to` with `text`, as a
    /// keystroke. Returns whether an input rule fired.
    pub fn handle_text_input(&mut self, from: usize, to: usize, text: &str) -> Result<bool, TransformError> {
        let found = find_match(
            self.schema(),
            &self.state.doc,
            from,
            to,
            text,
            self.options.input_rule_lookbehind,
        );

        let marks = self.typing_marks(from);
        let mut tr = self.transaction();
        replace_with_text(&mut tr, from, to, text, marks)?;
        self.dispatch(tr);

        let Some(rule) = found else {
            return Ok(false);
        };

        let end = from + text.chars().count();
        let size = content_size(self.schema(), &rule.nodes);
        let mut tr = self.transaction();
        tr.replace_inline(rule.start, end, rule.nodes)?;
        tr.set_selection(Selection::cursor(rule.start + size));
        tr.set_add_to_history(rule.undoable);
        self.dispatch(tr);
        Ok(true)
    }

    /// Type `text` one character at a time at the selection, each character
    /// a keystroke.
    pub fn type_text(&mut self, text: &str) -> Result<(), TransformError> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let selection = self.state.selection;
            self.handle_text_input(selection.from(), selection.to(), ch.encode_utf8(&mut buf))?;
        }
        Ok(())
    }

    /// Insert text at the selection without running input rules.
    pub fn insert_text(&mut self, text: &str) -> Result<(), TransformError> {
        let selection = self.state.selection;
        let marks = self.typing_marks(selection.from());
        let mut tr = self.transaction();
        replace_with_text(&mut tr, selection.from(), selection.to(), text, marks)?;
        self.dispatch(tr);
        Ok(())
    }
}

/// Replace `from..to` with text and put the caret after it.
pub(super) fn replace_with_text(
    tr: &mut Transaction,
    from: usize,
    to: usize,
    text: &str,
    marks: Vec<Mark>,
) -> Result<(), TransformError> {
    tr.delete(from, to)?;
    let at = tr.map(from, Assoc::Before);
    tr.insert_text(at, text, marks)?;
    tr.set_selection(Selection::cursor(at + text.chars().count()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::emoji;

    fn doc(content: Vec<Node>) -> Node {
        Node::new("doc").with_content(vec![Node::new("paragraph").with_content(content)])
    }

    #[test]
    fn hashtag_rule_keeps_lead_and_adds_space() {
        let schema = Schema::with_defaults();
        let doc = doc(vec![Node::text("see #topic")]);
        let found = find_match(&schema, &doc, 11, 11, " ", DEFAULT_LOOKBEHIND).unwrap();
        assert_eq!(found.rule, "hashtag");
        assert_eq!(found.start, 4);
        assert_eq!(
            found.nodes,
            vec![
                Node::text(" "),
                Node::new("hashtag").with_attr("name", "topic"),
                Node::text(" "),
            ]
        );
        assert!(!found.undoable);
    }

    #[test]
    fn atoms_read_as_object_replacement() {
        let schema = Schema::with_defaults();
        // An atom directly before the sigil is not whitespace.
        let doc = doc(vec![emoji("smile"), Node::text("#tag")]);
        assert!(find_match(&schema, &doc, 6, 6, " ", DEFAULT_LOOKBEHIND).is_none());
    }

    #[test]
    fn lookbehind_bounds_the_text() {
        let schema = Schema::with_defaults();
        let doc = doc(vec![Node::text("x #topic")]);
        assert!(find_match(&schema, &doc, 9, 9, " ", 3).is_none());
        assert!(find_match(&schema, &doc, 9, 9, " ", 7).is_some());
    }

    #[test]
    fn code_blocks_do_not_trigger() {
        let schema = Schema::with_defaults();
        let doc = Node::new("doc").with_content(vec![
            Node::new("code_block").with_content(vec![Node::text("#topic")])
        ]);
        assert!(find_match(&schema, &doc, 7, 7, " ", DEFAULT_LOOKBEHIND).is_none());
    }
}
