//! Editor state: document, selection and stored marks

use super::transform::{Assoc, StepMap};
use crate::model::{Mark, Node};

/// A text selection. `anchor` stays put while `head` moves; both are
/// document positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection {
            anchor: pos,
            head: pos,
        }
    }

    pub fn range(anchor: usize, head: usize) -> Self {
        Selection { anchor, head }
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn map(&self, map: &StepMap) -> Selection {
        Selection {
            anchor: map.map(self.anchor, Assoc::After),
            head: map.map(self.head, Assoc::After),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub doc: Node,
    pub selection: Selection,
    /// Marks the next typed text gets instead of those at the caret.
    pub stored_marks: Option<Vec<Mark>>,
}

impl EditorState {
    pub fn new(doc: Node, selection: Selection) -> Self {
        EditorState {
            doc,
            selection,
            stored_marks: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_and_to_are_ordered() {
        let selection = Selection::range(7, 3);
        assert_eq!((selection.from(), selection.to()), (3, 7));
        assert!(!selection.is_empty());
        assert!(Selection::cursor(4).is_empty());
    }

    #[test]
    fn cursor_moves_past_insertion_at_caret() {
        let map = StepMap::replace(4, 0, 3);
        assert_eq!(Selection::cursor(4).map(&map), Selection::cursor(7));
        assert_eq!(Selection::range(1, 4).map(&map), Selection::range(1, 7));
    }
}
