//! # Undo/Redo History
//!
//! Snapshot history for the editor.
//!
//! ## Design
//!
//! - Each history entry records the document and selection before and after
//!   the change
//! - Undo restores the `before` snapshot and moves the entry to the redo stack
//! - Redo restores the `after` snapshot
//! - New entries clear the redo stack
//! - Changes kept out of history amend the `after` of the latest entry, so
//!   they are undone together with it
//! - Batches group several changes into one entry

use super::state::Selection;
use crate::model::Node;

/// Document and selection at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub doc: Node,
    pub selection: Selection,
}

#[derive(Debug, Clone)]
struct Entry {
    before: Snapshot,
    after: Snapshot,
}

/// Undo/redo stack of snapshots
#[derive(Debug)]
pub struct History {
    /// Applied entries (most recent last)
    undo_stack: Vec<Entry>,

    /// Undone entries (most recent last)
    redo_stack: Vec<Entry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Open batch, if any
    current_batch: Option<Option<Entry>>,
}

impl History {
    /// Create a history with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record a change from `before` to `after`.
    ///
    /// With `add_to_history` false the change is folded into the most recent
    /// entry instead. Without one there is nothing to fold into and the
    /// change is not undoable.
    pub fn record(&mut self, before: Snapshot, after: Snapshot, add_to_history: bool) {
        if let Some(batch) = &mut self.current_batch {
            match batch {
                Some(entry) => entry.after = after,
                None if add_to_history => *batch = Some(Entry { before, after }),
                None => {}
            }
            return;
        }

        if !add_to_history {
            if let Some(entry) = self.undo_stack.last_mut() {
                entry.after = after;
            }
            return;
        }

        self.push_entry(Entry { before, after });
    }

    /// Start grouping changes into one entry
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(None);
    }

    /// Close the current batch and push it
    pub fn end_batch(&mut self) {
        if let Some(Some(entry)) = self.current_batch.take() {
            self.push_entry(entry);
        }
    }

    fn push_entry(&mut self, entry: Entry) {
        self.undo_stack.push(entry);

        // Enforce max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // Clear redo stack (new change invalidates redo history)
        self.redo_stack.clear();
    }

    /// Pop the latest entry, returning the snapshot to restore
    pub fn undo(&mut self) -> Option<Snapshot> {
        let entry = self.undo_stack.pop()?;
        let before = entry.before.clone();
        self.redo_stack.push(entry);
        Some(before)
    }

    /// Re-apply the latest undone entry, returning the snapshot to restore
    pub fn redo(&mut self) -> Option<Snapshot> {
        let entry = self.redo_stack.pop()?;
        let after = entry.after.clone();
        self.undo_stack.push(entry);
        Some(after)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
