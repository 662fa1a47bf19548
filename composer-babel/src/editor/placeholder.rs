//! Upload placeholders
//!
//! A placeholder marks where an upload's content will land. It is inserted
//! at the caret when the upload starts, and on completion it is located again
//! by id (the document may have changed arbitrarily in between) and replaced
//! by the uploaded markdown. Failed or cancelled uploads remove it.
//!
//! At most one placeholder exists per id. Resolving an id that is no longer
//! in the document reports [`PlaceholderError::PlaceholderNotFound`];
//! cancelling one is a no-op.

use super::commands::splice;
use super::state::Selection;
use super::transform::Assoc;
use super::Editor;
use crate::error::PlaceholderError;
use crate::extensions::{placeholder, PLACEHOLDER};
use crate::model::position::path_position;
use crate::model::Node;

/// Translation key of the placeholder label.
pub const UPLOADING_KEY: &str = "uploading_filename";

/// Upload lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Started { id: String, filename: String },
    Progress { id: String, percent: u8 },
    Completed { id: String, markdown: String },
    Failed { id: String, reason: String },
    Cancelled { id: String },
    CancelAll,
}

impl Editor {
    /// Insert a placeholder for upload `id` at the caret.
    pub fn insert_placeholder(&mut self, id: &str, filename: &str) -> Result<(), PlaceholderError> {
        if !self.schema().has_node(PLACEHOLDER) {
            return Err(PlaceholderError::Unsupported(PLACEHOLDER.to_string()));
        }
        if self.placeholder_position(id).is_some() {
            return Err(PlaceholderError::DuplicatePlaceholder(id.to_string()));
        }
        let label = self
            .translator()
            .translate(UPLOADING_KEY, &[("filename", filename)]);
        let at = self.state.selection.from();
        let mut tr = self.transaction();
        tr.insert_inline(at, placeholder(id, filename, &label))?;
        self.dispatch(tr);
        tracing::debug!(id, filename, "inserted upload placeholder");
        Ok(())
    }

    /// Replace the placeholder for `id` with content parsed from `markdown`.
    pub fn resolve_placeholder(&mut self, id: &str, markdown: &str) -> Result<(), PlaceholderError> {
        let Some(pos) = self.placeholder_position(id) else {
            tracing::warn!(id, "placeholder to resolve is gone");
            return Err(PlaceholderError::PlaceholderNotFound(id.to_string()));
        };
        let parsed = self.parse_markdown(markdown)?;
        let selection = self.state.selection;
        let mut tr = self.transaction();
        splice(&mut tr, pos, pos + 1, parsed.content)?;
        // The caret stays where the user left it.
        let mapped = Selection::range(
            tr.map(selection.anchor, Assoc::After),
            tr.map(selection.head, Assoc::After),
        );
        tr.set_selection(mapped);
        self.dispatch(tr);
        tracing::debug!(id, "resolved upload placeholder");
        Ok(())
    }

    /// Remove the placeholder for `id`. Returns whether one was removed.
    pub fn cancel_placeholder(&mut self, id: &str) -> bool {
        let Some(pos) = self.placeholder_position(id) else {
            tracing::debug!(id, "no placeholder to cancel");
            return false;
        };
        let mut tr = self.transaction();
        match tr.replace_inline(pos, pos + 1, Vec::new()) {
            Ok(_) => {
                self.dispatch(tr);
                true
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "failed to remove placeholder");
                false
            }
        }
    }

    /// Remove every placeholder. Returns how many were removed.
    pub fn cancel_all_placeholders(&mut self) -> usize {
        let ids = self.placeholder_ids();
        self.batch(|editor| {
            ids.iter()
                .filter(|id| editor.cancel_placeholder(id))
                .count()
        })
    }

    /// Apply an upload lifecycle event.
    pub fn handle_upload(&mut self, event: UploadEvent) -> Result<(), PlaceholderError> {
        match event {
            UploadEvent::Started { id, filename } => self.insert_placeholder(&id, &filename),
            UploadEvent::Progress { id, percent } => {
                tracing::trace!(id, percent, "upload progress");
                Ok(())
            }
            UploadEvent::Completed { id, markdown } => self.resolve_placeholder(&id, &markdown),
            UploadEvent::Failed { id, reason } => {
                tracing::warn!(id, reason, "upload failed");
                self.cancel_placeholder(&id);
                Ok(())
            }
            UploadEvent::Cancelled { id } => {
                self.cancel_placeholder(&id);
                Ok(())
            }
            UploadEvent::CancelAll => {
                self.cancel_all_placeholders();
                Ok(())
            }
        }
    }

    /// Ids of the placeholders in the document, in document order.
    pub fn placeholder_ids(&self) -> Vec<String> {
        self.state
            .doc
            .descendants()
            .into_iter()
            .filter(|node| node.is(PLACEHOLDER))
            .filter_map(|node| node.attr_str("id").map(str::to_string))
            .collect()
    }

    /// Position of the placeholder carrying `id`.
    fn placeholder_position(&self, id: &str) -> Option<usize> {
        let is_target = |node: &Node| node.is(PLACEHOLDER) && node.attr_str("id") == Some(id);
        let path = self.state.doc.find_paths(is_target).into_iter().next()?;
        path_position(self.schema(), &self.state.doc, &path)
    }
}
