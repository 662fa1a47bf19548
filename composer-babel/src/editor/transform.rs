//! Document changes
//!
//! A [`Step`] is one atomic change to the document. Applying it yields the
//! new document and a [`StepMap`] describing how positions moved, so that
//! the selection and positions computed before the change can be carried
//! over. A [`Transaction`] composes steps and tracks the selection, stored
//! marks and whether the change belongs in the undo history.
//!
//! Steps are validated against the schema before they touch the document:
//! a step whose result would not fit the content model fails with a
//! [`TransformError`] and leaves the transaction unchanged.

use crate::error::TransformError;
use crate::model::position::{
    content_size, node_size, normalize_inline, path_position, split_inline, textblock_at,
    textblocks_between, TextblockRef,
};
use crate::model::{Attrs, Mark, Node};
use crate::schema::{ContentModel, Schema};
use std::sync::Arc;

use super::state::{EditorState, Selection};

/// Which side a position sticks to when content is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// Position mapping for one step: replaced ranges as
/// `(start, old_size, new_size)` in the coordinates before the step, sorted
/// by start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn identity() -> Self {
        StepMap::default()
    }

    pub fn replace(start: usize, old_size: usize, new_size: usize) -> Self {
        if old_size == 0 && new_size == 0 {
            return StepMap::identity();
        }
        StepMap {
            ranges: vec![(start, old_size, new_size)],
        }
    }

    fn from_ranges(ranges: Vec<(usize, usize, usize)>) -> Self {
        StepMap { ranges }
    }

    /// Map a position. Positions inside a replaced range move to its start or
    /// end depending on `assoc`.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    Assoc::Before
                } else if pos == end {
                    Assoc::After
                } else {
                    assoc
                };
                let base = (start as isize + diff) as usize;
                return match side {
                    Assoc::Before => base,
                    Assoc::After => base + new_size,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        (pos as isize + diff) as usize
    }
}

/// An atomic document change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replace `from..to` (both inside one textblock) with inline content.
    ReplaceInline {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    /// Replace children `from..to` of the node at `parent` with `nodes`.
    ReplaceChildren {
        parent: Vec<usize>,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    },
    /// Change the type of the textblock at `path`, keeping its text.
    SetBlockType {
        path: Vec<usize>,
        node_type: String,
        attrs: Attrs,
    },
    /// Wrap children `from..to` of `parent` in `wrapper`, each one inside a
    /// copy of `item` when given.
    Wrap {
        parent: Vec<usize>,
        from: usize,
        to: usize,
        wrapper: Node,
        item: Option<Node>,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark_type: String,
    },
}

impl Step {
    /// Apply the step in place. On error `doc` is left untouched.
    pub fn apply(&self, schema: &Schema, doc: &mut Node) -> Result<StepMap, TransformError> {
        match self {
            Step::ReplaceInline { from, to, content } => replace_inline(schema, doc, *from, *to, content),
            Step::ReplaceChildren {
                parent,
                from,
                to,
                nodes,
            } => replace_children(schema, doc, parent, *from, *to, nodes),
            Step::SetBlockType {
                path,
                node_type,
                attrs,
            } => set_block_type(schema, doc, path, node_type, attrs),
            Step::Wrap {
                parent,
                from,
                to,
                wrapper,
                item,
            } => wrap(schema, doc, parent, *from, *to, wrapper, item.as_ref()),
            Step::AddMark { from, to, mark } => {
                update_marks(schema, doc, *from, *to, |marks| {
                    marks.push(mark.clone());
                    schema.normalize_marks(marks);
                })
            }
            Step::RemoveMark { from, to, mark_type } => {
                update_marks(schema, doc, *from, *to, |marks| {
                    marks.retain(|m| &m.mark_type != mark_type);
                })
            }
        }
    }
}

fn check_range(schema: &Schema, doc: &Node, from: usize, to: usize) -> Result<(), TransformError> {
    let size = content_size(schema, &doc.content);
    if from > to || to > size {
        return Err(TransformError::OutOfRange {
            pos: from.max(to),
            size,
        });
    }
    Ok(())
}

fn textblock_for(schema: &Schema, doc: &Node, from: usize, to: usize) -> Result<TextblockRef, TransformError> {
    check_range(schema, doc, from, to)?;
    let tb = textblock_at(schema, doc, from).ok_or(TransformError::NotInTextblock(from))?;
    if !tb.contains(to) {
        return Err(TransformError::NotInTextblock(to));
    }
    Ok(tb)
}

fn check_allowed(schema: &Schema, parent: &str, nodes: &[Node]) -> Result<(), TransformError> {
    match nodes.iter().find(|node| !schema.allows(parent, node)) {
        Some(child) => Err(TransformError::InvalidContent {
            parent: parent.to_string(),
            child: child.node_type.clone(),
        }),
        None => Ok(()),
    }
}

fn node_at_mut<'d>(doc: &'d mut Node, path: &[usize]) -> Result<&'d mut Node, TransformError> {
    let depth = path.len();
    doc.at_path_mut(path).ok_or(TransformError::OutOfRange {
        pos: path.last().copied().unwrap_or_default(),
        size: depth,
    })
}

/// First position of the content of the node at `path`.
fn content_start(schema: &Schema, doc: &Node, path: &[usize]) -> Result<usize, TransformError> {
    if path.is_empty() {
        return Ok(0);
    }
    path_position(schema, doc, path)
        .map(|pos| pos + 1)
        .ok_or(TransformError::OutOfRange {
            pos: path.last().copied().unwrap_or_default(),
            size: path.len(),
        })
}

fn replace_inline(
    schema: &Schema,
    doc: &mut Node,
    from: usize,
    to: usize,
    content: &[Node],
) -> Result<StepMap, TransformError> {
    let tb = textblock_for(schema, doc, from, to)?;
    let block = node_at_mut(doc, &tb.path)?;
    check_allowed(schema, &block.node_type, content)?;

    let (before, _) = split_inline(schema, &block.content, from - tb.start);
    let (_, after) = split_inline(schema, &block.content, to - tb.start);
    let mut next = before;
    next.extend(content.iter().cloned());
    next.extend(after);
    block.content = normalize_inline(next);

    Ok(StepMap::replace(from, to - from, content_size(schema, content)))
}

fn replace_children(
    schema: &Schema,
    doc: &mut Node,
    parent_path: &[usize],
    from: usize,
    to: usize,
    nodes: &[Node],
) -> Result<StepMap, TransformError> {
    let start = content_start(schema, doc, parent_path)?;
    let parent = node_at_mut(doc, parent_path)?;
    if from > to || to > parent.content.len() {
        return Err(TransformError::OutOfRange {
            pos: to,
            size: parent.content.len(),
        });
    }
    check_allowed(schema, &parent.node_type, nodes)?;

    let offset = start + content_size(schema, &parent.content[..from]);
    let old_size = content_size(schema, &parent.content[from..to]);
    let mut new_size = content_size(schema, nodes);
    parent.content.splice(from..to, nodes.iter().cloned());

    match schema.node_spec(&parent.node_type).map(|spec| spec.content) {
        Some(ContentModel::Blocks) if parent.content.is_empty() => {
            parent.content.push(Node::new("paragraph"));
            new_size += 2;
        }
        Some(ContentModel::Inline) | Some(ContentModel::Text) => {
            parent.content = normalize_inline(std::mem::take(&mut parent.content));
        }
        _ => {}
    }

    Ok(StepMap::replace(offset, old_size, new_size))
}

/// Plain text of inline content for a code block: hard breaks become
/// newlines, other leaves their plain-text form.
fn plain_text(schema: &Schema, content: &[Node]) -> String {
    content
        .iter()
        .map(|node| match &node.text {
            Some(text) => text.clone(),
            None => schema.leaf_text(node),
        })
        .collect()
}

fn set_block_type(
    schema: &Schema,
    doc: &mut Node,
    path: &[usize],
    node_type: &str,
    attrs: &Attrs,
) -> Result<StepMap, TransformError> {
    let start = content_start(schema, doc, path)?;
    let spec = schema
        .node_spec(node_type)
        .filter(|spec| spec.is_textblock())
        .ok_or_else(|| TransformError::InvalidContent {
            parent: node_type.to_string(),
            child: "text".to_string(),
        })?;
    let block = node_at_mut(doc, path)?;
    if !schema.is_textblock(block) {
        return Err(TransformError::NotInTextblock(start));
    }

    let old_size = content_size(schema, &block.content);
    let content = if spec.content == ContentModel::Text {
        let text = plain_text(schema, &block.content);
        normalize_inline(vec![Node::text(text)])
    } else {
        block.content.clone()
    };
    let new_size = content_size(schema, &content);

    block.node_type = node_type.to_string();
    block.attrs = spec.resolve_attrs(attrs).unwrap_or_else(|_| attrs.clone());
    block.content = content;

    if old_size == new_size {
        Ok(StepMap::identity())
    } else {
        Ok(StepMap::replace(start, old_size, new_size))
    }
}

fn wrap(
    schema: &Schema,
    doc: &mut Node,
    parent_path: &[usize],
    from: usize,
    to: usize,
    wrapper: &Node,
    item: Option<&Node>,
) -> Result<StepMap, TransformError> {
    let start = content_start(schema, doc, parent_path)?;
    let parent = node_at_mut(doc, parent_path)?;
    let cannot_wrap = || TransformError::CannotWrap {
        from,
        to,
        wrapper: wrapper.node_type.clone(),
    };
    if from >= to || to > parent.content.len() {
        return Err(cannot_wrap());
    }

    let children: Vec<Node> = parent.content[from..to].to_vec();
    let wrapped: Vec<Node> = match item {
        Some(item) => children
            .iter()
            .map(|child| item.clone().with_content(vec![child.clone()]))
            .collect(),
        None => children.clone(),
    };
    if let Some(item) = item {
        check_allowed(schema, &item.node_type, &children).map_err(|_| cannot_wrap())?;
    }
    check_allowed(schema, &wrapper.node_type, &wrapped).map_err(|_| cannot_wrap())?;
    let wrapper = wrapper.clone().with_content(wrapped);
    check_allowed(schema, &parent.node_type, std::slice::from_ref(&wrapper)).map_err(|_| cannot_wrap())?;

    let mut offset = start + content_size(schema, &parent.content[..from]);
    let inner = usize::from(item.is_some());
    let mut ranges = vec![(offset, 0, 1 + inner)];
    for (index, child) in children.iter().enumerate() {
        offset += node_size(schema, child);
        let last = index + 1 == children.len();
        if !last && inner == 1 {
            ranges.push((offset, 0, 2));
        }
    }
    ranges.push((offset, 0, inner + 1));

    parent.content.splice(from..to, [wrapper]);
    Ok(StepMap::from_ranges(ranges))
}

fn update_marks(
    schema: &Schema,
    doc: &mut Node,
    from: usize,
    to: usize,
    update: impl Fn(&mut Vec<Mark>),
) -> Result<StepMap, TransformError> {
    check_range(schema, doc, from, to)?;
    for tb in textblocks_between(schema, doc, from, to) {
        let block = node_at_mut(doc, &tb.path)?;
        let code = schema
            .node_spec(&block.node_type)
            .is_some_and(|spec| spec.content == ContentModel::Text);
        if code {
            continue;
        }
        let lo = from.max(tb.start) - tb.start;
        let hi = to.min(tb.end) - tb.start;
        if lo >= hi {
            continue;
        }
        let (before, rest) = split_inline(schema, &block.content, lo);
        let (mut middle, after) = split_inline(schema, &rest, hi - lo);
        for node in &mut middle {
            update(&mut node.marks);
        }
        let mut next = before;
        next.extend(middle);
        next.extend(after);
        block.content = normalize_inline(next);
    }
    Ok(StepMap::identity())
}

/// A group of steps applied to an [`EditorState`] as one unit.
#[derive(Debug, Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    doc: Node,
    steps: Vec<Step>,
    maps: Vec<StepMap>,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    add_to_history: bool,
}

impl Transaction {
    pub fn new(schema: Arc<Schema>, state: &EditorState) -> Self {
        Transaction {
            schema,
            doc: state.doc.clone(),
            steps: Vec::new(),
            maps: Vec::new(),
            selection: state.selection,
            stored_marks: state.stored_marks.clone(),
            stored_marks_set: false,
            add_to_history: true,
        }
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub fn add_to_history(&self) -> bool {
        self.add_to_history
    }

    /// Apply a step. The selection is mapped through it.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let mut doc = self.doc.clone();
        let map = step.apply(&self.schema, &mut doc)?;
        self.doc = doc;
        self.selection = self.selection.map(&map);
        self.steps.push(step);
        self.maps.push(map);
        Ok(self)
    }

    /// Map a position from before the first step to the current document.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn replace_inline(&mut self, from: usize, to: usize, content: Vec<Node>) -> Result<&mut Self, TransformError> {
        self.step(Step::ReplaceInline { from, to, content })
    }

    pub fn insert_text(&mut self, pos: usize, text: &str, marks: Vec<Mark>) -> Result<&mut Self, TransformError> {
        self.replace_inline(pos, pos, vec![Node::text(text).with_marks(marks)])
    }

    pub fn insert_inline(&mut self, pos: usize, node: Node) -> Result<&mut Self, TransformError> {
        self.replace_inline(pos, pos, vec![node])
    }

    /// Delete the inline content in `from..to`. Textblocks the range spans
    /// are emptied of the selected part but not joined.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        if from == to {
            return Ok(self);
        }
        let blocks = textblocks_between(&self.schema, &self.doc, from, to);
        if blocks.is_empty() {
            return Err(TransformError::NotInTextblock(from));
        }
        for tb in blocks.iter().rev() {
            let lo = from.max(tb.start);
            let hi = to.min(tb.end);
            if lo < hi {
                self.replace_inline(lo, hi, Vec::new())?;
            }
        }
        Ok(self)
    }

    pub fn replace_children(
        &mut self,
        parent: Vec<usize>,
        from: usize,
        to: usize,
        nodes: Vec<Node>,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::ReplaceChildren {
            parent,
            from,
            to,
            nodes,
        })
    }

    pub fn set_block_type(&mut self, path: Vec<usize>, node_type: &str, attrs: Attrs) -> Result<&mut Self, TransformError> {
        self.step(Step::SetBlockType {
            path,
            node_type: node_type.to_string(),
            attrs,
        })
    }

    pub fn wrap(
        &mut self,
        parent: Vec<usize>,
        from: usize,
        to: usize,
        wrapper: Node,
        item: Option<Node>,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::Wrap {
            parent,
            from,
            to,
            wrapper,
            item,
        })
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> Result<&mut Self, TransformError> {
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(&mut self, from: usize, to: usize, mark_type: &str) -> Result<&mut Self, TransformError> {
        self.step(Step::RemoveMark {
            from,
            to,
            mark_type: mark_type.to_string(),
        })
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self
    }

    /// Marks applied to the next typed text.
    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    /// Keep this change out of the undo history. It is folded into the
    /// previous history entry instead.
    pub fn set_add_to_history(&mut self, add: bool) -> &mut Self {
        self.add_to_history = add;
        self
    }

    pub(crate) fn into_state(self) -> EditorState {
        let stored_marks = if self.stored_marks_set {
            self.stored_marks
        } else if self.doc_changed() {
            None
        } else {
            self.stored_marks
        };
        EditorState {
            doc: self.doc,
            selection: self.selection,
            stored_marks,
        }
    }
}
