//! Document tree nodes and marks

use super::attrs::{AttrValue, Attrs};
use serde::{Deserialize, Serialize};

/// A typed node in the document tree.
///
/// Text nodes carry `text` and no content; every other node carries
/// `content`. The JSON shape follows the `{type, attrs, content, text, marks}`
/// convention used by browser-side editors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// An annotation over a run of inline content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Node {
    pub fn new(node_type: impl Into<String>) -> Self {
        Node {
            node_type: node_type.into(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    /// Create a text node. Empty text is allowed here but is dropped by
    /// inline normalization.
    pub fn text(text: impl Into<String>) -> Self {
        Node {
            text: Some(text.into()),
            ..Node::new("text")
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = marks;
        self
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is(&self, node_type: &str) -> bool {
        self.node_type == node_type
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// String attribute, or `None` when absent or not a string.
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(AttrValue::as_str)
    }

    pub fn has_mark(&self, mark_type: &str) -> bool {
        self.marks.iter().any(|m| m.mark_type == mark_type)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Node>) {
        out.push(self);
        for child in &self.content {
            child.collect_descendants(out);
        }
    }

    /// Number of nodes of the given type in this subtree.
    pub fn count(&self, node_type: &str) -> usize {
        self.descendants()
            .into_iter()
            .filter(|n| n.node_type == node_type)
            .count()
    }

    /// Path (child indices) to every node in the subtree matching `pred`.
    pub fn find_paths(&self, pred: impl Fn(&Node) -> bool) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_paths(&pred, &mut path, &mut out);
        out
    }

    fn collect_paths(
        &self,
        pred: &dyn Fn(&Node) -> bool,
        path: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        for (i, child) in self.content.iter().enumerate() {
            path.push(i);
            if pred(child) {
                out.push(path.clone());
            }
            child.collect_paths(pred, path, out);
            path.pop();
        }
    }

    /// Node at a child-index path.
    pub fn at_path(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.content.get(index))
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &index in path {
            node = node.content.get_mut(index)?;
        }
        Some(node)
    }
}

impl Mark {
    pub fn new(mark_type: impl Into<String>) -> Self {
        Mark {
            mark_type: mark_type.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }
}
