//! Node and mark type definitions
//!
//! A [`NodeSpec`] describes one node type: where it may appear (its group),
//! what it may contain (its content model), which attributes it carries and
//! how generic editing treats it (atom, draggable, selectable, defining).

use crate::model::{AttrKind, AttrValue, Attrs, Node};

/// The group a node type joins. Container content models accept every
/// member of the matching group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Block,
    Inline,
}

/// What a node may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    /// Leaf node, counts as a single position.
    Empty,
    /// Unmarked text only (`text*`), e.g. code blocks.
    Text,
    /// Inline nodes and marked text (`inline*`).
    Inline,
    /// One or more block nodes (`block+`).
    Blocks,
    /// One or more list items (`list_item+`).
    ListItems,
}

impl ContentModel {
    pub fn is_textblock(self) -> bool {
        matches!(self, ContentModel::Text | ContentModel::Inline)
    }

    pub fn expression(self) -> &'static str {
        match self {
            ContentModel::Empty => "",
            ContentModel::Text => "text*",
            ContentModel::Inline => "inline*",
            ContentModel::Blocks => "block+",
            ContentModel::ListItems => "list_item+",
        }
    }
}

/// A declared attribute. Attributes without a default are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub kind: AttrKind,
    pub default: Option<AttrValue>,
}

impl AttrSpec {
    pub fn required(name: &'static str, kind: AttrKind) -> Self {
        AttrSpec {
            name,
            kind,
            default: None,
        }
    }

    pub fn optional(name: &'static str, kind: AttrKind, default: impl Into<AttrValue>) -> Self {
        AttrSpec {
            name,
            kind,
            default: Some(default.into()),
        }
    }
}

/// How an atom stores the text that follows its open token during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPayload {
    /// Attribute receiving the text.
    pub attr: &'static str,
    /// Sigil stripped from the text before it is stored (`#`, `@`).
    pub prefix: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: &'static str,
    pub group: Option<NodeGroup>,
    pub content: ContentModel,
    pub attrs: Vec<AttrSpec>,
    pub atom: bool,
    pub draggable: bool,
    pub selectable: bool,
    pub defining: bool,
    /// Content is code: input rules do not fire and marks are not allowed.
    pub code: bool,
    pub payload: Option<TextPayload>,
}

impl NodeSpec {
    pub fn new(name: &'static str, group: Option<NodeGroup>, content: ContentModel) -> Self {
        NodeSpec {
            name,
            group,
            content,
            attrs: Vec::new(),
            atom: false,
            draggable: false,
            selectable: true,
            defining: false,
            code: false,
            payload: None,
        }
    }

    /// An inline leaf whose content is opaque to editing.
    pub fn inline_atom(name: &'static str) -> Self {
        NodeSpec {
            atom: true,
            ..NodeSpec::new(name, Some(NodeGroup::Inline), ContentModel::Empty)
        }
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn payload(mut self, attr: &'static str, prefix: &'static str) -> Self {
        self.payload = Some(TextPayload { attr, prefix });
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.content == ContentModel::Empty
    }

    pub fn is_textblock(&self) -> bool {
        self.content.is_textblock()
    }

    pub fn is_inline(&self) -> bool {
        self.group == Some(NodeGroup::Inline)
    }

    /// Whether `child` may appear directly inside a node of this type.
    pub fn allows(&self, child: &Node, child_spec: Option<&NodeSpec>) -> bool {
        match self.content {
            ContentModel::Empty => false,
            ContentModel::Text => child.is_text() && child.marks.is_empty(),
            ContentModel::Inline => {
                child.is_text() || child_spec.is_some_and(NodeSpec::is_inline)
            }
            ContentModel::Blocks => {
                child_spec.is_some_and(|s| s.group == Some(NodeGroup::Block))
            }
            ContentModel::ListItems => child.node_type == "list_item",
        }
    }

    /// Fill defaults and check required attributes. Unknown attributes are
    /// dropped.
    pub fn resolve_attrs(&self, given: &Attrs) -> Result<Attrs, &'static str> {
        let mut attrs = Attrs::new();
        for spec in &self.attrs {
            let value = match (given.get(spec.name), &spec.default) {
                (Some(value), _) if !value.is_null() && value.fits(spec.kind) => value.clone(),
                (_, Some(default)) => default.clone(),
                (_, None) => return Err(spec.name),
            };
            attrs.insert(spec.name.to_string(), value);
        }
        Ok(attrs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSpec {
    pub name: &'static str,
    pub attrs: Vec<AttrSpec>,
    /// Whether text typed at the mark's end inherits it.
    pub inclusive: bool,
}

impl MarkSpec {
    pub fn new(name: &'static str) -> Self {
        MarkSpec {
            name,
            attrs: Vec::new(),
            inclusive: true,
        }
    }

    pub fn non_inclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }

    pub fn attr(mut self, attr: AttrSpec) -> Self {
        self.attrs.push(attr);
        self
    }
}

/// What an extension contributes to the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Node(NodeSpec),
    Mark(MarkSpec),
}

impl TypeSpec {
    pub fn name(&self) -> &'static str {
        match self {
            TypeSpec::Node(spec) => spec.name,
            TypeSpec::Mark(spec) => spec.name,
        }
    }
}

/// Node types every schema starts with.
pub(crate) fn core_nodes() -> Vec<NodeSpec> {
    use AttrKind::{Int, Str};
    use ContentModel::{Blocks, Empty, Inline, ListItems, Text};

    let block = Some(NodeGroup::Block);
    let inline = Some(NodeGroup::Inline);

    vec![
        NodeSpec::new("doc", None, Blocks),
        NodeSpec::new("paragraph", block, Inline),
        NodeSpec::new("blockquote", block, Blocks).defining(),
        NodeSpec::new("horizontal_rule", block, Empty),
        NodeSpec::new("heading", block, Inline)
            .attr(AttrSpec::optional("level", Int, 1))
            .defining(),
        NodeSpec::new("code_block", block, Text)
            .attr(AttrSpec::optional("params", Str, ""))
            .code()
            .defining(),
        NodeSpec::new("ordered_list", block, ListItems).attr(AttrSpec::optional("order", Int, 1)),
        NodeSpec::new("bullet_list", block, ListItems),
        NodeSpec::new("list_item", None, Blocks).defining(),
        NodeSpec::new("text", inline, Empty),
        NodeSpec::new("image", inline, Empty)
            .attr(AttrSpec::required("src", Str))
            .attr(AttrSpec::optional("alt", Str, AttrValue::Null))
            .attr(AttrSpec::optional("title", Str, AttrValue::Null))
            .draggable(true),
        NodeSpec::new("hard_break", inline, Empty).selectable(false),
    ]
}

/// Mark types every schema starts with, in nesting rank order (outermost first).
pub(crate) fn core_marks() -> Vec<MarkSpec> {
    vec![
        MarkSpec::new("em"),
        MarkSpec::new("strong"),
        MarkSpec::new("link")
            .attr(AttrSpec::required("href", AttrKind::Str))
            .attr(AttrSpec::optional("title", AttrKind::Str, AttrValue::Null))
            .non_inclusive(),
        MarkSpec::new("code"),
    ]
}
