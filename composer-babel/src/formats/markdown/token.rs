//! Markdown tokens
//!
//! The intermediate form between markdown source and the document tree. Block
//! structure is a flat stream of open/close pairs; the inline content of a
//! textblock is carried by a single `inline` token whose children are again a
//! flat open/close stream.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Nesting {
    Open,
    Close,
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Token type (`paragraph`, `bbcode`, `span`, ...). Extension handlers are
    /// keyed by it.
    pub name: String,
    pub nesting: Nesting,
    /// HTML tag the token stands for.
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<(String, String)>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub markup: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub info: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
}

impl Token {
    fn new(name: &str, tag: &str, nesting: Nesting) -> Self {
        Token {
            name: name.to_string(),
            nesting,
            tag: tag.to_string(),
            attrs: Vec::new(),
            content: String::new(),
            markup: String::new(),
            info: String::new(),
            children: Vec::new(),
        }
    }

    pub fn open(name: &str, tag: &str) -> Self {
        Self::new(name, tag, Nesting::Open)
    }

    pub fn close(name: &str, tag: &str) -> Self {
        Self::new(name, tag, Nesting::Close)
    }

    pub fn leaf(name: &str, tag: &str) -> Self {
        Self::new(name, tag, Nesting::Leaf)
    }

    /// A `text` leaf.
    pub fn text(content: impl Into<String>) -> Self {
        Self::leaf("text", "").with_content(content)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.markup = markup.into();
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn is_open(&self) -> bool {
        self.nesting == Nesting::Open
    }

    pub fn is_close(&self) -> bool {
        self.nesting == Nesting::Close
    }
}
