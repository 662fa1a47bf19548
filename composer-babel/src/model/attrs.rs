//! Typed node and mark attributes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute map. Ordered by key so that equality ignores insertion order.
pub type Attrs = BTreeMap<String, AttrValue>;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

/// The declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Str,
    Int,
    Bool,
}

impl AttrValue {
    /// Coerce a raw textual value (a DOM attribute, a token attribute) into
    /// the declared kind. Unparseable values become `Null`.
    pub fn parse_as(kind: AttrKind, raw: Option<&str>) -> AttrValue {
        let Some(raw) = raw else {
            return AttrValue::Null;
        };
        match kind {
            AttrKind::Str => AttrValue::Str(raw.to_string()),
            AttrKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(AttrValue::Int)
                .unwrap_or(AttrValue::Null),
            AttrKind::Bool => match raw.trim() {
                "true" => AttrValue::Bool(true),
                "false" => AttrValue::Bool(false),
                _ => AttrValue::Null,
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether a value of this shape satisfies `kind`. `Null` fits every kind.
    pub fn fits(&self, kind: AttrKind) -> bool {
        matches!(
            (self, kind),
            (AttrValue::Null, _)
                | (AttrValue::Str(_), AttrKind::Str)
                | (AttrValue::Int(_), AttrKind::Int)
                | (AttrValue::Bool(_), AttrKind::Bool)
        )
    }
}

/// Renders the value the way it appears in DOM attributes and markdown
/// metadata. `Null` renders as the empty string.
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}
