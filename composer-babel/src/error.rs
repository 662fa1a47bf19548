//! Error types for schema building, import/export and editing
//!
//! Each concern has its own enum so callers can tell fatal conditions (a
//! schema conflict, an unparseable document) apart from recoverable ones (a
//! placeholder the user already deleted).

use thiserror::Error;

/// Errors raised while building a [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two registrations declared the same node or mark type name.
    #[error("type `{name}` is registered more than once (by `{first}` and `{second}`)")]
    SchemaConflict {
        name: String,
        first: String,
        second: String,
    },
    /// An extension can produce nodes from parsing but cannot write them back.
    #[error("extension `{extension}` parses `{name}` but has no serializer for it")]
    MissingSerializer { extension: String, name: String },
}

/// Why a token stream or DOM tree could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malformed {
    #[error("close token `{found}` without a matching open")]
    UnexpectedClose { found: String },
    #[error("expected close for `{expected}`, found `{found}`")]
    MismatchedClose { expected: String, found: String },
    #[error("{0} node(s) left open at end of input")]
    Unclosed(usize),
    #[error("`{child}` is not allowed inside `{parent}`")]
    InvalidContent { parent: String, child: String },
    #[error("`{node}` is missing required attribute `{attr}`")]
    MissingAttribute { node: String, attr: String },
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
}

/// Errors raised by the markdown and DOM importers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// The source cannot be represented; callers keep it unmodified.
    #[error("malformed document: {0}")]
    MalformedDocument(#[from] Malformed),
}

/// Errors raised by the markdown exporter and the DOM renderer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("no serializer for node type `{0}`")]
    UnknownNodeType(String),
    #[error("markdown formatting failed: {0}")]
    Markdown(String),
    #[error("html serialization failed: {0}")]
    Html(String),
}

/// Errors raised while applying a step to a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("position {0} is not inside a textblock")]
    NotInTextblock(usize),
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },
    #[error("`{child}` is not allowed inside `{parent}`")]
    InvalidContent { parent: String, child: String },
    #[error("range {from}..{to} cannot be wrapped in `{wrapper}`")]
    CannotWrap {
        from: usize,
        to: usize,
        wrapper: String,
    },
}

/// Errors raised by the placeholder lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    /// No placeholder node carries this id (already resolved, cancelled or
    /// deleted by the user).
    #[error("no placeholder with id `{0}`")]
    PlaceholderNotFound(String),
    #[error("a placeholder with id `{0}` is already pending")]
    DuplicatePlaceholder(String),
    #[error("the schema has no `{0}` node type")]
    Unsupported(String),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Errors raised by commands that parse markdown into the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Failure reported by an input-rule handler. The engine treats it as "no
/// match" and leaves the typed text in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("input rule `{rule}` failed: {reason}")]
pub struct InputRuleError {
    pub rule: String,
    pub reason: String,
}

/// Errors that can occur during format operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Error during parsing
    #[error("Parse error: {0}")]
    ParseError(String),
    /// Error during serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// Format does not support the operation
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

impl From<ImportError> for FormatError {
    fn from(err: ImportError) -> Self {
        FormatError::ParseError(err.to_string())
    }
}

impl From<ExportError> for FormatError {
    fn from(err: ExportError) -> Self {
        FormatError::SerializationError(err.to_string())
    }
}
