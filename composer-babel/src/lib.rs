//! Document model, format conversion and editing commands for the composer
//!
//!     This crate holds the rich-text side of the composer: a schema-driven document tree,
//!     lossless(ish) conversion to and from the markdown dialect posts are stored in, DOM
//!     import/export for pasted and cooked HTML, and the commands and typing triggers the
//!     composer toolbar uses.
//!
//!     TLDR: For extension authors:
//!         - An extension contributes exactly one node or mark type plus its parse/serialize rules.
//!         - Anything an extension can parse it must be able to serialize, the schema refuses it otherwise.
//!         - Registration order is priority: the first extension claiming a token or element wins.
//!         - Typing triggers are input rules; they never fire on programmatic inserts.
//!
//! Architecture
//!
//!     The document is a value tree (./model). Every consumer reads the same immutable
//!     [`Schema`] built once from the core types and the registered extensions (./schema). Both
//!     importers feed a flat open/content/close stream into one builder (./common/builder.rs),
//!     which owns nesting and validation, so format code only maps tokens or elements.
//!
//!     This is a pure lib, shell agnostic: nothing here prints, reads env vars or touches files.
//!
//!     The file structure :
//!     .
//!     ├── error.rs
//!     ├── extension.rs            # Extension trait and rule types
//!     ├── extensions              # Built-in extensions (hashtag, mention, quote, ...)
//!     ├── schema                  # Node/mark specs and the Schema registry
//!     ├── model                   # Node, Mark, attributes, flat positions
//!     ├── common                  # Document builder shared by the importers
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── formats
//!     │   ├── markdown            # tokenizer, token importer, exporter
//!     │   ├── html                # DOM importer and renderer
//!     │   └── json                # the editor tree as JSON
//!     ├── editor                  # transactions, history, input rules, commands, placeholders
//!     ├── i18n.rs                 # labels written into the document
//!     └── lib.rs
//!
//! Testing
//!     tests
//!     ├── lib.rs
//!     └── <area>
//!         ├── mod.rs
//!         └── <testname>.rs
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include these
//!     in the mod.
//!
//! Core Algorithms
//!
//!     Import is a stack machine over a linear token stream (markdown) or a DOM walk (HTML). Export
//!     walks the tree and builds the markdown library's AST, which does the actual formatting.
//!     The round-trip law holds for documents the exporter produces: import(export(doc)) == doc.
//!
//!     Editing works on flat positions (./model/position.rs). A change is a sequence of steps,
//!     each returning a position map, so positions computed before a change can be carried over.
//!
//! Library Choices
//!
//!     Markdown tokenizing and formatting go through comrak, DOM parsing and serialization through
//!     html5ever. We only write the adapters between their trees and ours.
//!
pub mod common;
pub mod editor;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod format;
pub mod formats;
pub mod i18n;
pub mod model;
pub mod registry;
pub mod schema;

pub use editor::{Editor, EditorOptions, Selection, UploadEvent};
pub use error::{
    CommandError, ExportError, FormatError, ImportError, PlaceholderError, SchemaError,
    TransformError,
};
pub use extension::Extension;
pub use format::Format;
pub use formats::html::{parse_html, render_html};
pub use formats::markdown::{export_markdown, import_markdown, TokenizerOptions};
pub use i18n::Translate;
pub use model::{AttrValue, Attrs, Mark, Node};
pub use registry::FormatRegistry;
pub use schema::{Schema, SchemaBuilder};
