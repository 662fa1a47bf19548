//! Markdown format implementation
//!
//! This module implements bidirectional conversion between the document tree
//! and markdown as written in the composer: CommonMark plus hashtags,
//! mentions, emoji shortcodes, `~~strikethrough~~` and BBCode quoted replies.
//!
//! # Library Choice
//!
//! We use the `comrak` crate for the CommonMark part of both directions. The
//! extension constructs are layered on top of it: the [`tokenizer`] turns
//! Comrak's AST into a flat token stream and adds extension tokens, and the
//! [`serializer`] hands extension nodes to their own serializers and embeds
//! the result verbatim.
//!
//! # Element Mapping Table
//!
//! | Node / Mark      | Markdown                         | Token(s)                       |
//! |------------------|----------------------------------|--------------------------------|
//! | paragraph        | Paragraph                        | `paragraph`                    |
//! | heading          | `#` .. `######`                  | `heading` (tag `hN`)           |
//! | blockquote       | `> ...`                          | `blockquote`                   |
//! | code_block       | Fenced block, params → info      | `fence`                        |
//! | horizontal_rule  | `---`                            | `hr`                           |
//! | bullet_list      | `- item`                         | `bullet_list`, `list_item`     |
//! | ordered_list     | `3. item`, order → start         | `ordered_list`, `list_item`    |
//! | image            | `![alt](src "title")`            | `image`                        |
//! | hard_break       | Backslash line break             | `hardbreak`                    |
//! | quote            | `[quote="user, post:1"]`         | `bbcode` aside + blockquote    |
//! | hashtag          | `#name` or cooked `<a>`          | `span.hashtag-raw`, `html_inline` |
//! | mention          | `@name` or cooked `<a>`          | `mention`, `html_inline`       |
//! | emoji            | `:code:` or cooked `<img>`       | `emoji`, `html_inline`         |
//! | em / strong      | `*a*` / `**a**`                  | `em` / `strong`                |
//! | link             | `[a](href "title")`              | `link`                         |
//! | code             | `` `a` ``                        | `code_inline`                  |
//! | strikethrough    | `~~a~~`                          | `s`                            |
//!
//! # Lossy Conversions
//!
//! - Quotes nested inside lists or blockquotes are written as their cooked
//!   `<aside>` HTML. Content with a blank line in it (a code block with an
//!   empty line) ends that HTML block early.
//! - Upload placeholders are written as `[label]()` and come back as text.
//! - Consecutive lists of the same kind are separated by an HTML comment,
//!   which imports as nothing.

pub mod parser;
pub mod serializer;
pub mod token;
pub mod tokenizer;

pub use serializer::{export_markdown, MarkdownWriter, WriteContext};
pub use tokenizer::TokenizerOptions;

use crate::error::{FormatError, ImportError};
use crate::format::Format;
use crate::model::Node;
use crate::schema::Schema;
use comrak::ComrakOptions;
use std::sync::Arc;

pub(crate) fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true;
    options
}

/// Import markdown into a document of `schema`.
pub fn import_markdown(
    schema: &Schema,
    source: &str,
    options: &TokenizerOptions,
) -> Result<Node, ImportError> {
    let tokens = tokenizer::tokenize(source, options);
    tracing::trace!(tokens = tokens.len(), "tokenized markdown");
    parser::import_tokens(schema, &tokens)
}

/// Format implementation for Markdown
pub struct MarkdownFormat {
    schema: Arc<Schema>,
    options: TokenizerOptions,
}

impl MarkdownFormat {
    pub fn new(schema: Arc<Schema>) -> Self {
        let options = TokenizerOptions::for_schema(&schema);
        MarkdownFormat { schema, options }
    }

    /// Narrow the constructs recognized on import.
    pub fn with_options(mut self, options: TokenizerOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for MarkdownFormat {
    fn default() -> Self {
        Self::new(Arc::new(Schema::with_defaults()))
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "CommonMark with composer extensions"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Node, FormatError> {
        Ok(import_markdown(&self.schema, source, &self.options)?)
    }

    fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        Ok(export_markdown(&self.schema, doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_round_trips_extension_markup() {
        let format = MarkdownFormat::default();
        let doc = format.parse("see #topic and @bob :smile:\n").unwrap();
        let paragraph = &doc.content[0];
        assert_eq!(paragraph.count("hashtag"), 1);
        assert_eq!(paragraph.count("mention"), 1);
        assert_eq!(paragraph.count("emoji"), 1);
        assert_eq!(format.serialize(&doc).unwrap(), "see #topic and @bob :smile:\n");
    }

    #[test]
    fn schema_without_extensions_keeps_text() {
        let schema = Arc::new(crate::schema::SchemaBuilder::new().build().unwrap());
        let format = MarkdownFormat::new(schema);
        let doc = format.parse("see #topic\n").unwrap();
        assert_eq!(doc.content[0].content, vec![Node::text("see #topic")]);
    }
}
