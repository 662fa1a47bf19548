//! HTML format implementation
//!
//! This module implements bidirectional conversion between the document tree
//! and the on-screen DOM form of the composer.
//!
//! # Library Choice
//!
//! We use the `html5ever` + `markup5ever_rcdom` ecosystem for both directions:
//! - `html5ever`: HTML5 parser and serializer
//! - `markup5ever_rcdom`: Reference-counted DOM tree the parser builds and the
//!   renderer assembles
//!
//! The same parser imports raw HTML blocks found in markdown, so cooked markup
//! pasted into the source (`<aside class="quote">`, `<a class="mention">`)
//! yields the same nodes as its markdown form.
//!
//! # Element Mapping Table
//!
//! | Node / Mark      | HTML                                                 |
//! |------------------|------------------------------------------------------|
//! | paragraph        | `<p>`                                                |
//! | heading          | `<h1>` .. `<h6>`                                     |
//! | blockquote       | `<blockquote>`                                       |
//! | code_block       | `<pre><code class="lang-x">`                         |
//! | lists            | `<ul>`, `<ol start="n">`, `<li>`                     |
//! | image            | `<img src alt title>`                                |
//! | hard_break       | `<br>`                                               |
//! | quote            | `<aside class="quote" data-*>` + header + blockquote |
//! | hashtag          | `<a class="hashtag-cooked" data-name>`               |
//! | mention          | `<a class="mention" data-name>`                      |
//! | emoji            | `<img class="emoji" alt=":code:" data-code>`         |
//! | upload_placeholder | `<span class="upload-placeholder">` (render only)  |
//! | em / strong      | `<em>` / `<strong>` (also `<i>` / `<b>` on import)   |
//! | link / code      | `<a href title>` / `<code>`                          |
//! | strikethrough    | `<s>` (also `<del>` on import)                       |
//!
//! # Lossy Conversions
//!
//! - Whitespace-only text between blocks is dropped.
//! - Unknown elements are unwrapped; their attributes are lost.

pub mod parser;
pub mod serializer;

pub use parser::parse_html;
pub use serializer::render_html;

use crate::error::FormatError;
use crate::format::Format;
use crate::model::Node;
use crate::schema::Schema;
use std::sync::Arc;

/// Format implementation for HTML
pub struct HtmlFormat {
    schema: Arc<Schema>,
}

impl HtmlFormat {
    pub fn new(schema: Arc<Schema>) -> Self {
        HtmlFormat { schema }
    }
}

impl Default for HtmlFormat {
    fn default() -> Self {
        Self::new(Arc::new(Schema::with_defaults()))
    }
}

impl Format for HtmlFormat {
    fn name(&self) -> &str {
        "html"
    }

    fn description(&self) -> &str {
        "HTML fragment in the composer's DOM form"
    }

    fn file_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Node, FormatError> {
        Ok(parse_html(&self.schema, source)?)
    }

    fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        Ok(render_html(&self.schema, doc)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_html_parses_back() {
        let format = HtmlFormat::default();
        let doc = Node::new("doc").with_content(vec![
            Node::new("quote")
                .with_attr("username", "sam")
                .with_attr("post_number", 3i64)
                .with_attr("topic_id", crate::model::AttrValue::Null)
                .with_attr("full", false)
                .with_content(vec![Node::new("paragraph").with_content(vec![
                    Node::text("Hi "),
                    Node::new("mention").with_attr("name", "bob"),
                ])]),
            Node::new("ordered_list").with_attr("order", 3i64).with_content(vec![
                Node::new("list_item").with_content(vec![Node::new("paragraph")
                    .with_content(vec![Node::text("one")])]),
            ]),
        ]);
        let html = format.serialize(&doc).unwrap();
        assert_eq!(format.parse(&html).unwrap(), doc);
    }
}
