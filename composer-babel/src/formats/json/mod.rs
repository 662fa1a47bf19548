//! JSON format implementation
//!
//! The document tree in the `{type, attrs, content, text, marks}` shape used
//! by browser-side editors, via `serde_json`. Parsing checks the tree against
//! the schema: unknown types, missing required attributes and content the
//! parent does not allow are rejected, and attribute defaults are filled in.

use crate::error::{FormatError, Malformed};
use crate::format::Format;
use crate::model::Node;
use crate::schema::Schema;
use std::sync::Arc;

/// Format implementation for the JSON document tree
pub struct JsonFormat {
    schema: Arc<Schema>,
}

impl JsonFormat {
    pub fn new(schema: Arc<Schema>) -> Self {
        JsonFormat { schema }
    }
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self::new(Arc::new(Schema::with_defaults()))
    }
}

impl Format for JsonFormat {
    fn name(&self) -> &str {
        "json"
    }

    fn description(&self) -> &str {
        "Document tree as JSON"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Node, FormatError> {
        let doc: Node = serde_json::from_str(source)
            .map_err(|e| FormatError::ParseError(format!("JSON parsing failed: {e}")))?;
        if doc.node_type != "doc" {
            return Err(FormatError::ParseError(format!(
                "root node must be `doc`, found `{}`",
                doc.node_type
            )));
        }
        check(&self.schema, doc).map_err(|e| FormatError::ParseError(e.to_string()))
    }

    fn serialize(&self, doc: &Node) -> Result<String, FormatError> {
        serde_json::to_string_pretty(doc)
            .map_err(|e| FormatError::SerializationError(format!("JSON serialization failed: {e}")))
    }
}

fn check(schema: &Schema, mut node: Node) -> Result<Node, Malformed> {
    if node.is_text() {
        return Ok(node);
    }
    node.attrs = match schema.node_attrs(&node.node_type, &node.attrs) {
        Some(Ok(attrs)) => attrs,
        Some(Err(attr)) => {
            return Err(Malformed::MissingAttribute {
                node: node.node_type,
                attr: attr.to_string(),
            })
        }
        None => return Err(Malformed::UnknownNodeType(node.node_type)),
    };
    let content = std::mem::take(&mut node.content);
    for child in content {
        if !schema.allows(&node.node_type, &child) {
            return Err(Malformed::InvalidContent {
                parent: node.node_type,
                child: child.node_type,
            });
        }
        node.content.push(check(schema, child)?);
    }
    Ok(node)
}
