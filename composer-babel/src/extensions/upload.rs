//! Upload placeholders
//!
//! Stand-ins for content that is still being uploaded. They are created by
//! the placeholder commands only and are never produced by parsing. An export
//! taken while an upload is pending still carries a readable `[label]()`
//! marker.

use crate::error::ExportError;
use crate::extension::{DomOutput, Extension};
use crate::formats::markdown::serializer::MarkdownWriter;
use crate::model::{AttrKind, Node};
use crate::schema::{AttrSpec, NodeSpec, TypeSpec};

/// Node type name of upload placeholders.
pub const PLACEHOLDER: &str = "upload_placeholder";

#[derive(Debug, Clone, Copy, Default)]
pub struct UploadPlaceholderExtension;

/// A placeholder node for an upload id.
pub fn placeholder(id: &str, filename: &str, label: &str) -> Node {
    Node::new(PLACEHOLDER)
        .with_attr("id", id)
        .with_attr("filename", filename)
        .with_attr("label", label)
}

fn label_of(node: &Node) -> &str {
    node.attr_str("label").unwrap_or_default()
}

impl Extension for UploadPlaceholderExtension {
    fn name(&self) -> &'static str {
        "upload"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Node(
            NodeSpec::inline_atom(PLACEHOLDER)
                .attr(AttrSpec::required("id", AttrKind::Str))
                .attr(AttrSpec::optional("filename", AttrKind::Str, ""))
                .attr(AttrSpec::optional("label", AttrKind::Str, "")),
        )
    }

    fn to_dom(&self, node: &Node) -> Option<DomOutput> {
        Some(DomOutput::element(
            "span",
            vec![
                ("class", "upload-placeholder".to_string()),
                ("data-upload-id", node.attr_str("id").unwrap_or_default().to_string()),
            ],
            vec![DomOutput::Text(label_of(node).to_string())],
        ))
    }

    fn leaf_text(&self, node: &Node) -> Option<String> {
        Some(label_of(node).to_string())
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn serialize_node(&self, node: &Node, out: &mut MarkdownWriter<'_>) -> Result<(), ExportError> {
        out.write(&format!("[{}]()", label_of(node)));
        Ok(())
    }
}
