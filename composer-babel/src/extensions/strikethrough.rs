//! Strikethrough (`~~text~~`), contributed as a mark.

use crate::extension::{
    DomContent, DomElement, DomOutput, DomRule, Extension, TokenAction, TokenHandler,
};
use crate::formats::markdown::token::Token;
use crate::model::{Attrs, Mark};
use crate::schema::{MarkSpec, TypeSpec};

#[derive(Debug, Clone, Copy, Default)]
pub struct StrikethroughExtension;

fn no_attrs(_: &DomElement) -> Option<Attrs> {
    Some(Attrs::new())
}

fn open_mark(_: &Token) -> TokenAction {
    TokenAction::OpenMark(Mark::new("strikethrough"))
}

impl Extension for StrikethroughExtension {
    fn name(&self) -> &'static str {
        "strikethrough"
    }

    fn spec(&self) -> TypeSpec {
        TypeSpec::Mark(MarkSpec::new("strikethrough"))
    }

    fn parse_dom(&self) -> Vec<DomRule> {
        ["s", "del"]
            .into_iter()
            .map(|tag| DomRule {
                tag,
                class: None,
                get_attrs: no_attrs,
                content: DomContent::Children,
            })
            .collect()
    }

    fn mark_to_dom(&self, _mark: &Mark) -> Option<DomOutput> {
        Some(DomOutput::element("s", Vec::new(), vec![DomOutput::Hole]))
    }

    fn token_handlers(&self) -> Vec<TokenHandler> {
        vec![TokenHandler {
            token: "s",
            handle: open_mark,
        }]
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn mark_delimiters(&self, _mark: &Mark) -> Option<(String, String)> {
        Some(("~~".to_string(), "~~".to_string()))
    }
}
