//! Markdown import (tokens → document)
//!
//! Walks the token stream and drives a [`DocumentBuilder`]. For each token
//! the extension handlers registered for its name are tried in registration
//! order; the first one that does not decline decides what happens. Tokens no
//! extension claims fall back to the built-in CommonMark mapping, and tokens
//! nothing knows pass through (their children are kept).
//!
//! Raw HTML blocks are imported through the DOM importer so that cooked
//! markup (`<aside class="quote">`, `<a class="mention">`) pasted into the
//! source yields the same nodes as its markdown form. Inline HTML takes the
//! same route when a DOM rule claims it and is otherwise kept as text.

use super::token::Token;
use crate::common::builder::DocumentBuilder;
use crate::error::{ImportError, Malformed};
use crate::extension::TokenAction;
use crate::formats::html::parser::{import_fragment, import_inline_fragment};
use crate::model::{AttrKind, AttrValue, Attrs, Mark, Node};
use crate::schema::Schema;

/// Build a document from a token stream.
pub fn import_tokens(schema: &Schema, tokens: &[Token]) -> Result<Node, ImportError> {
    let mut builder = DocumentBuilder::new(schema);
    walk(&mut builder, tokens)?;
    Ok(builder.finish()?)
}

fn walk(builder: &mut DocumentBuilder<'_>, tokens: &[Token]) -> Result<(), ImportError> {
    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        index += 1;

        if token.is_close() {
            builder.close(&token.name)?;
            continue;
        }

        match extension_action(builder.schema(), token) {
            Some(TokenAction::Ignore) => {
                tracing::debug!(token = %token.name, "dropping ignored token region");
                if token.is_open() {
                    index = skip_region(tokens, index)?;
                }
            }
            Some(action) => apply(builder, token, action)?,
            None => builtin(builder, token)?,
        }
    }
    Ok(())
}

fn extension_action(schema: &Schema, token: &Token) -> Option<TokenAction> {
    schema
        .token_handlers(&token.name)
        .map(|handler| (handler.handle)(token))
        .find(|action| *action != TokenAction::Decline)
}

fn apply(builder: &mut DocumentBuilder<'_>, token: &Token, action: TokenAction) -> Result<(), ImportError> {
    match action {
        TokenAction::Open { node_type, attrs } => {
            builder.open_node(node_type, attrs, &token.name)?;
            if !token.is_open() {
                walk(builder, &token.children)?;
                builder.close(&token.name)?;
            }
        }
        TokenAction::OpenMark(mark) => {
            builder.open_mark(mark, &token.name);
            if !token.is_open() {
                walk(builder, &token.children)?;
                builder.close(&token.name)?;
            }
        }
        TokenAction::Leaf(node) => builder.add_node(node)?,
        TokenAction::Passthrough | TokenAction::Decline | TokenAction::Ignore => {
            passthrough(builder, token)?;
        }
    }
    Ok(())
}

fn passthrough(builder: &mut DocumentBuilder<'_>, token: &Token) -> Result<(), ImportError> {
    if token.is_open() {
        builder.open_transparent(&token.name);
    } else {
        walk(builder, &token.children)?;
    }
    Ok(())
}

/// Index just past the close matching the open before `index`.
fn skip_region(tokens: &[Token], mut index: usize) -> Result<usize, Malformed> {
    let mut depth = 1usize;
    while index < tokens.len() {
        let token = &tokens[index];
        index += 1;
        if token.is_open() {
            depth += 1;
        } else if token.is_close() {
            depth -= 1;
            if depth == 0 {
                return Ok(index);
            }
        }
    }
    Err(Malformed::Unclosed(depth))
}

fn builtin(builder: &mut DocumentBuilder<'_>, token: &Token) -> Result<(), ImportError> {
    let schema = builder.schema();
    let name = token.name.as_str();
    match name {
        "paragraph" | "blockquote" | "bullet_list" | "list_item" => {
            builder.open_node(name, Attrs::new(), name)?;
        }
        "heading" => {
            let level = token
                .tag
                .strip_prefix('h')
                .and_then(|level| level.parse::<i64>().ok())
                .unwrap_or(1);
            builder.open_node(name, attrs([("level", AttrValue::Int(level))]), name)?;
        }
        "ordered_list" => {
            let order = AttrValue::parse_as(AttrKind::Int, token.attr("start"));
            builder.open_node(name, attrs([("order", order)]), name)?;
        }
        "em" | "strong" => builder.open_mark(Mark::new(name), name),
        "link" => {
            let mut mark = Mark::new("link").with_attr("href", token.attr("href").unwrap_or_default());
            if let Some(title) = token.attr("title") {
                mark = mark.with_attr("title", title);
            }
            builder.open_mark(mark, name);
        }
        "fence" => {
            let content = match token.content.as_str() {
                "" => Vec::new(),
                text => vec![Node::text(text)],
            };
            let node = schema.node(
                "code_block",
                attrs([("params", AttrValue::from(token.info.as_str()))]),
                content,
            );
            builder.add_node(node)?;
        }
        "hr" => builder.add_node(Node::new("horizontal_rule"))?,
        "hardbreak" => builder.add_node(Node::new("hard_break"))?,
        "image" => {
            let mut image = Node::new("image").with_attr("src", token.attr("src").unwrap_or_default());
            if !token.content.is_empty() {
                image = image.with_attr("alt", token.content.as_str());
            }
            if let Some(title) = token.attr("title") {
                image = image.with_attr("title", title);
            }
            builder.add_node(image)?;
        }
        "text" => builder.add_text(&token.content, &[])?,
        "softbreak" => builder.add_text("\n", &[])?,
        "code_inline" => builder.add_text(&token.content, &[Mark::new("code")])?,
        "html_block" => import_fragment(builder, &token.content)?,
        "html_inline" => {
            if !import_inline_fragment(builder, &token.content)? {
                walk(builder, &token.children)?;
            }
        }
        "inline" => walk(builder, &token.children)?,
        _ => {
            tracing::debug!(token = %token.name, "passing through unknown token");
            passthrough(builder, token)?;
        }
    }
    Ok(())
}

fn attrs<const N: usize>(pairs: [(&str, AttrValue); N]) -> Attrs {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}
