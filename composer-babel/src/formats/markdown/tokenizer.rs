//! Markdown tokenization
//!
//! Pipeline: source → BBCode quote segments → Comrak AST per segment → tokens
//!
//! Comrak handles the CommonMark grammar. Two things are layered on top:
//!
//! - `[quote="..."]` / `[/quote]` lines starting at column 0 (outside fenced
//!   code) delimit quoted replies. They are cut out before Comrak sees the
//!   source and become `bbcode` tokens around the recursively tokenized body.
//!   An unclosed `[quote]` is left as plain text.
//! - Text runs are scanned for `#tag`, `@user` and `:emoji:` after whitespace
//!   or at the start of a text run. Matches become `span.hashtag-raw`,
//!   `mention` and `emoji` tokens. Link text and code are never scanned. A
//!   backslash before the sigil (`\#tag`) keeps the construct plain text.
//!
//! Inline HTML from an opening tag to its matching close (or a lone void tag
//! such as `<img>`) with only text in between becomes one `html_inline`
//! token. Its content is the HTML fragment; its children are the tokens the
//! run would produce as plain text, for when no DOM rule claims the element.

use super::default_comrak_options;
use super::token::Token;
use crate::extensions::quote::header_attrs;
use crate::extensions::RAW_CLASS;
use crate::schema::Schema;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{parse_document, Arena};
use once_cell::sync::Lazy;
use regex::{Match, Regex};

static QUOTE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\[quote(?:="?([^"\]]*)"?)?\]\s*$"#).expect("valid quote open regex")
});
static QUOTE_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[/quote\]\s*$").expect("valid quote close regex"));
static HTML_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<([A-Za-z][A-Za-z0-9-]*)[\s/>]").expect("valid html open regex"));
static HTML_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</([A-Za-z][A-Za-z0-9-]*)\s*>$").expect("valid html close regex"));
static INLINE_TRIGGERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<lead>^|\s)(?:#(?P<tag>\w[\w-]*)|@(?P<user>\w[\w-]*)|:(?P<emoji>[\w+-]+):)")
        .expect("valid inline trigger regex")
});

static TRIGGER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w[\w-]*$").expect("valid trigger name regex"));
static EMOJI_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w+-]+$").expect("valid emoji code regex"));

const VOID_TAGS: [&str; 5] = ["br", "hr", "img", "input", "wbr"];

/// Escaped trigger sigils and the private-use characters standing in for
/// them while Comrak parses.
const ESCAPED_SIGILS: [(char, char); 3] = [('#', '\u{E000}'), ('@', '\u{E001}'), (':', '\u{E002}')];

/// Which constructs the tokenizer recognizes beyond CommonMark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub hashtags: bool,
    pub mentions: bool,
    pub emoji: bool,
    pub quotes: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        TokenizerOptions {
            hashtags: true,
            mentions: true,
            emoji: true,
            quotes: true,
        }
    }
}

impl TokenizerOptions {
    /// Recognize only the constructs some registered extension can import.
    pub fn for_schema(schema: &Schema) -> Self {
        TokenizerOptions {
            hashtags: schema.has_node("hashtag"),
            mentions: schema.has_node("mention"),
            emoji: schema.has_node("emoji"),
            quotes: schema.has_node("quote"),
        }
    }
}

/// Whether `#name` and `@name` scan back as exactly `name`.
pub(crate) fn is_trigger_name(name: &str) -> bool {
    TRIGGER_NAME.is_match(name)
}

/// Whether `:code:` scans back as exactly `code`.
pub(crate) fn is_emoji_code(code: &str) -> bool {
    EMOJI_CODE.is_match(code)
}

/// Byte offsets of the sigils in `text` that would scan as a hashtag,
/// mention or emoji. `boundary` says whether whitespace or the start of the
/// run precedes `text`.
pub(crate) fn trigger_sigils(text: &str, boundary: bool) -> Vec<usize> {
    INLINE_TRIGGERS
        .captures_iter(text)
        .filter_map(|caps| caps.name("lead"))
        .filter(|lead| leads_trigger(lead, boundary))
        .map(|lead| lead.end())
        .collect()
}

fn leads_trigger(lead: &Match<'_>, boundary: bool) -> bool {
    !lead.as_str().is_empty() || (lead.start() == 0 && boundary)
}

/// Tokenize markdown source.
pub fn tokenize(source: &str, options: &TokenizerOptions) -> Vec<Token> {
    let mut tokens = Vec::new();
    for segment in split_quotes(source, options.quotes) {
        match segment {
            Segment::Markdown(text) => markdown_tokens(&text, options, &mut tokens),
            Segment::Quote { meta, body } => {
                let attrs = header_attrs(meta.as_deref().unwrap_or_default());
                let username = attrs
                    .iter()
                    .find(|(name, _)| name == "data-username")
                    .map(|(_, value)| value.clone());
                tokens.push(
                    attrs
                        .into_iter()
                        .fold(Token::open("bbcode", "aside"), |t, (k, v)| t.with_attr(k, v)),
                );
                tokens.push(Token::open("quote_header", "div").with_attr("class", "quote-header"));
                if let Some(username) = username {
                    tokens.push(Token::text(format!("{username}:")));
                }
                tokens.push(Token::close("quote_header", "div"));
                tokens.push(Token::open("bbcode", "blockquote"));
                tokens.extend(tokenize(&body, options));
                tokens.push(Token::close("bbcode", "blockquote"));
                tokens.push(Token::close("bbcode", "aside"));
            }
        }
    }
    tokens
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Markdown(String),
    Quote { meta: Option<String>, body: String },
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn split_quotes(source: &str, enabled: bool) -> Vec<Segment> {
    if !enabled {
        return vec![Segment::Markdown(source.to_string())];
    }

    let mut segments = Vec::new();
    let mut markdown = String::new();
    let mut body = String::new();
    let mut open_line = String::new();
    let mut meta: Option<String> = None;
    let mut depth = 0usize;
    let mut in_fence = false;

    for line in source.split_inclusive('\n') {
        let bare = line.trim_end_matches(['\n', '\r']);
        if is_fence(bare) {
            in_fence = !in_fence;
        } else if !in_fence {
            if let Some(caps) = QUOTE_OPEN.captures(bare) {
                depth += 1;
                if depth == 1 {
                    if !markdown.is_empty() {
                        segments.push(Segment::Markdown(std::mem::take(&mut markdown)));
                    }
                    meta = caps.get(1).map(|m| m.as_str().to_string());
                    open_line = line.to_string();
                    continue;
                }
            } else if depth > 0 && QUOTE_CLOSE.is_match(bare) {
                depth -= 1;
                if depth == 0 {
                    segments.push(Segment::Quote {
                        meta: meta.take(),
                        body: std::mem::take(&mut body),
                    });
                    continue;
                }
            }
        }
        if depth > 0 {
            body.push_str(line);
        } else {
            markdown.push_str(line);
        }
    }

    if depth > 0 {
        // Unclosed quote: keep everything from the opening line as text.
        markdown.push_str(&open_line);
        markdown.push_str(&body);
    }
    if !markdown.is_empty() {
        segments.push(Segment::Markdown(markdown));
    }
    segments
}

fn markdown_tokens(source: &str, options: &TokenizerOptions, out: &mut Vec<Token>) {
    let arena = Arena::new();
    let source = protect_escapes(source);
    let root = parse_document(&arena, &source, &default_comrak_options());
    for child in root.children() {
        block_tokens(child, options, out);
    }
}

fn block_tokens<'a>(node: &'a AstNode<'a>, options: &TokenizerOptions, out: &mut Vec<Token>) {
    let value = node.data.borrow().value.clone();
    let (name, tag) = match value {
        NodeValue::Paragraph => ("paragraph", "p".to_string()),
        NodeValue::Heading(heading) => ("heading", format!("h{}", heading.level)),
        NodeValue::BlockQuote => ("blockquote", "blockquote".to_string()),
        NodeValue::Item(_) => ("list_item", "li".to_string()),
        NodeValue::List(list) => {
            let (name, tag) = match list.list_type {
                ListType::Bullet => ("bullet_list", "ul"),
                ListType::Ordered => ("ordered_list", "ol"),
            };
            let mut open = Token::open(name, tag);
            if list.list_type == ListType::Ordered {
                open = open.with_attr("start", list.start.to_string());
            }
            out.push(open);
            for child in node.children() {
                block_tokens(child, options, out);
            }
            out.push(Token::close(name, tag));
            return;
        }
        NodeValue::CodeBlock(code) => {
            let literal = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
            out.push(
                Token::leaf("fence", "code")
                    .with_content(restore_escapes(literal))
                    .with_info(unescape_sigils(code.info.trim())),
            );
            return;
        }
        NodeValue::HtmlBlock(html) => {
            out.push(Token::leaf("html_block", "").with_content(restore_escapes(&html.literal)));
            return;
        }
        NodeValue::ThematicBreak => {
            out.push(Token::leaf("hr", "hr"));
            return;
        }
        other => {
            tracing::debug!(node = ?other, "skipping unsupported markdown block");
            return;
        }
    };

    out.push(Token::open(name, &tag));
    if matches!(name, "paragraph" | "heading") {
        let mut scan = Scan::new(options);
        let mut children = Vec::new();
        inline_sequence(node, &mut scan, &mut children);
        out.push(Token::leaf("inline", "").with_children(children));
    } else {
        for child in node.children() {
            block_tokens(child, options, out);
        }
    }
    out.push(Token::close(name, &tag));
}

/// Text scanning state for one inline sequence.
struct Scan<'o> {
    options: &'o TokenizerOptions,
    /// Whether the previous character was whitespace or the sequence start.
    boundary: bool,
    in_link: usize,
}

impl<'o> Scan<'o> {
    fn new(options: &'o TokenizerOptions) -> Self {
        Scan {
            options,
            boundary: true,
            in_link: 0,
        }
    }

    fn text(&mut self, text: &str, out: &mut Vec<Token>) {
        if text.is_empty() {
            return;
        }
        if self.in_link > 0 {
            out.push(Token::text(unescape_sigils(text)));
            self.settle(text);
            return;
        }

        let mut last = 0;
        for caps in INLINE_TRIGGERS.captures_iter(text) {
            let Some(lead) = caps.name("lead") else {
                continue;
            };
            if !leads_trigger(&lead, self.boundary) {
                continue;
            }
            let token = if let Some(tag) = caps.name("tag").filter(|_| self.options.hashtags) {
                vec![
                    Token::open("span", "span").with_attr("class", RAW_CLASS),
                    Token::text(format!("#{}", tag.as_str())),
                    Token::close("span", "span"),
                ]
            } else if let Some(user) = caps.name("user").filter(|_| self.options.mentions) {
                vec![
                    Token::open("mention", "span").with_attr("class", "mention"),
                    Token::text(format!("@{}", user.as_str())),
                    Token::close("mention", "span"),
                ]
            } else if let Some(code) = caps.name("emoji").filter(|_| self.options.emoji) {
                vec![Token::leaf("emoji", "img").with_markup(code.as_str())]
            } else {
                continue;
            };

            if lead.end() > last {
                out.push(Token::text(unescape_sigils(&text[last..lead.end()])));
            }
            out.extend(token);
            last = caps.get(0).map_or(lead.end(), |m| m.end());
        }

        if last < text.len() {
            out.push(Token::text(unescape_sigils(&text[last..])));
        }
        self.settle(text);
    }

    fn settle(&mut self, text: &str) {
        self.boundary = text.chars().last().is_some_and(char::is_whitespace);
    }
}

fn inline_tokens<'a>(node: &'a AstNode<'a>, scan: &mut Scan<'_>, out: &mut Vec<Token>) {
    let value = node.data.borrow().value.clone();
    let (name, tag) = match value {
        NodeValue::Text(text) => {
            scan.text(&text, out);
            return;
        }
        NodeValue::HtmlInline(html) => {
            out.push(Token::text(restore_escapes(&html)));
            scan.settle(&html);
            return;
        }
        NodeValue::Code(code) => {
            out.push(Token::leaf("code_inline", "code").with_content(restore_escapes(&code.literal)));
            scan.boundary = false;
            return;
        }
        NodeValue::SoftBreak => {
            out.push(Token::leaf("softbreak", "br"));
            scan.boundary = true;
            return;
        }
        NodeValue::LineBreak => {
            out.push(Token::leaf("hardbreak", "br"));
            scan.boundary = true;
            return;
        }
        NodeValue::Image(link) => {
            let mut token = Token::leaf("image", "img")
                .with_attr("src", unescape_sigils(&link.url))
                .with_content(plain_text(node));
            if !link.title.is_empty() {
                token = token.with_attr("title", unescape_sigils(&link.title));
            }
            out.push(token);
            scan.boundary = false;
            return;
        }
        NodeValue::Link(link) => {
            let mut token = Token::open("link", "a").with_attr("href", unescape_sigils(&link.url));
            if !link.title.is_empty() {
                token = token.with_attr("title", unescape_sigils(&link.title));
            }
            out.push(token);
            scan.in_link += 1;
            inline_sequence(node, scan, out);
            scan.in_link -= 1;
            out.push(Token::close("link", "a"));
            return;
        }
        NodeValue::Emph => ("em", "em"),
        NodeValue::Strong => ("strong", "strong"),
        NodeValue::Strikethrough => ("s", "s"),
        _ => {
            inline_sequence(node, scan, out);
            return;
        }
    };

    out.push(Token::open(name, tag));
    inline_sequence(node, scan, out);
    out.push(Token::close(name, tag));
}

fn inline_sequence<'a>(parent: &'a AstNode<'a>, scan: &mut Scan<'_>, out: &mut Vec<Token>) {
    let children: Vec<_> = parent.children().collect();
    let mut index = 0;
    while index < children.len() {
        match html_run(&children[index..]) {
            Some((html, len)) => {
                let mut fallback = Vec::new();
                for &child in &children[index..index + len] {
                    inline_tokens(child, scan, &mut fallback);
                }
                out.push(Token::leaf("html_inline", "").with_content(html).with_children(fallback));
                index += len;
            }
            None => {
                inline_tokens(children[index], scan, out);
                index += 1;
            }
        }
    }
}

/// The HTML fragment of an inline element starting at `nodes[0]` and the
/// number of nodes it spans.
fn html_run<'a>(nodes: &[&'a AstNode<'a>]) -> Option<(String, usize)> {
    let mut html = String::new();
    let mut tag = String::new();
    let mut depth = 0usize;
    for (index, node) in nodes.iter().enumerate() {
        match &node.data.borrow().value {
            NodeValue::HtmlInline(literal) => {
                html.push_str(&restore_escapes(literal));
                if index == 0 {
                    let (name, void) = open_tag(literal)?;
                    if void {
                        return Some((html, 1));
                    }
                    tag = name;
                    depth = 1;
                } else if let Some((name, void)) = open_tag(literal) {
                    if name == tag && !void {
                        depth += 1;
                    }
                } else if close_tag(literal).is_some_and(|name| name == tag) {
                    depth -= 1;
                    if depth == 0 {
                        return Some((html, index + 1));
                    }
                }
            }
            NodeValue::Text(text) if index > 0 => html.push_str(&escape_html(&unescape_sigils(text))),
            NodeValue::SoftBreak if index > 0 => html.push('\n'),
            _ => return None,
        }
    }
    None
}

/// Tag name of an opening tag and whether it has no closing tag.
fn open_tag(html: &str) -> Option<(String, bool)> {
    let name = HTML_OPEN.captures(html)?[1].to_ascii_lowercase();
    let void = VOID_TAGS.contains(&name.as_str()) || html.trim_end().ends_with("/>");
    Some((name, void))
}

fn close_tag(html: &str) -> Option<String> {
    HTML_CLOSE
        .captures(html)
        .map(|caps| caps[1].to_ascii_lowercase())
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Replace `\#`, `\@` and `\:` with their stand-ins. Other escapes, `\\`
/// included, are copied unchanged.
fn protect_escapes(source: &str) -> String {
    let mut protected = String::with_capacity(source.len());
    let mut chars = source.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            protected.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) => match ESCAPED_SIGILS.iter().find(|(sigil, _)| *sigil == next) {
                Some((_, stand_in)) => protected.push(*stand_in),
                None => {
                    protected.push('\\');
                    protected.push(next);
                }
            },
            None => protected.push('\\'),
        }
    }
    protected
}

/// Stand-ins back to the bare sigil, for text Comrak has unescaped.
fn unescape_sigils(text: &str) -> String {
    text.chars()
        .map(|ch| {
            ESCAPED_SIGILS
                .iter()
                .find(|(_, stand_in)| *stand_in == ch)
                .map_or(ch, |(sigil, _)| *sigil)
        })
        .collect()
}

/// Stand-ins back to the escaped source, for literals Comrak keeps verbatim.
fn restore_escapes(text: &str) -> String {
    let mut restored = String::with_capacity(text.len());
    for ch in text.chars() {
        match ESCAPED_SIGILS.iter().find(|(_, stand_in)| *stand_in == ch) {
            Some((sigil, _)) => {
                restored.push('\\');
                restored.push(*sigil);
            }
            None => restored.push(ch),
        }
    }
    restored
}

fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for child in node.descendants() {
        match &child.data.borrow().value {
            NodeValue::Text(t) => text.push_str(&unescape_sigils(t)),
            NodeValue::Code(code) => text.push_str(&restore_escapes(&code.literal)),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}
