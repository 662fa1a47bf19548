//! DOM import and render through the public API

use crate::common::{doc, import, para, schema};
use composer_babel::{parse_html, render_html, AttrValue, Node};

#[test]
fn test_aside_quote_from_dom() {
    let parsed = parse_html(
        &schema(),
        r#"<aside class="quote" data-username="sam" data-post="3" data-topic="42" data-full="true"><blockquote><p>Hi</p></blockquote></aside>"#,
    )
    .unwrap();
    let quote = &parsed.content[0];
    assert_eq!(quote.node_type, "quote");
    assert_eq!(quote.attrs.len(), 4);
    assert_eq!(quote.attr("post_number"), Some(&AttrValue::Int(3)));
    assert_eq!(quote.content, vec![para(vec![Node::text("Hi")])]);
}

#[test]
fn test_rendered_markdown_parses_back_to_same_doc() {
    let source = import(
        "Thanks @sam for #release :tada:\n\n\
         [quote=\"sam, post:3, topic:42\"]\n*quoted*\n[/quote]\n\n\
         1. one\n2. two\n",
    );
    let html = render_html(&schema(), &source).unwrap();
    assert!(html.contains(r#"class="mention""#), "{html}");
    assert!(html.contains(r#"class="hashtag-cooked""#), "{html}");
    assert!(html.contains(r#"<aside class="quote""#), "{html}");
    assert_eq!(parse_html(&schema(), &html).unwrap(), source);
}

#[test]
fn test_pasted_markup_unwraps_unknown_elements() {
    let parsed = parse_html(&schema(), "<section><p>one <span>two</span></p></section>").unwrap();
    assert_eq!(parsed, doc(vec![para(vec![Node::text("one two")])]));
}

#[test]
fn test_render_escapes_text() {
    let html = render_html(&schema(), &doc(vec![para(vec![Node::text("a < b & c")])])).unwrap();
    assert!(html.contains("a &lt; b &amp; c"), "{html}");
}
