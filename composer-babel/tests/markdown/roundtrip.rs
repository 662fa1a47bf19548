//! Round-trip law: import(export(doc)) == doc for documents the exporter
//! produces.

use crate::common::{doc, export, hashtag, import, mention, para};
use composer_babel::extensions::emoji;
use composer_babel::model::position::normalize_inline;
use composer_babel::Node;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Item {
    Word(String),
    Hashtag(String),
    Mention(String),
    Emoji(String),
}

fn item() -> impl Strategy<Value = Item> {
    prop_oneof![
        3 => "[a-z]{1,8}".prop_map(Item::Word),
        1 => "[a-z][a-z0-9]{0,7}".prop_map(Item::Hashtag),
        1 => "[a-z][a-z0-9]{0,7}".prop_map(Item::Mention),
        1 => "[a-z]{2,8}".prop_map(Item::Emoji),
    ]
}

/// Items whose names need not fit the `#name` / `@name` grammar.
fn loose_item() -> impl Strategy<Value = Item> {
    prop_oneof![
        3 => "[a-z]{1,8}".prop_map(Item::Word),
        1 => "[a-z][a-z0-9-]{0,5}|[a-z]{1,3} [a-z]{1,3}".prop_map(Item::Hashtag),
        1 => "[a-z][a-z0-9-]{0,5}|[a-z]{1,3}\\.[a-z]{1,3}".prop_map(Item::Mention),
        1 => "[a-z]{2,8}|\\+1".prop_map(Item::Emoji),
    ]
}

fn item_node(item: Item) -> Node {
    match item {
        Item::Word(word) => Node::text(word),
        Item::Hashtag(name) => hashtag(&name),
        Item::Mention(name) => mention(&name),
        Item::Emoji(code) => emoji(&code),
    }
}

/// A paragraph of items separated by single spaces.
fn paragraph(items: Vec<Item>) -> Node {
    let mut content = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            content.push(Node::text(" "));
        }
        content.push(item_node(item));
    }
    para(normalize_inline(content))
}

/// A paragraph of items, each with or without a space before it.
fn glued_paragraph(items: Vec<(Item, bool)>) -> Node {
    let mut content = Vec::new();
    for (index, (item, spaced)) in items.into_iter().enumerate() {
        if index > 0 && spaced {
            content.push(Node::text(" "));
        }
        content.push(item_node(item));
    }
    para(normalize_inline(content))
}

proptest! {
    #[test]
    fn prop_markdown_round_trip(blocks in prop::collection::vec(prop::collection::vec(item(), 1..8), 1..4)) {
        let original = doc(blocks.into_iter().map(paragraph).collect());
        let markdown = export(&original);
        prop_assert_eq!(import(&markdown), original, "markdown was {:?}", markdown);
    }

    #[test]
    fn prop_glued_atoms_round_trip(
        blocks in prop::collection::vec(prop::collection::vec((loose_item(), any::<bool>()), 1..8), 1..4)
    ) {
        let original = doc(blocks.into_iter().map(glued_paragraph).collect());
        let markdown = export(&original);
        prop_assert_eq!(import(&markdown), original, "markdown was {:?}", markdown);
    }
}

#[test]
fn test_cooked_atoms_next_to_text_round_trip() {
    for html in [
        r#"<p><a class="mention" data-name="bob">@bob</a>x</p>"#,
        r#"<p><a class="hashtag-cooked" data-name="a">#a</a>-b</p>"#,
        r#"<p>see <a class="hashtag-cooked" data-name="a b">#a b</a></p>"#,
        r#"<img class="emoji" alt=":x:" data-code="x">"#,
    ] {
        let first = import(html);
        let blank = |n: &Node| n.is_text() && n.text_content().trim().is_empty();
        assert!(!first.content[0].content.iter().any(blank), "{first:?}");
        let markdown = export(&first);
        assert_eq!(import(&markdown), first, "{html} exported as {markdown:?}");
    }
}

#[test]
fn test_nested_quotes_round_trip() {
    let quote = Node::new("quote")
        .with_attr("username", "sam")
        .with_attr("post_number", 3i64)
        .with_content(vec![para(vec![Node::text("Hi "), mention("bob")])]);
    let original = doc(vec![
        Node::new("blockquote").with_content(vec![quote.clone()]),
        Node::new("bullet_list").with_content(vec![Node::new("list_item").with_content(vec![
            para(vec![Node::text("item")]),
            quote,
        ])]),
    ]);
    let first = import(&export(&original));
    assert_eq!(first.count("quote"), 2);
    assert_eq!(import(&export(&first)), first);
}

#[test]
fn test_escaped_sigils_round_trip() {
    let first = import("\\#topic and \\@bob\n");
    assert_eq!(first.content[0].content, vec![Node::text("#topic and @bob")]);
    assert_eq!(import(&export(&first)), first);
}

#[test]
fn test_kitchensink_round_trip() {
    let source = "\
# Release notes

Thanks @sam for #release-2 :tada:

- fixed *the* **bug**
- added `code`

3. third
4. fourth

> quoted ~~old~~ text

[quote=\"sam, post:3, topic:42, full:true\"]
Hi
[/quote]

```rust
fn main() {}
```

---

![logo](/logo.png \"Logo\") and [a link](https://example.com)
";
    let first = import(source);
    let second = import(&export(&first));
    assert_eq!(first, second);
}
