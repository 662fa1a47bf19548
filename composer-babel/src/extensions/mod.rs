//! Built-in extensions
//!
//! | Extension       | Type                 | Markdown              | DOM                         |
//! |-----------------|----------------------|-----------------------|-----------------------------|
//! | hashtag         | inline atom          | `#name`               | `a.hashtag-cooked`          |
//! | mention         | inline atom          | `@name`               | `a.mention`                 |
//! | quote           | block container      | `[quote="..."]`       | `aside.quote > blockquote`  |
//! | emoji           | inline atom          | `:code:`              | `img.emoji`                 |
//! | upload          | inline atom          | `[label]()`           | `span.upload-placeholder`   |
//! | strikethrough   | mark                 | `~~text~~`            | `s`, `del`                  |
//!
//! [`defaults`] returns them in registration order, which is also their
//! matching priority.

mod emoji;
mod hashtag;
mod mention;
pub mod quote;
mod strikethrough;
mod upload;

pub use emoji::{emoji, EmojiExtension};
pub use hashtag::{HashtagExtension, COOKED_CLASS, RAW_CLASS};
pub use mention::MentionExtension;
pub use quote::QuoteExtension;
pub use strikethrough::StrikethroughExtension;
pub use upload::{placeholder, UploadPlaceholderExtension, PLACEHOLDER};

use crate::extension::Extension;
use std::sync::Arc;

/// The built-in extensions in registration order.
pub fn defaults() -> Vec<Arc<dyn Extension>> {
    vec![
        Arc::new(HashtagExtension),
        Arc::new(MentionExtension),
        Arc::new(QuoteExtension),
        Arc::new(EmojiExtension),
        Arc::new(UploadPlaceholderExtension),
        Arc::new(StrikethroughExtension),
    ]
}
