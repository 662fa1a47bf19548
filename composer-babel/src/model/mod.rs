//! Document model
//!
//! A document is a value tree of [`Node`]s. Marks annotate inline content and
//! are stored on the inline nodes they cover. Addressing by flat positions is
//! provided by [`position`].

mod attrs;
mod node;
pub mod position;

pub use attrs::{AttrKind, AttrValue, Attrs};
pub use node::{Mark, Node};
