//! Shared import machinery used by the markdown and HTML importers.

pub mod builder;
