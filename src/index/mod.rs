//! The filing index: its text format and the merge rule
//!
//! This module handles:
//! - Rendering records into the Markdown index document
//! - Parsing records back out of a stored document
//! - Merging newly crawled records with the stored ones

mod document;
mod merger;

pub use document::{
    parse_records, parse_row, render_document, render_row, schema_version, IndexLayout,
    SCHEMA_VERSION,
};
pub use merger::{merge, new_prefix_len};
