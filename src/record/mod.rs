//! Filing records and their value types
//!
//! A [`FilingRecord`] is one row of the persisted index. Records are always
//! handled newest-first; see [`crate::index::merge`] for how that order is kept.

mod timestamp;

pub use timestamp::{Timestamp, CANONICAL_FORMAT, LISTING_FORMAT};

use std::fmt;

/// Materiality verdict as stored in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Materiality {
    /// The classifier judged the event material (`✓`)
    Material,

    /// The classifier judged the event not material (empty cell)
    NotMaterial,

    /// Unclear, or classification disabled (`?`)
    #[default]
    Unclear,
}

impl Materiality {
    /// Symbol written to the index cell
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Material => "✓",
            Self::NotMaterial => "",
            Self::Unclear => "?",
        }
    }

    /// Reads an index cell back; unknown content is treated as unclear
    pub fn from_symbol(s: &str) -> Self {
        match s.trim() {
            "✓" => Self::Material,
            "" => Self::NotMaterial,
            _ => Self::Unclear,
        }
    }
}

impl fmt::Display for Materiality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One disclosed filing that mentions the tracked item code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingRecord {
    /// Form type such as `8-K` or `8-K/A`; empty when the cell was missing
    pub form_type: String,

    /// Company name with filer-role annotations removed
    pub company: String,

    /// Submission time as disclosed on the listing
    pub timestamp: Timestamp,

    pub materiality: Materiality,

    /// Absolute URL of the filing detail page
    pub link: String,
}

impl FilingRecord {
    /// The (company, timestamp) pair the index never repeats
    pub fn key(&self) -> (&str, Timestamp) {
        (&self.company, self.timestamp)
    }
}
