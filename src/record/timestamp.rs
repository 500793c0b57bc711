//! Second-precision filing timestamps
//!
//! Timestamps appear in two textual shapes: the listing page renders the date
//! and time in one table cell split by a `<br>`, so the visible text reads
//! `2024-01-0210:00:00`; the index stores the canonical `2024-01-02 10:00:00`.

use chrono::{NaiveDateTime, Timelike};
use std::fmt;

/// Canonical rendering used in the index and in logs
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shape of the timestamp cell text on the listing page
pub const LISTING_FORMAT: &str = "%Y-%m-%d%H:%M:%S";

/// A filing submission time
///
/// Ordering is chronological, which for four-digit years is the same order as
/// a lexicographic compare of the canonical string. The crawl stop rule and the
/// merge cutoff both compare through this type, so they always agree on what
/// "newer" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// The watermark used when no index exists yet: `1970-01-01 00:00:00`
    pub fn epoch() -> Self {
        Self(NaiveDateTime::default())
    }

    /// Parses the canonical `YYYY-MM-DD HH:MM:SS` form
    pub fn parse_canonical(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s.trim(), CANONICAL_FORMAT)
            .ok()
            .map(Self)
    }

    /// Parses the listing page form, where date and time are not separated
    pub fn parse_listing(s: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(s.trim(), LISTING_FORMAT)
            .ok()
            .map(Self)
    }

    /// Current local wall-clock time, truncated to the second
    pub fn now() -> Self {
        let now = chrono::Local::now().naive_local();
        Self(now.with_nanosecond(0).unwrap_or(now))
    }

    /// True when `self` is strictly later than `other`
    pub fn is_newer_than(&self, other: &Timestamp) -> bool {
        self > other
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_FORMAT))
    }
}
