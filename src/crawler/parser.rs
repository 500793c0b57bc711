//! Listing page parser
//!
//! This module turns one listing page into:
//! - The records extracted from entries that mention the tracked item code
//! - The oldest entry timestamp on the page (input to the stop condition)
//! - Whether the page offers a "next page" control
//!
//! Parsing is synchronous and owns the whole document, so nothing borrowed from
//! the markup outlives the call.

use crate::crawler::extractor::{extract_record, FormTypeMatcher};
use crate::record::{FilingRecord, Timestamp};
use crate::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static INPUT: Lazy<Selector> = Lazy::new(|| Selector::parse("input[value]").expect("valid selector"));

static LISTING_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}\d{2}:\d{2}:\d{2}").expect("valid listing timestamp regex")
});

/// What makes a row an entry, and what makes an entry relevant
#[derive(Debug, Clone)]
pub struct ScanRules {
    /// Text every filing entry row contains (e.g. "Current report")
    pub marker_phrase: String,

    /// Item code a relevant entry mentions
    pub item_code: String,

    /// Used to recognise the "Next N" control
    pub page_size: u32,

    /// Listing origin; relative links resolve against it
    pub origin: Url,

    pub form_matcher: FormTypeMatcher,
}

/// Everything the crawl needs from one listing page
#[derive(Debug, Default)]
pub struct PageScan {
    /// New records in page order
    pub records: Vec<FilingRecord>,

    /// Oldest timestamp among all marker entries, relevant or not
    pub oldest: Option<Timestamp>,

    /// Number of marker entries seen
    pub entries: usize,

    /// Number of entries that mention the item code
    pub matched: usize,

    pub has_next_page: bool,

    /// The malformed entry that cut extraction short on this page
    pub malformed: Option<ExtractError>,
}

/// Scans one listing page
///
/// Rows are examined as adjacent (filer row, entry row) pairs. An entry row
/// counts when its own text contains the marker phrase. Every counted entry
/// feeds the oldest-timestamp scan; entries that also mention the item code
/// are extracted. A malformed relevant entry stops extraction for the rest of
/// the page, but the oldest-timestamp scan still sees every entry.
pub fn scan_listing_page(html: &str, rules: &ScanRules, watermark: Timestamp) -> PageScan {
    let document = Html::parse_document(html);
    let rows: Vec<ElementRef<'_>> = document.select(&ROW).collect();

    let mut scan = PageScan {
        has_next_page: has_next_page(&document, rules.page_size),
        ..PageScan::default()
    };

    for pair in rows.windows(2) {
        let (prior, entry) = (pair[0], pair[1]);
        let text: String = entry.text().collect();

        if !text.contains(&rules.marker_phrase) {
            continue;
        }
        scan.entries += 1;

        if let Some(seen) = entry_timestamp(&text) {
            scan.oldest = Some(match scan.oldest {
                Some(current) => current.min(seen),
                None => seen,
            });
        }

        if !text.contains(&rules.item_code) {
            continue;
        }
        scan.matched += 1;

        if scan.malformed.is_some() {
            continue;
        }

        match extract_record(prior, entry, watermark, &rules.origin, &rules.form_matcher) {
            Ok(Some(record)) => scan.records.push(record),
            Ok(None) => {}
            Err(e) => scan.malformed = Some(e),
        }
    }

    scan
}

/// First listing-format timestamp in an entry's text
pub fn entry_timestamp(text: &str) -> Option<Timestamp> {
    LISTING_TIMESTAMP
        .find(text)
        .and_then(|m| Timestamp::parse_listing(m.as_str()))
}

/// True if the page has the `Next {page_size}` button
fn has_next_page(document: &Html, page_size: u32) -> bool {
    let label = format!("Next {}", page_size);
    document
        .select(&INPUT)
        .any(|input| input.value().attr("value") == Some(label.as_str()))
}
