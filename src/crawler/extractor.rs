//! Record extraction from one listing entry
//!
//! The listing renders each filing as two adjacent table rows: the first names
//! the filer (with a hyperlink to its filing list), the second carries the form
//! type, the document links, the item description, and the submission time.

use crate::record::{FilingRecord, Materiality, Timestamp};
use crate::{ExtractError, ExtractResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));
static NOWRAP_CELL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td[nowrap]").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static LINE_BREAK: Lazy<Selector> = Lazy::new(|| Selector::parse("br").expect("valid selector"));

static FILER_ROLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\) \(Filer\)\s*").expect("valid filer-role regex"));

/// Visible text of the document link on each entry
pub const HTML_LINK_TEXT: &str = "[html]";

/// Matches the form-type cell, e.g. `8-K` or `8-K/A`
#[derive(Debug, Clone)]
pub struct FormTypeMatcher {
    pattern: Regex,
}

impl FormTypeMatcher {
    pub fn new(form_type: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!("^{}(/A)?$", regex::escape(form_type.trim())))?;
        Ok(Self { pattern })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text.trim())
    }
}

/// Strips the `(CIK) (Filer)` annotation and collapses whitespace
///
/// Line breaks and runs of spaces inside the name become single spaces, so the
/// result can be written to one index cell unchanged.
///
/// # Example
///
/// ```
/// use filing_watch::crawler::normalize_company;
///
/// assert_eq!(normalize_company("Example Corp (0001234567) (Filer)"), "Example Corp");
/// ```
pub fn normalize_company(raw: &str) -> String {
    FILER_ROLE
        .replace_all(raw, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts one filing record from a filer row and the entry row below it
///
/// Returns `Ok(None)` when the entry is not strictly newer than `watermark`;
/// nothing past the timestamp is read in that case. The returned record carries
/// [`Materiality::Unclear`] until a classifier assesses it.
///
/// # Errors
///
/// Any expected element that is missing is an [`ExtractError`]; the caller
/// decides how far that failure reaches.
pub fn extract_record(
    prior: ElementRef<'_>,
    entry: ElementRef<'_>,
    watermark: Timestamp,
    origin: &Url,
    form_matcher: &FormTypeMatcher,
) -> ExtractResult<Option<FilingRecord>> {
    let company = prior
        .select(&ANCHOR)
        .next()
        .map(|a| normalize_company(&a.text().collect::<String>()))
        .ok_or(ExtractError::MissingCompany)?;

    let timestamp = extract_timestamp(entry)?;
    if !timestamp.is_newer_than(&watermark) {
        tracing::debug!("Skipping {} at {} (already indexed)", company, timestamp);
        return Ok(None);
    }

    let link = extract_link(entry, origin)?;

    let form_type = entry
        .select(&CELL)
        .map(|td| td.text().collect::<String>())
        .find(|text| form_matcher.is_match(text))
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    Ok(Some(FilingRecord {
        form_type,
        company,
        timestamp,
        materiality: Materiality::Unclear,
        link,
    }))
}

/// Reads the submission time from the nowrap cell that holds a line break
fn extract_timestamp(entry: ElementRef<'_>) -> ExtractResult<Timestamp> {
    let cell = entry
        .select(&NOWRAP_CELL)
        .find(|td| td.select(&LINE_BREAK).next().is_some())
        .ok_or(ExtractError::MissingTimestamp)?;

    let text: String = cell.text().collect();
    Timestamp::parse_listing(&text).ok_or_else(|| ExtractError::BadTimestamp(text.trim().to_string()))
}

/// Resolves the `[html]` document link against the listing origin
fn extract_link(entry: ElementRef<'_>, origin: &Url) -> ExtractResult<String> {
    let href = entry
        .select(&LINK)
        .find(|a| a.text().collect::<String>().trim() == HTML_LINK_TEXT)
        .and_then(|a| a.value().attr("href"))
        .ok_or(ExtractError::MissingLink)?;

    origin
        .join(href.trim())
        .map(|url| url.to_string())
        .map_err(|_| ExtractError::BadLink(href.to_string()))
}
