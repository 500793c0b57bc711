//! Merging newly crawled records into the existing index

use crate::record::FilingRecord;

/// Number of leading `new_records` strictly newer than the newest old record
///
/// Both lists are newest-first, so the scan stops at the first record that is
/// not newer: this is a prefix length, not a filter count.
pub fn new_prefix_len(new_records: &[FilingRecord], old_records: &[FilingRecord]) -> usize {
    match old_records.first() {
        None => new_records.len(),
        Some(newest_old) => new_records
            .iter()
            .take_while(|record| record.timestamp.is_newer_than(&newest_old.timestamp))
            .count(),
    }
}

/// Combines new and old records, both newest-first, into one newest-first list
///
/// With no old records the result is `new_records` unchanged. Otherwise the
/// newest old timestamp is the cutoff: the longest prefix of `new_records`
/// strictly newer than it is placed in front of `old_records`. A new record at
/// exactly the cutoff second is dropped even if it is a different filing.
///
/// # Example
///
/// ```
/// use filing_watch::index::merge;
/// use filing_watch::{FilingRecord, Materiality, Timestamp};
///
/// let rec = |ts: &str| FilingRecord {
///     form_type: "8-K".to_string(),
///     company: "Example Corp".to_string(),
///     timestamp: Timestamp::parse_canonical(ts).unwrap(),
///     materiality: Materiality::Unclear,
///     link: "https://www.sec.gov/x".to_string(),
/// };
/// let old = vec![rec("2024-01-02 10:00:00")];
/// let new = vec![rec("2024-01-03 09:00:00"), rec("2024-01-02 10:00:00")];
/// let merged = merge(&new, Some(&old));
/// assert_eq!(merged, vec![new[0].clone(), old[0].clone()]);
/// ```
pub fn merge(
    new_records: &[FilingRecord],
    old_records: Option<&[FilingRecord]>,
) -> Vec<FilingRecord> {
    let old_records = old_records.unwrap_or_default();
    let keep = new_prefix_len(new_records, old_records);

    let mut merged = Vec::with_capacity(keep + old_records.len());
    merged.extend_from_slice(&new_records[..keep]);
    merged.extend_from_slice(old_records);
    merged
}
