//! The persisted index document
//!
//! The index is a Markdown file: a heading block, a table of records, and an
//! optional disclaimer. Rows are found by shape rather than by line number, so
//! older headings (and the legacy three-column layout) still parse.
//!
//! Current layout, with classification enabled:
//!
//! ```text
//! # List of Form 8-Ks with item 1.05
//! <!-- filing-watch schema: 2 -->
//! Last checked 2024-01-03 12:00:00
//!
//! Material: ✓ = yes, blank = no, ? = unclear
//!
//! |Form|Company|Timestamp|Material|Link|
//! |---|---|---|:-:|---|
//! |8-K|Example Corp|2024-01-03 09:00:00|✓|[link](https://www.sec.gov/...)|
//!
//! *Materiality is assessed by a language model and may be wrong.*
//! ```

use crate::record::{FilingRecord, Materiality, Timestamp};
use once_cell::sync::Lazy;
use regex::Regex;

/// Version written into the heading of every document this crate renders
pub const SCHEMA_VERSION: u32 = 2;

const LEGEND: &str = "Material: ✓ = yes, blank = no, ? = unclear";
const DISCLAIMER: &str = "*Materiality is assessed by a language model and may be wrong.*";

static SCHEMA_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<!--\s*filing-watch schema:\s*(\d+)\s*-->").expect("valid schema regex")
});

/// Shape of the rendered document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    /// Tracked item code shown in the title
    pub item_code: String,

    /// Whether the Material column, legend, and disclaimer are written
    pub classified: bool,
}

/// Renders the full document
pub fn render_document(
    records: &[FilingRecord],
    layout: &IndexLayout,
    checked_at: Timestamp,
) -> String {
    let mut doc = String::new();

    doc.push_str(&format!(
        "# List of Form 8-Ks with item {}\n",
        layout.item_code
    ));
    doc.push_str(&format!(
        "<!-- filing-watch schema: {} -->\n",
        SCHEMA_VERSION
    ));
    doc.push_str(&format!("Last checked {}\n\n", checked_at));

    if layout.classified {
        doc.push_str(LEGEND);
        doc.push_str("\n\n");
        doc.push_str("|Form|Company|Timestamp|Material|Link|\n");
        doc.push_str("|---|---|---|:-:|---|\n");
    } else {
        doc.push_str("|Form|Company|Timestamp|Link|\n");
        doc.push_str("|---|---|---|---|\n");
    }

    for record in records {
        doc.push_str(&render_row(record, layout.classified));
        doc.push('\n');
    }

    if layout.classified {
        doc.push('\n');
        doc.push_str(DISCLAIMER);
        doc.push('\n');
    }

    doc
}

/// Renders one record as a table row
pub fn render_row(record: &FilingRecord, classified: bool) -> String {
    let link = format!("[link]({})", escape_cell(&record.link));
    let mut cells = vec![
        escape_cell(&record.form_type),
        escape_cell(&record.company),
        record.timestamp.to_string(),
    ];
    if classified {
        cells.push(record.materiality.symbol().to_string());
    }
    cells.push(link);

    format!("|{}|", cells.join("|"))
}

/// Parses every record row in the document, in document order
///
/// A line is a record row when it is a pipe-delimited table row whose
/// timestamp cell holds a canonical timestamp; header, separator, and prose
/// lines never do.
pub fn parse_records(content: &str) -> Vec<FilingRecord> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(parse_row)
        .collect()
}

/// Parses one table row, if it is a record row
///
/// Accepted shapes:
/// - `|Company|Timestamp|Link|` (legacy)
/// - `|Form|Company|Timestamp|Link|`
/// - `|Form|Company|Timestamp|Material|Link|`
pub fn parse_row(line: &str) -> Option<FilingRecord> {
    let cells = split_cells(line.trim())?;

    let (form_type, company, timestamp, materiality, link) = match cells.as_slice() {
        [company, timestamp, link] => (
            String::new(),
            company,
            timestamp,
            Materiality::Unclear,
            link,
        ),
        [form, company, timestamp, link] => {
            (form.clone(), company, timestamp, Materiality::Unclear, link)
        }
        [form, company, timestamp, material, link] => (
            form.clone(),
            company,
            timestamp,
            Materiality::from_symbol(material),
            link,
        ),
        _ => return None,
    };

    let timestamp = Timestamp::parse_canonical(timestamp)?;

    Some(FilingRecord {
        form_type: form_type.trim().to_string(),
        company: company.trim().to_string(),
        timestamp,
        materiality,
        link: parse_link(link),
    })
}

/// Schema version declared in the heading, if any
pub fn schema_version(content: &str) -> Option<u32> {
    SCHEMA_MARKER
        .captures(content)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn parse_link(cell: &str) -> String {
    let cell = cell.trim();
    cell.strip_prefix("[link](")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(cell)
        .to_string()
}

fn escape_cell(value: &str) -> String {
    value
        .replace(['\r', '\n'], " ")
        .replace('\\', "\\\\")
        .replace('|', "\\|")
}

/// Splits `|a|b|c|` into cells, honouring `\|` and `\\` escapes
fn split_cells(line: &str) -> Option<Vec<String>> {
    let inner = line.strip_prefix('|')?;

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    let mut closed = false;

    while let Some(c) = chars.next() {
        closed = false;
        match c {
            '\\' => match chars.next() {
                Some(next @ ('|' | '\\')) => current.push(next),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '|' => {
                cells.push(std::mem::take(&mut current));
                closed = true;
            }
            other => current.push(other),
        }
    }

    if !closed {
        return None;
    }
    Some(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(form: &str, company: &str, ts: &str, materiality: Materiality) -> FilingRecord {
        FilingRecord {
            form_type: form.to_string(),
            company: company.to_string(),
            timestamp: Timestamp::parse_canonical(ts).unwrap(),
            materiality,
            link: format!(
                "https://www.sec.gov/Archives/edgar/data/1/{}-index.htm",
                ts.replace([' ', ':'], "-")
            ),
        }
    }

    fn layout(classified: bool) -> IndexLayout {
        IndexLayout {
            item_code: "1.05".to_string(),
            classified,
        }
    }

    fn checked() -> Timestamp {
        Timestamp::parse_canonical("2024-01-05 12:00:00").unwrap()
    }

    #[test]
    fn test_roundtrip_classified() {
        let records = vec![
            rec("8-K", "Alpha Inc", "2024-01-04 09:00:00", Materiality::Material),
            rec("8-K/A", "Beta | Sons", "2024-01-03 09:00:00", Materiality::NotMaterial),
            rec("", "Gamma\\Delta", "2024-01-02 09:00:00", Materiality::Unclear),
        ];
        let doc = render_document(&records, &layout(true), checked());
        assert_eq!(parse_records(&doc), records);
    }

    #[test]
    fn test_roundtrip_unclassified() {
        let records = vec![
            rec("8-K", "Alpha Inc", "2024-01-04 09:00:00", Materiality::Unclear),
            rec("8-K", "Beta LLC", "2024-01-03 09:00:00", Materiality::Unclear),
        ];
        let doc = render_document(&records, &layout(false), checked());
        assert!(!doc.contains("Material"));
        assert_eq!(parse_records(&doc), records);
    }

    #[test]
    fn test_heading_shape() {
        let doc = render_document(&[], &layout(true), checked());
        let lines: Vec<&str> = doc.lines().collect();
        assert_eq!(lines[0], "# List of Form 8-Ks with item 1.05");
        assert_eq!(lines[2], "Last checked 2024-01-05 12:00:00");
        assert!(doc.contains("|Form|Company|Timestamp|Material|Link|"));
        assert!(doc.trim_end().ends_with(DISCLAIMER));
        assert_eq!(schema_version(&doc), Some(SCHEMA_VERSION));
        assert!(parse_records(&doc).is_empty());
    }

    #[test]
    fn test_row_rendering() {
        let record = rec("8-K", "Alpha Inc", "2024-01-04 09:00:00", Materiality::Material);
        assert_eq!(
            render_row(&record, true),
            format!("|8-K|Alpha Inc|2024-01-04 09:00:00|✓|[link]({})|", record.link)
        );
        let record = rec("8-K", "Alpha Inc", "2024-01-04 09:00:00", Materiality::NotMaterial);
        assert_eq!(
            render_row(&record, true),
            format!("|8-K|Alpha Inc|2024-01-04 09:00:00||[link]({})|", record.link)
        );
    }

    #[test]
    fn test_parse_legacy_layout() {
        let doc = "# List of Form 8-Ks with item 1.05\n\
                   Last checked 2024-01-01 00:00:00\n\n\
                   |Company|Timestamp|Link|\n\
                   |---|---|---|\n\
                   |Old Co|2023-12-30 16:05:00|[link](https://www.sec.gov/a-index.htm)|\r\n\
                   |Older Co|2023-12-29 16:05:00|[link](https://www.sec.gov/b-index.htm)|\n";
        let records = parse_records(doc);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company, "Old Co");
        assert_eq!(records[0].form_type, "");
        assert_eq!(records[0].materiality, Materiality::Unclear);
        assert_eq!(records[0].link, "https://www.sec.gov/a-index.htm");
        assert_eq!(records[1].timestamp.to_string(), "2023-12-29 16:05:00");
        assert_eq!(schema_version(doc), None);
    }

    #[test]
    fn test_roundtrip_link_with_pipe() {
        let mut record = rec("8-K", "Alpha Inc", "2024-01-04 09:00:00", Materiality::Material);
        record.link = "https://www.sec.gov/Archives/a|b-index.htm".to_string();

        for classified in [true, false] {
            let doc = render_document(&[record.clone()], &layout(classified), checked());
            assert!(doc.contains(r"[link](https://www.sec.gov/Archives/a\|b-index.htm)"));
            let parsed = parse_records(&doc);
            assert_eq!(parsed.len(), 1);
            assert_eq!(parsed[0].link, record.link);
        }
    }

    #[test]
    fn test_roundtrip_company_from_multiline_markup() {
        let company =
            crate::crawler::normalize_company("Beta\n   Holdings\r\nInc (0000000002) (Filer)");
        let record = rec("8-K", &company, "2024-01-04 09:00:00", Materiality::Unclear);
        let doc = render_document(&[record.clone()], &layout(false), checked());
        assert_eq!(parse_records(&doc), vec![record]);
        assert_eq!(parse_records(&doc)[0].company, "Beta Holdings Inc");
    }

    #[test]
    fn test_parse_ignores_non_rows() {
        assert!(parse_row("|Form|Company|Timestamp|Link|").is_none());
        assert!(parse_row("|---|---|---|---|").is_none());
        assert!(parse_row("Last checked 2024-01-01 00:00:00").is_none());
        assert!(parse_row("|8-K|Alpha|2024-01-01 00:00:00|[link](x)").is_none());
        assert!(parse_row("|a|b|c|d|e|f|").is_none());
        assert!(parse_row("").is_none());
    }

    #[test]
    fn test_split_cells_escapes() {
        assert_eq!(
            split_cells(r"|a\|b|c\\|d|"),
            Some(vec!["a|b".to_string(), "c\\".to_string(), "d".to_string()])
        );
        assert_eq!(split_cells("no pipes"), None);
    }
}
