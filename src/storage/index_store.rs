//! Reading and writing the filing index through a document store

use crate::index::{parse_records, render_document, schema_version, IndexLayout};
use crate::record::{FilingRecord, Timestamp};
use crate::storage::traits::{DocumentStore, NewIssue, StorageResult, WriteOutcome};

/// How the last read went
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// The document was read
    Existing,
    /// The store has no such document yet
    Missing,
    /// The read failed; treated like `Missing`
    Unreadable,
}

/// The index as of one read
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    /// Stored records, newest first; `None` when there is no document
    pub records: Option<Vec<FilingRecord>>,

    /// Token to pass back on write
    pub version: Option<String>,

    /// Timestamp of the newest stored record, or the epoch sentinel
    pub watermark: Timestamp,

    /// Schema version declared in the stored heading
    pub schema: Option<u32>,

    pub source: SnapshotSource,
}

impl IndexSnapshot {
    fn empty(source: SnapshotSource) -> Self {
        Self {
            records: None,
            version: None,
            watermark: Timestamp::epoch(),
            schema: None,
            source,
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The index document, read and written with optimistic concurrency
pub struct IndexStore {
    store: Box<dyn DocumentStore>,
    layout: IndexLayout,
    file_name: String,
}

impl IndexStore {
    /// `file_name` appears in commit messages
    pub fn new(store: Box<dyn DocumentStore>, layout: IndexLayout, file_name: &str) -> Self {
        Self {
            store,
            layout,
            file_name: file_name.to_string(),
        }
    }

    pub fn layout(&self) -> &IndexLayout {
        &self.layout
    }

    /// Reads the current index
    ///
    /// Never fails: a transport or server error is logged and reported as an
    /// unreadable, empty snapshot.
    pub async fn read(&self) -> IndexSnapshot {
        match self.store.get().await {
            Ok(Some(document)) => {
                let records = parse_records(&document.content);
                let watermark = records
                    .first()
                    .map(|record| record.timestamp)
                    .unwrap_or_else(Timestamp::epoch);
                let schema = schema_version(&document.content);
                tracing::info!(
                    "Read {} records from {} (newest {}, schema {})",
                    records.len(),
                    self.store.describe(),
                    watermark,
                    schema.map(|v| v.to_string()).unwrap_or_else(|| "legacy".to_string())
                );
                IndexSnapshot {
                    records: Some(records),
                    version: document.version,
                    watermark,
                    schema,
                    source: SnapshotSource::Existing,
                }
            }
            Ok(None) => {
                tracing::info!("{} doesn't exist, so creating it", self.store.describe());
                IndexSnapshot::empty(SnapshotSource::Missing)
            }
            Err(e) => {
                tracing::error!("Failed to read {}: {}", self.store.describe(), e);
                IndexSnapshot::empty(SnapshotSource::Unreadable)
            }
        }
    }

    /// Renders the document that `write` would store
    pub fn render(&self, records: &[FilingRecord], checked_at: Timestamp) -> String {
        render_document(records, &self.layout, checked_at)
    }

    /// Writes `records` conditionally on `version`
    ///
    /// `Some(version)` updates the document read with that token; `None`
    /// creates it. Failures, including version conflicts, are logged with the
    /// store's response and returned.
    pub async fn write(
        &self,
        records: &[FilingRecord],
        version: Option<&str>,
    ) -> StorageResult<WriteOutcome> {
        let content = self.render(records, Timestamp::now());
        let message = match version {
            Some(_) => format!("Update {}", self.file_name),
            None => format!("Create {}", self.file_name),
        };

        match self.store.put(&content, &message, version).await {
            Ok(outcome) => {
                match outcome {
                    WriteOutcome::Updated => {
                        tracing::info!("Updated {} successfully", self.file_name)
                    }
                    WriteOutcome::Created => {
                        tracing::info!("Created {} successfully", self.file_name)
                    }
                }
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Error writing {}: {}", self.file_name, e);
                Err(e)
            }
        }
    }

    /// Opens an issue listing the newly indexed filings
    pub async fn notify(&self, new_records: &[FilingRecord], labels: &[String]) -> StorageResult<()> {
        let issue = build_issue(&self.layout.item_code, new_records, labels);
        self.store.create_issue(&issue).await
    }
}

/// Builds the notification issue for `new_records`
pub fn build_issue(item_code: &str, new_records: &[FilingRecord], labels: &[String]) -> NewIssue {
    let noun = if new_records.len() == 1 { "filing" } else { "filings" };
    let title = format!(
        "{} new Form 8-K {} with item {}",
        new_records.len(),
        noun,
        item_code
    );

    let body = new_records
        .iter()
        .map(|record| {
            let form = if record.form_type.is_empty() {
                String::new()
            } else {
                format!(" ({})", record.form_type)
            };
            format!(
                "- {}{} filed {}: {}",
                record.company, form, record.timestamp, record.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    NewIssue {
        title,
        body,
        labels: labels.to_vec(),
    }
}
