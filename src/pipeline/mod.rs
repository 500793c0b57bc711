//! Pipeline driver
//!
//! One run is: read the stored index, crawl the listing back to its watermark,
//! merge the new records in front of the stored ones, and write the result
//! conditionally on the version that was read. A version conflict means another
//! writer got there first; the document is re-read, the same new records are
//! merged again, and the write is retried a bounded number of times.

use crate::config::{Config, Secrets};
use crate::crawler::{build_controller, CrawlController};
use crate::index::{merge, new_prefix_len};
use crate::record::{FilingRecord, Timestamp};
use crate::storage::{open_index_store, IndexSnapshot, IndexStore};
use crate::WatchError;

/// Summary of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    /// Records newer than everything previously stored
    pub new_records: usize,

    /// Records in the document after the merge
    pub total_records: usize,

    pub written: bool,

    /// A notification issue was opened
    pub notified: bool,
}

/// Crawl and store, composed
pub struct Pipeline {
    controller: CrawlController,
    store: IndexStore,
    write_attempts: u32,
    notify: bool,
    issue_labels: Vec<String>,
}

impl Pipeline {
    pub fn new(controller: CrawlController, store: IndexStore) -> Self {
        Self {
            controller,
            store,
            write_attempts: 3,
            notify: false,
            issue_labels: Vec::new(),
        }
    }

    /// Builds the pipeline described by `config`
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<Self, WatchError> {
        let controller = build_controller(config, secrets)?;
        let store = open_index_store(config, secrets)?;

        let mut pipeline =
            Self::new(controller, store).with_write_attempts(config.store.write_attempts);
        if config.store.notify {
            pipeline = pipeline.with_notifications(config.store.issue_labels.clone());
        }
        Ok(pipeline)
    }

    /// Total write attempts, conflicts included (at least one)
    pub fn with_write_attempts(mut self, attempts: u32) -> Self {
        self.write_attempts = attempts.max(1);
        self
    }

    /// Opens an issue with these labels whenever a run indexes new filings
    pub fn with_notifications(mut self, labels: Vec<String>) -> Self {
        self.notify = true;
        self.issue_labels = labels;
        self
    }

    /// Runs read, crawl, merge, and write once
    ///
    /// # Errors
    ///
    /// Fails when the crawl aborts (nothing is written) or when the write fails
    /// for a reason other than a conflict, or still conflicts after the last
    /// attempt. A failed notification is only logged.
    pub async fn run(&self) -> Result<RunReport, WatchError> {
        let snapshot = self.store.read().await;
        let new_records = self.controller.run(snapshot.watermark).await?;

        let mut report = self.write_merged(snapshot, &new_records).await?;

        if self.notify && report.new_records > 0 {
            match self
                .store
                .notify(&new_records[..report.new_records], &self.issue_labels)
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "Opened notification issue for {} filings",
                        report.new_records
                    );
                    report.notified = true;
                }
                Err(e) => tracing::warn!("Could not open notification issue: {}", e),
            }
        }

        tracing::info!(
            "Run complete: {} new, {} total",
            report.new_records,
            report.total_records
        );
        Ok(report)
    }

    /// Runs read, crawl, and merge, and returns the document a write would store
    pub async fn preview(&self) -> Result<(RunReport, String), WatchError> {
        let snapshot = self.store.read().await;
        let new_records = self.controller.run(snapshot.watermark).await?;

        let (merged, fresh) = merge_into(&snapshot, &new_records);
        let report = RunReport {
            new_records: fresh,
            total_records: merged.len(),
            written: false,
            notified: false,
        };
        Ok((report, self.store.render(&merged, Timestamp::now())))
    }

    async fn write_merged(
        &self,
        mut snapshot: IndexSnapshot,
        new_records: &[FilingRecord],
    ) -> Result<RunReport, WatchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let (merged, fresh) = merge_into(&snapshot, new_records);

            match self.store.write(&merged, snapshot.version.as_deref()).await {
                Ok(_) => {
                    return Ok(RunReport {
                        new_records: fresh,
                        total_records: merged.len(),
                        written: true,
                        notified: false,
                    })
                }
                Err(e) if e.is_conflict() && attempt < self.write_attempts => {
                    tracing::warn!(
                        "Write conflict (attempt {}/{}), re-reading the index",
                        attempt,
                        self.write_attempts
                    );
                    snapshot = self.store.read().await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Merged records and how many of them are new
fn merge_into(
    snapshot: &IndexSnapshot,
    new_records: &[FilingRecord],
) -> (Vec<FilingRecord>, usize) {
    let old = snapshot.records.as_deref();
    let fresh = new_prefix_len(new_records, old.unwrap_or_default());
    (merge(new_records, old), fresh)
}

/// Builds the pipeline from `config` and runs it once
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `secrets` - Tokens resolved from the environment
pub async fn run_pipeline(config: &Config, secrets: &Secrets) -> crate::Result<RunReport> {
    Pipeline::from_config(config, secrets)?.run().await
}
