//! Crawl controller - the page loop
//!
//! Pages are fetched newest-first starting at page 0. Each page is scanned for
//! entries, relevant entries are extracted (and assessed when a classifier is
//! configured), and the loop stops once a page reaches back to the watermark or
//! there is no next page.

use crate::classify::MaterialityAssessor;
use crate::crawler::fetcher::{FetchResult, ListingSource};
use crate::crawler::parser::{scan_listing_page, PageScan, ScanRules};
use crate::crawler::retry::RetryPolicy;
use crate::record::{FilingRecord, Timestamp};
use crate::WatchError;

/// Why the crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The page's oldest entry is not newer than the watermark
    ReachedWatermark,
    /// No "next page" control
    LastPage,
}

/// What to do after a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Continue,
    Stop(StopReason),
}

/// Decides whether the crawl goes on after `scan`
///
/// Uses the same strict "newer than" comparison as extraction and merging.
pub fn decide(scan: &PageScan, watermark: Timestamp) -> PageDecision {
    if let Some(oldest) = scan.oldest {
        if !oldest.is_newer_than(&watermark) {
            return PageDecision::Stop(StopReason::ReachedWatermark);
        }
    }
    if !scan.has_next_page {
        return PageDecision::Stop(StopReason::LastPage);
    }
    PageDecision::Continue
}

/// Drives the listing crawl
pub struct CrawlController {
    source: Box<dyn ListingSource>,
    rules: ScanRules,
    retry: RetryPolicy,
    assessor: Option<MaterialityAssessor>,
}

impl CrawlController {
    pub fn new(source: Box<dyn ListingSource>, rules: ScanRules, retry: RetryPolicy) -> Self {
        Self {
            source,
            rules,
            retry,
            assessor: None,
        }
    }

    /// Enables materiality classification of every new record
    pub fn with_assessor(mut self, assessor: MaterialityAssessor) -> Self {
        self.assessor = Some(assessor);
        self
    }

    pub fn classifies(&self) -> bool {
        self.assessor.is_some()
    }

    /// Crawls until the watermark or the last page
    ///
    /// Returns the new records newest-first, in page and entry order.
    ///
    /// # Errors
    ///
    /// An unavailable page or an exhausted retry budget aborts the crawl with
    /// no records. A malformed entry only cuts its own page short.
    pub async fn run(&self, watermark: Timestamp) -> Result<Vec<FilingRecord>, WatchError> {
        tracing::info!("Crawling listing for filings newer than {}", watermark);

        let mut found = Vec::new();
        let mut page_index = 0u32;

        loop {
            tracing::info!("Extracting data from page {}", page_index + 1);
            let body = self.fetch_with_retry(page_index).await?;

            let scan = scan_listing_page(&body, &self.rules, watermark);
            if let Some(e) = &scan.malformed {
                tracing::error!(
                    "Malformed entry on page {}, skipping the rest of its entries: {}",
                    page_index + 1,
                    e
                );
            }
            tracing::debug!(
                "Page {}: {} entries, {} with item {}, {} new",
                page_index + 1,
                scan.entries,
                scan.matched,
                self.rules.item_code,
                scan.records.len()
            );

            let decision = decide(&scan, watermark);

            for mut record in scan.records {
                if let Some(assessor) = &self.assessor {
                    record.materiality = assessor.assess(&record.link).await;
                }
                tracing::info!("New filing: {} at {}", record.company, record.timestamp);
                found.push(record);
            }

            match decision {
                PageDecision::Stop(StopReason::ReachedWatermark) => {
                    tracing::info!("Done extracting new data from the listing pages");
                    break;
                }
                PageDecision::Stop(StopReason::LastPage) => {
                    tracing::info!("Reached the last listing page");
                    break;
                }
                PageDecision::Continue => page_index += 1,
            }
        }

        tracing::info!("Found {} new filings", found.len());
        Ok(found)
    }

    /// Fetches one page, retrying transient failures with backoff
    async fn fetch_with_retry(&self, page_index: u32) -> Result<String, WatchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.source.fetch_page(page_index).await {
                FetchResult::Success { body, .. } => return Ok(body),
                FetchResult::HttpError {
                    url,
                    status_code,
                    body,
                } => {
                    tracing::error!(
                        "Failed to load listing (code: {}) for URL: {} ({})",
                        status_code,
                        url,
                        body.chars().take(200).collect::<String>()
                    );
                    return Err(WatchError::ListingUnavailable {
                        url,
                        status: status_code,
                    });
                }
                FetchResult::NetworkError {
                    url,
                    error,
                    timed_out,
                } => {
                    let what = if timed_out { "timed out" } else { "failed" };
                    tracing::warn!(
                        "Request to {} {} (attempt {}/{}): {}",
                        url,
                        what,
                        attempt,
                        self.retry.max_attempts,
                        error
                    );

                    if !self.retry.allows_retry(attempt) {
                        return Err(WatchError::RetriesExhausted {
                            url,
                            attempts: attempt,
                            last_error: error,
                        });
                    }
                    tokio::time::sleep(self.retry.backoff_after(attempt)).await;
                }
            }
        }
    }
}
