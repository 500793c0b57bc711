//! Crawler module for the latest-filings listing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching of listing pages with bounded retries
//! - Listing markup scanning and record extraction
//! - The page loop and its watermark stop rule

mod controller;
mod extractor;
mod fetcher;
mod parser;
mod retry;

pub use controller::{decide, CrawlController, PageDecision, StopReason};
pub use extractor::{extract_record, normalize_company, FormTypeMatcher};
pub use fetcher::{build_http_client, fetch_listing, FetchResult, HttpListingFetcher, ListingSource};
pub use parser::{entry_timestamp, scan_listing_page, PageScan, ScanRules};
pub use retry::RetryPolicy;

use crate::classify::{ChatClassifier, HttpFilingTextSource, MaterialityAssessor};
use crate::config::{Config, Secrets};
use crate::{ConfigError, WatchError};
use std::time::Duration;
use url::Url;

/// Builds the crawl controller for a configuration
///
/// Wires the HTTP listing fetcher, the retry policy, and (when a classifier is
/// configured) the materiality assessor.
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `secrets` - Tokens resolved from the environment
pub fn build_controller(config: &Config, secrets: &Secrets) -> Result<CrawlController, WatchError> {
    let listing = &config.listing;

    let form_matcher = FormTypeMatcher::new(&listing.form_type).map_err(|e| {
        ConfigError::Validation(format!("form-type '{}': {}", listing.form_type, e))
    })?;
    let rules = ScanRules {
        marker_phrase: listing.marker_phrase.clone(),
        item_code: listing.item_code.clone(),
        page_size: listing.page_size,
        origin: Url::parse(&listing.base_url)?,
        form_matcher,
    };

    let fetcher = HttpListingFetcher::new(listing, &config.user_agent)?;
    let controller = CrawlController::new(
        Box::new(fetcher),
        rules,
        RetryPolicy::from_config(listing),
    );

    let Some(classifier) = &config.classifier else {
        return Ok(controller);
    };

    let api_key = secrets
        .classifier_key
        .clone()
        .ok_or_else(|| ConfigError::MissingSecret(classifier.api_key_env.clone()))?;
    let text_client = build_http_client(
        &config.user_agent,
        Duration::from_secs(classifier.timeout_secs),
    )?;
    let assessor = MaterialityAssessor::new(
        Box::new(HttpFilingTextSource::new(text_client, classifier.max_text_bytes)),
        Box::new(ChatClassifier::new(classifier, api_key, &listing.item_code)?),
        &listing.item_code,
        &classifier.end_marker,
    );

    tracing::info!("Materiality classification enabled (model {})", classifier.model);
    Ok(controller.with_assessor(assessor))
}
