//! Storage module for persisting the filing index
//!
//! This module handles all remote document operations, including:
//! - Conditional reads and writes against the document store
//! - Parsing the stored index into records and a watermark
//! - Opening notification issues when new filings are indexed

mod github;
mod index_store;
mod traits;

pub use github::{etag_to_version, GitHubStore};
pub use index_store::{build_issue, IndexSnapshot, IndexStore, SnapshotSource};
pub use traits::{
    DocumentStore, NewIssue, StorageError, StorageResult, StoredDocument, WriteOutcome,
};

use crate::config::{Config, Secrets};
use crate::index::IndexLayout;
use crate::WatchError;

/// Opens the configured index store
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `secrets` - Tokens resolved from the environment
pub fn open_index_store(config: &Config, secrets: &Secrets) -> Result<IndexStore, WatchError> {
    let backend = GitHubStore::new(&config.store, &config.user_agent, secrets.store_token.clone())?;
    let layout = IndexLayout {
        item_code: config.listing.item_code.clone(),
        classified: config.classifier.is_some(),
    };
    let file_name = config
        .store
        .path
        .rsplit('/')
        .next()
        .unwrap_or(&config.store.path)
        .to_string();

    Ok(IndexStore::new(Box::new(backend), layout, &file_name))
}
