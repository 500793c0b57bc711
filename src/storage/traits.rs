//! Storage traits and error types
//!
//! This module defines the trait interface for remote document stores and
//! associated error types.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Version conflict (HTTP {status}): {body}")]
    Conflict { status: u16, body: String },

    #[error("Store rejected the request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl StorageError {
    /// True when a re-read and retry may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A document as read from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub content: String,

    /// Opaque token echoed back on the next write
    pub version: Option<String>,
}

/// What a successful conditional write did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Updated,
}

/// An informational issue opened against the store's project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Trait for remote document store implementations
///
/// The store holds a single document. Writes are conditional: passing the
/// version from the last read updates the document only if nobody changed it
/// since; passing `None` creates it and fails if it already exists.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads the document; `Ok(None)` means it does not exist
    async fn get(&self) -> StorageResult<Option<StoredDocument>>;

    /// Writes the document conditionally on `version`
    async fn put(
        &self,
        content: &str,
        message: &str,
        version: Option<&str>,
    ) -> StorageResult<WriteOutcome>;

    /// Opens a notification issue
    async fn create_issue(&self, issue: &NewIssue) -> StorageResult<()>;

    /// Human-readable name of the document, for logs
    fn describe(&self) -> String;
}
