//! Filing-Watch: an incremental index of disclosure filings
//!
//! This crate crawls a paginated "latest filings" listing, extracts one record
//! per filing that mentions a tracked item code, optionally asks a language
//! model whether each filing is material, and merges the new records into a
//! remotely hosted Markdown index using optimistic-concurrency writes.

pub mod classify;
pub mod config;
pub mod crawler;
pub mod index;
pub mod pipeline;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Filing-Watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Listing page unavailable (HTTP {status}) at {url}")]
    ListingUnavailable { url: String, status: u16 },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Gave up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable {0} is not set")]
    MissingSecret(String),
}

/// Errors raised while extracting a record from a listing entry
///
/// Any of these means the markup did not have the expected shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no company hyperlink in the filer row")]
    MissingCompany,

    #[error("no timestamp cell in the filing row")]
    MissingTimestamp,

    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),

    #[error("no [html] link in the filing row")]
    MissingLink,

    #[error("cannot resolve filing link '{0}'")]
    BadLink(String),
}

/// Result type alias for Filing-Watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for extraction
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

// Re-export commonly used types
pub use config::Config;
pub use index::merge;
pub use pipeline::{run_pipeline, Pipeline, RunReport};
pub use record::{FilingRecord, Materiality, Timestamp};
