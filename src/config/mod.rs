//! Configuration module for Filing-Watch
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and reading the API tokens the configuration names from the environment.
//!
//! # Example
//!
//! ```no_run
//! use filing_watch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("filing-watch.toml")).unwrap();
//! println!("Listing page size: {}", config.listing.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, Config, ListingConfig, StoreConfig, UserAgentConfig,
};
pub use validation::ALLOWED_PAGE_SIZES;

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config, resolve_secrets,
    Secrets,
};
