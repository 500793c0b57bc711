//! HTTP fetcher for the latest-filings listing
//!
//! This module handles the listing requests, including:
//! - Building HTTP clients with a descriptive user agent
//! - Building the paginated listing URL
//! - Classifying responses into success, unavailable page, or transient failure

use crate::config::{ListingConfig, UserAgentConfig};
use crate::WatchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Result of a listing page request
#[derive(Debug)]
pub enum FetchResult {
    /// Page retrieved
    Success {
        /// The requested URL
        url: String,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status; the page is unavailable
    HttpError {
        url: String,
        status_code: u16,
        body: String,
    },

    /// Timeout or connection failure; worth another attempt
    NetworkError {
        url: String,
        error: String,
        timed_out: bool,
    },
}

/// Source of listing pages, addressed by zero-based page index
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches the page at `page_index` (offset in units of the page size)
    async fn fetch_page(&self, page_index: u32) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Bound on each whole request
///
/// # Example
///
/// ```no_run
/// use filing_watch::config::UserAgentConfig;
/// use filing_watch::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     client_name: "FilingWatch".to_string(),
///     client_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "ops@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches listing pages over HTTP
pub struct HttpListingFetcher {
    client: Client,
    endpoint: Url,
    form_type: String,
    page_size: u32,
}

impl HttpListingFetcher {
    /// Creates a fetcher for the configured listing site
    pub fn new(listing: &ListingConfig, user_agent: &UserAgentConfig) -> Result<Self, WatchError> {
        let client = build_http_client(user_agent, Duration::from_secs(listing.timeout_secs))?;
        let endpoint = Url::parse(&listing.base_url)?.join("/cgi-bin/browse-edgar")?;

        Ok(Self {
            client,
            endpoint,
            form_type: listing.form_type.clone(),
            page_size: listing.page_size,
        })
    }

    /// URL of the listing page at `page_index`
    ///
    /// Filtering by item code happens client-side; the query only selects the
    /// form type and the window of entries.
    pub fn page_url(&self, page_index: u32) -> Url {
        let start = page_index.saturating_mul(self.page_size);
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("action", "getcurrent")
            .append_pair("datea", "")
            .append_pair("dateb", "")
            .append_pair("company", "")
            .append_pair("type", &self.form_type)
            .append_pair("SIC", "")
            .append_pair("State", "")
            .append_pair("Country", "")
            .append_pair("CIK", "")
            .append_pair("owner", "include")
            .append_pair("accno", "")
            .append_pair("start", &start.to_string())
            .append_pair("count", &self.page_size.to_string());
        url
    }
}

#[async_trait]
impl ListingSource for HttpListingFetcher {
    async fn fetch_page(&self, page_index: u32) -> FetchResult {
        let url = self.page_url(page_index);
        fetch_listing(&self.client, url.as_str()).await
    }
}

/// Issues one GET and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with readable body | Success |
/// | Any other status | HttpError (page unavailable) |
/// | Timeout | NetworkError, `timed_out` |
/// | Connection or body read failure | NetworkError |
pub async fn fetch_listing(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return FetchResult::HttpError {
                    url: url.to_string(),
                    status_code: status.as_u16(),
                    body,
                };
            }

            match response.text().await {
                Ok(body) => FetchResult::Success {
                    url: url.to_string(),
                    body,
                },
                Err(e) => FetchResult::NetworkError {
                    url: url.to_string(),
                    timed_out: e.is_timeout(),
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            FetchResult::NetworkError {
                url: url.to_string(),
                timed_out: e.is_timeout(),
                error,
            }
        }
    }
}
