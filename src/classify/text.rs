//! Filing text retrieval
//!
//! Filings can run to many megabytes, so only a bounded prefix is downloaded.
//! The body is read chunk by chunk and the request is dropped as soon as the
//! cap is reached.

use crate::WatchError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;

/// Source of a filing's plain text, given its detail-page link
#[async_trait]
pub trait FilingTextSource: Send + Sync {
    async fn fetch_text(&self, link: &str) -> Result<String, WatchError>;
}

/// Derives the full-submission text URL from a detail-page URL
///
/// `…/0001234567-24-000001-index.htm` becomes `…/0001234567-24-000001.txt`.
/// Links without the `-index` suffix are returned unchanged.
pub fn filing_text_url(link: &str) -> String {
    for suffix in ["-index.html", "-index.htm"] {
        if let Some(stem) = link.strip_suffix(suffix) {
            return format!("{}.txt", stem);
        }
    }
    link.to_string()
}

/// Visible text of a markup document, whitespace collapsed
///
/// Script and style contents are skipped.
pub fn visible_text(markup: &str) -> String {
    let document = Html::parse_document(markup);
    let mut words: Vec<&str> = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|parent| parent.value().as_element())
            .map(|element| matches!(element.name(), "script" | "style"))
            .unwrap_or(false);
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}

/// Downloads filing text over HTTP, capped at `max_bytes`
pub struct HttpFilingTextSource {
    client: Client,
    max_bytes: usize,
}

impl HttpFilingTextSource {
    pub fn new(client: Client, max_bytes: usize) -> Self {
        Self { client, max_bytes }
    }

    /// Reads at most `max_bytes` of the body at `url`
    async fn fetch_prefix(&self, url: &str) -> Result<Vec<u8>, WatchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| classify_transport_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut buffer: Vec<u8> = Vec::new();
        while buffer.len() < self.max_bytes {
            match response
                .chunk()
                .await
                .map_err(|source| classify_transport_error(url, source))?
            {
                Some(chunk) => buffer.extend_from_slice(&chunk),
                None => break,
            }
        }
        buffer.truncate(self.max_bytes);

        Ok(buffer)
    }
}

#[async_trait]
impl FilingTextSource for HttpFilingTextSource {
    async fn fetch_text(&self, link: &str) -> Result<String, WatchError> {
        let url = filing_text_url(link);
        let bytes = self.fetch_prefix(&url).await?;
        tracing::debug!("Fetched {} bytes of filing text from {}", bytes.len(), url);

        let raw = String::from_utf8_lossy(&bytes);
        Ok(visible_text(&raw))
    }
}

fn classify_transport_error(url: &str, source: reqwest::Error) -> WatchError {
    if source.is_timeout() {
        WatchError::Timeout {
            url: url.to_string(),
        }
    } else {
        WatchError::Http {
            url: url.to_string(),
            source,
        }
    }
}
