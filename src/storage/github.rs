//! GitHub contents API backend
//!
//! The index lives in a repository file. Reads use the raw media type and take
//! the blob SHA from the `ETag` header; writes send it back as `sha`, which
//! GitHub checks before accepting the new content.

use crate::config::{StoreConfig, UserAgentConfig};
use crate::crawler::build_http_client;
use crate::storage::traits::{
    DocumentStore, NewIssue, StorageError, StorageResult, StoredDocument, WriteOutcome,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use std::time::Duration;

const RAW_MEDIA_TYPE: &str = "application/vnd.github.v3.raw";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Body of a contents PUT
#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// Document store backed by one file in a GitHub repository
pub struct GitHubStore {
    client: Client,
    token: String,
    api_url: String,
    owner: String,
    repo: String,
    path: String,
    branch: Option<String>,
}

impl GitHubStore {
    pub fn new(
        config: &StoreConfig,
        user_agent: &UserAgentConfig,
        token: String,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, Duration::from_secs(config.timeout_secs))?;
        Ok(Self {
            client,
            token,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            path: config.path.trim_start_matches('/').to_string(),
            branch: config.branch.clone(),
        })
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url, self.owner, self.repo, self.path
        )
    }

    fn issues_url(&self) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, self.owner, self.repo)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

/// Strips the quotes (and weak prefix) from an ETag value
pub fn etag_to_version(etag: &str) -> String {
    etag.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .to_string()
}

#[async_trait]
impl DocumentStore for GitHubStore {
    async fn get(&self) -> StorageResult<Option<StoredDocument>> {
        let url = self.contents_url();
        let mut request = self
            .authorized(self.client.get(&url))
            .header("Accept", RAW_MEDIA_TYPE);
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch)]);
        }

        let response = request
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let version = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(etag_to_version);
        let content = response
            .text()
            .await
            .map_err(|source| StorageError::Transport { url, source })?
            .replace('\r', "");

        Ok(Some(StoredDocument { content, version }))
    }

    async fn put(
        &self,
        content: &str,
        message: &str,
        version: Option<&str>,
    ) -> StorageResult<WriteOutcome> {
        let url = self.contents_url();
        let payload = PutContents {
            message,
            content: base64::engine::general_purpose::STANDARD.encode(content.as_bytes()),
            sha: version,
            branch: self.branch.as_deref(),
        };

        let response = self
            .authorized(self.client.put(&url))
            .header("Accept", JSON_MEDIA_TYPE)
            .json(&payload)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        match status {
            StatusCode::OK => Ok(WriteOutcome::Updated),
            StatusCode::CREATED => Ok(WriteOutcome::Created),
            // 409: stale sha; 422: sha missing for a file that now exists
            StatusCode::CONFLICT
            | StatusCode::PRECONDITION_FAILED
            | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::Conflict {
                    status: status.as_u16(),
                    body,
                })
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(StorageError::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    async fn create_issue(&self, issue: &NewIssue) -> StorageResult<()> {
        let url = self.issues_url();
        let response = self
            .authorized(self.client.post(&url))
            .header("Accept", JSON_MEDIA_TYPE)
            .json(issue)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::CREATED {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn describe(&self) -> String {
        format!("{}/{}/{}", self.owner, self.repo, self.path)
    }
}
