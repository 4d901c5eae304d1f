// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! GitHub Contents Object Store
//!
//! Implements [`ObjectStore`] on top of the GitHub repository contents API.
//! Every `put` is one commit on the configured branch.
//!
//! # API Endpoints
//!
//! - `GET /repos/{repo}/contents/{path}?ref={branch}` - Read a file or list a directory
//! - `PUT /repos/{repo}/contents/{path}` - Create or update a file (needs the
//!   current blob `sha` when overwriting)
//!
//! The read-then-write of the blob sha is not atomic. Two writers racing on
//! the same path surface as [`StoreError::Conflict`] for the loser; nothing
//! here retries.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::storage::{validate_object_path, EntryType, ObjectStore, StoreEntry, StoreError};

const USER_AGENT: &str = concat!("hive-core/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// GitHub contents API adapter
pub struct GitHubContentsStore {
    client: Client,
    /// API base URL (e.g., "https://api.github.com")
    api_url: String,
    /// `owner/name`
    repo: String,
    branch: String,
    token: String,
}

/// Response shape of `GET contents` for a single file
#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(rename = "type")]
    entry_type: EntryType,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

/// Response shape of `GET contents` for a directory
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Dir(Vec<StoreEntry>),
    File(ContentFile),
}

#[derive(Debug, Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

impl GitHubContentsStore {
    /// Create new adapter
    ///
    /// # Arguments
    /// * `api_url` - API base URL, without trailing slash
    /// * `repo` - Repository as `owner/name`
    /// * `branch` - Branch every read and commit targets
    /// * `token` - Bearer token with contents read/write permission
    /// * `timeout` - Per-request timeout
    pub fn new(
        api_url: &str,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_url, self.repo, path)
    }

    async fn fetch(&self, path: &str) -> Result<Option<ContentsResponse>, StoreError> {
        let response = self
            .client
            .get(self.contents_url(path))
            .query(&[("ref", self.branch.as_str())])
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<ContentsResponse>().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(error_from_response(path, response).await),
        }
    }

    /// Blob sha of the current file at `path`, if any.
    async fn current_sha(&self, path: &str) -> Result<Option<String>, StoreError> {
        match self.fetch(path).await? {
            Some(ContentsResponse::File(file)) => Ok(Some(file.sha)),
            Some(ContentsResponse::Dir(_)) => Err(StoreError::Conflict(format!(
                "{} is a directory",
                path
            ))),
            None => Ok(None),
        }
    }

    /// Files over the inline limit come back without content; follow the
    /// raw download link instead.
    async fn download(&self, path: &str, url: &str) -> Result<Vec<u8>, StoreError> {
        let response = self.client.get(url).bearer_auth(&self.token).send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(path, response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ObjectStore for GitHubContentsStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        validate_object_path(path)?;
        let file = match self.fetch(path).await? {
            Some(ContentsResponse::File(file)) if file.entry_type == EntryType::File => file,
            Some(_) | None => return Ok(None),
        };

        match (file.encoding.as_deref(), file.content) {
            (Some("base64"), Some(content)) if !content.is_empty() => {
                let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = STANDARD
                    .decode(compact)
                    .map_err(|e| StoreError::Serialization(format!("{}: {}", path, e)))?;
                Ok(Some(bytes))
            }
            _ => match file.download_url {
                Some(url) => Ok(Some(self.download(path, &url).await?)),
                None => Ok(Some(Vec::new())),
            },
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<StoreEntry>, StoreError> {
        let dir = dir.trim_end_matches('/');
        validate_object_path(dir)?;
        match self.fetch(dir).await? {
            Some(ContentsResponse::Dir(entries)) => Ok(entries),
            Some(ContentsResponse::File(_)) | None => Ok(Vec::new()),
        }
    }

    async fn put(&self, path: &str, bytes: &[u8], message: &str) -> Result<(), StoreError> {
        validate_object_path(path)?;
        let sha = self.current_sha(path).await?;

        let body = PutContentRequest {
            message,
            content: STANDARD.encode(bytes),
            branch: &self.branch,
            sha,
        };

        let response = self
            .client
            .put(self.contents_url(path))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                debug!(path = %path, message = %message, "Committed object");
                Ok(())
            }
            _ => Err(error_from_response(path, response).await),
        }
    }
}

async fn error_from_response(path: &str, response: Response) -> StoreError {
    let status = response.status();
    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0");
    let detail = response
        .text()
        .await
        .unwrap_or_else(|_| format!("HTTP {}", status));
    let detail = format!("{} ({}): {}", path, status, detail);

    match status {
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => StoreError::Conflict(detail),
        StatusCode::FORBIDDEN if rate_limited => StoreError::Unavailable(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied(detail),
        StatusCode::TOO_MANY_REQUESTS => StoreError::Unavailable(detail),
        s if s.is_server_error() => StoreError::Unavailable(detail),
        _ => StoreError::Unknown(detail),
    }
}
