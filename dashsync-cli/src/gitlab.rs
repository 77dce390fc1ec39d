//! GitLab repository client.
//!
//! Implements [`RemoteRepository`] on top of the GitLab REST API:
//! - `GET /projects/{pid}/repository/files/{path}?ref={branch}` reads a file
//! - `POST /projects/{pid}/repository/commits` applies a batch of file
//!   actions as one atomic commit

use anyhow::Context;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dashsync_core::{Action, RemoteRepository, SyncError};
use reqwest::{Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::GitSettings;

const API_PREFIX: &str = "/api/v4";

/// Response of the repository files endpoint
#[derive(Debug, Deserialize)]
struct FileResponse {
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Body of the commits endpoint
#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    branch: &'a str,
    commit_message: &'a str,
    actions: Vec<CommitAction<'a>>,
}

#[derive(Debug, Serialize)]
struct CommitAction<'a> {
    action: &'static str,
    file_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    /// Set to `base64` for content that is not valid UTF-8
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding: Option<&'static str>,
}

impl<'a> From<&'a Action> for CommitAction<'a> {
    fn from(action: &'a Action) -> Self {
        let (content, encoding) = match action.content() {
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => (Some(text.to_string()), None),
                Err(_) => (Some(BASE64.encode(bytes)), Some("base64")),
            },
            None => (None, None),
        };
        Self {
            action: action.kind().as_str(),
            file_path: action.path(),
            previous_path: action.previous_path(),
            content,
            encoding,
        }
    }
}

/// Normalize a GitLab base URL to its REST API root.
fn api_root(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(API_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, API_PREFIX)
    }
}

/// GitLab API client bound to one project and branch
pub struct GitlabClient {
    api_url: String,
    token: Option<String>,
    project_id: u64,
    branch: String,
    http: reqwest::Client,
}

impl GitlabClient {
    /// Create a new client. `base_url` may be the instance URL or its `/api/v4` root.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        project_id: u64,
        branch: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let api_url = api_root(base_url);
        Url::parse(&api_url).with_context(|| format!("Invalid GitLab URL: {}", base_url))?;
        Ok(Self {
            api_url,
            token,
            project_id,
            branch: branch.to_string(),
            http,
        })
    }

    pub fn from_settings(settings: &GitSettings) -> anyhow::Result<Self> {
        Self::new(
            &settings.api,
            settings.token.clone(),
            settings.project_id,
            &settings.branch,
            settings.timeout,
        )
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// URL of a repository file; the path is sent as one encoded segment.
    fn file_url(&self, path: &str) -> dashsync_core::Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/projects/{}/repository/files",
            self.api_url, self.project_id
        ))
        .map_err(|e| SyncError::Transport(format!("Invalid GitLab URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Transport(format!("Invalid GitLab URL: {}", self.api_url)))?
            .push(path);
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.header("PRIVATE-TOKEN", token),
            None => req,
        }
    }
}

#[async_trait]
impl RemoteRepository for GitlabClient {
    async fn read_file(&self, path: &str) -> dashsync_core::Result<Option<Vec<u8>>> {
        let url = self.file_url(path)?;
        let resp = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("Failed to fetch {}: {}", path, e)))?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("{} not found on branch {}", path, self.branch);
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Transport(format!(
                "GET file {} failed ({}): {}",
                path, status, body
            )));
        }

        let file: FileResponse = resp.json().await.map_err(|e| {
            SyncError::Transport(format!("Failed to parse file response for {}: {}", path, e))
        })?;

        let data = if file.encoding == "text" {
            file.content.into_bytes()
        } else {
            BASE64.decode(file.content.trim()).map_err(|e| {
                SyncError::Transport(format!("Invalid base64 content for {}: {}", path, e))
            })?
        };
        Ok(Some(data))
    }

    async fn commit(&self, message: &str, actions: &[Action]) -> dashsync_core::Result<()> {
        let url = Url::parse(&format!(
            "{}/projects/{}/repository/commits",
            self.api_url, self.project_id
        ))
        .map_err(|e| SyncError::Commit(format!("Invalid GitLab URL: {}", e)))?;

        let body = CommitRequest {
            branch: &self.branch,
            commit_message: message,
            actions: actions.iter().map(CommitAction::from).collect(),
        };

        let resp = self
            .request(Method::POST, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Commit(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Commit(format!("{}: {}", status, body)));
        }
        Ok(())
    }
}
