#![doc = "GitHub REST implementation of the content and comment stores."]
//
//! # GitHub client
//!
//! [`GitHubClient`] is one authenticated session against the GitHub REST
//! API. A run builds two of them: one with the repository token for
//! comments, one with the artifacts token for file contents. Both traits
//! from [`crate::contract`] are implemented on the same type, so the
//! session split is purely a matter of which token a client was built with.
//!
//! - Requests go out one at a time and are never retried.
//! - Non-2xx answers become a [`RemoteApiError`] with the status and the
//!   API's `message` field.
//! - File content is base64 encoded here; callers hand over raw bytes.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, Url};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::config::RepoSlug;
use crate::contract::{
    CommentStore, ContentStore, IssueComment, PutFileRequest, StoredFile, TargetLocation,
};
use crate::error::RemoteApiError;

const API_VERSION: &str = "2022-11-28";
const COMMENTS_PAGE_SIZE: usize = 100;
const ERROR_BODY_LIMIT: usize = 500;

pub struct GitHubClient {
    http: reqwest::Client,
    api_base: Url,
    /// Which session this is ("comments" or "artifacts"); only used in logs.
    session: &'static str,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str, session: &'static str) -> Result<Self, RemoteApiError> {
        let api_base = Url::parse(api_url).map_err(|e| {
            tracing::error!(error = ?e, api_url, "Invalid GitHub API URL");
            RemoteApiError::new("build client", None, format!("invalid API URL '{api_url}': {e}"))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(RemoteApiError::new(
                "build client",
                None,
                format!("API URL '{api_url}' cannot be used as a base"),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("artifact-courier"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim())).map_err(|_| {
            RemoteApiError::new("build client", None, "token contains invalid header characters")
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RemoteApiError::new("build client", None, e.to_string()))?;

        tracing::info!(
            session,
            api_url = %api_base,
            token_set = !token.trim().is_empty(),
            "Initialized GitHub session"
        );
        Ok(Self {
            http,
            api_base,
            session,
        })
    }

    /// API URL for the given path segments; each segment is percent-encoded.
    fn endpoint<'s, I>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut url = self.api_base.clone();
        // cannot_be_a_base was ruled out in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn repo_endpoint<'s, I>(&self, repo: &'s RepoSlug, rest: I) -> Url
    where
        I: IntoIterator<Item = &'s str>,
    {
        self.endpoint(
            ["repos", repo.owner.as_str(), repo.name.as_str()]
                .into_iter()
                .chain(rest),
        )
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, RemoteApiError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(session = self.session, operation, error = ?e, "GitHub request failed");
            RemoteApiError::new(operation, None, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteApiError::new(
                operation,
                Some(status.as_u16()),
                api_error_message(&body),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            RemoteApiError::new(
                operation,
                Some(status.as_u16()),
                format!("failed to decode response: {e}"),
            )
        })
    }
}

/// The `message` field of a GitHub error body, or the (truncated) raw body.
pub(crate) fn api_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ApiErrorBody {
        message: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Splits a storage path into its parent directory ("" for the root) and file name.
pub(crate) fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContentEntry {
    pub name: String,
    pub sha: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// A contents lookup answers with an array for directories and an object for files.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    Single(IgnoredAny),
}

pub(crate) fn find_revision(entries: &[ContentEntry], file_name: &str) -> Option<String> {
    entries
        .iter()
        .find(|entry| entry.name == file_name && entry.kind != "dir")
        .map(|entry| entry.sha.clone())
}

#[derive(Deserialize)]
struct RepositoryInfo {
    default_branch: String,
}

#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: Option<PutContentsFile>,
    commit: Option<CommitRef>,
}

#[derive(Deserialize)]
struct PutContentsFile {
    path: String,
    sha: String,
}

#[derive(Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Deserialize)]
struct ApiComment {
    id: u64,
    user: Option<ApiUser>,
    body: Option<String>,
}

#[derive(Deserialize)]
struct ApiUser {
    login: String,
}

impl From<ApiComment> for IssueComment {
    fn from(c: ApiComment) -> Self {
        IssueComment {
            id: c.id,
            author_login: c.user.map(|u| u.login).unwrap_or_default(),
            body: c.body.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct CommentBody<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct CreatedComment {
    id: u64,
}

#[async_trait]
impl ContentStore for GitHubClient {
    async fn default_branch(&self, repo: &RepoSlug) -> Result<String, RemoteApiError> {
        tracing::info!(session = self.session, repo = %repo, "Fetching repository default branch");
        let url = self.repo_endpoint(repo, []);
        match self
            .send_json::<RepositoryInfo>("get repository", self.http.get(url))
            .await
        {
            Ok(info) => {
                tracing::info!(repo = %repo, branch = %info.default_branch, "Fetched default branch");
                Ok(info.default_branch)
            }
            Err(e) => {
                tracing::error!(error = %e, repo = %repo, "Failed to fetch repository");
                Err(e)
            }
        }
    }

    async fn file_revision(
        &self,
        target: &TargetLocation,
        path: &str,
    ) -> Result<Option<String>, RemoteApiError> {
        let (dir, file_name) = split_parent(path);
        tracing::debug!(
            session = self.session,
            repo = %target.repo,
            branch = %target.branch,
            dir,
            file_name,
            "Listing storage directory"
        );
        let url = self.repo_endpoint(
            &target.repo,
            std::iter::once("contents").chain(dir.split('/').filter(|s| !s.is_empty())),
        );
        let request = self
            .http
            .get(url)
            .query(&[("ref", target.branch.as_str())]);

        match self
            .send_json::<ContentsResponse>("get contents", request)
            .await
        {
            Ok(ContentsResponse::Listing(entries)) => Ok(find_revision(&entries, file_name)),
            Ok(ContentsResponse::Single(_)) => Ok(None),
            Err(e) if e.is_not_found() => {
                tracing::debug!(dir, "Storage directory does not exist yet");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn put_file(
        &self,
        target: &TargetLocation,
        request: PutFileRequest,
    ) -> Result<StoredFile, RemoteApiError> {
        tracing::info!(
            session = self.session,
            repo = %target.repo,
            branch = %target.branch,
            path = %request.path,
            bytes = request.content.len(),
            previous_revision = request.previous_revision.as_deref().unwrap_or("<none>"),
            "Writing file contents"
        );
        let url = self.repo_endpoint(
            &target.repo,
            std::iter::once("contents").chain(request.path.split('/').filter(|s| !s.is_empty())),
        );
        let body = PutContentsBody {
            message: &request.message,
            content: base64::engine::general_purpose::STANDARD.encode(&request.content),
            branch: &target.branch,
            sha: request.previous_revision.as_deref(),
        };

        match self
            .send_json::<PutContentsResponse>("put contents", self.http.put(url).json(&body))
            .await
        {
            Ok(resp) => {
                let (path, revision) = match resp.content {
                    Some(file) => (file.path, file.sha),
                    None => (request.path.clone(), String::new()),
                };
                let commit = resp.commit.map(|c| c.sha);
                tracing::info!(path = %path, revision = %revision, commit = ?commit, "Stored file");
                Ok(StoredFile {
                    path,
                    revision,
                    commit,
                })
            }
            Err(e) => {
                tracing::error!(error = %e, path = %request.path, "Failed to write file contents");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CommentStore for GitHubClient {
    async fn list_comments(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
    ) -> Result<Vec<IssueComment>, RemoteApiError> {
        let issue = issue_number.to_string();
        let per_page = COMMENTS_PAGE_SIZE.to_string();
        let mut comments = Vec::new();
        let mut page = 1_u32;
        loop {
            let url = self.repo_endpoint(repo, ["issues", issue.as_str(), "comments"]);
            let request = self
                .http
                .get(url)
                .query(&[("per_page", per_page.as_str()), ("page", page.to_string().as_str())]);
            let chunk: Vec<ApiComment> = match self.send_json("list comments", request).await {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::error!(error = %e, repo = %repo, issue_number, page, "Failed to list comments");
                    return Err(e);
                }
            };
            let fetched = chunk.len();
            comments.extend(chunk.into_iter().map(IssueComment::from));
            if fetched < COMMENTS_PAGE_SIZE {
                break;
            }
            page += 1;
        }
        tracing::info!(repo = %repo, issue_number, count = comments.len(), "Listed issue comments");
        Ok(comments)
    }

    async fn update_comment(
        &self,
        repo: &RepoSlug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), RemoteApiError> {
        let id = comment_id.to_string();
        let url = self.repo_endpoint(repo, ["issues", "comments", id.as_str()]);
        match self
            .send_json::<IgnoredAny>("update comment", self.http.patch(url).json(&CommentBody { body }))
            .await
        {
            Ok(_) => {
                tracing::info!(repo = %repo, comment_id, "Updated comment");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, repo = %repo, comment_id, "Failed to update comment");
                Err(e)
            }
        }
    }

    async fn create_comment(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
        body: &str,
    ) -> Result<u64, RemoteApiError> {
        let issue = issue_number.to_string();
        let url = self.repo_endpoint(repo, ["issues", issue.as_str(), "comments"]);
        match self
            .send_json::<CreatedComment>("create comment", self.http.post(url).json(&CommentBody { body }))
            .await
        {
            Ok(created) => {
                tracing::info!(repo = %repo, issue_number, comment_id = created.id, "Created comment");
                Ok(created.id)
            }
            Err(e) => {
                tracing::error!(error = %e, repo = %repo, issue_number, "Failed to create comment");
                Err(e)
            }
        }
    }
}
