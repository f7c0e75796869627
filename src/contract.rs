//! # contract: the two remote capabilities a publish run needs
//!
//! A run talks to the remote through two independent sessions:
//!
//! - [`ContentStore`]: scoped to the storage repository. Reads repository
//!   metadata and reads/writes file contents.
//! - [`CommentStore`]: scoped to the triggering repository. Lists, creates
//!   and updates issue comments.
//!
//! Both may be backed by the same credentials, but they are separate
//! capabilities and are passed around separately. The real implementation
//! is [`crate::github::GitHubClient`]; tests use the generated
//! `MockContentStore` / `MockCommentStore` (exported by the default
//! `test-export-mocks` feature).
//!
//! No method retries. Every error is a [`RemoteApiError`].

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::RepoSlug;
use crate::error::RemoteApiError;

/// Where artifacts are committed: storage repository and resolved branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLocation {
    pub repo: RepoSlug,
    pub branch: String,
}

impl TargetLocation {
    /// Stable "raw view" link for a stored file.
    pub fn raw_link(&self, server_url: &str, storage_path: &str) -> String {
        format!(
            "{}/blob/{}/{}?raw=true",
            self.repo.web_url(server_url),
            self.branch,
            storage_path
        )
    }
}

/// A create-or-overwrite request for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutFileRequest {
    pub path: String,
    /// Raw file bytes. Wire encoding is the client's job.
    pub content: Vec<u8>,
    pub message: String,
    /// Revision marker of the file being replaced; `None` creates the file.
    pub previous_revision: Option<String>,
}

/// What the remote reports after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    /// Revision marker of the newly stored content.
    pub revision: String,
    /// Commit created by the write, if reported.
    pub commit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueComment {
    pub id: u64,
    /// Empty when the author account no longer exists.
    pub author_login: String,
    pub body: String,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Default branch of a repository.
    async fn default_branch(&self, repo: &RepoSlug) -> Result<String, RemoteApiError>;

    /// Current revision marker of the file at `path` on the target branch,
    /// or `None` when the file (or its directory) does not exist.
    async fn file_revision(
        &self,
        target: &TargetLocation,
        path: &str,
    ) -> Result<Option<String>, RemoteApiError>;

    /// Creates the file, or overwrites it conditioned on `previous_revision`.
    async fn put_file(
        &self,
        target: &TargetLocation,
        request: PutFileRequest,
    ) -> Result<StoredFile, RemoteApiError>;
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// All comments on an issue or pull request, oldest first.
    async fn list_comments(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
    ) -> Result<Vec<IssueComment>, RemoteApiError>;

    /// Replaces the body of an existing comment.
    async fn update_comment(
        &self,
        repo: &RepoSlug,
        comment_id: u64,
        body: &str,
    ) -> Result<(), RemoteApiError>;

    /// Posts a new comment and returns its id.
    async fn create_comment(
        &self,
        repo: &RepoSlug,
        issue_number: u64,
        body: &str,
    ) -> Result<u64, RemoteApiError>;
}
