//! Uploads local artifacts into the storage repository, one at a time.
//!
//! For each artifact: read the bytes, derive the storage path, look up the
//! current revision marker (so an existing file is overwritten rather than
//! duplicated), commit, and hand back a raw-view link.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::PublishConfig;
use crate::context::RunContext;
use crate::contract::{ContentStore, PutFileRequest, TargetLocation};
use crate::error::PublishError;

const SHORT_COMMIT_LEN: usize = 5;

/// Result of uploading one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedArtifact {
    /// Path as listed in the `artifacts` input.
    pub source_path: String,
    /// Path inside the storage repository.
    pub storage_path: String,
    /// Revision marker that was overwritten, if the file already existed.
    pub previous_revision: Option<String>,
    pub link: String,
}

/// Joins the storage directory and the artifact path the way a POSIX path
/// join does: empty and `.` segments are dropped and `..` pops a segment.
/// Leading slashes are not preserved, so the result is always relative to
/// the repository root.
pub fn storage_path(artifacts_dir: &str, artifact_path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in artifacts_dir.split('/').chain(artifact_path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// First five characters of the commit id.
pub fn short_commit(commit: &str) -> &str {
    match commit.char_indices().nth(SHORT_COMMIT_LEN) {
        Some((cut, _)) => &commit[..cut],
        None => commit,
    }
}

/// `Upload <path> (<short commit>)`, optionally followed by back-references
/// to the pull request and the commit.
pub fn commit_message(
    storage_path: &str,
    commit: &str,
    inter_link: bool,
    context: &RunContext,
) -> String {
    let mut message = format!("Upload {} ({})", storage_path, short_commit(commit));
    if inter_link {
        message.push('\n');
        if let Some(pr_url) = context.pull_request_url() {
            message.push_str(&format!("\nPull request: {pr_url}"));
        }
        message.push_str(&format!("\nCommit: {}", context.commit_url(commit)));
    }
    message
}

pub struct ArtifactUploader<'a, C: ContentStore + ?Sized> {
    store: &'a C,
    target: &'a TargetLocation,
    config: &'a PublishConfig,
    context: &'a RunContext,
}

impl<'a, C: ContentStore + ?Sized> ArtifactUploader<'a, C> {
    pub fn new(
        store: &'a C,
        target: &'a TargetLocation,
        config: &'a PublishConfig,
        context: &'a RunContext,
    ) -> Self {
        Self {
            store,
            target,
            config,
            context,
        }
    }

    /// Revision marker of the stored file, or `None`. Lookup failures are
    /// logged and read as "no prior file".
    async fn previous_revision(&self, path: &str) -> Option<String> {
        match self.store.file_revision(self.target, path).await {
            Ok(revision) => revision,
            Err(e) => {
                warn!(error = %e, path, "Could not look up existing file revision, uploading as new");
                None
            }
        }
    }

    pub async fn upload(&self, artifact_path: &str) -> Result<UploadedArtifact, PublishError> {
        let content = tokio::fs::read(artifact_path).await.map_err(|source| {
            tracing::error!(error = ?source, artifact = artifact_path, "Failed to read artifact");
            PublishError::LocalFileNotFound {
                path: PathBuf::from(artifact_path),
                source,
            }
        })?;

        let path = storage_path(&self.config.artifacts_dir, artifact_path);
        let previous_revision = self.previous_revision(&path).await;
        match &previous_revision {
            Some(revision) => info!(artifact = artifact_path, storage_path = %path, old_revision = %revision, "Uploading file"),
            None => info!(artifact = artifact_path, storage_path = %path, "Uploading file (first time)"),
        }

        let message = commit_message(
            &path,
            &self.config.commit,
            self.config.inter_link.is_enabled(),
            self.context,
        );
        let request = PutFileRequest {
            path: path.clone(),
            content,
            message,
            previous_revision: previous_revision.clone(),
        };
        let stored = self.store.put_file(self.target, request).await?;

        let link = self.target.raw_link(&self.context.server_url, &path);
        info!(artifact = artifact_path, revision = %stored.revision, link = %link, "Artifact uploaded");

        Ok(UploadedArtifact {
            source_path: artifact_path.to_string(),
            storage_path: path,
            previous_revision,
            link,
        })
    }
}
