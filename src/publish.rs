//! High-level pipeline: resolve target → upload artifacts → compose report → reconcile comment.
//!
//! This module owns the control flow of a run. Everything it needs arrives
//! as arguments: the typed [`PublishConfig`], the explicit [`RunContext`],
//! and one implementation of each remote capability.
//!
//! # Responsibilities
//! - Short-circuit when the artifact list is empty (no remote calls at all)
//! - Resolve the storage repository and branch
//! - Upload artifacts strictly one at a time, in listed order
//! - Compose the Markdown report and reconcile the summary comment
//!
//! # Error Handling
//! Fail-fast. The first failing step aborts the run; artifacts uploaded
//! before it stay uploaded, and no comment is posted.
//!
//! # Navigation
//! - Main entrypoint: [`publish`]
//! - Supporting: [`resolve_target`], [`PublishReport`]

use tracing::{error, info};

use crate::comment::{reconcile_comment, CommentOutcome};
use crate::config::PublishConfig;
use crate::context::RunContext;
use crate::contract::{CommentStore, ContentStore, TargetLocation};
use crate::error::PublishError;
use crate::report::ReportBody;
use crate::uploader::{ArtifactUploader, UploadedArtifact};

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishReport {
    /// The artifact list was empty; nothing was uploaded or posted.
    Skipped,
    Published(PublishSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub target: TargetLocation,
    pub artifacts: Vec<UploadedArtifact>,
    /// Final Markdown body, whether or not it was posted.
    pub body: String,
    /// `None` when posting is disabled.
    pub comment: Option<CommentOutcome>,
}

/// Storage repository (override or triggering repository) and branch
/// (override or the storage repository's default branch).
pub async fn resolve_target<C: ContentStore + ?Sized>(
    config: &PublishConfig,
    context: &RunContext,
    contents: &C,
) -> Result<TargetLocation, PublishError> {
    let repo = config
        .artifacts_repo
        .clone()
        .unwrap_or_else(|| context.repo.clone());

    let branch = match &config.artifacts_branch {
        Some(branch) => branch.clone(),
        None => contents.default_branch(&repo).await?,
    };

    info!(artifacts_repo = %repo, artifacts_branch = %branch, "Resolved artifacts location");
    Ok(TargetLocation { repo, branch })
}

pub async fn publish<C, K>(
    config: &PublishConfig,
    context: &RunContext,
    contents: &C,
    comments: &K,
) -> Result<PublishReport, PublishError>
where
    C: ContentStore + ?Sized,
    K: CommentStore + ?Sized,
{
    if config.artifacts.is_empty() {
        info!("Artifact list is empty, nothing to publish");
        return Ok(PublishReport::Skipped);
    }

    let issue_number = if config.post_comment.is_enabled() {
        match context.issue_number {
            Some(number) => Some(number),
            None => {
                error!("post-comment is enabled but the triggering event has no issue or pull request");
                return Err(PublishError::MissingContext(
                    "post-comment requires an issue or pull request event".to_string(),
                ));
            }
        }
    } else {
        None
    };

    let target = resolve_target(config, context, contents).await?;
    let uploader = ArtifactUploader::new(contents, &target, config, context);

    let mut report = ReportBody::new(&config.title);
    let mut uploaded = Vec::with_capacity(config.artifacts.len());
    for artifact in &config.artifacts {
        let result = match uploader.upload(artifact).await {
            Ok(result) => result,
            Err(e) => {
                error!(artifact = %artifact, error = %e, "Upload failed, aborting run");
                return Err(e);
            }
        };
        report.push(&result);
        uploaded.push(result);
    }
    let body = report.finish(&config.commit);

    let comment = match issue_number {
        Some(number) => Some(
            reconcile_comment(
                comments,
                &context.repo,
                number,
                &context.bot_login,
                &config.title,
                &body,
            )
            .await?,
        ),
        None => {
            info!("post-comment disabled, not touching comments");
            None
        }
    };

    info!(
        uploaded = uploaded.len(),
        comment = ?comment,
        "Publish complete"
    );
    Ok(PublishReport::Published(PublishSummary {
        target,
        artifacts: uploaded,
        body,
        comment,
    }))
}
