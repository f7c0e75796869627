//! Keeps a single summary comment per title on the triggering issue.
//!
//! The canonical comment is the first one, in listing order, written by the
//! automation identity whose body contains the title. It is replaced
//! wholesale; older link lists are not kept. Concurrent runs on the same
//! issue are not coordinated.

use tracing::info;

use crate::config::RepoSlug;
use crate::contract::{CommentStore, IssueComment};
use crate::error::RemoteApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentOutcome {
    Updated(u64),
    Created(u64),
}

impl CommentOutcome {
    pub fn comment_id(self) -> u64 {
        match self {
            CommentOutcome::Updated(id) | CommentOutcome::Created(id) => id,
        }
    }
}

pub fn find_report_comment<'c>(
    comments: &'c [IssueComment],
    bot_login: &str,
    title: &str,
) -> Option<&'c IssueComment> {
    comments
        .iter()
        .find(|c| c.author_login == bot_login && c.body.contains(title))
}

pub async fn reconcile_comment<K: CommentStore + ?Sized>(
    store: &K,
    repo: &RepoSlug,
    issue_number: u64,
    bot_login: &str,
    title: &str,
    body: &str,
) -> Result<CommentOutcome, RemoteApiError> {
    let comments = store.list_comments(repo, issue_number).await?;
    match find_report_comment(&comments, bot_login, title) {
        Some(existing) => {
            info!(comment_id = existing.id, issue_number, "Updating comment");
            store.update_comment(repo, existing.id, body).await?;
            Ok(CommentOutcome::Updated(existing.id))
        }
        None => {
            info!(issue_number, "Posting new comment");
            let id = store.create_comment(repo, issue_number, body).await?;
            Ok(CommentOutcome::Created(id))
        }
    }
}
