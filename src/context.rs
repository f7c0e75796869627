//! The invocation context of a workflow run: which repository and issue
//! triggered it, and which server it talks to.
//!
//! Loaded once at startup and passed explicitly to the components that need
//! it. Nothing below this module reads `GITHUB_*` variables.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::RepoSlug;
use crate::error::PublishError;
use crate::load_config::InputSource;

pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BOT_LOGIN: &str = "github-actions[bot]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// The triggering repository.
    pub repo: RepoSlug,
    /// Issue or pull request number, when the triggering event has one.
    pub issue_number: Option<u64>,
    pub server_url: String,
    pub api_url: String,
    /// Login of the automation identity that owns the summary comment.
    pub bot_login: String,
}

impl RunContext {
    pub fn new(repo: RepoSlug, issue_number: Option<u64>) -> Self {
        Self {
            repo,
            issue_number,
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            bot_login: DEFAULT_BOT_LOGIN.to_string(),
        }
    }

    pub fn repo_url(&self) -> String {
        self.repo.web_url(&self.server_url)
    }

    pub fn pull_request_url(&self) -> Option<String> {
        self.issue_number
            .map(|number| format!("{}/pull/{}", self.repo_url(), number))
    }

    pub fn commit_url(&self, commit: &str) -> String {
        format!("{}/commit/{}", self.repo_url(), commit)
    }
}

#[derive(Debug, Default, Deserialize)]
struct EventPayload {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    issue: Option<Numbered>,
    #[serde(default)]
    pull_request: Option<Numbered>,
    #[serde(default)]
    repository: Option<EventRepository>,
}

#[derive(Debug, Deserialize)]
struct Numbered {
    number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EventRepository {
    name: String,
    owner: EventOwner,
}

#[derive(Debug, Deserialize)]
struct EventOwner {
    login: String,
}

impl EventPayload {
    fn issue_number(&self) -> Option<u64> {
        self.issue
            .as_ref()
            .and_then(|i| i.number)
            .or_else(|| self.pull_request.as_ref().and_then(|p| p.number))
            .or(self.number)
    }

    fn repo(&self) -> Option<RepoSlug> {
        self.repository
            .as_ref()
            .map(|r| RepoSlug::new(r.owner.login.clone(), r.name.clone()))
    }
}

fn read_event_payload(path: &Path) -> EventPayload {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = ?e, event_path = %path.display(), "Could not read event payload");
            return EventPayload::default();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = ?e, event_path = %path.display(), "Could not parse event payload");
            EventPayload::default()
        }
    }
}

fn non_empty_var<S: InputSource + ?Sized>(source: &S, key: &str) -> Option<String> {
    source
        .var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Builds the run context from `GITHUB_REPOSITORY`, `GITHUB_EVENT_PATH`,
/// `GITHUB_SERVER_URL` and `GITHUB_API_URL`.
///
/// The repository falls back to the event payload when `GITHUB_REPOSITORY`
/// is unset. The issue number is taken from `issue`, then `pull_request`,
/// then the payload's top-level `number`.
pub fn load_run_context<S: InputSource + ?Sized>(
    source: &S,
    bot_login: &str,
) -> Result<RunContext, PublishError> {
    let payload = non_empty_var(source, "GITHUB_EVENT_PATH")
        .map(|p| read_event_payload(Path::new(&p)))
        .unwrap_or_default();

    let repo = match non_empty_var(source, "GITHUB_REPOSITORY") {
        Some(raw) => raw.parse::<RepoSlug>().map_err(|reason| {
            PublishError::MissingContext(format!("GITHUB_REPOSITORY is malformed: {reason}"))
        })?,
        None => payload.repo().ok_or_else(|| {
            PublishError::MissingContext(
                "GITHUB_REPOSITORY is not set and the event payload names no repository"
                    .to_string(),
            )
        })?,
    };

    let context = RunContext {
        repo,
        issue_number: payload.issue_number(),
        server_url: non_empty_var(source, "GITHUB_SERVER_URL")
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        api_url: non_empty_var(source, "GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        bot_login: bot_login.to_string(),
    };

    info!(
        repo = %context.repo,
        issue_number = ?context.issue_number,
        server_url = %context.server_url,
        api_url = %context.api_url,
        bot_login = %context.bot_login,
        "Loaded run context"
    );
    Ok(context)
}
