use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::PublishError;

/// Fully resolved configuration for one publish run. Built once by
/// [`crate::load_config::load_config`] and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct PublishConfig {
    pub commit: String,
    pub repo_token: String,
    /// Local artifact paths, in the order they were listed.
    pub artifacts: Vec<String>,
    /// Credential for the storage repository. Equals `repo_token` unless overridden.
    pub artifacts_token: String,
    /// Storage repository override; `None` means the triggering repository.
    pub artifacts_repo: Option<RepoSlug>,
    /// Storage branch override; `None` means the storage repository's default branch.
    pub artifacts_branch: Option<String>,
    pub artifacts_dir: String,
    pub inter_link: Toggle,
    pub post_comment: Toggle,
    pub title: String,
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        let artifacts_repo = self
            .artifacts_repo
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "<triggering repository>".to_string());
        info!(
            commit = %self.commit,
            artifacts_count = self.artifacts.len(),
            artifacts_repo = %artifacts_repo,
            artifacts_branch = self.artifacts_branch.as_deref().unwrap_or("<default branch>"),
            artifacts_dir = %self.artifacts_dir,
            inter_link = %self.inter_link,
            post_comment = %self.post_comment,
            title = %self.title,
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}

// Tokens stay out of debug output.
impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("commit", &self.commit)
            .field("repo_token", &"<redacted>")
            .field("artifacts", &self.artifacts)
            .field("artifacts_token", &"<redacted>")
            .field("artifacts_repo", &self.artifacts_repo)
            .field("artifacts_branch", &self.artifacts_branch)
            .field("artifacts_dir", &self.artifacts_dir)
            .field("inter_link", &self.inter_link)
            .field("post_comment", &self.post_comment)
            .field("title", &self.title)
            .finish()
    }
}

/// An `owner/name` repository reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Web URL of the repository under the given server (e.g. `https://github.com`).
    pub fn web_url(&self, server_url: &str) -> String {
        format!(
            "{}/{}/{}",
            server_url.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl FromStr for RepoSlug {
    type Err = String;

    /// Exactly one `/`, both halves non-empty.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| format!("expected owner/name, got '{raw}'"))?;
        let (owner, name) = (owner.trim(), name.trim());
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(format!("expected owner/name, got '{raw}'"));
        }
        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Two-valued switch parsed from a string input.
///
/// `true`, `True` and `TRUE` enable; `false`, `False`, `FALSE` and the empty
/// string disable. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    Enabled,
    #[default]
    Disabled,
}

impl Toggle {
    pub fn parse(input_name: &str, raw: &str) -> Result<Self, PublishError> {
        match raw.trim() {
            "true" | "True" | "TRUE" => Ok(Toggle::Enabled),
            "" | "false" | "False" | "FALSE" => Ok(Toggle::Disabled),
            other => Err(PublishError::InvalidInput {
                name: input_name.to_string(),
                reason: format!("expected true or false, got '{other}'"),
            }),
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Toggle::Enabled
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Toggle::Enabled => f.write_str("enabled"),
            Toggle::Disabled => f.write_str("disabled"),
        }
    }
}

/// Splits a newline-delimited artifact list, trimming entries and dropping blank lines.
pub fn parse_artifact_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
