//! Resolves the named action inputs into a [`PublishConfig`].
//!
//! This is the only place where untyped string inputs are read. Everything
//! downstream works with the typed configuration: toggles are parsed into
//! [`Toggle`], the storage repository override into a [`RepoSlug`], and the
//! artifact list into an ordered vector of paths.
//!
//! Inputs are looked up through an [`InputSource`]. In a workflow run that
//! is the process environment, where input `repo-token` arrives as
//! `INPUT_REPO-TOKEN`. Tests hand in a plain `HashMap`.

use std::collections::HashMap;

use tracing::{error, info};

use crate::config::{parse_artifact_list, PublishConfig, RepoSlug, Toggle};
use crate::error::PublishError;

pub const DEFAULT_TITLE: &str = "Artifacts";

/// Read-only view of environment-style key/value pairs.
pub trait InputSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl InputSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl InputSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Environment variable carrying the action input `name`.
pub fn input_env_key(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Trimmed input value; empty when unset.
pub fn get_input<S: InputSource + ?Sized>(source: &S, name: &str) -> String {
    source
        .var(&input_env_key(name))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

pub fn get_required_input<S: InputSource + ?Sized>(
    source: &S,
    name: &str,
) -> Result<String, PublishError> {
    let value = get_input(source, name);
    if value.is_empty() {
        error!(input = name, "Required input is missing");
        return Err(PublishError::MissingRequiredInput {
            name: name.to_string(),
        });
    }
    Ok(value)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Reads all inputs and derives the effective values (token fallback, optional overrides).
pub fn load_config<S: InputSource + ?Sized>(source: &S) -> Result<PublishConfig, PublishError> {
    info!("Resolving action inputs");

    let commit = get_required_input(source, "commit")?;
    let repo_token = get_required_input(source, "repo-token")?;
    let artifact_list = get_required_input(source, "artifacts")?;

    let artifacts_token = match non_empty(get_input(source, "artifacts-token")) {
        Some(token) => {
            info!(token_len = token.len(), "Using dedicated artifacts token");
            token
        }
        None => {
            info!("No artifacts-token supplied, falling back to repo-token");
            repo_token.clone()
        }
    };

    let artifacts_repo = match non_empty(get_input(source, "artifacts-repo")) {
        Some(raw) => match raw.parse::<RepoSlug>() {
            Ok(slug) => Some(slug),
            Err(reason) => {
                error!(input = "artifacts-repo", value = %raw, "Malformed repository override");
                return Err(PublishError::InvalidInput {
                    name: "artifacts-repo".to_string(),
                    reason,
                });
            }
        },
        None => None,
    };

    let artifacts_branch = non_empty(get_input(source, "artifacts-branch"));
    let artifacts_dir = get_input(source, "artifacts-dir");
    let inter_link = Toggle::parse("inter-link", &get_input(source, "inter-link"))?;
    let post_comment = Toggle::parse("post-comment", &get_input(source, "post-comment"))?;
    let title =
        non_empty(get_input(source, "title")).unwrap_or_else(|| DEFAULT_TITLE.to_string());

    let artifacts = parse_artifact_list(&artifact_list);
    info!(artifacts = ?artifacts, "Parsed artifact list");

    let config = PublishConfig {
        commit,
        repo_token,
        artifacts,
        artifacts_token,
        artifacts_repo,
        artifacts_branch,
        artifacts_dir,
        inter_link,
        post_comment,
        title,
    };
    config.trace_loaded();
    Ok(config)
}
