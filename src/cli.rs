//! This module implements the CLI interface for artifact-courier: command
//! parsing, wiring the environment into a publish run, and reporting the
//! outcome to the workflow runner.
//!
//! All publishing logic (configuration, uploads, report, comment
//! reconciliation) lives in the library modules. This module is glue.
//!
//! ## How To Use
//! - In a workflow step: run `artifact-courier publish` with the action
//!   inputs exported as `INPUT_*` variables.
//! - Programmatically / in tests: call [`run`] with a constructed [`Cli`],
//!   or [`publish_from_env`] with any [`InputSource`].
//!
//! A failed run prints a `::error::` workflow command so the runner marks
//! the step as failed with the error message.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::comment::CommentOutcome;
use crate::context::{load_run_context, DEFAULT_BOT_LOGIN};
use crate::github::GitHubClient;
use crate::load_config::{load_config, InputSource, ProcessEnv};
use crate::publish::{publish, PublishReport};

#[derive(Parser)]
#[clap(
    name = "artifact-courier",
    version,
    about = "Upload CI build artifacts to a repository branch and link them from a pull request comment"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload the listed artifacts and reconcile the summary comment
    Publish {
        /// Login of the automation account that owns the summary comment
        #[clap(long, default_value = DEFAULT_BOT_LOGIN)]
        bot_login: String,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let result = match cli.command {
        Commands::Publish { bot_login } => publish_from_env(&ProcessEnv, &bot_login).await,
    };

    if let Err(e) = &result {
        println!("{}", workflow_error(&e.to_string()));
    }
    result
}

/// Loads inputs and run context from `source`, opens both GitHub sessions and publishes.
pub async fn publish_from_env<S: InputSource + ?Sized>(source: &S, bot_login: &str) -> Result<()> {
    let config = load_config(source)?;
    let context = load_run_context(source, bot_login)?;

    let comments = GitHubClient::new(&context.api_url, &config.repo_token, "comments")?;
    let contents = GitHubClient::new(&context.api_url, &config.artifacts_token, "artifacts")?;

    tracing::info!(command = "publish", "Starting publish run");
    match publish(&config, &context, &contents, &comments).await {
        Ok(PublishReport::Skipped) => {
            tracing::info!(command = "publish", "Nothing to publish");
            Ok(())
        }
        Ok(PublishReport::Published(summary)) => {
            for artifact in &summary.artifacts {
                tracing::info!(artifact = %artifact.source_path, link = %artifact.link, "Published artifact");
            }
            let comment_id = summary.comment.map(CommentOutcome::comment_id);
            tracing::info!(command = "publish", comment = ?summary.comment, comment_id = ?comment_id, "Publish run complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "publish", error = %e, "Publish run failed");
            Err(e.into())
        }
    }
}

/// `::error::<message>` with the message escaped for the workflow command parser.
pub fn workflow_error(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}
