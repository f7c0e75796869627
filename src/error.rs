//! Error taxonomy for a publish run.
//!
//! Every failure is fatal for the run and is surfaced as a single
//! human-readable message at the CLI boundary. The only error that is ever
//! swallowed is a failed revision lookup, which the uploader treats as
//! "no prior file".

use std::path::PathBuf;

/// Failure of a single call against the remote repository API.
///
/// `status` is `None` when the request never produced an HTTP response
/// (connection, TLS, or body decoding failures).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "GitHub API {operation} failed ({}): {message}",
    .status.map_or_else(|| "no response".to_string(), |s| format!("status {s}"))
)]
pub struct RemoteApiError {
    pub operation: String,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteApiError {
    pub fn new(operation: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Input required and not supplied: {name}")]
    MissingRequiredInput { name: String },

    #[error("Invalid value for input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("Missing workflow context: {0}")]
    MissingContext(String),

    #[error("Failed to read artifact {}: {source}", .path.display())]
    LocalFileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Remote(#[from] RemoteApiError),
}
