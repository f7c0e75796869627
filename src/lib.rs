#![doc = "artifact-courier: upload CI build artifacts to a repository branch and link them from a pull request comment."]

//! A run reads its inputs, resolves where artifacts go, uploads each listed
//! file (overwriting an existing file at the same path), composes a
//! Markdown summary, and keeps one bot comment per title up to date.
//!
//! Entry points: [`publish::publish`] for library use, [`cli::run`] for the binary.

pub mod cli;
pub mod comment;
pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod github;
pub mod load_config;
pub mod publish;
pub mod report;
pub mod uploader;
