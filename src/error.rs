//! Error types shared by the detail cache, the command runners and the CLI.
//!
//! Defines `AppError` for every failure the crate can report. Most of these
//! never reach a `DetailCache` caller: a failed or timed-out git command is
//! folded into `SignatureStatus::Error` by the signature parser, and only
//! lifecycle misuse (`AlreadyStarted`, `WorkerSpawn`) surfaces from `start`.
//!
//! Error groups:
//! - `Git`, `RepoNotFound`, `CommitNotFound` → repository access via git2
//! - `InvalidCommitId` → malformed hex digest
//! - `CommandSpawn`, `CommandTimeout`, `CommandFailed`, `Interrupted` → runners
//! - `AlreadyStarted`, `WorkerSpawn` → cache lifecycle

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Invalid commit id: {0:?}")]
    InvalidCommitId(String),

    #[error("Detail cache is already started")]
    AlreadyStarted,

    #[error("Failed to spawn detail worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("Failed to execute {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} timed out after {timeout:?} and was terminated")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Command {command} exited with {}: {stderr}", exit_label(.exit_code))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Command {0} was interrupted")]
    Interrupted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
