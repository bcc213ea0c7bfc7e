//! Commit detail cache for git repository browsers.
//!
//! Resolves per-commit metadata (signature verification state) on background
//! worker threads so interactive callers never block on git.
//!
//! - `detail`: `DetailCache` facade, request ledger, LRU store, worker pool
//! - `git`: command runners (real process and dry-run), signature lookup,
//!   repository access through git2
//! - `models`: `CommitId`, `Detail`, `SignatureStatus`, listing DTOs
//! - `error`: `AppError` and the crate `Result` alias

pub mod detail;
pub mod error;
pub mod git;
pub mod models;

pub use detail::{CacheConfig, DetailCache, DetailReady};
pub use error::{AppError, Result};
pub use git::{DryRunRunner, GitOutput, GitRepository, GitRunner, Interrupt, ProcessRunner};
pub use models::{CommitId, CommitInfo, Detail, SignatureStatus};
