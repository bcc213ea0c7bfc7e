//! commit-details - signature verification status for git commits
//!
//! # Usage
//! ```bash
//! commit-details                          # Newest 20 commits of the current repo
//! commit-details ~/myproject --limit 50   # Newest 50 commits of another repo
//! commit-details . HEAD~3 v1.2.0          # Specific revisions
//! commit-details . --json                 # Machine-readable output
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commit_details::detail::config::{DEFAULT_CAPACITY, DEFAULT_READY_CHANNEL_CAPACITY};
use commit_details::git::runner::DEFAULT_COMMAND_TIMEOUT;
use commit_details::{
    CacheConfig, CommitId, CommitInfo, Detail, DetailCache, DetailReady, GitRepository, ProcessRunner,
};

/// Commit details - show signature verification state for commits
#[derive(Parser)]
#[command(name = "commit-details")]
#[command(about = "Show signature verification state for git commits", long_about = None)]
struct Cli {
    /// Path to the git repository
    #[arg(value_name = "REPO_PATH", default_value = ".")]
    repo_path: String,

    /// Revisions to check instead of the newest commits
    #[arg(value_name = "REV")]
    revs: Vec<String>,

    /// Number of recent commits to check when no revisions are given
    #[arg(short, long, default_value_t = 20, env = "COMMIT_DETAILS_LIMIT")]
    limit: usize,

    /// Background worker threads
    #[arg(short, long, default_value_t = 1, env = "COMMIT_DETAILS_WORKERS")]
    workers: usize,

    /// Per-commit git timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_COMMAND_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..),
        env = "COMMIT_DETAILS_TIMEOUT"
    )]
    timeout_secs: u64,

    /// Maximum cached details (0 = unbounded)
    #[arg(long, default_value_t = DEFAULT_CAPACITY, env = "COMMIT_DETAILS_CAPACITY")]
    capacity: usize,

    /// Ready notifications buffered before the waiter falls back to re-querying
    #[arg(long, default_value_t = DEFAULT_READY_CHANNEL_CAPACITY, env = "COMMIT_DETAILS_READY_BUFFER")]
    ready_buffer: usize,

    /// Give up waiting for results after this many seconds
    #[arg(long, default_value_t = 60, env = "COMMIT_DETAILS_WAIT")]
    wait_secs: u64,

    /// Git executable to run
    #[arg(long, default_value = "git", env = "COMMIT_DETAILS_GIT")]
    git: PathBuf,

    /// Print JSON instead of a table
    #[arg(long, env = "COMMIT_DETAILS_JSON")]
    json: bool,
}

#[derive(Serialize)]
struct Row<'a> {
    #[serde(flatten)]
    commit: &'a CommitInfo,
    #[serde(flatten)]
    detail: Detail,
}

/// Wait until every id has a resolved detail. False on timeout.
async fn wait_for_details(
    cache: &DetailCache,
    ids: &[CommitId],
    ready: &mut broadcast::Receiver<DetailReady>,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        // Re-request so entries evicted by a small capacity come back
        let remaining = ids
            .iter()
            .filter(|id| !cache.query(id, true).is_resolved())
            .count();
        if remaining == 0 {
            return true;
        }
        tracing::debug!("Waiting for {} commit detail(s)", remaining);

        match tokio::time::timeout_at(deadline, ready.recv()).await {
            Ok(Ok(_)) | Ok(Err(RecvError::Lagged(_))) => continue,
            Ok(Err(RecvError::Closed)) | Err(_) => return false,
        }
    }
}

fn print_table(rows: &[Row<'_>]) {
    for row in rows {
        let signer = row.detail.signer.as_deref().unwrap_or("-");
        println!(
            "{}  {}  {:<18} {:<28} {:<16} {}",
            row.commit.oid.short(10),
            row.detail.sign_verify.code(),
            row.detail.sign_verify.label(),
            signer,
            row.commit.relative_time,
            row.commit.message,
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (quiet unless RUST_LOG says otherwise)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let repo = match GitRepository::open(&cli.repo_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("✗ Failed to open repository: {}", e);
            eprintln!("  Path: {}", cli.repo_path);
            std::process::exit(1);
        }
    };

    let commits: Vec<CommitInfo> = if cli.revs.is_empty() {
        repo.recent_commits(cli.limit)?
    } else {
        cli.revs
            .iter()
            .map(|rev| repo.resolve_commit(rev).and_then(|id| repo.commit_info(&id)))
            .collect::<commit_details::Result<_>>()?
    };

    if commits.is_empty() {
        eprintln!("✗ No commits to check");
        return Ok(());
    }

    let runner = ProcessRunner::new(repo.workdir())
        .with_git_binary(&cli.git)
        .with_timeout(Duration::from_secs(cli.timeout_secs));
    let config = CacheConfig::default()
        .with_workers(cli.workers)
        .with_capacity(cli.capacity)
        .with_ready_channel_capacity(cli.ready_buffer);

    let cache = DetailCache::new(config);
    let mut ready = cache.subscribe();
    cache.start(Arc::new(runner))?;

    let ids: Vec<CommitId> = commits.iter().map(|c| c.oid.clone()).collect();
    let wait = Duration::from_secs(cli.wait_secs);

    let complete = tokio::select! {
        complete = wait_for_details(&cache, &ids, &mut ready, wait) => complete,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n  Interrupted, stopping workers...");
            false
        }
    };

    let rows: Vec<Row<'_>> = commits
        .iter()
        .map(|commit| Row {
            commit,
            detail: cache.query(&commit.oid, false),
        })
        .collect();

    // Workers are plain threads; joining them must not stall the runtime
    tokio::task::block_in_place(|| cache.stop());

    if !complete {
        let missing = rows.iter().filter(|r| !r.detail.is_resolved()).count();
        eprintln!("  Warning: {} commit(s) still unresolved", missing);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print_table(&rows);
    }

    Ok(())
}
