use git2::{Repository, Sort};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{CommitId, CommitInfo};

pub struct GitRepository {
    repo: Mutex<Repository>,
    workdir: PathBuf,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(&path)
            .map_err(|_| AppError::RepoNotFound(path.as_ref().to_string_lossy().to_string()))?;

        // Bare repositories have no workdir; git runs fine from the git dir.
        let workdir = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self {
            repo: Mutex::new(repo),
            workdir,
        })
    }

    /// Directory git commands should run in
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T>,
    {
        let repo = self.repo.lock().map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        f(&repo)
    }

    /// Resolve a revision expression (`HEAD~2`, a branch, an abbreviated hash) to a commit id.
    pub fn resolve_commit(&self, rev: &str) -> Result<CommitId> {
        self.with_repo(|repo| {
            let object = repo
                .revparse_single(rev)
                .map_err(|_| AppError::CommitNotFound(rev.to_string()))?;
            let commit = object
                .peel_to_commit()
                .map_err(|_| AppError::CommitNotFound(rev.to_string()))?;
            Ok(CommitId::from(commit.id()))
        })
    }

    /// Newest `limit` commits reachable from HEAD, in time order.
    pub fn recent_commits(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        self.with_repo(|repo| {
            if repo.is_empty()? {
                return Ok(Vec::new());
            }

            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TIME)?;
            revwalk.push_head()?;

            let mut commits = Vec::new();
            for oid in revwalk.take(limit) {
                let commit = repo.find_commit(oid?)?;
                commits.push(commit_to_info(&commit));
            }
            Ok(commits)
        })
    }

    /// Look up listing info for a single commit.
    pub fn commit_info(&self, id: &CommitId) -> Result<CommitInfo> {
        self.with_repo(|repo| {
            let commit = repo
                .revparse_single(id.as_str())
                .and_then(|obj| obj.peel_to_commit())
                .map_err(|_| AppError::CommitNotFound(id.to_string()))?;
            Ok(commit_to_info(&commit))
        })
    }
}

pub fn commit_to_info(commit: &git2::Commit) -> CommitInfo {
    let timestamp = commit.time().seconds();
    CommitInfo {
        oid: CommitId::from(commit.id()),
        message: commit.summary().unwrap_or("").trim().to_string(),
        author: commit.author().name().unwrap_or("Unknown").to_string(),
        timestamp,
        relative_time: format_relative_time(timestamp),
    }
}

pub fn format_relative_time(timestamp: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let diff = now - timestamp;

    let (value, unit) = if diff < 60 {
        return "just now".to_string();
    } else if diff < 3600 {
        (diff / 60, "minute")
    } else if diff < 86400 {
        (diff / 3600, "hour")
    } else if diff < 2592000 {
        (diff / 86400, "day")
    } else if diff < 31536000 {
        (diff / 2592000, "month")
    } else {
        (diff / 31536000, "year")
    };

    format!("{} {}{} ago", value, unit, if value == 1 { "" } else { "s" })
}
