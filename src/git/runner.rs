//! Command runner abstraction.
//!
//! The detail cache never spawns processes itself. It hands git arguments to
//! a `GitRunner` chosen by the caller at `DetailCache::start`:
//! - `ProcessRunner`: runs the real `git` binary in a working directory
//! - `DryRunRunner` (see `dry_run.rs`): canned output, no I/O, for tests
//!
//! Every run receives an `Interrupt` token. Runners that can block for a long
//! time are expected to poll it and give up with `AppError::Interrupted`.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};

/// Upper bound for one git invocation when none is configured.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared cancellation flag handed to every run.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Raw result of one git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turns a non-zero exit into `AppError::CommandFailed`.
    pub fn check(self, command: &str) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(AppError::CommandFailed {
                command: command.to_string(),
                exit_code: self.exit_code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Executes one git subcommand synchronously.
///
/// Implementations must be shareable across worker threads. The cache calls
/// `run` from at most one thread per worker, never while holding its lock.
pub trait GitRunner: Send + Sync {
    /// Run `git <args>` and return its output. A non-zero exit is not an
    /// error at this level; callers inspect `GitOutput::success`.
    fn run(&self, args: &[String], interrupt: &Interrupt) -> Result<GitOutput>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

/// Runs the real git binary as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    git_binary: PathBuf,
    change_dir: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    pub fn new<P: AsRef<Path>>(change_dir: P) -> Self {
        Self {
            git_binary: PathBuf::from("git"),
            change_dir: change_dir.as_ref().to_path_buf(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_git_binary<P: AsRef<Path>>(mut self, git_binary: P) -> Self {
        self.git_binary = git_binary.as_ref().to_path_buf();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn describe(&self, args: &[String]) -> String {
        format!("{} {}", self.git_binary.display(), args.join(" "))
    }
}

impl GitRunner for ProcessRunner {
    fn run(&self, args: &[String], interrupt: &Interrupt) -> Result<GitOutput> {
        let command_line = self.describe(args);
        tracing::trace!("Running {} in {}", command_line, self.change_dir.display());

        let mut child = Command::new(&self.git_binary)
            .args(args)
            .current_dir(&self.change_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| AppError::CommandSpawn {
                program: self.git_binary.display().to_string(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty child can't fill a pipe
        // buffer and stall before we observe its exit.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if interrupt.is_triggered() {
                        terminate(&mut child);
                        tracing::debug!("Interrupted {}", command_line);
                        return Err(AppError::Interrupted(command_line));
                    }
                    if started.elapsed() >= self.timeout {
                        terminate(&mut child);
                        tracing::warn!("{} timed out after {:?}", command_line, self.timeout);
                        return Err(AppError::CommandTimeout {
                            command: command_line,
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    terminate(&mut child);
                    return Err(AppError::Internal(format!(
                        "Failed to wait for {}: {}",
                        command_line, e
                    )));
                }
            }
        };

        Ok(GitOutput {
            exit_code: status.code(),
            stdout: join_reader(stdout),
            stderr: join_reader(stderr),
        })
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).to_string())
        .unwrap_or_default()
}

/// Kill and reap. Reader threads are left to finish once the pipes close.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
