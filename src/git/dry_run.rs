//! No-op command runner.
//!
//! Answers every git invocation from a table of canned outputs keyed by the
//! commit id (the last argument of the command) and records what was asked.
//! Nothing is spawned and nothing touches the filesystem, which makes the
//! detail cache testable without a git binary.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{AppError, Result};
use crate::git::runner::{GitOutput, GitRunner, Interrupt};
use crate::models::CommitId;

const DELAY_SLICE: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
pub struct DryRunRunner {
    outputs: HashMap<CommitId, GitOutput>,
    default_output: GitOutput,
    delay: Option<Duration>,
    fail: bool,
    calls: Mutex<HashMap<String, usize>>,
    commands: Mutex<Vec<Vec<String>>>,
}

impl DryRunRunner {
    /// Runner answering every command with empty, successful output.
    pub fn new() -> Self {
        Self {
            default_output: GitOutput::ok(""),
            ..Self::default()
        }
    }

    /// Canned output for commands whose last argument is `id`.
    pub fn with_output(mut self, id: &CommitId, output: GitOutput) -> Self {
        self.outputs.insert(id.clone(), output);
        self
    }

    /// Output for ids without a canned entry.
    pub fn with_default_output(mut self, output: GitOutput) -> Self {
        self.default_output = output;
        self
    }

    /// Simulate a slow git by sleeping before answering. The sleep gives up
    /// early when the run is interrupted.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every run fail as if git could not be executed.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of runs issued for `id`.
    pub fn invocations(&self, id: &CommitId) -> usize {
        self.calls.lock().get(id.as_str()).copied().unwrap_or(0)
    }

    pub fn total_invocations(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Every argument list received, in call order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().clone()
    }

    fn wait(&self, interrupt: &Interrupt) -> bool {
        let Some(delay) = self.delay else {
            return true;
        };
        let started = Instant::now();
        while started.elapsed() < delay {
            if interrupt.is_triggered() {
                return false;
            }
            thread::sleep(DELAY_SLICE.min(delay));
        }
        true
    }
}

impl GitRunner for DryRunRunner {
    fn run(&self, args: &[String], interrupt: &Interrupt) -> Result<GitOutput> {
        let key = args.last().cloned().unwrap_or_default();
        *self.calls.lock().entry(key.clone()).or_insert(0) += 1;
        self.commands.lock().push(args.to_vec());
        tracing::trace!("Dry run: git {}", args.join(" "));

        if !self.wait(interrupt) {
            return Err(AppError::Interrupted(format!("git {}", args.join(" "))));
        }
        if self.fail {
            return Err(AppError::Internal("dry-run runner configured to fail".to_string()));
        }

        let output = CommitId::new(&key)
            .ok()
            .and_then(|id| self.outputs.get(&id))
            .unwrap_or(&self.default_output);
        Ok(output.clone())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
