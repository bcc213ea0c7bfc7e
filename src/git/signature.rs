//! Signature verification lookup for a single commit.
//!
//! Runs `git log -1` with the `%G?`, `%GS` and `%GK` placeholders and turns
//! the result into a `Detail`. This module holds no state: whatever goes
//! wrong (spawn failure, timeout, non-zero exit, garbage output) ends up as
//! `SignatureStatus::Error` so one bad commit can't take a worker down.

use crate::error::AppError;
use crate::git::runner::{GitRunner, Interrupt};
use crate::models::{CommitId, Detail, SignatureStatus};

/// `%G?`, signer and key separated by NUL bytes
pub const SIGNATURE_FORMAT: &str = "--format=%G?%x00%GS%x00%GK";

/// Outcome of one computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Computed {
    Ready(Detail),
    /// The run was cancelled by `DetailCache::stop`; nothing should be cached.
    Interrupted,
}

pub fn signature_args(id: &CommitId) -> Vec<String> {
    vec![
        "log".to_string(),
        "-1".to_string(),
        "--no-walk".to_string(),
        "--no-show-signature".to_string(),
        SIGNATURE_FORMAT.to_string(),
        id.to_string(),
    ]
}

pub fn compute_detail(id: &CommitId, runner: &dyn GitRunner, interrupt: &Interrupt) -> Computed {
    let args = signature_args(id);
    let command = format!("git {}", args.join(" "));

    let output = match runner.run(&args, interrupt).and_then(|o| o.check(&command)) {
        Ok(output) => output,
        Err(AppError::Interrupted(_)) => return Computed::Interrupted,
        Err(e) => {
            tracing::warn!("Signature lookup for {} failed: {}", id.short(12), e);
            return Computed::Ready(Detail::error());
        }
    };

    match parse_signature_output(&output.stdout) {
        Some(detail) => Computed::Ready(detail),
        None => {
            tracing::warn!(
                "Unparseable signature output for {}: {:?}",
                id.short(12),
                output.stdout
            );
            Computed::Ready(Detail::error())
        }
    }
}

/// Parse `<code>\0<signer>\0<key>`. Empty signer or key fields become `None`.
pub fn parse_signature_output(stdout: &str) -> Option<Detail> {
    let line = stdout.lines().find(|l| !l.trim().is_empty())?;
    let mut fields = line.split('\0');

    let mut code = fields.next()?.trim().chars();
    let sign_verify = match (code.next(), code.next()) {
        (Some(c), None) => SignatureStatus::from_code(c)?,
        _ => return None,
    };

    let mut optional = || {
        fields
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };
    let signer = optional();
    let key = optional();

    Some(Detail {
        sign_verify,
        signer,
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::dry_run::DryRunRunner;
    use crate::git::runner::GitOutput;
    use std::time::Duration;

    fn id(hex: &str) -> CommitId {
        CommitId::new(hex).unwrap()
    }

    #[test]
    fn test_parse_good_signature() {
        let detail = parse_signature_output("G\0Alice <alice@example.com>\0ABCDEF0123456789\n").unwrap();
        assert_eq!(detail.sign_verify, SignatureStatus::Good);
        assert_eq!(detail.signer.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(detail.key.as_deref(), Some("ABCDEF0123456789"));
    }

    #[test]
    fn test_parse_unsigned() {
        let detail = parse_signature_output("N\0\0\n").unwrap();
        assert_eq!(detail, Detail::with_status(SignatureStatus::NoSignature));
        let bare = parse_signature_output("N").unwrap();
        assert_eq!(bare.sign_verify, SignatureStatus::NoSignature);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_signature_output(""), None);
        assert_eq!(parse_signature_output("\n\n"), None);
        assert_eq!(parse_signature_output("Q\0\0"), None);
        assert_eq!(parse_signature_output("GG\0x\0y"), None);
        assert_eq!(parse_signature_output("fatal: bad object"), None);
    }

    #[test]
    fn test_signature_args_end_with_commit() {
        let args = signature_args(&id("deadbeef"));
        assert_eq!(args.first().map(String::as_str), Some("log"));
        assert_eq!(args.last().map(String::as_str), Some("deadbeef"));
        assert!(args.iter().any(|a| a == SIGNATURE_FORMAT));
    }

    #[test]
    fn test_compute_detail_success() {
        let commit = id("deadbeef");
        let runner = DryRunRunner::new().with_output(&commit, GitOutput::ok("B\0Mallory\0BAD\n"));
        let computed = compute_detail(&commit, &runner, &Interrupt::new());
        let Computed::Ready(detail) = computed else {
            panic!("expected a detail");
        };
        assert_eq!(detail.sign_verify, SignatureStatus::Bad);
        assert_eq!(detail.signer.as_deref(), Some("Mallory"));
    }

    #[test]
    fn test_compute_detail_maps_failures_to_error() {
        let commit = id("deadbeef");

        let failing = DryRunRunner::new().with_failure();
        assert_eq!(
            compute_detail(&commit, &failing, &Interrupt::new()),
            Computed::Ready(Detail::error())
        );

        let non_zero = DryRunRunner::new()
            .with_output(&commit, GitOutput::failed(128, "fatal: bad object deadbeef"));
        assert_eq!(
            compute_detail(&commit, &non_zero, &Interrupt::new()),
            Computed::Ready(Detail::error())
        );

        let empty = DryRunRunner::new();
        assert_eq!(
            compute_detail(&commit, &empty, &Interrupt::new()),
            Computed::Ready(Detail::error())
        );
    }

    /// Runner whose every command overruns its timeout.
    struct TimingOutRunner;

    impl GitRunner for TimingOutRunner {
        fn run(&self, args: &[String], _interrupt: &Interrupt) -> crate::error::Result<GitOutput> {
            Err(AppError::CommandTimeout {
                command: format!("git {}", args.join(" ")),
                timeout: Duration::from_secs(10),
            })
        }

        fn name(&self) -> &'static str {
            "timing-out"
        }
    }

    #[test]
    fn test_compute_detail_timeout_is_error() {
        let commit = id("deadbeef");
        assert_eq!(
            compute_detail(&commit, &TimingOutRunner, &Interrupt::new()),
            Computed::Ready(Detail::error())
        );
    }

    #[test]
    fn test_compute_detail_interrupted() {
        let commit = id("deadbeef");
        let runner = DryRunRunner::new().with_delay(Duration::from_secs(5));
        let interrupt = Interrupt::new();
        interrupt.trigger();
        assert_eq!(compute_detail(&commit, &runner, &interrupt), Computed::Interrupted);
    }
}
