//! Per-commit detail records.
//!
//! `Detail` is what the cache hands back to callers. A default-constructed
//! value means "not computed yet"; anything else came from a worker.

use serde::{Deserialize, Serialize};

/// Signature verification state of a commit, following git's `%G?` codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    /// Not computed yet
    #[default]
    Unknown,
    /// `G`: good signature
    Good,
    /// `U`: good signature with unknown validity
    GoodUntrusted,
    /// `X`: good signature that has expired
    ExpiredSignature,
    /// `Y`: good signature made by an expired key
    ExpiredKey,
    /// `R`: good signature made by a revoked key
    RevokedKey,
    /// `E`: signature cannot be checked, usually a missing key
    MissingKey,
    /// `B`: bad signature
    Bad,
    /// `N`: commit is not signed
    NoSignature,
    /// The git command failed or its output could not be parsed
    Error,
}

impl SignatureStatus {
    /// Maps a `%G?` placeholder character. Unrecognised codes yield `None`.
    pub fn from_code(code: char) -> Option<Self> {
        let status = match code {
            'G' => Self::Good,
            'U' => Self::GoodUntrusted,
            'X' => Self::ExpiredSignature,
            'Y' => Self::ExpiredKey,
            'R' => Self::RevokedKey,
            'E' => Self::MissingKey,
            'B' => Self::Bad,
            'N' => Self::NoSignature,
            _ => return None,
        };
        Some(status)
    }

    /// Single-character code. `?` for not computed, `!` for errors.
    pub fn code(self) -> char {
        match self {
            Self::Unknown => '?',
            Self::Good => 'G',
            Self::GoodUntrusted => 'U',
            Self::ExpiredSignature => 'X',
            Self::ExpiredKey => 'Y',
            Self::RevokedKey => 'R',
            Self::MissingKey => 'E',
            Self::Bad => 'B',
            Self::NoSignature => 'N',
            Self::Error => '!',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Good => "good",
            Self::GoodUntrusted => "good (untrusted)",
            Self::ExpiredSignature => "expired signature",
            Self::ExpiredKey => "expired key",
            Self::RevokedKey => "revoked key",
            Self::MissingKey => "missing key",
            Self::Bad => "bad",
            Self::NoSignature => "no signature",
            Self::Error => "error",
        }
    }
}

/// Metadata computed for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    pub sign_verify: SignatureStatus,
    /// Signer name as reported by `%GS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    /// Signing key as reported by `%GK`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Detail {
    pub fn with_status(sign_verify: SignatureStatus) -> Self {
        Self {
            sign_verify,
            ..Self::default()
        }
    }

    pub fn error() -> Self {
        Self::with_status(SignatureStatus::Error)
    }

    /// False only for the default "not computed yet" value.
    pub fn is_resolved(&self) -> bool {
        self.sign_verify != SignatureStatus::Unknown
    }
}
