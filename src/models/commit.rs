use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Shortest abbreviated hash accepted as a commit id.
pub const MIN_ID_LEN: usize = 4;

/// Longest accepted hash (SHA-256 object format).
pub const MAX_ID_LEN: usize = 64;

/// Hex digest identifying a commit. Always lowercase.
///
/// Used as the only key of the detail cache and its request ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId(String);

impl CommitId {
    pub fn new(hex: impl AsRef<str>) -> Result<Self, AppError> {
        let hex = hex.as_ref().trim();
        let valid_len = (MIN_ID_LEN..=MAX_ID_LEN).contains(&hex.len());
        if !valid_len || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AppError::InvalidCommitId(hex.to_string()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, for display in tables and logs.
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CommitId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CommitId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.0
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        // Oid's Display is already lowercase hex
        Self(oid.to_string())
    }
}

/// Basic commit info for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitInfo {
    pub oid: CommitId,
    pub message: String,
    pub author: String,
    pub timestamp: i64,
    pub relative_time: String,
}
