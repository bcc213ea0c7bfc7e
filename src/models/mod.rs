//! Plain data types shared across the crate.
//!
//! - `commit`: CommitId (cache key), CommitInfo (listing row)
//! - `detail`: Detail, SignatureStatus

pub mod commit;
pub mod detail;

pub use commit::*;
pub use detail::*;
