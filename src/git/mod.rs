pub mod dry_run;
pub mod repository;
pub mod runner;
pub mod signature;

pub use dry_run::DryRunRunner;
pub use repository::GitRepository;
pub use runner::{GitOutput, GitRunner, Interrupt, ProcessRunner};
