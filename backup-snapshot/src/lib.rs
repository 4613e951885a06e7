//! Backup Snapshot Library
//!
//! Incremental, hard-link deduplicated directory snapshots. Each run copies
//! the sources into a timestamped directory with rsync, hard-linking files
//! that did not change since the previous snapshot.

pub mod catalog;
pub mod config;
pub mod executor;
pub mod fs;
pub mod shutdown;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use catalog::{BackupCatalog, BackupRecord};
pub use config::Config;
pub use executor::{RunOptions, RunOutcome, RunReport, SnapshotOrchestrator};
pub use sync::{FilesystemSemantics, ProcessTransferer, SyncCommandBuilder};
pub use utils::errors::SnapshotError;
pub type Result<T> = std::result::Result<T, SnapshotError>;
