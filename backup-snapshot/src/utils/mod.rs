//! Utility modules for the snapshot tool.

pub mod errors;
pub mod format;
pub mod logger;

pub use errors::{Result, SnapshotError};
