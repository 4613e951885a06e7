//! A single existing snapshot and the timestamp naming scheme.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Directory-name pattern of a snapshot, e.g. `2024_03_01_22_15_00`.
pub const TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// One snapshot directory found under the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
}

/// Parse a directory base name as a snapshot timestamp.
///
/// Returns `None` for anything that is not exactly `YYYY_MM_DD_HH_MM_SS`.
/// The formatted value must reproduce `name`, which rejects short fields
/// (`2024_3_1_...`) that the parser alone would accept.
pub fn parse_timestamp(name: &str) -> Option<NaiveDateTime> {
    let timestamp = NaiveDateTime::parse_from_str(name, TIMESTAMP_FORMAT).ok()?;
    (format_timestamp(&timestamp) == name).then_some(timestamp)
}

/// Format a timestamp as a snapshot directory name.
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

impl BackupRecord {
    pub fn new(path: PathBuf, timestamp: NaiveDateTime) -> Self {
        Self { path, timestamp }
    }

    /// True if the base name of `path` is a snapshot timestamp.
    pub fn is_backup(path: &Path) -> bool {
        Self::from_path(path).is_some()
    }

    /// Build a record from a snapshot directory path, or `None` if its
    /// base name does not follow the timestamp pattern.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let timestamp = parse_timestamp(name)?;
        Some(Self::new(path.to_path_buf(), timestamp))
    }

    /// Snapshot id, the directory base name.
    pub fn name(&self) -> String {
        format_timestamp(&self.timestamp)
    }

    /// Compare by timestamp only. Paths are not consulted, so records with
    /// identical timestamps compare `Equal` and a stable sort keeps them
    /// in their original order.
    pub fn chronological(a: &Self, b: &Self) -> Ordering {
        a.timestamp.cmp(&b.timestamp)
    }
}

impl fmt::Display for BackupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backup from {} @ {}", self.timestamp, self.path.display())
    }
}
