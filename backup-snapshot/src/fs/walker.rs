//! Snapshot tree statistics.
//!
//! A walk over a freshly staged snapshot tells how much of it is new data
//! and how much is shared with earlier snapshots through hard links.

use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

/// Totals for one snapshot tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Regular files (symlinks are counted as files, not followed)
    pub files: u64,

    /// Directories below the root
    pub dirs: u64,

    /// Sum of regular file sizes in bytes
    pub bytes: u64,

    /// Regular files with more than one link, i.e. content shared with
    /// another snapshot (or hard-linked inside the source)
    pub linked_files: u64,

    /// Bytes of those linked files
    pub linked_bytes: u64,
}

impl TreeStats {
    /// Bytes that this snapshot added on disk.
    pub fn new_bytes(&self) -> u64 {
        self.bytes.saturating_sub(self.linked_bytes)
    }
}

/// Walk `root` without following symlinks and sum up its contents.
pub fn tree_stats(root: &Path) -> std::io::Result<TreeStats> {
    let mut stats = TreeStats::default();

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = entry?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            stats.dirs += 1;
            continue;
        }

        stats.files += 1;
        if !file_type.is_file() {
            continue;
        }

        let metadata = entry.metadata()?;
        stats.bytes += metadata.len();
        if link_count(&metadata) > 1 {
            stats.linked_files += 1;
            stats.linked_bytes += metadata.len();
        }
    }

    Ok(stats)
}

#[cfg(unix)]
fn link_count(metadata: &std::fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink()
}

#[cfg(not(unix))]
fn link_count(_metadata: &std::fs::Metadata) -> u64 {
    1
}
