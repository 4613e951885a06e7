//! Discovery of existing snapshots under a destination root.

pub mod record;

pub use record::{format_timestamp, parse_timestamp, BackupRecord, TIMESTAMP_FORMAT};

use crate::utils::{Result, SnapshotError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Verify that the destination root exists and is a directory.
///
/// Returns the canonical path so later `--link-dest` arguments are absolute.
pub fn validate_destination(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(SnapshotError::InvalidDestination(root.to_path_buf()));
    }
    std::fs::canonicalize(root).map_err(|_| SnapshotError::InvalidDestination(root.to_path_buf()))
}

/// Snapshots found in a destination root, oldest first.
#[derive(Debug, Clone, Default)]
pub struct BackupCatalog {
    records: Vec<BackupRecord>,
}

impl BackupCatalog {
    /// List the immediate subdirectories of `root` and keep the snapshots.
    ///
    /// Files and directories with other names (staging directories, logs,
    /// anything an operator put there) are skipped.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut records = Vec::new();

        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let name = entry.file_name();
            debug!("Found directory {} in backup destination.", name.to_string_lossy());
            match BackupRecord::from_path(&path) {
                Some(record) => records.push(record),
                None => debug!(path = %path.display(), "Not a backup, skipping"),
            }
        }

        let catalog = Self::from_records(records);
        info!("Found {} backups.", catalog.len());
        for record in catalog.iter() {
            debug!("{}", record);
        }

        Ok(catalog)
    }

    /// Build a catalog from already classified records.
    pub fn from_records(mut records: Vec<BackupRecord>) -> Self {
        // Stable: equal timestamps keep their listing order.
        records.sort_by(BackupRecord::chronological);
        Self { records }
    }

    /// The newest snapshot, if any.
    pub fn most_recent(&self) -> Option<&BackupRecord> {
        self.records.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackupRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[BackupRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_empty_root() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let catalog = BackupCatalog::scan(temp_dir.path())?;
        assert!(catalog.is_empty());
        assert!(catalog.most_recent().is_none());
        Ok(())
    }

    #[test]
    fn test_scan_keeps_only_snapshots_in_order() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        for name in ["2024_03_01_10_00_00", "2023_12_24_18_30_00", "2024_01_15_08_00_00"] {
            fs::create_dir(root.join(name))?;
        }
        fs::create_dir(root.join("tmpdir-1234"))?;
        fs::create_dir(root.join("2024_3_1_10_00_00"))?;
        fs::create_dir(root.join("lost+found"))?;
        fs::write(root.join("2024_02_01_00_00_00"), b"a file, not a snapshot")?;
        fs::write(root.join("2024_03_01_10_00_00.log"), b"log")?;

        let catalog = BackupCatalog::scan(root)?;
        let names: Vec<String> = catalog.iter().map(BackupRecord::name).collect();
        assert_eq!(
            names,
            vec!["2023_12_24_18_30_00", "2024_01_15_08_00_00", "2024_03_01_10_00_00"]
        );
        assert_eq!(catalog.most_recent().unwrap().path, root.join("2024_03_01_10_00_00"));
        Ok(())
    }

    #[test]
    fn test_from_records_is_stable_on_ties() {
        let t = parse_timestamp("2024_01_01_00_00_00").unwrap();
        let first = BackupRecord::new(PathBuf::from("/one/2024_01_01_00_00_00"), t);
        let second = BackupRecord::new(PathBuf::from("/two/2024_01_01_00_00_00"), t);
        let older = BackupRecord::new(
            PathBuf::from("/one/2023_01_01_00_00_00"),
            parse_timestamp("2023_01_01_00_00_00").unwrap(),
        );

        let catalog = BackupCatalog::from_records(vec![first.clone(), older.clone(), second.clone()]);
        assert_eq!(catalog.records(), &[older, first, second.clone()]);
        assert_eq!(catalog.most_recent(), Some(&second));
    }

    #[test]
    fn test_validate_destination() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("plain-file");
        fs::write(&file, b"x")?;

        let root = validate_destination(temp_dir.path())?;
        assert!(root.is_absolute());

        assert!(matches!(
            validate_destination(&temp_dir.path().join("missing")),
            Err(SnapshotError::InvalidDestination(_))
        ));
        assert!(matches!(
            validate_destination(&file),
            Err(SnapshotError::InvalidDestination(_))
        ));
        Ok(())
    }
}
