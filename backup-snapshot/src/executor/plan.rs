//! What a run is going to do, decided once from the catalog and the clock.

use crate::catalog::{format_timestamp, BackupCatalog, BackupRecord};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// The new snapshot's identity and how it relates to the previous one.
#[derive(Debug, Clone)]
pub struct SnapshotPlan {
    /// Destination root
    pub root: PathBuf,

    /// Run start, truncated to whole seconds
    pub started_at: NaiveDateTime,

    /// `YYYY_MM_DD_HH_MM_SS` of `started_at`
    pub snapshot_name: String,

    /// Where the snapshot is published
    pub snapshot_path: PathBuf,

    /// Most recent existing snapshot, used as the hard-link reference
    pub reference: Option<BackupRecord>,

    /// Force checksum comparison for this run
    pub thorough: bool,

    /// Transfer log, next to the snapshot
    pub log_file: PathBuf,
}

impl SnapshotPlan {
    pub fn compute(root: &Path, catalog: &BackupCatalog, now: NaiveDateTime) -> Self {
        let started_at = now.with_nanosecond(0).unwrap_or(now);
        let snapshot_name = format_timestamp(&started_at);
        let reference = catalog.most_recent().cloned();
        let thorough = needs_thorough_check(reference.as_ref(), &started_at);

        Self {
            root: root.to_path_buf(),
            started_at,
            snapshot_path: root.join(&snapshot_name),
            log_file: root.join(format!("{}.log", snapshot_name)),
            snapshot_name,
            reference,
            thorough,
        }
    }

    /// The previous snapshot's subdirectory for a source staged as `name`.
    pub fn link_reference(&self, name: &OsStr) -> Option<PathBuf> {
        self.reference.as_ref().map(|r| r.path.join(name))
    }
}

/// Full checksum verification runs on the first snapshot of each calendar
/// month, and when there is nothing to compare against.
pub fn needs_thorough_check(reference: Option<&BackupRecord>, now: &NaiveDateTime) -> bool {
    match reference {
        None => true,
        Some(record) => {
            record.timestamp.month() != now.month() || record.timestamp.year() != now.year()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::parse_timestamp;

    fn record(name: &str) -> BackupRecord {
        BackupRecord::new(PathBuf::from("/backup").join(name), parse_timestamp(name).unwrap())
    }

    fn ts(name: &str) -> NaiveDateTime {
        parse_timestamp(name).unwrap()
    }

    #[test]
    fn test_thorough_without_reference() {
        assert!(needs_thorough_check(None, &ts("2024_01_31_12_00_00")));
    }

    #[test]
    fn test_thorough_on_month_change() {
        let last = record("2024_01_31_23_59_59");
        assert!(needs_thorough_check(Some(&last), &ts("2024_02_01_00_00_00")));
    }

    #[test]
    fn test_not_thorough_within_month() {
        let last = record("2024_01_05_08_00_00");
        assert!(!needs_thorough_check(Some(&last), &ts("2024_01_31_22_00_00")));
    }

    #[test]
    fn test_thorough_same_month_other_year() {
        let last = record("2023_01_20_08_00_00");
        assert!(needs_thorough_check(Some(&last), &ts("2024_01_21_08_00_00")));
    }

    #[test]
    fn test_compute_with_empty_catalog() {
        let now = ts("2024_06_15_09_30_00") + chrono::Duration::milliseconds(750);
        let plan = SnapshotPlan::compute(Path::new("/backup"), &BackupCatalog::default(), now);

        assert_eq!(plan.snapshot_name, "2024_06_15_09_30_00");
        assert_eq!(plan.started_at, ts("2024_06_15_09_30_00"));
        assert_eq!(plan.snapshot_path, PathBuf::from("/backup/2024_06_15_09_30_00"));
        assert_eq!(plan.log_file, PathBuf::from("/backup/2024_06_15_09_30_00.log"));
        assert!(plan.reference.is_none());
        assert!(plan.thorough);
        assert_eq!(plan.link_reference(OsStr::new("docs")), None);
    }

    #[test]
    fn test_compute_picks_most_recent_reference() {
        let catalog = BackupCatalog::from_records(vec![
            record("2024_06_10_09_30_00"),
            record("2024_05_31_09_30_00"),
        ]);
        let plan = SnapshotPlan::compute(Path::new("/backup"), &catalog, ts("2024_06_15_09_30_00"));

        assert_eq!(plan.reference, Some(record("2024_06_10_09_30_00")));
        assert!(!plan.thorough);
        assert_eq!(
            plan.link_reference(OsStr::new("docs")),
            Some(PathBuf::from("/backup/2024_06_10_09_30_00/docs"))
        );
    }
}
