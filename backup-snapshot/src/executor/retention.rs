//! Opt-in pruning of old snapshots.

use crate::catalog::BackupCatalog;
use crate::utils::Result;
use std::path::Path;
use tracing::{error, info};

/// Keep the newest `keep` snapshots under `root` and delete the rest,
/// including their `.log` files. Returns how many snapshots were removed.
///
/// Failures to delete one snapshot are logged and do not stop the others.
pub fn prune(root: &Path, keep: usize) -> Result<usize> {
    let catalog = BackupCatalog::scan(root)?;
    if catalog.len() <= keep {
        return Ok(0);
    }

    let excess = catalog.len() - keep;
    let mut removed = 0;

    for record in &catalog.records()[..excess] {
        match std::fs::remove_dir_all(&record.path) {
            Ok(()) => {
                removed += 1;
                info!(path = %record.path.display(), "Deleted old snapshot");
            }
            Err(e) => {
                error!(path = %record.path.display(), error = %e, "Failed to delete old snapshot");
                continue;
            }
        }

        let log_file = root.join(format!("{}.log", record.name()));
        if let Err(e) = std::fs::remove_file(&log_file) {
            if e.kind() != std::io::ErrorKind::NotFound {
                error!(path = %log_file.display(), error = %e, "Failed to delete snapshot log");
            }
        }
    }

    Ok(removed)
}
