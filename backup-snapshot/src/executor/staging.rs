//! The temporary directory a snapshot is assembled in.

use crate::utils::{Result, SnapshotError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Prefix of staging directory names. Never matches the snapshot pattern.
pub const STAGING_PREFIX: &str = "tmpdir-";

/// A staging directory under the destination root.
///
/// Consumed by exactly one of [`publish`](Self::publish),
/// [`discard`](Self::discard) or [`keep`](Self::keep). Dropping it leaves
/// the directory on disk.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Create `<root>/tmpdir-<uuid>`. Fails if the directory exists.
    pub fn create(root: &Path) -> Result<Self> {
        let path = root.join(format!("{}{}", STAGING_PREFIX, Uuid::new_v4().simple()));
        std::fs::create_dir(&path).map_err(|source| SnapshotError::StagingCreate {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), "Temporary backup destination");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rename the staging directory to `target` in one step.
    ///
    /// Refuses a `target` that already exists when checked. The check and
    /// the rename are separate steps, so an empty directory created at
    /// `target` in between is still replaced (rename(2) semantics). On
    /// failure the staged tree stays under its temporary name.
    pub fn publish(self, target: &Path) -> Result<PathBuf> {
        debug!("Move temporary directory {} to {}", self.path.display(), target.display());

        if target.exists() {
            return Err(SnapshotError::Publish {
                staging: self.path,
                target: target.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::AlreadyExists, "target exists"),
            });
        }

        std::fs::rename(&self.path, target).map_err(|source| SnapshotError::Publish {
            staging: self.path.clone(),
            target: target.to_path_buf(),
            source,
        })?;
        Ok(target.to_path_buf())
    }

    /// Remove the staging directory and everything in it.
    pub fn discard(self) -> Result<()> {
        info!("Remove temporary directory {}", self.path.display());
        std::fs::remove_dir_all(&self.path).map_err(|source| SnapshotError::Discard {
            path: self.path.clone(),
            source,
        })
    }

    /// Leave the directory for the operator and return its path.
    pub fn keep(self) -> PathBuf {
        self.path
    }
}
