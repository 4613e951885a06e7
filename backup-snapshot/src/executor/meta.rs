//! Snapshot metadata, serialized as `.snapshot.json` in each snapshot root.

use crate::fs::walker::TreeStats;
use crate::sync::FilesystemSemantics;
use crate::utils::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const META_FILE: &str = ".snapshot.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u32,
    pub snapshot: String,
    pub host: String,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub reference: Option<String>,
    pub thorough: bool,
    pub semantics: FilesystemSemantics,
    pub sources: Vec<MetaSource>,
    pub stats: Option<TreeStats>,
}

/// A source directory and the subdirectory it was staged as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaSource {
    pub path: PathBuf,
    pub name: String,
}

impl SnapshotMeta {
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(META_FILE), json)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn read_from(dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(dir.join(META_FILE))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Name of this machine, for the metadata record.
pub fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
