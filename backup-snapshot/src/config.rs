//! Configuration management for the snapshot tool.
//!
//! Loads an optional TOML file; command-line flags override its values.

use crate::sync::FilesystemSemantics;
use crate::utils::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sync tool executable (default: rsync)
    #[serde(default = "default_program")]
    pub program: String,

    /// Attribute handling of the destination filesystem (NTFS, OTHER)
    #[serde(default)]
    pub target_fst: FilesystemSemantics,

    /// Patterns passed to the sync tool as --exclude
    #[serde(default)]
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Number of snapshots to keep; unset keeps all
    #[serde(default)]
    pub keep: Option<usize>,
}

// Default values
fn default_program() -> String {
    "rsync".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            target_fst: FilesystemSemantics::default(),
            excludes: Vec::new(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run destructive or impossible.
    pub fn validate(&self) -> Result<()> {
        if self.sync.program.trim().is_empty() {
            return Err(SnapshotError::Config("sync.program must not be empty".to_string()));
        }
        if self.retention.keep == Some(0) {
            return Err(SnapshotError::Config(
                "retention.keep must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
