//! Custom error types for the snapshot tool.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The destination directory {} does not exist or is not a directory", .0.display())]
    InvalidDestination(PathBuf),

    #[error("Snapshot {} already exists", .0.display())]
    SnapshotExists(PathBuf),

    #[error("Failed to create staging directory {}: {source}", .path.display())]
    StagingCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to publish {} as {}: {source}", .staging.display(), .target.display())]
    Publish {
        staging: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {}: {source}", .path.display())]
    Discard {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
