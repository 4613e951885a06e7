//! Argument lists for the external sync tool (rsync).

use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;

/// Attribute preservation adapted to the destination filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilesystemSemantics {
    /// No permissions, owners, groups or times; recursion, symlinks and
    /// devices only.
    #[default]
    #[value(name = "NTFS")]
    Ntfs,

    /// Full attribute-preserving archive mode.
    #[value(name = "OTHER")]
    Other,
}

impl FilesystemSemantics {
    fn flags(self) -> &'static [&'static str] {
        match self {
            // -rlD is --archive without --times --perms --owner --group
            FilesystemSemantics::Ntfs => &["--no-perms", "--no-owner", "--no-group", "-rlD"],
            FilesystemSemantics::Other => &["--archive"],
        }
    }
}

impl fmt::Display for FilesystemSemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilesystemSemantics::Ntfs => write!(f, "NTFS"),
            FilesystemSemantics::Other => write!(f, "OTHER"),
        }
    }
}

/// Always present: mirror deletions, never overwrite what is already in
/// the staging area, keep hard links and sparse files.
const BASE_OPTIONS: &[&str] = &["--delete", "--ignore-existing", "--hard-links", "--sparse"];

/// One transfer: a source directory copied into a staging directory.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Normalized source directory, no trailing separator
    pub source: PathBuf,

    /// Staging directory the source is copied into
    pub destination: PathBuf,

    pub semantics: FilesystemSemantics,

    /// Report what would be transferred without writing
    pub dry_run: bool,

    /// Matching subdirectory of the previous snapshot to hard-link against
    pub link_reference: Option<PathBuf>,

    /// Compare file contents by checksum instead of size and mtime
    pub thorough: bool,

    /// File the sync tool appends its transfer log to
    pub log_file: Option<PathBuf>,
}

/// A ready-to-run sync invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl SyncCommand {
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Builds sync commands for a run. Holds the run-wide settings; per-source
/// settings come in through [`SyncOptions`].
#[derive(Debug, Clone)]
pub struct SyncCommandBuilder {
    program: OsString,
    excludes: Vec<String>,
}

impl SyncCommandBuilder {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            excludes: Vec::new(),
        }
    }

    /// Patterns passed as `--exclude=<pattern>` on every command.
    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Build the argument list. Never fails; bad paths surface when the
    /// tool runs.
    pub fn build(&self, options: &SyncOptions) -> SyncCommand {
        let mut args: Vec<OsString> = BASE_OPTIONS.iter().map(OsString::from).collect();
        args.extend(options.semantics.flags().iter().map(OsString::from));

        for pattern in &self.excludes {
            args.push(format!("--exclude={}", pattern).into());
        }

        if let Some(log_file) = &options.log_file {
            args.push(prefixed("--log-file=", log_file.as_os_str()));
        }

        if options.dry_run {
            args.push("--dry-run".into());
        }

        if let Some(link_reference) = &options.link_reference {
            args.push(prefixed("--link-dest=", link_reference.as_os_str()));
        }

        if options.thorough {
            args.push("--checksum".into());
        }

        args.push(options.source.clone().into_os_string());
        args.push(options.destination.clone().into_os_string());

        SyncCommand {
            program: self.program.clone(),
            args,
        }
    }
}

impl Default for SyncCommandBuilder {
    fn default() -> Self {
        Self::new("rsync")
    }
}

fn prefixed(flag: &str, value: &OsStr) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(value);
    arg
}
