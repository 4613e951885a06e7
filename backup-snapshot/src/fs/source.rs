//! Source directory path handling.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a source path: drop trailing separators and `.`
/// components, fold `..` into its parent where possible.
///
/// The sync tool copies the directory itself (not its contents) only when
/// the source has no trailing separator, so this must run before building
/// the command.
pub fn normalize_source(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Name of the subdirectory a source lands in inside the snapshot: the
/// last component of the normalized path.
///
/// Paths without a usable last component (`.`, `..`, `/`) are resolved
/// against the filesystem first; `None` if there is still no name.
pub fn staged_name(normalized: &Path) -> Option<OsString> {
    if let Some(Component::Normal(name)) = normalized.components().last() {
        return Some(name.to_os_string());
    }
    std::fs::canonicalize(normalized)
        .ok()?
        .file_name()
        .map(|name| name.to_os_string())
}
