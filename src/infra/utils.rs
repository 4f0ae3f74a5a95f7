//! Filepath: src/infra/utils.rs
//! Utility helpers organized by small, focused structs.
//! All functions are associated fns to keep call sites
//! ergonomic, testable, and discoverable.

use std::path::{Path, PathBuf};

use tracing::warn;

/// User-supplied path helpers
pub struct PathUtils;

impl PathUtils
{
    /// Expand `~` and `$VAR` in a user path. Unknown variables leave the
    /// path as typed (after tilde expansion).
    pub fn expand(path: &Path) -> PathBuf
    {
        let raw = path.to_string_lossy();

        match shellexpand::full(&raw)
        {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(
                shellexpand::tilde(&raw)
                    .as_ref(),
            ),
        }
    }

    /// Data directory to scan: `fileloc` when it is a directory, otherwise
    /// the current directory with a warning.
    pub fn resolve_data_dir(fileloc: &Path) -> PathBuf
    {
        let expanded = Self::expand(fileloc);

        if expanded.is_dir()
        {
            return expanded;
        }

        warn!(
            fileloc = %expanded.display(),
            "data location is not a directory, using current directory"
        );
        PathBuf::from(".")
    }

    /// Canonical form for display; falls back to the path as given.
    /// Uses `dunce` so Windows paths stay free of `\\?\` prefixes.
    pub fn display_path(path: &Path) -> String
    {
        dunce::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string()
    }
}
