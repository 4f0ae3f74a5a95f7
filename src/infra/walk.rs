//! Filepath: src/infra/walk.rs
//! Data file discovery.
//! - Matches file names against a single glob (e.g. `*.txt`)
//! - Non-recursive by default: only files directly inside the root
//! - Ignore files are not consulted; data dirs are often gitignored
//! - Deterministic ordering for stable ranking ties and tests
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;

/// Walker that yields files whose name matches one glob.
pub struct DataFileWalker
{
    /// Compiled file name pattern
    pattern: GlobMatcher,

    /// Include hidden (dot) files; default false
    include_hidden: bool,

    /// Maximum recursion depth; default Some(1) (root entries only)
    max_depth: Option<usize>,
}

impl DataFileWalker
{
    /// Build a walker for file names matching `pattern`.
    pub fn new(pattern: &str) -> Result<Self>
    {
        let glob = Glob::new(pattern).with_context(|| format!("Invalid file glob '{pattern}'"))?;

        Ok(Self { pattern: glob.compile_matcher(), include_hidden: false, max_depth: Some(1) })
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    /// (Optional) Limit recursion depth (`None` = unbounded).
    pub fn with_max_depth(
        mut self,
        depth: Option<usize>,
    ) -> Self
    {
        self.max_depth = depth;
        self
    }

    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        b.standard_filters(false);
        // WalkBuilder::hidden(true) => *skip* dotfiles
        b.hidden(!self.include_hidden);
        b.max_depth(self.max_depth);

        b
    }

    /// Matching files under `root`, sorted by path.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let mut out: Vec<PathBuf> = self
            .build_walk(root.as_ref())
            .build()
            .filter_map(|res| res.ok())
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .filter(|entry| {
                self.pattern
                    .is_match(entry.file_name())
            })
            .map(|entry| entry.into_path())
            .collect();

        out.sort();

        out
    }

    /// First matching file in sorted order, if any.
    pub fn first_match<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Option<PathBuf>
    {
        self.walk_files(root)
            .into_iter()
            .next()
    }
}
