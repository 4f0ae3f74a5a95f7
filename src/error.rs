//! Domain error taxonomy.
//!
//! Library code returns `SiftError`; command handlers wrap it with
//! `anyhow::Context` at the CLI boundary.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the classification engine and its collaborators.
#[derive(Debug, Error)]
pub enum SiftError
{
    /// Seed or data source could not be opened or read
    #[error("failed to load {}: {source}", path.display())]
    Load
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A delimited row failed field-count or numeric checks
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow
    {
        line: usize,
        reason: String,
    },

    /// Output sink could not be created or appended to
    #[error("failed to write {}: {source}", path.display())]
    Write
    {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A filter pattern group failed to compile
    #[error("invalid pattern in group '{group}': {source}")]
    Pattern
    {
        group: &'static str,
        #[source]
        source: regex::Error,
    },

    /// Forbidden-substring automaton could not be built
    #[error("invalid forbidden substring set: {0}")]
    Forbidden(#[from] aho_corasick::BuildError),

    /// No seed file was configured and none was found by glob
    #[error("no seed source found (looked for {pattern} in {})", dir.display())]
    NoSeedSource
    {
        dir: PathBuf,
        pattern: String,
    },
}

impl SiftError
{
    /// Shorthand for a `Load` error on `path`.
    pub fn load(
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self
    {
        Self::Load { path: path.into(), source }
    }

    /// Shorthand for a `MalformedRow` error.
    pub fn malformed(
        line: usize,
        reason: impl Into<String>,
    ) -> Self
    {
        Self::MalformedRow { line, reason: reason.into() }
    }
}
