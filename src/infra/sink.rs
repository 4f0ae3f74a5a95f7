//! Filepath: src/infra/sink.rs
//! Size-rotated pipe-delimited output.
//!
//! The sink checks the current file before each batch: a missing file is
//! created with a header row, and a file already past `rotate_bytes` hands
//! over to the next numbered file (`outfile0.out` -> `outfile1.out`).

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::info;

use crate::error::SiftError;
use crate::infra::rows::{DELIMITER, OUTPUT_HEADERS};

#[derive(Debug)]
pub struct RotatingSink
{
    template: PathBuf,
    rotate_bytes: u64,
    counter: u32,
    current: PathBuf,
    header: String,
}

impl RotatingSink
{
    /// Sink starting at `template`, with the standard output header.
    pub fn new(
        template: impl Into<PathBuf>,
        rotate_bytes: u64,
    ) -> Self
    {
        let template = template.into();
        Self {
            current: template.clone(),
            template,
            rotate_bytes,
            counter: 0,
            header: join_fields(&OUTPUT_HEADERS),
        }
    }

    /// Replace the header row written at the top of each new file.
    pub fn with_header<F: AsRef<str>>(
        mut self,
        fields: &[F],
    ) -> Self
    {
        self.header = join_fields(fields);
        self
    }

    /// File the next batch will go to (before any rotation check).
    pub fn current_path(&self) -> &Path
    {
        &self.current
    }

    pub fn counter(&self) -> u32
    {
        self.counter
    }

    /// `<stem without trailing digits><counter>.<ext>` next to the template.
    pub fn rotated_path(
        &self,
        counter: u32,
    ) -> PathBuf
    {
        let stem = self
            .template
            .file_stem()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default();
        let base = stem.trim_end_matches(|c: char| c.is_ascii_digit());

        let name = match self
            .template
            .extension()
        {
            Some(ext) => format!("{base}{counter}.{}", ext.to_string_lossy()),
            None => format!("{base}{counter}"),
        };

        self.template
            .with_file_name(name)
    }

    /// Decide the target file for the next batch. Returns true when the
    /// file must be (re)created with a header row.
    fn prepare(&mut self) -> Result<bool, SiftError>
    {
        match fs::metadata(&self.current)
        {
            Err(e) if e.kind() == io::ErrorKind::NotFound =>
            {
                info!(path = %self.current.display(), "creating first outfile");
                Ok(true)
            }
            Err(source) => Err(SiftError::Write { path: self.current.clone(), source }),
            Ok(meta) if meta.len() > self.rotate_bytes =>
            {
                self.counter += 1;
                self.current = self.rotated_path(self.counter);
                info!(counter = self.counter, path = %self.current.display(), "rotating outfile");
                Ok(true)
            }
            Ok(_) => Ok(false),
        }
    }

    /// Append pre-joined `rows` (see [`join_fields`]) as one batch. An
    /// empty batch touches nothing. Returns the number of rows written.
    pub fn write_batch<S: AsRef<str>>(
        &mut self,
        rows: &[S],
    ) -> Result<usize, SiftError>
    {
        if rows.is_empty()
        {
            return Ok(0);
        }

        let fresh = self.prepare()?;
        let path = self.current.clone();
        let werr = |source: io::Error| SiftError::Write { path: path.clone(), source };

        if let Some(parent) = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(werr)?;
        }

        let mut opts = OpenOptions::new();
        opts.create(true);
        if fresh
        {
            opts.write(true)
                .truncate(true);
        }
        else
        {
            opts.append(true);
        }

        let mut out = BufWriter::new(
            opts.open(&path)
                .map_err(werr)?,
        );

        if fresh
        {
            writeln!(out, "{}", self.header).map_err(werr)?;
        }
        for row in rows
        {
            writeln!(out, "{}", row.as_ref()).map_err(werr)?;
        }
        out.flush()
            .map_err(werr)?;

        Ok(rows.len())
    }
}

/// Join fields with the output delimiter.
pub fn join_fields<F: AsRef<str>>(fields: &[F]) -> String
{
    fields
        .iter()
        .map(AsRef::as_ref)
        .join(&DELIMITER.to_string())
}
