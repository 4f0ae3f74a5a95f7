//! Filepath: src/core/rank.rs
//! Order data files by how many in-range dates they contain, so the files
//! most likely to hold relevant rows are classified first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::{info, instrument, warn};

use crate::cli::{AppContext, OutputFormat, RankArgs};
use crate::core::filters::DateMatcher;
use crate::error::SiftError;
use crate::infra::config::load_config;
use crate::infra::io::map_file;
use crate::infra::utils::PathUtils;
use crate::infra::walk::DataFileWalker;

/// A data file and its date-match score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedFile
{
    pub path: PathBuf,
    pub score: usize,
}

pub struct FileRanker
{
    matcher: DateMatcher,
}

impl FileRanker
{
    /// Ranker counting `YYYY/MM/DD` dates for `years` (empty = defaults).
    pub fn new(years: &[u16]) -> Result<Self, SiftError>
    {
        Ok(Self { matcher: DateMatcher::for_years(years)? })
    }

    /// Date-match count over the file's raw bytes.
    pub fn score(
        &self,
        path: &Path,
    ) -> Result<usize, SiftError>
    {
        let bytes = map_file(path)?;
        Ok(self
            .matcher
            .count(bytes.as_ref()))
    }

    /// Score `files` in parallel, drop zero scores, and sort descending.
    /// Ties keep the input order.
    #[instrument(skip_all, fields(files = files.len()))]
    pub fn rank(
        &self,
        files: &[PathBuf],
    ) -> Vec<RankedFile>
    {
        let scored: Vec<Option<RankedFile>> = files
            .par_iter()
            .map(|path| match self.score(path)
            {
                Ok(score) => Some(RankedFile { path: path.clone(), score }),
                Err(e) =>
                {
                    warn!(error = %e, "skipping unreadable file");
                    None
                }
            })
            .collect();

        let mut ranked: Vec<RankedFile> = scored
            .into_iter()
            .flatten()
            .filter(|r| r.score > 0)
            .collect();

        ranked.sort_by(|a, b| b.score.cmp(&a.score));

        info!(ranked = ranked.len(), "finished ranking");
        ranked
    }
}

/// Discover data files under `fileloc` matching `ext`, then rank them.
pub fn discover_and_rank(
    fileloc: &Path,
    ext: &str,
    years: &[u16],
) -> Result<Vec<RankedFile>>
{
    let dir = PathUtils::resolve_data_dir(fileloc);
    let files = DataFileWalker::new(ext)?.walk_files(&dir);
    info!(dir = %PathUtils::display_path(&dir), files = files.len(), "discovered data files");

    let ranker = FileRanker::new(years).context("Failed to build date matcher")?;
    Ok(ranker.rank(&files))
}

pub fn run(
    args: RankArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let cfg = load_config()?;

    let fileloc = args
        .fileloc
        .unwrap_or(cfg.input.fileloc);
    let ext = args
        .ext
        .unwrap_or(cfg.input.ext);

    let ranked = discover_and_rank(&fileloc, &ext, &cfg.ranking.years)?;

    match args.format
    {
        OutputFormat::Json =>
        {
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
        OutputFormat::Table =>
        {
            #[derive(Tabled)]
            struct Row
            {
                rank: usize,
                score: usize,
                file: String,
            }

            let rows: Vec<Row> = ranked
                .iter()
                .enumerate()
                .map(|(i, r)| Row { rank: i + 1, score: r.score, file: r.path.display().to_string() })
                .collect();

            println!("{}", Table::new(rows));
        }
        OutputFormat::Text =>
        {
            if ranked.is_empty()
            {
                if !ctx.quiet
                {
                    println!("No data files with matching dates");
                }
                return Ok(());
            }

            for r in &ranked
            {
                if ctx.no_color
                {
                    println!("{:>8}  {}", r.score, r.path.display());
                }
                else
                {
                    println!("{:>8}  {}", r.score.to_string().green(), r.path.display());
                }
            }
        }
    }

    Ok(())
}
