//! Filepath: src/core/pipeline.rs
//! Drive ranked data files through the row pre-filter and the novelty
//! classifier, writing accepted rows to the rotating sink.
//!
//! Files are processed strictly in rank order on one thread; the
//! classifier's state carries over from file to file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cli::{AppContext, RunArgs};
use crate::core::classifier::{NoveltyClassifier, Verdict};
use crate::core::filters::RegexFilterSet;
use crate::core::rank::{RankedFile, discover_and_rank};
use crate::core::report::{RunReport, log_final_stats};
use crate::core::seed::SeedCorpus;
use crate::error::SiftError;
use crate::infra::config::load_config;
use crate::infra::io::read_file_smart;
use crate::infra::rows::{TransactionRow, split_fields};
use crate::infra::sink::{RotatingSink, join_fields};
use crate::infra::utils::PathUtils;
use crate::infra::walk::DataFileWalker;

/// Glob used to find a seed file when none is configured.
pub const SEED_GLOB: &str = "*.seed";

/// Why a well-formed row never reached the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason
{
    NonNegativeAmount,
    BeforeMinYear,
    BlankNarrative,
    BadNarrative,
}

/// Result of screening one raw line.
#[derive(Debug, Clone, PartialEq)]
pub enum Screened
{
    /// Row passed every check; its narrative is whitespace-collapsed
    Candidate(TransactionRow),
    Skip(SkipReason),
}

/// Cheap per-row checks applied before classification.
#[derive(Debug, Clone)]
pub struct RowFilter
{
    min_year: i32,
    whitespace_runs: Regex,
}

impl RowFilter
{
    pub fn new(min_year: i32) -> Result<Self, SiftError>
    {
        let whitespace_runs = Regex::new(r"\s{2,}")
            .map_err(|source| SiftError::Pattern { group: "whitespace", source })?;

        Ok(Self { min_year, whitespace_runs })
    }

    /// Parse and screen `line` (1-based `line_no`). Field-count, amount and
    /// year parse failures are `MalformedRow` errors.
    pub fn screen(
        &self,
        line_no: usize,
        line: &str,
        filters: &RegexFilterSet,
    ) -> Result<Screened, SiftError>
    {
        let mut row = TransactionRow::from_fields(line_no, split_fields(line))?;

        if row.amount >= 0.0
        {
            return Ok(Screened::Skip(SkipReason::NonNegativeAmount));
        }

        let year = row
            .entry_year()
            .ok_or_else(|| {
                SiftError::malformed(line_no, format!("entry_date '{}'", row.entry_date))
            })?;
        if year < self.min_year
        {
            return Ok(Screened::Skip(SkipReason::BeforeMinYear));
        }

        let collapsed = self
            .whitespace_runs
            .replace_all(&row.narrative, " ");
        if collapsed.trim().is_empty() || collapsed.chars().count() < 2
        {
            return Ok(Screened::Skip(SkipReason::BlankNarrative));
        }
        row.narrative = collapsed.into_owned();

        if filters.is_bad_narrative(&row.narrative) || filters.is_dead_narrative(&row.narrative)
        {
            return Ok(Screened::Skip(SkipReason::BadNarrative));
        }

        Ok(Screened::Candidate(row))
    }
}

/// Running row counters. Every processed row is either accepted or
/// skipped; malformed rows are a subset of skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters
{
    pub processed: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub accepted: usize,
}

impl RunCounters
{
    /// `1 - skipped / processed`; 0 before any row is seen.
    pub fn acceptance_ratio(&self) -> f64
    {
        if self.processed == 0
        {
            return 0.0;
        }
        1.0 - self.skipped as f64 / self.processed as f64
    }

    fn absorb(
        &mut self,
        other: &RunCounters,
    )
    {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.malformed += other.malformed;
        self.accepted += other.accepted;
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome
{
    pub path: PathBuf,
    pub score: usize,
    pub counters: RunCounters,
    /// Rows written to the sink (0 on dry runs)
    pub written: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Owns the classifier and sink for one run.
pub struct Pipeline
{
    classifier: NoveltyClassifier,
    row_filter: RowFilter,
    /// `None` on dry runs
    sink: Option<RotatingSink>,
    counters: RunCounters,
    outcomes: Vec<FileOutcome>,
}

impl Pipeline
{
    pub fn new(
        classifier: NoveltyClassifier,
        row_filter: RowFilter,
        sink: Option<RotatingSink>,
    ) -> Self
    {
        Self { classifier, row_filter, sink, counters: RunCounters::default(), outcomes: Vec::new() }
    }

    /// Screen and classify `lines`, returning this batch's counters and the
    /// accepted rows already joined for output.
    pub fn process_lines<I, S>(
        &mut self,
        lines: I,
    ) -> (RunCounters, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut counters = RunCounters::default();
        let mut accepted = Vec::new();

        for (idx, line) in lines
            .into_iter()
            .enumerate()
        {
            counters.processed += 1;

            let screened =
                self.row_filter
                    .screen(idx + 1, line.as_ref(), self.classifier.filters());

            let row = match screened
            {
                Ok(Screened::Candidate(row)) => row,
                Ok(Screened::Skip(reason)) =>
                {
                    debug!(line = idx + 1, ?reason, "row skipped");
                    counters.skipped += 1;
                    continue;
                }
                Err(e) =>
                {
                    debug!(error = %e, "malformed row");
                    counters.skipped += 1;
                    counters.malformed += 1;
                    continue;
                }
            };

            match self
                .classifier
                .decide(&row.narrative)
            {
                Verdict::Accept =>
                {
                    counters.accepted += 1;
                    accepted.push(join_fields(&row.project()));
                }
                Verdict::Reject(_) => counters.skipped += 1,
            }
        }

        (counters, accepted)
    }

    /// Process one ranked file and write its accepted rows as one batch.
    /// Read and write failures are logged and recorded on the outcome.
    #[instrument(skip_all, fields(file = %ranked.path.display(), score = ranked.score))]
    pub fn process_file(
        &mut self,
        ranked: &RankedFile,
    )
    {
        info!("running file");

        let mut outcome = FileOutcome {
            path: ranked
                .path
                .clone(),
            score: ranked.score,
            counters: RunCounters::default(),
            written: 0,
            error: None,
        };

        match read_file_smart(&ranked.path)
        {
            Err(e) =>
            {
                warn!(error = %e, "skipping unreadable file");
                outcome.error = Some(e.to_string());
            }
            Ok(bytes) =>
            {
                let (counters, rows) = self.process_lines(bytes.lines_lossy());
                outcome.counters = counters;
                self.counters
                    .absorb(&counters);

                if let Some(sink) = self.sink.as_mut()
                {
                    match sink.write_batch(&rows)
                    {
                        Ok(n) => outcome.written = n,
                        Err(e) =>
                        {
                            warn!(error = %e, rows = rows.len(), "batch abandoned");
                            outcome.error = Some(e.to_string());
                        }
                    }
                }
            }
        }

        info!(
            processed = self.counters.processed,
            skipped = self.counters.skipped,
            ratio = self.counters.acceptance_ratio(),
            "after current file"
        );

        self.outcomes
            .push(outcome);
    }

    /// Process `files` in order, ticking `progress` once per file.
    pub fn run_files(
        &mut self,
        files: &[RankedFile],
        progress: &ProgressBar,
    )
    {
        for ranked in files
        {
            progress.set_message(
                ranked
                    .path
                    .display()
                    .to_string(),
            );
            self.process_file(ranked);
            progress.inc(1);
        }

        progress.finish_with_message("Classification complete");
    }

    pub fn counters(&self) -> RunCounters
    {
        self.counters
    }

    pub fn outcomes(&self) -> &[FileOutcome]
    {
        &self.outcomes
    }

    pub fn classifier(&self) -> &NoveltyClassifier
    {
        &self.classifier
    }

    pub fn is_dry_run(&self) -> bool
    {
        self.sink
            .is_none()
    }
}

/// Seed file to load: an explicit path, else the first `*.seed` in `dir`.
pub fn resolve_seed(
    explicit: Option<PathBuf>,
    dir: &Path,
) -> Result<PathBuf>
{
    if let Some(path) = explicit
    {
        return Ok(PathUtils::expand(&path));
    }

    DataFileWalker::new(SEED_GLOB)?
        .first_match(dir)
        .ok_or_else(|| {
            SiftError::NoSeedSource { dir: dir.to_path_buf(), pattern: SEED_GLOB.to_string() }
                .into()
        })
}

fn progress_bar(
    len: usize,
    ctx: &AppContext,
) -> Result<ProgressBar>
{
    if ctx.quiet
    {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

pub fn run(
    args: RunArgs,
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
    let outfile = PathUtils::expand(
        &args
            .outfile
            .unwrap_or(cfg.output.outfile),
    );

    let seed_path = resolve_seed(args.seed.or(cfg.seed.path), Path::new("."))?;

    let filters = RegexFilterSet::new()?;
    let seed = SeedCorpus::load(&seed_path, &filters)
        .with_context(|| format!("Failed to load seed corpus {}", seed_path.display()))?;
    let classifier = NoveltyClassifier::new(seed, filters, cfg.classifier.clone())?;
    let row_filter = RowFilter::new(cfg.prefilter.min_year)?;

    let ranked = discover_and_rank(&fileloc, &ext, &cfg.ranking.years)?;

    let sink = if ctx.dry_run
    {
        None
    }
    else
    {
        Some(RotatingSink::new(&outfile, cfg.output.rotate_bytes))
    };

    let mut pipeline = Pipeline::new(classifier, row_filter, sink);
    let progress = progress_bar(ranked.len(), ctx)?;
    pipeline.run_files(&ranked, &progress);

    let report = RunReport::from_pipeline(&pipeline, &seed_path);
    log_final_stats(&report);

    if let Some(path) = &args.report
    {
        if ctx.dry_run
        {
            if !ctx.quiet
            {
                println!("{}", format!("DRY RUN: would write report to {}", path.display()).yellow());
            }
        }
        else
        {
            report.write_json(path)?;
        }
    }

    if !ctx.quiet
    {
        let c = pipeline.counters();
        let summary = format!(
            "{} files, {} processed, {} accepted, {} skipped ({} malformed)",
            ranked.len(),
            c.processed,
            c.accepted,
            c.skipped,
            c.malformed
        );

        if ctx.dry_run
        {
            println!("DRY RUN: {summary}");
        }
        else if ctx.no_color
        {
            println!("Done: {summary} -> {}", outfile.display());
        }
        else
        {
            println!("{} {summary} -> {}", "✓".green(), outfile.display());
        }
    }

    Ok(())
}
