//! Filepath: src/core/report.rs
//! End-of-run summary (logged and optionally written as JSON) and the
//! `stats` command for inspecting a seed file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::info;

use crate::cli::{AppContext, OutputFormat, StatsArgs};
use crate::core::classifier::ClassifierMetrics;
use crate::core::filters::RegexFilterSet;
use crate::core::pipeline::{FileOutcome, Pipeline, RunCounters, resolve_seed};
use crate::core::seed::{SeedCorpus, SeedStats, TokenDensity};
use crate::infra::config::load_config;
use crate::infra::logging::FINAL_STATS_TARGET;

/// Everything known about a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport
{
    pub generated_at: DateTime<Local>,
    pub seed: PathBuf,
    pub dry_run: bool,
    pub counters: RunCounters,
    pub acceptance_ratio: f64,
    pub files: Vec<FileOutcome>,
    pub metrics: ClassifierMetrics,
    pub stats: SeedStats,
    /// Live token density, sorted by token
    pub densities: IndexMap<String, u64>,
}

impl RunReport
{
    pub fn from_pipeline(
        pipeline: &Pipeline,
        seed: &Path,
    ) -> Self
    {
        let classifier = pipeline.classifier();
        let counters = pipeline.counters();

        Self {
            generated_at: Local::now(),
            seed: seed.to_path_buf(),
            dry_run: pipeline.is_dry_run(),
            counters,
            acceptance_ratio: counters.acceptance_ratio(),
            files: pipeline
                .outcomes()
                .to_vec(),
            metrics: classifier.metrics(),
            stats: classifier
                .seed()
                .stats()
                .clone(),
            densities: sorted_densities(
                classifier
                    .seed()
                    .density(),
            ),
        }
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub fn write_json(
        &self,
        path: &Path,
    ) -> Result<()>
    {
        if let Some(parent) = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;

        info!(path = %path.display(), "run report written");
        Ok(())
    }
}

fn sorted_densities(density: &TokenDensity) -> IndexMap<String, u64>
{
    density
        .sorted_by_token()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Log the summary, stats and every density entry at the `final_stats`
/// target.
pub fn log_final_stats(report: &RunReport)
{
    let c = &report.counters;
    info!(
        target: FINAL_STATS_TARGET,
        processed = c.processed,
        skipped = c.skipped,
        malformed = c.malformed,
        accepted = c.accepted,
        ratio = report.acceptance_ratio,
        "completed"
    );

    let s = &report.stats;
    info!(
        target: FINAL_STATS_TARGET,
        mean = s.mean,
        stddev = s.stddev,
        lower = s.lower_threshold,
        upper = s.upper_threshold,
        distinct = s.densities.len(),
        "DENSITIES"
    );

    for (token, count) in &report.densities
    {
        info!(target: FINAL_STATS_TARGET, "{token}\t{count}");
    }
}

/// Summary printed by `sift stats`.
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary
{
    pub seed: PathBuf,
    pub entries: usize,
    pub tokens: usize,
    pub skipped_rows: usize,
    pub stats: SeedStats,
    pub top: Vec<TokenCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct TokenCount
{
    pub token: String,
    pub count: u64,
}

impl SeedSummary
{
    pub fn from_corpus(
        corpus: &SeedCorpus,
        top: usize,
    ) -> Self
    {
        Self {
            seed: corpus
                .source()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            entries: corpus.len(),
            tokens: corpus
                .density()
                .len(),
            skipped_rows: corpus.skipped_rows(),
            stats: corpus
                .stats()
                .clone(),
            top: corpus
                .density()
                .top(top)
                .into_iter()
                .map(|(token, count)| TokenCount { token: token.to_string(), count })
                .collect(),
        }
    }
}

pub fn run(
    args: StatsArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let cfg = load_config()?;
    let seed_path = resolve_seed(args.seed.or(cfg.seed.path), Path::new("."))?;

    let filters = RegexFilterSet::new()?;
    let corpus = SeedCorpus::load(&seed_path, &filters)
        .with_context(|| format!("Failed to load seed corpus {}", seed_path.display()))?;
    let summary = SeedSummary::from_corpus(&corpus, args.top);

    match args.format
    {
        OutputFormat::Json =>
        {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Table =>
        {
            println!("{}", Table::new(summary.top.clone()));
        }
        OutputFormat::Text =>
        {
            let title = format!("Seed {}", summary.seed.display());
            if ctx.no_color
            {
                println!("{title}");
            }
            else
            {
                println!("{}", title.bold());
            }

            let s = &summary.stats;
            println!(
                "  entries {}  tokens {}  skipped rows {}",
                summary.entries, summary.tokens, summary.skipped_rows
            );
            println!(
                "  mean {:.3}  stddev {:.3}  band ({}, {:.3})",
                s.mean, s.stddev, s.lower_threshold, s.upper_threshold
            );

            for t in &summary.top
            {
                println!("{:>8}  {}", t.count, t.token);
            }
        }
    }

    Ok(())
}
