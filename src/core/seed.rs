//! Filepath: src/core/seed.rs
//! Seed corpus: the set of canonical accepted narratives plus the token
//! frequency statistics the classifier measures candidates against.
//!
//! Invariants:
//! - `stats` is derived from `density` and is only refreshed by
//!   [`SeedCorpus::rebuild_stats`]; any density mutation marks it stale.
//! - Admission reinforces token counts only; it never adds a sentence to
//!   the corpus set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::filters::RegexFilterSet;
use crate::core::normalize::{canonical_string, raw_tokens};
use crate::error::SiftError;
use crate::infra::io::read_file_smart;
use crate::infra::rows::{SEED_HEADERS, split_fields};

/// Tokens of this many characters or fewer are left out of the statistics.
const MIN_STAT_TOKEN_CHARS: usize = 2;

/// Token → occurrence count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDensity(HashMap<String, u64>);

impl TokenDensity
{
    /// Count every token longer than two characters across `entries`.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts: HashMap<String, u64> = HashMap::new();

        for entry in entries
        {
            for tok in raw_tokens(entry).filter(|t| t.chars().count() > MIN_STAT_TOKEN_CHARS)
            {
                *counts
                    .entry(tok.to_string())
                    .or_insert(0) += 1;
            }
        }

        Self(counts)
    }

    /// Current count for `token` (0 when unseen).
    pub fn get(
        &self,
        token: &str,
    ) -> u64
    {
        self.0
            .get(token)
            .copied()
            .unwrap_or(0)
    }

    pub fn increment(
        &mut self,
        token: &str,
    )
    {
        *self
            .0
            .entry(token.to_string())
            .or_insert(0) += 1;
    }

    pub fn len(&self) -> usize
    {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.0.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_
    {
        self.0
            .values()
            .copied()
    }

    /// Entries sorted by token, for stable reports.
    pub fn sorted_by_token(&self) -> Vec<(&str, u64)>
    {
        let mut v: Vec<_> = self
            .0
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        v.sort_unstable_by(|a, b| a.0.cmp(b.0));
        v
    }

    /// Entries sorted by count descending, then token.
    pub fn top(
        &self,
        n: usize,
    ) -> Vec<(&str, u64)>
    {
        let mut v = self.sorted_by_token();
        v.sort_by(|a, b| b.1.cmp(&a.1));
        v.truncate(n);
        v
    }
}

impl FromIterator<(String, u64)> for TokenDensity
{
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self
    {
        Self(
            iter.into_iter()
                .collect(),
        )
    }
}

/// Summary statistics over a [`TokenDensity`] snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeedStats
{
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
    /// Distinct density values, highest first
    pub densities: Vec<u64>,
    /// `ceil(mean / 10)`
    pub lower_threshold: f64,
    /// `mean + 10 * stddev`
    pub upper_threshold: f64,
}

impl SeedStats
{
    /// Derive stats from `density`. An empty map yields all zeros, which
    /// makes [`SeedStats::in_band`] false for every count.
    pub fn from_density(density: &TokenDensity) -> Self
    {
        if density.is_empty()
        {
            return Self::default();
        }

        let n = density.len() as f64;
        let mean = density
            .values()
            .map(|v| v as f64)
            .sum::<f64>()
            / n;
        let variance = density
            .values()
            .map(|v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / n;
        let stddev = variance.sqrt();

        let mut densities: Vec<u64> = density
            .values()
            .collect();
        densities.sort_unstable_by(|a, b| b.cmp(a));
        densities.dedup();

        Self {
            mean,
            stddev,
            densities,
            lower_threshold: (mean / 10.0).ceil(),
            upper_threshold: mean + 10.0 * stddev,
        }
    }

    /// Strictly between the lower and upper thresholds.
    pub fn in_band(
        &self,
        count: u64,
    ) -> bool
    {
        let c = count as f64;
        self.lower_threshold < c && c < self.upper_threshold
    }
}

/// The growing reference set and its statistics.
#[derive(Debug, Clone)]
pub struct SeedCorpus
{
    entries: IndexSet<String>,
    density: TokenDensity,
    stats: SeedStats,
    stale: bool,
    skipped_rows: usize,
    source: Option<PathBuf>,
}

impl SeedCorpus
{
    /// Load a pipe-delimited seed file with a `t_desc|...` header.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(
        path: P,
        filters: &RegexFilterSet,
    ) -> Result<Self, SiftError>
    {
        let path = path.as_ref();
        let bytes = read_file_smart(path)?;

        let mut corpus = Self::from_lines(bytes.lines_lossy(), filters);
        corpus.source = Some(path.to_path_buf());

        info!(
            entries = corpus.len(),
            tokens = corpus.density.len(),
            skipped = corpus.skipped_rows,
            "seed corpus loaded"
        );

        Ok(corpus)
    }

    /// Parse seed lines. The first line is the header; the narrative
    /// column is found by name and defaults to the first column. A final
    /// row whose width differs from the header is treated as truncated and
    /// dropped.
    pub fn from_lines<I, S>(
        lines: I,
        filters: &RegexFilterSet,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lines = lines.into_iter();

        let header = lines
            .next()
            .map(|h| split_fields(h.as_ref()))
            .unwrap_or_default();
        let column = header
            .iter()
            .position(|h| h == SEED_HEADERS[0])
            .unwrap_or(0);
        let width = header
            .len()
            .max(1);

        let mut rows: Vec<Vec<String>> = lines
            .filter(|l| !l.as_ref().trim().is_empty())
            .map(|l| split_fields(l.as_ref()))
            .collect();

        let mut skipped = 0;
        if rows
            .last()
            .is_some_and(|r| r.len() != width)
        {
            rows.pop();
            skipped += 1;
        }

        let mut entries = IndexSet::with_capacity(rows.len());
        for row in rows
        {
            match row.get(column)
            {
                Some(desc) => {
                    entries.insert(canonical_string(filters, desc));
                }
                None => skipped += 1,
            }
        }

        let mut corpus = Self::from_canonical(entries);
        corpus.skipped_rows = skipped;
        corpus
    }

    /// Build a corpus directly from raw narratives.
    pub fn from_narratives<I, S>(
        narratives: I,
        filters: &RegexFilterSet,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = narratives
            .into_iter()
            .map(|n| canonical_string(filters, n.as_ref()))
            .collect();

        Self::from_canonical(entries)
    }

    fn from_canonical(entries: IndexSet<String>) -> Self
    {
        let density = TokenDensity::from_entries(entries.iter().map(String::as_str));
        let stats = SeedStats::from_density(&density);

        Self { entries, density, stats, stale: false, skipped_rows: 0, source: None }
    }

    /// Fresh recount of token density over the canonical entries only.
    /// Admissions made since loading are not reflected here.
    pub fn token_density(&self) -> TokenDensity
    {
        TokenDensity::from_entries(
            self.entries
                .iter()
                .map(String::as_str),
        )
    }

    /// Live density: loaded counts plus every admission so far.
    pub fn density(&self) -> &TokenDensity
    {
        &self.density
    }

    /// Recompute [`SeedStats`] from the live density.
    pub fn rebuild_stats(&mut self)
    {
        self.stats = SeedStats::from_density(&self.density);
        self.stale = false;

        debug!(
            lower = self.stats.lower_threshold,
            mean = self.stats.mean,
            upper = self.stats.upper_threshold,
            "thresholds rebuilt"
        );
    }

    /// Fold an accepted candidate's canonical tokens into the density.
    pub fn admit<S: AsRef<str>>(
        &mut self,
        tokens: &[S],
    )
    {
        for tok in tokens
        {
            self.density
                .increment(tok.as_ref());
        }
        self.stale = true;
    }

    pub fn stats(&self) -> &SeedStats
    {
        &self.stats
    }

    /// True after [`SeedCorpus::admit`] until the next rebuild.
    pub fn is_stale(&self) -> bool
    {
        self.stale
    }

    pub fn contains(
        &self,
        narrative: &str,
    ) -> bool
    {
        self.entries
            .contains(narrative)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str>
    {
        self.entries
            .iter()
            .map(String::as_str)
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries
            .is_empty()
    }

    /// Seed rows skipped as malformed during loading.
    pub fn skipped_rows(&self) -> usize
    {
        self.skipped_rows
    }

    pub fn source(&self) -> Option<&Path>
    {
        self.source
            .as_deref()
    }
}

#[cfg(test)]
mod tests
{
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn filters() -> RegexFilterSet
    {
        RegexFilterSet::new().unwrap()
    }

    #[test]
    fn stats_on_synthetic_density()
    {
        let density: TokenDensity = [("a", 1), ("b", 2), ("c", 10)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let stats = SeedStats::from_density(&density);

        let mean = 13.0 / 3.0;
        let stddev = (146.0_f64 / 9.0).sqrt();
        assert!((stats.mean - mean).abs() < 1e-12);
        assert!((stats.stddev - stddev).abs() < 1e-12);
        assert_eq!(stats.lower_threshold, 1.0);
        assert!((stats.upper_threshold - (mean + 10.0 * stddev)).abs() < 1e-9);
        assert_eq!(stats.densities, vec![10, 2, 1]);

        assert!(!stats.in_band(1));
        assert!(stats.in_band(2));
        assert!(stats.in_band(10));
    }

    #[test]
    fn empty_density_has_no_band()
    {
        let stats = SeedStats::from_density(&TokenDensity::default());
        assert_eq!(stats, SeedStats::default());
        assert!(!stats.in_band(0));
        assert!(!stats.in_band(5));
    }

    #[test]
    fn density_skips_short_tokens()
    {
        let corpus = SeedCorpus::from_narratives(["payment to shop", "shop at mall"], &filters());
        let d = corpus.token_density();

        assert_eq!(d.get("shop"), 2);
        assert_eq!(d.get("payment"), 1);
        assert_eq!(d.get("to"), 0);
        assert_eq!(d.get("at"), 0);
        assert_eq!(d.len(), 3);
    }

    #[test]
    fn loading_strips_noise_and_collapses_duplicates()
    {
        let lines = [
            "t_desc|tag_name|counter_party|avg",
            "COFFEE HOUSE 1234|food|coffee|4.5",
            "COFFEE HOUSE POS|food|coffee|4.5",
            "RENT PAYMENT|home|landlord|900",
            "TRUNCATED",
        ];

        let corpus = SeedCorpus::from_lines(lines, &filters());

        assert_eq!(corpus.len(), 2);
        assert!(corpus.contains("COFFEE HOUSE"));
        assert!(corpus.contains("RENT PAYMENT"));
        assert_eq!(corpus.skipped_rows(), 1);
    }

    #[test]
    fn narrative_column_is_found_by_name()
    {
        let lines = ["avg|t_desc", "1|GYM MEMBERSHIP", "2|BOOK STORE"];
        let corpus = SeedCorpus::from_lines(lines, &filters());

        assert!(corpus.contains("GYM MEMBERSHIP"));
        assert!(corpus.contains("BOOK STORE"));
    }

    #[test]
    fn admit_bumps_density_and_marks_stale()
    {
        let mut corpus = SeedCorpus::from_narratives(["payment to shop"], &filters());
        let before = corpus.stats().clone();
        assert!(!corpus.is_stale());

        corpus.admit(&["shop", "at"]);
        assert!(corpus.is_stale());
        assert_eq!(corpus.density().get("shop"), 2);
        assert_eq!(corpus.density().get("at"), 1);

        // Stats do not move until rebuilt
        assert_eq!(corpus.stats(), &before);
        corpus.rebuild_stats();
        assert!(!corpus.is_stale());
        assert_ne!(corpus.stats(), &before);

        // Admission never adds a sentence, and the fresh recount ignores it
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.token_density().get("shop"), 1);
    }

    #[test]
    fn load_reads_file_and_reports_missing_source()
    {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "t_desc|tag_name|counter_party|avg").unwrap();
        writeln!(f, "WATER BILL|utility|water co|30").unwrap();

        let corpus = SeedCorpus::load(f.path(), &filters()).unwrap();
        assert!(corpus.contains("WATER BILL"));
        assert_eq!(corpus.source(), Some(f.path()));

        let err = SeedCorpus::load("/no/such/seed.seed", &filters()).unwrap_err();
        assert!(matches!(err, SiftError::Load { .. }));
    }
}
