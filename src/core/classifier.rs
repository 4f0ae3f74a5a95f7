//! Filepath: src/core/classifier.rs
//! Novelty admission: decide whether a narrative is different enough from
//! everything already seen to be kept.
//!
//! Stages run cheapest first and any failure short-circuits:
//!   1) trivial string checks and cache hits
//!   2) token density scan against the seed statistics
//!   3) canonical-form cache and corpus checks
//!   4) coverage scan against every seed entry
//!   5) admission (density update + stats rebuild)
//!
//! All state (corpus, density, stats, caches) is owned by one
//! [`NoveltyClassifier`], so decisions are strictly sequential and each one
//! sees the effect of every earlier admission.

use std::collections::HashSet;

use aho_corasick::AhoCorasick;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::filters::RegexFilterSet;
use crate::core::normalize::{canonicalize, raw_tokens};
use crate::core::seed::SeedCorpus;
use crate::error::SiftError;
use crate::infra::config::ClassifierConfig;

/// Why a narrative was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason
{
    TooShort,
    Forbidden,
    AlreadyChecked,
    InSeed,
    DensityFail,
    CanonicalAlreadyChecked,
    CanonicalInSeed,
    NearDuplicate,
}

impl RejectReason
{
    pub fn as_str(self) -> &'static str
    {
        match self
        {
            RejectReason::TooShort => "too_short",
            RejectReason::Forbidden => "forbidden",
            RejectReason::AlreadyChecked => "already_checked",
            RejectReason::InSeed => "in_seed",
            RejectReason::DensityFail => "density_fail",
            RejectReason::CanonicalAlreadyChecked => "canonical_already_checked",
            RejectReason::CanonicalInSeed => "canonical_in_seed",
            RejectReason::NearDuplicate => "near_duplicate",
        }
    }
}

impl std::fmt::Display for RejectReason
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`NoveltyClassifier::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict
{
    Accept,
    Reject(RejectReason),
}

impl Verdict
{
    pub fn is_accept(self) -> bool
    {
        matches!(self, Verdict::Accept)
    }

    /// `accept` or the reject reason, for logs and reports.
    pub fn label(self) -> &'static str
    {
        match self
        {
            Verdict::Accept => "accept",
            Verdict::Reject(r) => r.as_str(),
        }
    }
}

/// Counters describing the work done so far.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClassifierMetrics
{
    pub decisions: usize,
    pub accepted: usize,
    /// Candidates that reached the token density scan
    pub density_scans: usize,
    /// Candidates that reached the seed coverage scan
    pub coverage_scans: usize,
    /// Rejections keyed by reason, in first-seen order
    pub rejected: IndexMap<&'static str, usize>,
    pub already_checked: usize,
    pub density_fail: usize,
}

/// Fraction of `seed_entry` tokens present in `candidate`.
/// Returns `None` for an entry with no tokens (not comparable).
pub fn coverage(
    seed_entry: &str,
    candidate: &HashSet<&str>,
) -> Option<f64>
{
    let mut total = 0usize;
    let mut hits = 0usize;

    for tok in raw_tokens(seed_entry).filter(|t| !t.is_empty())
    {
        total += 1;
        if candidate.contains(tok)
        {
            hits += 1;
        }
    }

    if total == 0
    {
        return None;
    }

    Some(hits as f64 / total as f64)
}

/// Stateful admission engine.
pub struct NoveltyClassifier
{
    filters: RegexFilterSet,
    seed: SeedCorpus,
    config: ClassifierConfig,
    forbidden: Option<AhoCorasick>,
    already_checked: HashSet<String>,
    density_fail: HashSet<String>,
    metrics: ClassifierMetrics,
}

impl NoveltyClassifier
{
    pub fn new(
        seed: SeedCorpus,
        filters: RegexFilterSet,
        config: ClassifierConfig,
    ) -> Result<Self, SiftError>
    {
        let forbidden = if config
            .forbidden_substrings
            .is_empty()
        {
            None
        }
        else
        {
            Some(AhoCorasick::new(&config.forbidden_substrings)?)
        };

        Ok(Self {
            filters,
            seed,
            config,
            forbidden,
            already_checked: HashSet::new(),
            density_fail: HashSet::new(),
            metrics: ClassifierMetrics::default(),
        })
    }

    /// Decide whether `comparator` is novel. Accepting it folds its
    /// canonical tokens into the seed density and rebuilds the stats.
    pub fn decide(
        &mut self,
        comparator: &str,
    ) -> Verdict
    {
        debug_assert!(!self.seed.is_stale(), "seed stats must be rebuilt before deciding");

        self.metrics.decisions += 1;

        let verdict = self.evaluate(comparator);
        match verdict
        {
            Verdict::Accept => self.metrics.accepted += 1,
            Verdict::Reject(reason) =>
            {
                *self
                    .metrics
                    .rejected
                    .entry(reason.as_str())
                    .or_insert(0) += 1;
                debug!(comparator, %reason, "rejected");
            }
        }

        verdict
    }

    fn evaluate(
        &mut self,
        comparator: &str,
    ) -> Verdict
    {
        // 1) Easy checks
        if comparator
            .chars()
            .count()
            < self.config.min_length
        {
            return Verdict::Reject(RejectReason::TooShort);
        }

        if self
            .forbidden
            .as_ref()
            .is_some_and(|ac| ac.is_match(comparator))
        {
            return Verdict::Reject(RejectReason::Forbidden);
        }

        if self
            .already_checked
            .contains(comparator)
        {
            return Verdict::Reject(RejectReason::AlreadyChecked);
        }

        if self
            .seed
            .contains(comparator)
        {
            return Verdict::Reject(RejectReason::InSeed);
        }

        debug!(comparator, "starting comparator");

        // 2) Token density
        if self.density_scan_fails(comparator)
        {
            self.already_checked
                .insert(comparator.to_string());
            self.density_fail
                .insert(comparator.to_string());
            return Verdict::Reject(RejectReason::DensityFail);
        }

        // 3) Canonical form
        let canonical_tokens = canonicalize(&self.filters, comparator);
        let canonical = canonical_tokens.join(" ");

        if self
            .already_checked
            .contains(&canonical)
        {
            self.already_checked
                .insert(comparator.to_string());
            return Verdict::Reject(RejectReason::CanonicalAlreadyChecked);
        }

        if self
            .seed
            .contains(&canonical)
        {
            self.already_checked
                .insert(comparator.to_string());
            return Verdict::Reject(RejectReason::CanonicalInSeed);
        }

        // 4) Coverage against every seed entry
        self.metrics.coverage_scans += 1;
        let candidate: HashSet<&str> = canonical_tokens
            .iter()
            .copied()
            .collect();

        for entry in self.seed.entries()
        {
            let Some(cov) = coverage(entry, &candidate)
            else
            {
                debug!(entry, "seed entry has no tokens");
                continue;
            };

            if cov > self.config.match_threshold
            {
                debug!(comparator, entry, coverage = cov, "near duplicate");
                self.already_checked
                    .insert(canonical.clone());
                self.already_checked
                    .insert(comparator.to_string());
                return Verdict::Reject(RejectReason::NearDuplicate);
            }
        }

        // 5) Admission
        self.already_checked
            .insert(comparator.to_string());
        self.already_checked
            .insert(canonical.clone());

        self.seed
            .admit(&canonical_tokens);
        self.seed
            .rebuild_stats();

        info!(comparator, canonical = %canonical, "accepted");
        Verdict::Accept
    }

    /// Token density scan. A token whose density lies inside the stats band
    /// counts as "bad"; once the bad share reaches the running threshold the
    /// scan is marked failed.
    ///
    /// The failure flag is only consulted at the top of the next iteration,
    /// so a failure raised by the final token does not reject.
    fn density_scan_fails(
        &mut self,
        comparator: &str,
    ) -> bool
    {
        self.metrics.density_scans += 1;

        let tokens: Vec<&str> = raw_tokens(comparator).collect();
        let total = tokens.len() as f64;
        let stats = self.seed.stats();
        let cfg = &self.config;

        let mut threshold = cfg.initial_density_threshold;
        let mut bad = 0usize;
        let mut failed = false;

        for tok in tokens
        {
            if failed
            {
                return true;
            }

            if tok.is_empty()
            {
                threshold *= cfg.noise_decay;
                continue;
            }

            if self
                .filters
                .is_noise_token(tok)
                || self
                    .filters
                    .is_bad_narrative(tok)
            {
                threshold *= cfg.noise_decay;
                continue;
            }

            if tok.chars().count() < cfg.short_token_len
            {
                threshold *= cfg.noise_decay;
            }

            if self
                .filters
                .is_dead_narrative(tok)
            {
                threshold *= cfg.dead_decay;
            }

            let density = self
                .seed
                .density()
                .get(tok);
            debug!(token = tok, density, "token density");

            if stats.in_band(density)
            {
                bad += 1;

                if bad as f64 / total >= threshold
                {
                    failed = true;
                    warn!(comparator, token = tok, "density check failed");
                }
            }
        }

        false
    }

    pub fn seed(&self) -> &SeedCorpus
    {
        &self.seed
    }

    pub fn filters(&self) -> &RegexFilterSet
    {
        &self.filters
    }

    pub fn config(&self) -> &ClassifierConfig
    {
        &self.config
    }

    /// Snapshot of counters, including current cache sizes.
    pub fn metrics(&self) -> ClassifierMetrics
    {
        let mut m = self
            .metrics
            .clone();
        m.already_checked = self.already_checked.len();
        m.density_fail = self.density_fail.len();
        m
    }

    pub fn was_checked(
        &self,
        narrative: &str,
    ) -> bool
    {
        self.already_checked
            .contains(narrative)
    }

    pub fn failed_density(
        &self,
        narrative: &str,
    ) -> bool
    {
        self.density_fail
            .contains(narrative)
    }

    pub fn into_seed(self) -> SeedCorpus
    {
        self.seed
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn classifier(seed: &[&str]) -> NoveltyClassifier
    {
        let filters = RegexFilterSet::new().unwrap();
        let corpus = SeedCorpus::from_narratives(seed.iter().copied(), &filters);
        NoveltyClassifier::new(corpus, filters, ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn verbatim_seed_and_fresh_phrase()
    {
        let mut c = classifier(&["payment to shop"]);

        assert_eq!(c.decide("payment to shop"), Verdict::Reject(RejectReason::InSeed));

        let before = c
            .seed()
            .density()
            .get("unique");
        assert_eq!(c.decide("totally unrelated unique phrase"), Verdict::Accept);
        assert_eq!(c.seed().density().get("unique"), before + 1);

        // Stats were rebuilt on admission and reflect the new density
        assert!(!c.seed().is_stale());
        assert_eq!(
            c.seed().stats(),
            &crate::core::seed::SeedStats::from_density(c.seed().density())
        );
    }

    #[test]
    fn repeat_decision_is_answered_from_cache()
    {
        let mut c = classifier(&["payment to shop"]);

        assert_eq!(c.decide("weekly farm box"), Verdict::Accept);
        let scans = c.metrics();

        assert_eq!(c.decide("weekly farm box"), Verdict::Reject(RejectReason::AlreadyChecked));
        let after = c.metrics();

        assert_eq!(after.density_scans, scans.density_scans);
        assert_eq!(after.coverage_scans, scans.coverage_scans);
        assert_eq!(after.decisions, scans.decisions + 1);
    }

    #[test]
    fn canonical_rejects_are_cached_by_raw_text()
    {
        let mut c = classifier(&["coffee house"]);

        assert_eq!(c.decide("coffee house 1234"), Verdict::Reject(RejectReason::CanonicalInSeed));
        let scans = c.metrics();
        assert_eq!(c.decide("coffee house 1234"), Verdict::Reject(RejectReason::AlreadyChecked));
        assert_eq!(c.metrics().density_scans, scans.density_scans);

        assert_eq!(c.decide("weekly farm box"), Verdict::Accept);
        assert_eq!(
            c.decide("weekly farm box 99"),
            Verdict::Reject(RejectReason::CanonicalAlreadyChecked)
        );
        let scans = c.metrics();
        assert_eq!(c.decide("weekly farm box 99"), Verdict::Reject(RejectReason::AlreadyChecked));
        assert_eq!(c.metrics().density_scans, scans.density_scans);
    }

    #[test]
    fn trivial_rejects()
    {
        let mut c = classifier(&["payment to shop"]);

        assert_eq!(c.decide("ab"), Verdict::Reject(RejectReason::TooShort));
        assert_eq!(
            c.decide("paid SOME STRING today"),
            Verdict::Reject(RejectReason::Forbidden)
        );
        assert_eq!(c.metrics().density_scans, 0);
    }

    #[test]
    fn one_acceptance_per_canonical_form()
    {
        let mut c = classifier(&["payment to shop"]);

        let verdicts: Vec<_> = ["coffee house 1234", "coffee house 5678", "coffee  house POS"]
            .into_iter()
            .map(|n| c.decide(n))
            .collect();

        assert_eq!(
            verdicts,
            vec![
                Verdict::Accept,
                Verdict::Reject(RejectReason::CanonicalAlreadyChecked),
                Verdict::Reject(RejectReason::CanonicalAlreadyChecked),
            ]
        );
        assert_eq!(c.metrics().accepted, 1);
    }

    #[test]
    fn near_duplicate_of_seed_entry()
    {
        let mut c = classifier(&["monthly gym membership fee"]);

        assert_eq!(
            c.decide("gym membership fee refund"),
            Verdict::Reject(RejectReason::NearDuplicate)
        );
        assert!(c.was_checked("gym membership fee refund"));
    }

    #[test]
    fn coverage_at_threshold_is_not_a_match()
    {
        let mut c = classifier(&["alpha bravo charlie delta echo"]);

        // 3 of 5 seed tokens present: exactly 0.6
        assert_eq!(c.decide("alpha bravo charlie zulu"), Verdict::Accept);
    }

    #[test]
    fn zero_token_seed_entries_are_skipped()
    {
        let mut c = classifier(&["1234 POS", "payment to shop"]);
        assert!(c.seed().contains(""));

        assert_eq!(c.decide("fresh bakery order"), Verdict::Accept);

        // An all-noise candidate collapses onto the empty seed entry
        assert_eq!(
            c.decide("9999 POS 12/05"),
            Verdict::Reject(RejectReason::CanonicalInSeed)
        );
    }

    fn skewed_classifier() -> NoveltyClassifier
    {
        let filters = RegexFilterSet::new().unwrap();
        let mut corpus = SeedCorpus::from_narratives(["alpha bravo charlie delta"], &filters);
        corpus.admit(&["common"; 5]);
        corpus.rebuild_stats();

        // {alpha,bravo,charlie,delta: 1, common: 5} puts 2..=17 in band
        assert!(corpus.stats().in_band(5));
        assert!(!corpus.stats().in_band(1));

        NoveltyClassifier::new(corpus, filters, ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn density_failure_rejects_on_following_token()
    {
        let mut c = skewed_classifier();

        assert_eq!(
            c.decide("common common words here"),
            Verdict::Reject(RejectReason::DensityFail)
        );
        assert!(c.failed_density("common common words here"));
        assert!(c.was_checked("common common words here"));
    }

    #[test]
    fn density_failure_on_final_token_does_not_reject()
    {
        let mut c = skewed_classifier();

        // Same tokens, but the threshold is crossed on the last one
        assert_eq!(c.decide("words here common common"), Verdict::Accept);
        assert!(!c.failed_density("words here common common"));
    }

    #[test]
    fn coverage_handles_empty_and_partial_entries()
    {
        let cand: HashSet<&str> = ["a", "b"].into_iter().collect();
        assert_eq!(coverage("", &cand), None);
        assert_eq!(coverage("a b c d", &cand), Some(0.5));
        assert_eq!(coverage("a b", &cand), Some(1.0));
    }
}
