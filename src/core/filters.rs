//! Filepath: src/core/filters.rs
//! Fixed regex pattern groups that classify tokens and narratives as noise.
//!
//! Each group is a `RegexSet` of independent sub-patterns evaluated with OR
//! semantics. Every sub-pattern is wrapped as `^(?:...)` so a group only
//! matches at the very start of the haystack; callers never get partial
//! "found somewhere inside" answers.
//!
//! Groups run over the UTF-8 bytes with Unicode mode off, so `\w`, `\d`
//! and `\b` are ASCII-only and a non-ASCII letter is never a word char.

use regex::bytes::{Regex as BytesRegex, RegexSet};

use crate::error::SiftError;

/// Tokens that carry no meaning: digits, date fragments, amounts, markers.
pub const BAD_SEED_PATTERNS: &[&str] = &[
    r"\d+$",
    r"\d{1,2}(?:/\d{1,2})+",
    r"\w\['\+/=\]{2,}",
    r"\w{2}\d{3,}\w",
    r"\w{3}\d{4,10}",
    r"\d{3,}\w?",
    r"\d{2}(?:JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC)(?:\d{2,4})?",
    r"\bPOS\b",
    r"(?:\$|U+20A4|U+20AC)\d+\.\d+",
    r"REF\.NO",
    r"NO:",
    r"\d\w{4}\S{4}\d{3}\w",
    r"\w$",
];

/// Whole-narrative junk formats. The dead patterns are appended to this
/// list when the group is compiled.
pub const BAD_NARRATIVE_PATTERNS: &[&str] = &[
    r"(?:.+PBZ)$|\d+$",
    r"\s*\?\s*$",
    r"(?:\W\D){2,}",
    r"[0-9]{1,6}$",
    // Trailing quote sits after the end anchor, so this one never fires.
    r"[0-9]+-[A-Za-z]{3}$'",
    r"\d{2,10}(?:[^\w\d\s]\w+)+",
    r"[a-zA-z]{3} \d{4}-\d{2}-\d{2}",
    r"[0-9]{1,6} [0-9]{1,2}[A-Za-z]{3} ?[0-9]{4,}$",
    r"[0-9]{1,2}[A-Za-z]{1,3}[ -]?[A-Za-z]/[A-Za-z] \d+$",
    r"[0-9]{1,2}[A-Za-z]{3}[ -]?[A-Za-z]{3}(?: ?[0-9]{4,})?$",
    r"\w{2}\d{6}\w",
    r"E\+\d+$",
    r"\w{2}- \d+ -\d+$",
    r"\d{2,10} \d{2}\w{3}\d{2}",
    r"(?:\w{3}\d\w{2}){2}\w",
];

/// Strong noise: generic alphanumeric codes and reference tails.
pub const DEAD_NARRATIVE_PATTERNS: &[&str] = &[
    r"\w{2}-\d{4}\s+-\d{2,}",
    r"\d{8,}\w",
    r"\d{2}\w{2}\d{8,}|[a-zA-Z]{4,}\d?(?:\w{4,}|\d{5,})",
    r"[a-zA-Z]{3}\.[a-zA-Z]{4}\d+",
    r"\b[a-zA-Z]{1,4}\d{4}\b",
    r"WS-\d{4}",
];

/// Years searched by the file ranker when none are configured.
pub const DEFAULT_RANK_YEARS: &[u16] = &[2011, 2012, 2013, 2014, 2015];

/// A named set of start-anchored sub-patterns.
#[derive(Debug, Clone)]
pub struct PatternGroup
{
    name: &'static str,
    set: RegexSet,
}

impl PatternGroup
{
    /// Compile `patterns`, anchoring each one at the start of the haystack.
    pub fn new<'a, I>(
        name: &'static str,
        patterns: I,
    ) -> Result<Self, SiftError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let anchored = patterns
            .into_iter()
            .map(|p| format!("^(?-u:{p})"));

        let set =
            RegexSet::new(anchored).map_err(|source| SiftError::Pattern { group: name, source })?;

        Ok(Self { name, set })
    }

    /// True when any sub-pattern matches at the start of `haystack`.
    pub fn matches(
        &self,
        haystack: &str,
    ) -> bool
    {
        self.set
            .is_match(haystack.as_bytes())
    }

    /// Indices of the sub-patterns that matched (for diagnostics).
    pub fn matching(
        &self,
        haystack: &str,
    ) -> Vec<usize>
    {
        self.set
            .matches(haystack.as_bytes())
            .into_iter()
            .collect()
    }

    pub fn name(&self) -> &'static str
    {
        self.name
    }

    pub fn len(&self) -> usize
    {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.set.is_empty()
    }
}

/// The three fixed noise groups used by the normalizer, the classifier and
/// the row pre-filter.
#[derive(Debug, Clone)]
pub struct RegexFilterSet
{
    pub bad_seed: PatternGroup,
    pub bad_narratives: PatternGroup,
    pub dead_narratives: PatternGroup,
}

impl RegexFilterSet
{
    pub fn new() -> Result<Self, SiftError>
    {
        Ok(Self {
            bad_seed: PatternGroup::new("bad_seed", BAD_SEED_PATTERNS.iter().copied())?,
            bad_narratives: PatternGroup::new(
                "bad_narratives",
                BAD_NARRATIVE_PATTERNS
                    .iter()
                    .chain(DEAD_NARRATIVE_PATTERNS)
                    .copied(),
            )?,
            dead_narratives: PatternGroup::new(
                "dead_narratives",
                DEAD_NARRATIVE_PATTERNS.iter().copied(),
            )?,
        })
    }

    /// Token is pure noise and is dropped from canonical forms.
    pub fn is_noise_token(
        &self,
        token: &str,
    ) -> bool
    {
        self.bad_seed
            .matches(token)
    }

    pub fn is_bad_narrative(
        &self,
        text: &str,
    ) -> bool
    {
        self.bad_narratives
            .matches(text)
    }

    pub fn is_dead_narrative(
        &self,
        text: &str,
    ) -> bool
    {
        self.dead_narratives
            .matches(text)
    }
}

/// Counts `YYYY/MM/DD` dates for a fixed set of years in raw bytes.
#[derive(Debug, Clone)]
pub struct DateMatcher
{
    regex: BytesRegex,
}

impl DateMatcher
{
    /// Build a matcher for `years`; an empty list falls back to
    /// [`DEFAULT_RANK_YEARS`].
    pub fn for_years(years: &[u16]) -> Result<Self, SiftError>
    {
        let years = if years.is_empty() { DEFAULT_RANK_YEARS } else { years };

        let alternation = years
            .iter()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join("|");

        let pattern = format!(r"(?-u)\b(?:{alternation})(?:/[0-9]{{2}}){{2}}\b");

        let regex = BytesRegex::new(&pattern)
            .map_err(|source| SiftError::Pattern { group: "date_search", source })?;

        Ok(Self { regex })
    }

    /// Number of non-overlapping date matches in `haystack`.
    pub fn count(
        &self,
        haystack: &[u8],
    ) -> usize
    {
        self.regex
            .find_iter(haystack)
            .count()
    }
}
