//! Canonical forms: a narrative with its noise tokens stripped.
//!
//! Two narratives with the same canonical string are the same entity for
//! cache and corpus-membership purposes.

use itertools::Itertools;

use crate::core::filters::RegexFilterSet;

/// Split `narrative` on single spaces after trimming, keeping order.
/// Empty tokens (from doubled spaces) are preserved.
pub fn raw_tokens(narrative: &str) -> impl Iterator<Item = &str>
{
    narrative
        .trim()
        .split(' ')
}

/// Non-empty tokens of `narrative` that do not match `bad_seed`.
pub fn canonicalize<'a>(
    filters: &RegexFilterSet,
    narrative: &'a str,
) -> Vec<&'a str>
{
    raw_tokens(narrative)
        .map(str::trim)
        .filter(|t| !t.is_empty() && !filters.is_noise_token(t))
        .collect()
}

/// Canonical tokens joined by single spaces.
pub fn canonical_string(
    filters: &RegexFilterSet,
    narrative: &str,
) -> String
{
    canonicalize(filters, narrative)
        .into_iter()
        .join(" ")
}
