//! Property tests for tokenization, coverage and classifier caching.

use std::collections::HashSet;

use proptest::prelude::*;
use seedsift::core::{NoveltyClassifier, RegexFilterSet, SeedCorpus, Verdict, canonicalize, coverage};
use seedsift::infra::ClassifierConfig;

fn word() -> impl Strategy<Value = String> {
    "[a-z]{3,8}"
}

proptest! {
    #[test]
    fn coverage_grows_with_the_candidate(
        entry in prop::collection::vec(word(), 1..6),
        base in prop::collection::vec(word(), 0..6),
        extra in prop::collection::vec(word(), 0..6),
    ) {
        let entry = entry.join(" ");
        let small: HashSet<&str> = base.iter().map(String::as_str).collect();
        let mut large = small.clone();
        large.extend(extra.iter().map(String::as_str));

        let a = coverage(&entry, &small).unwrap();
        let b = coverage(&entry, &large).unwrap();

        prop_assert!(a <= b);
        prop_assert!((0.0..=1.0).contains(&b));
    }

    #[test]
    fn digit_and_date_tokens_canonicalize_to_nothing(
        parts in prop::collection::vec(
            prop_oneof!["[0-9]{1,9}", "[0-9]{1,2}/[0-9]{1,2}", Just("POS".to_string())],
            1..6,
        )
    ) {
        let filters = RegexFilterSet::new().unwrap();
        let narrative = parts.join(" ");
        prop_assert!(canonicalize(&filters, &narrative).is_empty());
    }

    #[test]
    fn second_identical_decision_is_a_cache_hit(narrative in "[a-z]{3,8}( [a-z]{3,8}){0,4}") {
        let filters = RegexFilterSet::new().unwrap();
        let seed = SeedCorpus::from_narratives(["payment to shop", "1234 5678"], &filters);
        let mut c = NoveltyClassifier::new(seed, filters, ClassifierConfig::default()).unwrap();

        c.decide(&narrative);
        let before = c.metrics();

        let second = c.decide(&narrative);
        let after = c.metrics();

        prop_assert!(!second.is_accept());
        prop_assert_eq!(after.density_scans, before.density_scans);
        prop_assert_eq!(after.coverage_scans, before.coverage_scans);
        prop_assert_eq!(after.accepted, before.accepted);
    }

    #[test]
    fn one_acceptance_per_canonical_form(
        words in prop::collection::vec(word(), 1..4),
        tails in prop::collection::vec("[0-9]{3,6}", 1..5),
    ) {
        let filters = RegexFilterSet::new().unwrap();
        let seed = SeedCorpus::from_narratives(["payment to shop"], &filters);
        let mut c = NoveltyClassifier::new(seed, filters, ClassifierConfig::default()).unwrap();

        let stem = words.join(" ");
        let accepted = tails
            .iter()
            .map(|t| c.decide(&format!("{stem} {t}")))
            .filter(|v| *v == Verdict::Accept)
            .count();

        prop_assert!(accepted <= 1);
    }
}
