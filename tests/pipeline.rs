//! Library-level run over ranked files with a real sink.

use std::fs;
use std::path::Path;

use indicatif::ProgressBar;
use seedsift::core::pipeline::Pipeline;
use seedsift::core::{FileRanker, NoveltyClassifier, RegexFilterSet, RowFilter, RunReport, SeedCorpus};
use seedsift::infra::{ClassifierConfig, DataFileWalker, RotatingSink};
use tempfile::TempDir;

fn row(
    date: &str,
    narrative: &str,
    amount: &str,
) -> String {
    format!("{date}|DEBIT|{narrative}|1|{date}|CARD|{amount}|0|N\n")
}

fn write(
    dir: &Path,
    name: &str,
    rows: &[String],
) {
    fs::write(dir.join(name), rows.concat()).unwrap();
}

#[test]
fn ranked_files_feed_one_classifier() {
    let tmp = TempDir::new().unwrap();
    let dat = tmp.path().join("dat");
    fs::create_dir_all(&dat).unwrap();

    // low.txt: one dated row; high.txt: three
    write(&dat, "low.txt", &[row("2012/05/01", "garden centre plants", "-9.99")]);
    write(
        &dat,
        "high.txt",
        &[
            row("2014/02/01", "garden centre plants", "-5.00"),
            row("2014/02/02", "payment to shop", "-1.00"),
            row("2014/02/03", "evening cinema tickets", "-12.00"),
        ],
    );
    fs::write(dat.join("notes.md"), "2014/01/01").unwrap();

    let files = DataFileWalker::new("*.txt").unwrap().walk_files(&dat);
    assert_eq!(files.len(), 2);

    let ranked = FileRanker::new(&[]).unwrap().rank(&files);
    assert!(ranked[0].path.ends_with("high.txt"));
    assert!(ranked[1].path.ends_with("low.txt"));

    let filters = RegexFilterSet::new().unwrap();
    let seed = SeedCorpus::from_narratives(["payment to shop"], &filters);
    let classifier = NoveltyClassifier::new(seed, filters, ClassifierConfig::default()).unwrap();

    let outfile = tmp.path().join("out/outfile0.out");
    let sink = RotatingSink::new(&outfile, 2_000_000);
    let mut pipeline = Pipeline::new(classifier, RowFilter::new(2011).unwrap(), Some(sink));

    pipeline.run_files(&ranked, &ProgressBar::hidden());

    let c = pipeline.counters();
    assert_eq!(c.processed, 4);
    assert_eq!(c.accepted, 2);
    assert_eq!(c.skipped, 2);

    let outcomes = pipeline.outcomes();
    assert_eq!(outcomes[0].counters.accepted, 2);
    assert_eq!(outcomes[0].written, 2);
    // The same narrative in the lower-ranked file is already known
    assert_eq!(outcomes[1].counters.accepted, 0);
    assert_eq!(outcomes[1].written, 0);

    let text = fs::read_to_string(&outfile).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "COMPARISON_FIELD|TRANS_amount|TRANS_system|_NAME_|entry_date",
            "garden centre plants|-5.00|CARD|N|2014/02/01",
            "evening cinema tickets|-12.00|CARD|N|2014/02/03",
        ]
    );

    let report = RunReport::from_pipeline(&pipeline, Path::new("seed"));
    assert!(!report.dry_run);
    assert_eq!(report.files.len(), 2);
    assert_eq!(report.metrics.accepted, 2);
    assert_eq!(report.densities.get("cinema"), Some(&1));
    assert_eq!(report.acceptance_ratio, 0.5);
}

#[test]
fn unreadable_file_is_recorded_and_skipped() {
    let tmp = TempDir::new().unwrap();

    let filters = RegexFilterSet::new().unwrap();
    let seed = SeedCorpus::from_narratives(["payment to shop"], &filters);
    let classifier = NoveltyClassifier::new(seed, filters, ClassifierConfig::default()).unwrap();
    let mut pipeline = Pipeline::new(classifier, RowFilter::new(2011).unwrap(), None);

    let ghost = seedsift::core::RankedFile { path: tmp.path().join("gone.txt"), score: 3 };
    pipeline.process_file(&ghost);

    let outcome = &pipeline.outcomes()[0];
    assert!(outcome.error.is_some());
    assert_eq!(outcome.counters.processed, 0);
    assert_eq!(pipeline.counters().processed, 0);
}
