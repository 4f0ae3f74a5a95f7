//! **seedsift** - Narrative novelty filtering for pipe-delimited transaction dumps
//!
//! Ranks data files by in-range dates, screens each row, and keeps only
//! narratives that differ enough from a seed corpus that grows with every
//! acceptance. Single-threaded classification with memory-mapped input.

/// Command-line interface with clap integration
pub mod cli;

/// Domain error type shared by the library modules
pub mod error;

/// Core processing - Filters, seed statistics and the novelty classifier
pub mod core {
    /// Fixed regex noise groups and the ranking date matcher
    pub mod filters;
    pub use filters::{DateMatcher, PatternGroup, RegexFilterSet};

    /// Tokenization and canonical forms
    pub mod normalize;
    pub use normalize::{canonical_string, canonicalize, raw_tokens};

    /// Seed corpus, token density and threshold statistics
    pub mod seed;
    pub use seed::{SeedCorpus, SeedStats, TokenDensity};

    /// Staged novelty decisions with caches and admission
    pub mod classifier;
    pub use classifier::{NoveltyClassifier, RejectReason, Verdict, coverage};

    /// Parallel date-match ranking of data files
    pub mod rank;
    pub use rank::{FileRanker, RankedFile, run as rank_run};

    /// Row pre-filter and the sequential file driver
    pub mod pipeline;
    pub use pipeline::{Pipeline, RowFilter, RunCounters, run as pipeline_run};

    /// End-of-run report and seed summaries
    pub mod report;
    pub use report::{RunReport, SeedSummary, run as stats_run};
}

/// Infrastructure - Configuration, I/O, logging and output
pub mod infra {
    /// Layered configuration (file + SEEDSIFT_* env)
    pub mod config;
    pub use config::{ClassifierConfig, Config, init as config_init, load_config};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use io::{FileBytes, map_file, read_file_smart};

    /// Tracing subscriber setup
    pub mod logging;

    /// Pipe-delimited row parsing
    pub mod rows;
    pub use rows::TransactionRow;

    /// Size-rotated output files
    pub mod sink;
    pub use sink::RotatingSink;

    /// Glob-filtered data file discovery
    pub mod walk;
    pub use walk::DataFileWalker;

    /// Path expansion and data dir resolution
    pub mod utils;
    pub use utils::PathUtils;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use core::{NoveltyClassifier, RegexFilterSet, SeedCorpus, Verdict};
pub use error::SiftError;
pub use infra::{Config, load_config};
