use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "sift")]
#[command(
    about = "Sift transaction narratives down to a novel subset against a self-reinforcing seed corpus"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Classify without writing any output files
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rank data files and keep rows whose narratives are novel
    Run(RunArgs),

    /// Show data files in the order they would be processed
    Rank(RankArgs),

    /// Summarize a seed corpus
    Stats(StatsArgs),

    /// Initialize a seedsift.toml config file
    Init(InitArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Directory holding data files [config: input.fileloc]
    #[arg(short, long)]
    pub fileloc: Option<PathBuf>,

    /// Data file name glob [config: input.ext]
    #[arg(short, long)]
    pub ext: Option<String>,

    /// First output file; later files are numbered from it [config: output.outfile]
    #[arg(short, long)]
    pub outfile: Option<PathBuf>,

    /// Seed file (defaults to the first *.seed in the current directory)
    #[arg(short, long)]
    pub seed: Option<PathBuf>,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct RankArgs {
    /// Directory holding data files [config: input.fileloc]
    #[arg(short, long)]
    pub fileloc: Option<PathBuf>,

    /// Data file name glob [config: input.ext]
    #[arg(short, long)]
    pub ext: Option<String>,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct StatsArgs {
    /// Seed file (defaults to the first *.seed in the current directory)
    #[arg(short, long)]
    pub seed: Option<PathBuf>,

    /// Number of densest tokens to list
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Output format
    #[arg(long, default_value = "text", value_enum)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn globals_parse_after_subcommand() {
        let cli = Cli::parse_from(["sift", "run", "--dry-run", "-vv", "--seed", "a.seed"]);
        assert!(cli.dry_run);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run(args) => assert_eq!(args.seed, Some(PathBuf::from("a.seed"))),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn stats_defaults() {
        let cli = Cli::parse_from(["sift", "stats"]);
        match cli.command {
            Commands::Stats(args) => {
                assert_eq!(args.top, 20);
                assert!(matches!(args.format, OutputFormat::Text));
            }
            _ => panic!("expected stats"),
        }
    }
}
