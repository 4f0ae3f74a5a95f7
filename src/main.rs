use anyhow::Result;
use clap::Parser;
use seedsift::cli::{AppContext, Cli, Commands};
use seedsift::infra::{config::load_config, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    // Config errors surface from the command itself; logging falls back to defaults
    let log_cfg = load_config()
        .map(|c| c.logging)
        .unwrap_or_default();
    let level = logging::resolve_level(&log_cfg.level, cli.verbose, cli.quiet);
    logging::init(level, log_cfg.file.as_deref(), !cli.no_color)?;

    match cli.command {
        Commands::Run(args) => seedsift::core::pipeline::run(args, &ctx),
        Commands::Rank(args) => seedsift::core::rank::run(args, &ctx),
        Commands::Stats(args) => seedsift::core::report::run(args, &ctx),
        Commands::Init(args) => seedsift::infra::config::init(args, &ctx),
    }
}
