//! Filepath: src/infra/logging.rs
//! Tracing subscriber setup: stderr plus an optional plain-text log file.
//! `RUST_LOG` always overrides the computed default level.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Target used for the end-of-run summary so it can be filtered on its own.
pub const FINAL_STATS_TARGET: &str = "final_stats";

/// Parse a level name, falling back to `INFO` for anything unknown.
pub fn parse_level(level: &str) -> Level
{
    match level
        .trim()
        .to_ascii_lowercase()
        .as_str()
    {
        "off" | "error" => Level::ERROR,
        "warn" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// `-v` raises the configured level one step per flag; `--quiet` caps it
/// at `WARN`.
pub fn resolve_level(
    configured: &str,
    verbose: u8,
    quiet: bool,
) -> Level
{
    if quiet
    {
        return Level::WARN;
    }

    match verbose
    {
        0 => parse_level(configured),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(
    level: Level,
    file: Option<&Path>,
    ansi: bool,
) -> Result<()>
{
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(ansi);

    let file_layer = match file
    {
        Some(path) =>
        {
            if let Some(parent) = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log dir {}", parent.display()))?;
            }

            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(handle))
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_target(true)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}
