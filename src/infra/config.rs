use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::filters::DEFAULT_RANK_YEARS;

/// Config file names probed in priority order.
pub const CONFIG_FILES: [&str; 4] =
    ["seedsift.toml", "seedsift.yaml", "seedsift.json", ".seedsift.toml"];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Where data files are discovered
    pub input: InputConfig,

    /// Seed corpus source
    pub seed: SeedConfig,

    /// Rotating output sink
    pub output: OutputConfig,

    /// Row pre-filter applied before classification
    pub prefilter: PrefilterConfig,

    /// Novelty classifier constants
    pub classifier: ClassifierConfig,

    /// File ranking
    pub ranking: RankingConfig,

    /// Log level and optional log file
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig
{
    pub fileloc: PathBuf,
    pub ext: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig
{
    /// Explicit seed file; when unset the first `*.seed` in the working
    /// directory is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig
{
    pub outfile: PathBuf,
    pub rotate_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefilterConfig
{
    /// Rows dated before this year are skipped
    pub min_year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig
{
    /// Narratives shorter than this (in chars) are rejected outright
    pub min_length: usize,
    /// Literal substrings that reject a narrative
    pub forbidden_substrings: Vec<String>,
    /// Starting share of in-band tokens that fails the density scan
    pub initial_density_threshold: f64,
    /// Tokens shorter than this relax the threshold
    pub short_token_len: usize,
    /// Threshold multiplier for empty, noise, and short tokens
    pub noise_decay: f64,
    /// Threshold multiplier for dead tokens
    pub dead_decay: f64,
    /// Seed coverage above this marks a near duplicate
    pub match_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig
{
    pub years: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig
{
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for InputConfig
{
    fn default() -> Self
    {
        Self { fileloc: PathBuf::from("dat"), ext: "*.txt".to_string() }
    }
}

impl Default for OutputConfig
{
    fn default() -> Self
    {
        Self { outfile: PathBuf::from("out/outfile0.out"), rotate_bytes: 2_000_000 }
    }
}

impl Default for PrefilterConfig
{
    fn default() -> Self
    {
        Self { min_year: 2011 }
    }
}

impl Default for ClassifierConfig
{
    fn default() -> Self
    {
        Self {
            min_length: 3,
            forbidden_substrings: vec!["SOME STRING".to_string(), "ANOTHER STRING".to_string()],
            initial_density_threshold: 0.4,
            short_token_len: 4,
            noise_decay: 0.75,
            dead_decay: 0.3,
            match_threshold: 0.6,
        }
    }
}

impl Default for RankingConfig
{
    fn default() -> Self
    {
        Self { years: DEFAULT_RANK_YEARS.to_vec() }
    }
}

impl Default for LoggingConfig
{
    fn default() -> Self
    {
        Self { level: "info".to_string(), file: None }
    }
}

/// Load config from the working directory and `SEEDSIFT_*` env vars.
pub fn load_config() -> Result<Config>
{
    load_config_from(Path::new("."))
}

/// Load config from the first config file found in `dir`, then overlay
/// environment variables such as `SEEDSIFT_OUTPUT__ROTATE_BYTES`.
pub fn load_config_from(dir: &Path) -> Result<Config>
{
    let mut builder = config::Config::builder();

    for name in &CONFIG_FILES
    {
        let path = dir.join(name);
        if path.exists()
        {
            builder = builder.add_source(config::File::from(path));
            break;
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("SEEDSIFT")
            .prefix_separator("_")
            .separator("__"),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        if !ctx.quiet
        {
            println!("Would write {}:\n{toml_string}", config_path.display());
        }
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_round_trip_through_toml()
    {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
        assert!(text.contains("rotate_bytes = 2000000"));
    }

    #[test]
    fn partial_file_keeps_defaults() -> Result<()>
    {
        let tmp = TempDir::new()?;
        std::fs::write(
            tmp.path().join("seedsift.toml"),
            "[classifier]\nmatch_threshold = 0.8\n\n[ranking]\nyears = [2019]\n",
        )?;

        let cfg = load_config_from(tmp.path())?;
        assert_eq!(cfg.classifier.match_threshold, 0.8);
        assert_eq!(cfg.classifier.min_length, 3);
        assert_eq!(cfg.ranking.years, vec![2019]);
        assert_eq!(cfg.output, OutputConfig::default());
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let cfg = load_config_from(tmp.path())?;
        assert_eq!(cfg.input.ext, "*.txt");
        assert_eq!(cfg.prefilter.min_year, 2011);
        Ok(())
    }
}
