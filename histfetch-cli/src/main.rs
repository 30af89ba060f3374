//! histfetch CLI: fetch daily OHLCV history and export one JSON file per symbol.
//!
//! Settings resolve in this order: flag, environment variable, `--config`
//! TOML file, built-in default.
//!
//! Exit codes:
//! - 0: at least one symbol produced a series (written or empty)
//! - 1: no symbol succeeded, `--strict` with any failure, or a fatal write error
//! - 2: invalid configuration or a provider that cannot be constructed

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use histfetch_core::{
    run, DataProvider, DownloadProgress, JobConfig, RunReport, SilentProgress, SourceKind, StdoutProgress,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "histfetch",
    version,
    about = "Fetch daily OHLCV history and export it as per-symbol JSON"
)]
struct Cli {
    /// TOML config file providing defaults for every setting below.
    #[arg(long, env = "HISTFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Symbols to fetch, comma separated or repeated (e.g., GOOGL,META,AMZN).
    #[arg(long, env = "HISTFETCH_SYMBOLS", value_delimiter = ',')]
    symbols: Vec<String>,

    /// Start date (YYYY-MM-DD), inclusive.
    #[arg(long, env = "HISTFETCH_START")]
    start: Option<String>,

    /// End date (YYYY-MM-DD), exclusive.
    #[arg(long, env = "HISTFETCH_END")]
    end: Option<String>,

    /// Existing directory receiving <symbol>_historical.json files.
    #[arg(long, env = "HISTFETCH_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Data source: yahoo or csv.
    #[arg(long, env = "HISTFETCH_SOURCE")]
    source: Option<String>,

    /// Directory of <SYMBOL>.csv files (csv source).
    #[arg(long, env = "HISTFETCH_CSV_DIR")]
    csv_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds (yahoo source).
    #[arg(long, env = "HISTFETCH_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Also write the run report as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Exit non-zero if any symbol failed.
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// Suppress progress output.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Print the resolved configuration as TOML and exit.
    #[arg(long, default_value_t = false)]
    print_config: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (config, provider) = match resolve(&cli) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::from(2);
        }
    };

    if cli.print_config {
        return match toml::to_string_pretty(&config) {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: failed to render config: {e}");
                ExitCode::FAILURE
            }
        };
    }

    match run_export(&cli, &config, provider.as_ref()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("{flag} must be YYYY-MM-DD, got '{value}'"))
}

/// Layer flags and environment over the config file (or defaults) and validate.
fn resolve_config(cli: &Cli) -> Result<JobConfig> {
    let mut config = match &cli.config {
        Some(path) => JobConfig::from_file(path)?,
        None => JobConfig::default(),
    };

    if !cli.symbols.is_empty() {
        config.symbols = cli.symbols.clone();
    }
    if let Some(start) = &cli.start {
        config.start_date = parse_date("--start", start)?;
    }
    if let Some(end) = &cli.end {
        config.end_date = parse_date("--end", end)?;
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(source) = &cli.source {
        config.provider.source = source.parse::<SourceKind>()?;
    }
    if let Some(dir) = &cli.csv_dir {
        config.provider.csv_dir = Some(dir.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config.provider.timeout_secs = secs;
    }

    config.validate()?;
    debug!(?config, "resolved configuration");
    Ok(config)
}

/// Resolve the configuration and construct its provider.
fn resolve(cli: &Cli) -> Result<(JobConfig, Box<dyn DataProvider>)> {
    let config = resolve_config(cli)?;
    let provider = config
        .provider
        .build()
        .context("failed to construct data provider")?;
    Ok((config, provider))
}

fn run_export(cli: &Cli, config: &JobConfig, provider: &dyn DataProvider) -> Result<ExitCode> {
    let progress: &dyn DownloadProgress = if cli.quiet {
        &SilentProgress
    } else {
        &StdoutProgress
    };

    let report = run(config, provider, progress)
        .with_context(|| format!("export to {} aborted", config.output_dir.display()))?;

    if let Some(path) = &cli.report {
        report
            .write_json(path)
            .context("failed to write run report")?;
    }

    for (symbol, reason) in report.failures() {
        eprintln!("Error for {symbol}: {reason}");
    }

    Ok(ExitCode::from(exit_status(&report, cli.strict)))
}

fn exit_status(report: &RunReport, strict: bool) -> u8 {
    if report.succeeded() + report.empty() == 0 || (strict && report.failed() > 0) {
        1
    } else {
        0
    }
}
