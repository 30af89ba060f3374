//! Fetch-and-export job. Walks the configured symbols in order, fetching,
//! transforming and writing one JSON file per symbol.
//!
//! Failure policy:
//! - symbol unusable as a file name, provider or transform failure: recorded
//!   for that symbol, run continues
//! - empty series: recorded as `Empty`, no file is written, run continues
//! - missing output directory or a failed write: the whole run aborts

use crate::config::JobConfig;
use crate::data::DataProvider;
use crate::export::{self, ExportError};
use crate::transform;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("output directory does not exist: {}", path.display())]
    OutputDirMissing { path: PathBuf },

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// What happened to one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SymbolOutcome {
    Written {
        path: PathBuf,
        bar_count: usize,
        first_date: String,
        last_date: String,
        first_close: f64,
        last_close: f64,
        /// BLAKE3 hex digest of the file contents.
        digest: String,
    },
    Empty,
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    #[serde(flatten)]
    pub outcome: SymbolOutcome,
}

/// Summary of one run, in symbol order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub provider: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symbols: Vec<SymbolReport>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.symbols.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Written { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Failed { .. }))
    }

    /// Failed symbols with their reasons.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.symbols.iter().filter_map(|s| match &s.outcome {
            SymbolOutcome::Failed { reason } => Some((s.symbol.as_str(), reason.as_str())),
            _ => None,
        })
    }

    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.symbols
            .iter()
            .find(|s| s.symbol == symbol)
            .map(|s| &s.outcome)
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ExportError> {
        export::write_pretty(path, self, "run report")?;
        Ok(())
    }

    fn count(&self, pred: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.symbols.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Progress callback for the per-symbol loop.
pub trait DownloadProgress: Send {
    /// Called before a symbol is fetched.
    fn on_start(&self, symbol: &str, index: usize, total: usize, start: NaiveDate, end: NaiveDate);

    /// Called once a symbol has been written, skipped or failed.
    fn on_complete(&self, symbol: &str, index: usize, total: usize, outcome: &SymbolOutcome);

    /// Called when every symbol has been handled.
    fn on_batch_complete(&self, report: &RunReport);
}

/// Prints progress lines to stdout.
pub struct StdoutProgress;

impl DownloadProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize, start: NaiveDate, end: NaiveDate) {
        println!(
            "[{}/{}] Downloading {symbol} data from {start} to {end}...",
            index + 1,
            total
        );
    }

    fn on_complete(&self, symbol: &str, _index: usize, _total: usize, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Written {
                path,
                bar_count,
                first_close,
                last_close,
                ..
            } => {
                println!("Downloaded {bar_count} trading days for {symbol}");
                println!("Saved {symbol} data to {}", path.display());
                println!("Price range: ${first_close:.2} to ${last_close:.2}");
            }
            SymbolOutcome::Empty => println!("No data returned for {symbol}; nothing written"),
            SymbolOutcome::Failed { reason } => println!("Error downloading {symbol}: {reason}"),
        }
        println!();
    }

    fn on_batch_complete(&self, report: &RunReport) {
        println!(
            "Done: {}/{} written, {} empty, {} failed",
            report.succeeded(),
            report.total(),
            report.empty(),
            report.failed()
        );
    }
}

/// Discards all progress events.
pub struct SilentProgress;

impl DownloadProgress for SilentProgress {
    fn on_start(&self, _: &str, _: usize, _: usize, _: NaiveDate, _: NaiveDate) {}
    fn on_complete(&self, _: &str, _: usize, _: usize, _: &SymbolOutcome) {}
    fn on_batch_complete(&self, _: &RunReport) {}
}

/// Run the job over every configured symbol, sequentially and in order.
pub fn run(
    config: &JobConfig,
    provider: &dyn DataProvider,
    progress: &dyn DownloadProgress,
) -> Result<RunReport, JobError> {
    if !config.output_dir.is_dir() {
        return Err(JobError::OutputDirMissing {
            path: config.output_dir.clone(),
        });
    }

    let total = config.symbols.len();
    let mut symbols = Vec::with_capacity(total);
    info!(
        provider = provider.name(),
        total,
        start = %config.start_date,
        end = %config.end_date,
        "starting export"
    );

    for (i, symbol) in config.symbols.iter().enumerate() {
        progress.on_start(symbol, i, total, config.start_date, config.end_date);
        let outcome = export_symbol(config, provider, symbol)?;
        progress.on_complete(symbol, i, total, &outcome);
        symbols.push(SymbolReport {
            symbol: symbol.clone(),
            outcome,
        });
    }

    let report = RunReport {
        provider: provider.name().to_string(),
        start_date: config.start_date,
        end_date: config.end_date,
        symbols,
    };
    progress.on_batch_complete(&report);
    Ok(report)
}

/// Fetch → transform → write for a single symbol.
///
/// Only write errors escape as `Err`; everything else becomes an outcome.
fn export_symbol(
    config: &JobConfig,
    provider: &dyn DataProvider,
    symbol: &str,
) -> Result<SymbolOutcome, JobError> {
    if !export::is_safe_file_stem(symbol) {
        warn!(symbol, "symbol cannot be used as a file name");
        return Ok(SymbolOutcome::Failed {
            reason: format!("symbol '{symbol}' cannot be used as a file name"),
        });
    }

    let fetched = match provider.fetch(symbol, config.start_date, config.end_date) {
        Ok(fetched) => fetched,
        Err(e) => {
            warn!(symbol, error = %e, "fetch failed");
            return Ok(SymbolOutcome::Failed {
                reason: e.to_string(),
            });
        }
    };
    debug!(symbol, rows = fetched.bars.len(), source = ?fetched.source, "fetched");

    let bars = match transform::to_series(fetched.bars) {
        Ok(bars) => bars,
        Err(e) => {
            warn!(symbol, error = %e, "transform failed");
            return Ok(SymbolOutcome::Failed {
                reason: e.to_string(),
            });
        }
    };

    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        warn!(symbol, "provider returned no rows");
        return Ok(SymbolOutcome::Empty);
    };

    let path = export::output_path(&config.output_dir, symbol);
    let digest = export::write_series(&path, &bars)?;
    info!(symbol, bars = bars.len(), path = %path.display(), "written");

    Ok(SymbolOutcome::Written {
        bar_count: bars.len(),
        first_date: first.date.clone(),
        last_date: last.date.clone(),
        first_close: first.close,
        last_close: last.close,
        digest,
        path,
    })
}
