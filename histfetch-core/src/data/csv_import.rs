//! CSV import provider.
//!
//! Reads one file per symbol from a directory, in the layout Yahoo's own
//! "download" button produces:
//!
//! ```text
//! Date,Open,High,Low,Close,Adj Close,Volume
//! 2019-01-02,52.42,53.35,52.16,53.25,53.25,31868000
//! ```
//!
//! `Adj Close` is optional. Rows outside `[start, end)` are dropped so the
//! provider honors the same half-open range as the network source.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Adj Close", default)]
    adj_close: Option<f64>,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Provider backed by `<dir>/<SYMBOL>.csv` files.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Locate the file for a symbol: exact case first, then lowercase.
    fn locate(&self, symbol: &str) -> Option<PathBuf> {
        [symbol.to_string(), symbol.to_lowercase()]
            .into_iter()
            .map(|name| self.dir.join(format!("{name}.csv")))
            .find(|p| p.is_file())
    }

    fn read_rows(path: &Path, start: NaiveDate, end: NaiveDate) -> Result<Vec<RawBar>, DataError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::Other(format!("open {}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
            let row = row.map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "{} row {}: {e}",
                    path.display(),
                    line + 1
                ))
            })?;

            if row.date < start || row.date >= end {
                continue;
            }

            if !row.volume.is_finite() || row.volume < 0.0 {
                return Err(DataError::ResponseFormatChanged(format!(
                    "{} row {}: invalid volume {}",
                    path.display(),
                    line + 1,
                    row.volume
                )));
            }

            bars.push(RawBar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume as u64,
                adj_close: row.adj_close,
            });
        }

        Ok(bars)
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.locate(symbol).ok_or_else(|| DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
        debug!(symbol, path = %path.display(), "reading csv");

        let bars = Self::read_rows(&path, start, end)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }
}
