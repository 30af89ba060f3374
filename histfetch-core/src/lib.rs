//! histfetch core: fetch daily OHLCV history and export it as JSON.
//!
//! This crate contains:
//! - Data providers behind the `DataProvider` trait (Yahoo Finance, CSV import)
//! - The row → record transform (cent rounding, UTC-midnight timestamps)
//! - Per-symbol JSON export
//! - Job configuration (TOML + defaults)
//! - The sequential fetch-and-export job and its run report

pub mod config;
pub mod data;
pub mod export;
pub mod job;
pub mod transform;

pub use config::{ConfigError, JobConfig, ProviderConfig, SourceKind};
pub use data::{CsvProvider, DataError, DataProvider, DataSource, FetchResult, RawBar, YahooProvider};
pub use export::{output_path, write_series, ExportError};
pub use job::{
    run, DownloadProgress, JobError, RunReport, SilentProgress, StdoutProgress, SymbolOutcome,
    SymbolReport,
};
pub use transform::{epoch_millis, round_price, to_series, Bar, TransformError};
