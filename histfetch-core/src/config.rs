//! Job configuration.
//!
//! A `JobConfig` is loaded from an optional TOML file and then overridden
//! field by field by the CLI. Every field has a default, so an empty file is a
//! valid configuration:
//!
//! ```toml
//! symbols = ["GOOGL", "META", "AMZN"]
//! start_date = "2019-01-01"
//! end_date = "2025-11-14"
//! output_dir = "src/data"
//!
//! [provider]
//! source = "yahoo"     # or "csv"
//! csv_dir = "fixtures" # required when source = "csv"
//! timeout_secs = 30
//! ```

use crate::data::{CsvProvider, DataError, DataProvider, YahooProvider};
use crate::export::is_safe_file_stem;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to build provider: {0}")]
    Provider(#[from] DataError),
}

/// Which provider backs the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
}

impl std::str::FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yahoo" => Ok(Self::Yahoo),
            "csv" => Ok(Self::Csv),
            other => Err(ConfigError::Invalid(format!(
                "unknown source '{other}'. Valid: yahoo, csv"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub source: SourceKind,
    pub csv_dir: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Yahoo,
            csv_dir: None,
            timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    /// Construct the configured provider.
    pub fn build(&self) -> Result<Box<dyn DataProvider>, ConfigError> {
        match self.source {
            SourceKind::Yahoo => Ok(Box::new(YahooProvider::new(Duration::from_secs(
                self.timeout_secs,
            ))?)),
            SourceKind::Csv => {
                let dir = self.csv_dir.as_ref().ok_or_else(|| {
                    ConfigError::Invalid("the csv source requires a csv directory".into())
                })?;
                Ok(Box::new(CsvProvider::new(dir)))
            }
        }
    }
}

/// Everything one run of the job needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Ticker symbols, processed in this order.
    pub symbols: Vec<String>,

    /// First requested date (inclusive).
    pub start_date: NaiveDate,

    /// Last requested date (exclusive).
    pub end_date: NaiveDate,

    /// Existing directory receiving `<symbol>_historical.json` files.
    pub output_dir: PathBuf,

    pub provider: ProviderConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["GOOGL".into(), "META".into(), "AMZN".into()],
            start_date: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2025, 11, 14).unwrap_or_default(),
            output_dir: PathBuf::from("src/data"),
            provider: ProviderConfig::default(),
        }
    }
}

impl JobConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Trim symbols and check the configuration is runnable.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        for symbol in &mut self.symbols {
            *symbol = symbol.trim().to_string();
        }
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("at least one symbol is required".into()));
        }
        if self.symbols.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid("symbols must not be blank".into()));
        }
        if let Some(bad) = self.symbols.iter().find(|s| !is_safe_file_stem(s)) {
            return Err(ConfigError::Invalid(format!(
                "symbol '{bad}' cannot be used as a file name (path separators, '..' or control characters)"
            )));
        }
        // Output files are named by the lowercased symbol.
        let mut seen = HashSet::new();
        if let Some(dup) = self.symbols.iter().find(|s| !seen.insert(s.to_lowercase())) {
            return Err(ConfigError::Invalid(format!(
                "symbol '{dup}' is listed more than once (symbols are compared case-insensitively)"
            )));
        }
        if self.start_date >= self.end_date {
            return Err(ConfigError::Invalid(format!(
                "start date {} must be before end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.provider.source == SourceKind::Csv && self.provider.csv_dir.is_none() {
            return Err(ConfigError::Invalid(
                "the csv source requires a csv directory".into(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_run() {
        let c = JobConfig::default();
        assert_eq!(c.symbols, ["GOOGL", "META", "AMZN"]);
        assert_eq!(c.start_date.to_string(), "2019-01-01");
        assert_eq!(c.end_date.to_string(), "2025-11-14");
        assert_eq!(c.output_dir, Path::new("src/data"));
        assert_eq!(c.provider.source, SourceKind::Yahoo);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(JobConfig::from_toml("").unwrap(), JobConfig::default());
    }

    #[test]
    fn parses_full_toml() {
        let c = JobConfig::from_toml(
            r#"
symbols = ["AAPL", "MSFT"]
start_date = "2020-01-01"
end_date = "2021-01-01"
output_dir = "out"

[provider]
source = "csv"
csv_dir = "fixtures"
timeout_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(c.symbols, ["AAPL", "MSFT"]);
        assert_eq!(c.end_date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        assert_eq!(c.provider.source, SourceKind::Csv);
        assert_eq!(c.provider.csv_dir.as_deref(), Some(Path::new("fixtures")));
        assert_eq!(c.provider.timeout_secs, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = JobConfig::from_toml("symbolz = [\"AAPL\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_trims_and_checks() {
        let mut c = JobConfig {
            symbols: vec![" AAPL ".into()],
            ..JobConfig::default()
        };
        c.validate().unwrap();
        assert_eq!(c.symbols, ["AAPL"]);

        let mut c = JobConfig {
            symbols: vec![],
            ..JobConfig::default()
        };
        assert!(c.validate().is_err());

        let mut c = JobConfig {
            symbols: vec!["AAPL".into(), "  ".into()],
            ..JobConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_like_symbols() {
        for bad in ["BRK/B", "../../etc/passwd", "a\\b", ".."] {
            let mut c = JobConfig {
                symbols: vec![bad.into(), "AAPL".into()],
                ..JobConfig::default()
            };
            let err = c.validate().unwrap_err();
            assert!(err.to_string().contains("cannot be used as a file name"), "{bad}: {err}");
        }

        let mut c = JobConfig {
            symbols: vec!["BRK.B".into(), "^GSPC".into()],
            ..JobConfig::default()
        };
        c.validate().unwrap();
    }

    #[test]
    fn validate_rejects_case_insensitive_duplicates() {
        let mut c = JobConfig {
            symbols: vec!["GOOGL".into(), "META".into(), "googl".into()],
            ..JobConfig::default()
        };
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("'googl' is listed more than once"), "{err}");

        let mut c = JobConfig {
            symbols: vec!["AAPL".into(), " AAPL".into()],
            ..JobConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let mut c = JobConfig::default();
        c.end_date = c.start_date;
        let err = c.validate().unwrap_err();
        assert!(err.to_string().contains("must be before"));
    }

    #[test]
    fn csv_source_needs_directory() {
        let mut c = JobConfig::default();
        c.provider.source = SourceKind::Csv;
        assert!(c.validate().is_err());
        assert!(c.provider.build().is_err());

        c.provider.csv_dir = Some(PathBuf::from("fixtures"));
        c.validate().unwrap();
        assert_eq!(c.provider.build().unwrap().name(), "csv_import");
    }

    #[test]
    fn source_kind_from_str() {
        assert_eq!("Yahoo".parse::<SourceKind>().unwrap(), SourceKind::Yahoo);
        assert_eq!("csv".parse::<SourceKind>().unwrap(), SourceKind::Csv);
        assert!("polygon".parse::<SourceKind>().is_err());
    }
}
