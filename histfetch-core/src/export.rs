//! Per-symbol JSON export.
//!
//! Output is a pretty-printed JSON array (2-space indent, no trailing
//! newline) written over any existing file. The BLAKE3 digest of the bytes is
//! returned so reruns can be compared without re-reading the files.

use crate::transform::Bar;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether a symbol can be used as a file name inside the output directory:
/// non-empty, no path separators, no `..`, no control characters.
pub fn is_safe_file_stem(symbol: &str) -> bool {
    !symbol.is_empty()
        && !symbol.contains(['/', '\\'])
        && !symbol.contains("..")
        && !symbol.chars().any(char::is_control)
}

/// `<dir>/<lowercase symbol>_historical.json`
pub fn output_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{}_historical.json", symbol.to_lowercase()))
}

/// Write a series and return the hex digest of the written bytes.
pub fn write_series(path: &Path, bars: &[Bar]) -> Result<String, ExportError> {
    write_pretty(path, bars, "bar series")
}

pub(crate) fn write_pretty<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
    what: &str,
) -> Result<String, ExportError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ExportError::Serialize {
        what: what.to_string(),
        source,
    })?;
    std::fs::write(path, json.as_bytes()).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, timestamp: i64, close: f64) -> Bar {
        Bar {
            date: date.into(),
            timestamp,
            open: 52.42,
            high: 53.35,
            low: 52.16,
            close,
            volume: 31_868_000,
        }
    }

    #[test]
    fn path_is_lowercased_symbol() {
        let p = output_path(Path::new("src/data"), "GOOGL");
        assert_eq!(p, Path::new("src/data/googl_historical.json"));
        let p = output_path(Path::new("out"), "BRK-B");
        assert_eq!(p, Path::new("out/brk-b_historical.json"));
    }

    #[test]
    fn file_stems_stay_inside_the_directory() {
        assert!(is_safe_file_stem("GOOGL"));
        assert!(is_safe_file_stem("BRK.B"));
        assert!(is_safe_file_stem("^GSPC"));
        assert!(!is_safe_file_stem("BRK/B"));
        assert!(!is_safe_file_stem("..\\etc"));
        assert!(!is_safe_file_stem(".."));
        assert!(!is_safe_file_stem("A\nB"));
        assert!(!is_safe_file_stem(""));
    }

    #[test]
    fn writes_two_space_pretty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "GOOGL");
        write_series(&path, &[bar("2019-01-02", 1_546_387_200_000, 53.25)]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let expected = r#"[
  {
    "date": "2019-01-02",
    "timestamp": 1546387200000,
    "open": 52.42,
    "high": 53.35,
    "low": 52.16,
    "close": 53.25,
    "volume": 31868000
  }
]"#;
        assert_eq!(written, expected);
    }

    #[test]
    fn overwrites_and_digest_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(dir.path(), "META");
        std::fs::write(&path, "stale contents that are longer than the new file").unwrap();

        let bars = [bar("2019-01-02", 1_546_387_200_000, 135.68)];
        let first = write_series(&path, &bars).unwrap();
        let second = write_series(&path, &bars).unwrap();
        assert_eq!(first, second);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(blake3::hash(&bytes).to_hex().to_string(), first);

        let changed = write_series(&path, &[bar("2019-01-02", 1_546_387_200_000, 135.69)]).unwrap();
        assert_ne!(first, changed);
    }

    #[test]
    fn empty_series_is_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        write_series(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = output_path(&dir.path().join("nope"), "AMZN");
        let err = write_series(&path, &[]).unwrap_err();
        assert!(matches!(err, ExportError::Write { .. }));
        assert!(err.to_string().contains("amzn_historical.json"));
    }
}
