//! Provider rows → exported bar records.
//!
//! The exported record is flat and JSON-shaped: ISO date, UTC-midnight epoch
//! milliseconds, prices rounded to cents, integer volume. Rows are sorted by
//! date and deduplicated (first occurrence wins) before mapping.

use crate::data::RawBar;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One exported trading day. Field order is the JSON key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("non-finite {field} price on {date}")]
    NonFinitePrice { date: NaiveDate, field: &'static str },
}

/// Round a price to 2 fractional digits.
///
/// The binary value is scaled by 100 and the product rounded ties-to-even, so
/// results follow the scaled float, not the exact decimal expansion:
/// `1.005` gives `1.0` and `0.285` gives `0.28`.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Milliseconds since the Unix epoch for `date` at 00:00 UTC.
pub fn epoch_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

impl Bar {
    pub fn from_raw(raw: &RawBar) -> Result<Self, TransformError> {
        let price = |field: &'static str, value: f64| {
            if value.is_finite() {
                Ok(round_price(value))
            } else {
                Err(TransformError::NonFinitePrice {
                    date: raw.date,
                    field,
                })
            }
        };

        Ok(Self {
            date: raw.date.format("%Y-%m-%d").to_string(),
            timestamp: epoch_millis(raw.date),
            open: price("open", raw.open)?,
            high: price("high", raw.high)?,
            low: price("low", raw.low)?,
            close: price("close", raw.close)?,
            volume: raw.volume,
        })
    }
}

/// Convert provider rows into an ascending, duplicate-free series.
pub fn to_series(mut rows: Vec<RawBar>) -> Result<Vec<Bar>, TransformError> {
    rows.sort_by_key(|r| r.date);
    rows.dedup_by_key(|r| r.date);
    rows.iter().map(Bar::from_raw).collect()
}
