//! Property tests for the bar transform.
//!
//! Uses proptest to verify:
//! 1. Ordering: output dates are strictly ascending whatever the input order
//! 2. Rounding: every price is within half a cent of the provider value
//! 3. Timestamps: consecutive calendar days are exactly 86,400,000 ms apart

use chrono::{Duration, NaiveDate};
use histfetch_core::{epoch_millis, round_price, to_series, RawBar};
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    0.01..5000.0_f64
}

fn arb_day_offset() -> impl Strategy<Value = i64> {
    0..3650_i64
}

fn arb_row() -> impl Strategy<Value = RawBar> {
    (arb_day_offset(), arb_price(), arb_price(), arb_price(), arb_price(), any::<u32>()).prop_map(
        |(offset, open, high, low, close, volume)| RawBar {
            date: base_date() + Duration::days(offset),
            open,
            high,
            low,
            close,
            volume: volume as u64,
            adj_close: None,
        },
    )
}

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
}

// ── 1. Ordering ──────────────────────────────────────────────────────

proptest! {
    /// Output is strictly ascending by date: sorted and duplicate-free.
    #[test]
    fn series_is_strictly_ascending(rows in prop::collection::vec(arb_row(), 0..60)) {
        let mut unique_dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        unique_dates.sort();
        unique_dates.dedup();

        let series = to_series(rows).unwrap();

        prop_assert_eq!(series.len(), unique_dates.len());
        for pair in series.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }
}

// ── 2. Rounding ──────────────────────────────────────────────────────

proptest! {
    /// Rounded prices stay within half a cent of the provider value.
    #[test]
    fn rounding_stays_within_half_a_cent(price in arb_price()) {
        let rounded = round_price(price);
        prop_assert!((rounded - price).abs() <= 0.005 + 1e-9);
        // Rounding is idempotent.
        prop_assert_eq!(round_price(rounded), rounded);
    }
}

// ── 3. Timestamps ────────────────────────────────────────────────────

proptest! {
    /// Epoch milliseconds advance by exactly one day per calendar day.
    #[test]
    fn timestamps_step_one_day(offset in arb_day_offset()) {
        let day = base_date() + Duration::days(offset);
        let next = day + Duration::days(1);
        prop_assert_eq!(epoch_millis(next) - epoch_millis(day), 86_400_000);
        prop_assert_eq!(epoch_millis(day) % 86_400_000, 0);
    }
}
