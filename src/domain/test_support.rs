//! Series builders shared by unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::candle::{Candle, Series};

pub fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(i as i64)
}

/// open = high = low = close, constant volume.
pub fn series_from_closes(closes: &[f64]) -> Series {
    Series::new(
        "TEST",
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: day(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect(),
    )
}

/// (open, high, low, close, volume) rows.
pub fn series_from_rows(rows: &[(f64, f64, f64, f64, f64)]) -> Series {
    Series::new(
        "TEST",
        rows.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close, volume))| Candle {
                timestamp: day(i),
                open,
                high,
                low,
                close,
                volume,
            })
            .collect(),
    )
}
