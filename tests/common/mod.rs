#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use sigtrader::domain::candle::{Candle, Series};
use sigtrader::domain::error::AnalysisError;
use sigtrader::ports::data_port::CandlePort;
use std::collections::HashMap;
use std::path::Path;

pub fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(i as i64)
}

pub fn candle(i: usize, open: f64, close: f64) -> Candle {
    Candle {
        timestamp: day(i),
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: 1_000.0,
    }
}

/// (open, close) pairs on consecutive days.
pub fn series(name: &str, rows: &[(f64, f64)]) -> Series {
    Series::new(
        name,
        rows.iter()
            .enumerate()
            .map(|(i, &(open, close))| candle(i, open, close))
            .collect(),
    )
}

/// open == close for every candle.
pub fn flat_series(name: &str, closes: &[f64]) -> Series {
    let rows: Vec<(f64, f64)> = closes.iter().map(|&c| (c, c)).collect();
    series(name, &rows)
}

/// Candles 0-4 at 100, candle 5 opens at 100 and closes at 150, then 150
/// from candle 6 onwards.
pub fn jump_series(name: &str) -> Series {
    let mut rows = vec![(100.0, 100.0); 5];
    rows.push((100.0, 150.0));
    rows.extend(std::iter::repeat_n((150.0, 150.0), 4));
    series(name, &rows)
}

pub fn csv_text(candles: &[Candle]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.timestamp.format("%Y-%m-%d"),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        ));
    }
    out
}

pub fn write_csv(dir: &Path, code: &str, candles: &[Candle]) {
    std::fs::write(dir.join(format!("{code}.csv")), csv_text(candles)).unwrap();
}

pub struct MockCandlePort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockCandlePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, code: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(code.to_string(), candles);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl CandlePort for MockCandlePort {
    fn fetch_candles(&self, code: &str) -> Result<Vec<Candle>, AnalysisError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(AnalysisError::DataFormat {
                code: code.to_string(),
                reason: reason.clone(),
            });
        }
        self.data
            .get(code)
            .cloned()
            .ok_or_else(|| AnalysisError::NoData {
                code: code.to_string(),
            })
    }

    fn list_codes(&self) -> Result<Vec<String>, AnalysisError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }
}
