//! CSV candle files, one `<code>.csv` per series.
//!
//! Header: `timestamp,open,high,low,close,volume`. Timestamps are either
//! `%Y-%m-%d` (midnight) or `%Y-%m-%d %H:%M:%S`.

use crate::domain::candle::{Candle, parse_timestamp};
use crate::domain::error::AnalysisError;
use crate::ports::data_port::CandlePort;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{code}.csv"))
    }
}

fn field(record: &csv::StringRecord, idx: usize, name: &str, code: &str, line: usize) -> Result<f64, AnalysisError> {
    let raw = record.get(idx).ok_or_else(|| AnalysisError::DataFormat {
        code: code.to_string(),
        reason: format!("line {line}: missing {name} column"),
    })?;
    raw.trim().parse().map_err(|e| AnalysisError::DataFormat {
        code: code.to_string(),
        reason: format!("line {line}: invalid {name} value {raw:?}: {e}"),
    })
}

impl CandlePort for CsvAdapter {
    fn fetch_candles(&self, code: &str) -> Result<Vec<Candle>, AnalysisError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Err(AnalysisError::NoData {
                code: code.to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            // header is line 1
            let line = row + 2;
            let record = result.map_err(|e| AnalysisError::DataFormat {
                code: code.to_string(),
                reason: format!("line {line}: {e}"),
            })?;

            let raw_ts = record.get(0).unwrap_or_default();
            let timestamp = parse_timestamp(raw_ts).ok_or_else(|| AnalysisError::DataFormat {
                code: code.to_string(),
                reason: format!("line {line}: invalid timestamp {raw_ts:?}"),
            })?;

            candles.push(Candle {
                timestamp,
                open: field(&record, 1, "open", code, line)?,
                high: field(&record, 2, "high", code, line)?,
                low: field(&record, 3, "low", code, line)?,
                close: field(&record, 4, "close", code, line)?,
                volume: field(&record, 5, "volume", code, line)?,
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        debug!(code, rows = candles.len(), path = %path.display(), "loaded candles");
        Ok(candles)
    }

    fn list_codes(&self) -> Result<Vec<String>, AnalysisError> {
        let mut codes = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(code) = name.strip_suffix(".csv") {
                codes.push(code.to_string());
            }
        }
        codes.sort();
        Ok(codes)
    }
}
