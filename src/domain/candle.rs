//! Candle representation and series ingestion.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Accepts `%Y-%m-%d %H:%M:%S` or a bare `%Y-%m-%d` (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

static NEXT_SERIES_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity handle assigned when a series is ingested.
///
/// Two series with equal candles still get different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId(u64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An ingested, immutable candle sequence. Clones share storage and identity.
#[derive(Debug, Clone)]
pub struct Series {
    id: SeriesId,
    name: String,
    candles: Arc<[Candle]>,
}

impl Series {
    pub fn new(name: impl Into<String>, candles: Vec<Candle>) -> Self {
        Series {
            id: SeriesId(NEXT_SERIES_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            candles: candles.into(),
        }
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}
