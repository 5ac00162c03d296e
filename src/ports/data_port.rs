//! Candle source port.

use crate::domain::candle::Candle;
use crate::domain::error::AnalysisError;

pub trait CandlePort {
    /// Candles for `code`, sorted by ascending timestamp.
    fn fetch_candles(&self, code: &str) -> Result<Vec<Candle>, AnalysisError>;

    /// Codes this source can serve.
    fn list_codes(&self) -> Result<Vec<String>, AnalysisError>;
}
