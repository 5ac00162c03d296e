//! Boolean signals evaluated at an `IndexedCandle`.
//!
//! An undefined indicator value never triggers a signal. Crosses compare the
//! previous and current tick of an oscillator: bullish when it moves from
//! below zero to above zero, bearish the other way round. Candlestick
//! patterns hold only where the detector is defined and true.

use tracing::debug;

use crate::domain::analyzable::{Difference, Trend};
use crate::domain::indexed::IndexedCandle;
use crate::domain::indicator::{
    AccumulationDistributionLine, BearishAbandonedBaby, BollingerBand, BollingerBands,
    BullishShortDay, ClosePriceChange, ClosePricePercentageChange, DownsideTasukiGap,
    ExponentialMovingAverage, ExponentialMovingAverageOscillator, Formula, HighestClose,
    HighestHigh, HistoricalHighestClose, HistoricalHighestHigh, HistoricalLowestClose,
    HistoricalLowestLow, LowestClose, LowestLow, MacdHistogram, OnBalanceVolume,
    RelativeStrengthIndex, SimpleMovingAverage, SimpleMovingAverageOscillator, Stochastics,
    StochasticsOscillator,
};

impl<'a> IndexedCandle<'a> {
    fn diff_of<F>(&self, formula: F) -> Option<f64>
    where
        F: Formula,
        F::Output: Difference<Delta = f64>,
    {
        self.instance(formula).diff(self.index()).ok().flatten()
    }

    fn crosses<F>(&self, formula: F, upward: bool) -> bool
    where
        F: Formula<Output = f64>,
    {
        let Ok(neighbour) = self.instance(formula).compute_neighbour(self.index()) else {
            return false;
        };
        match (neighbour.previous.and_then(|t| t.value), neighbour.current.value) {
            (Some(prev), Some(current)) if upward => prev < 0.0 && current > 0.0,
            (Some(prev), Some(current)) => prev > 0.0 && current < 0.0,
            _ => false,
        }
    }

    fn pattern<F: Formula<Output = bool>>(&self, signal: &str, formula: F) -> bool {
        let hit = self.get(formula).unwrap_or(false);
        if hit {
            self.log_hit(signal, self.close());
        }
        hit
    }

    fn band_holds(&self, period: usize, sd: f64, test: impl Fn(&BollingerBand, f64) -> bool) -> bool {
        let bands = BollingerBands {
            period,
            stddev_mult_x100: (sd * 100.0).round() as u32,
        };
        self.get(bands).is_some_and(|band| test(&band, self.close()))
    }

    fn log_hit(&self, signal: &str, tick: f64) {
        debug!(
            signal,
            index = self.index(),
            timestamp = %self.timestamp(),
            close = self.close(),
            tick,
            "signal hit"
        );
    }

    pub fn close_price_change(&self, periods: usize) -> Option<f64> {
        self.get(ClosePriceChange(periods))
    }

    pub fn close_price_percentage_change(&self) -> Option<f64> {
        self.get(ClosePricePercentageChange)
    }

    pub fn is_bullish(&self, periods: usize) -> bool {
        self.close_price_change(periods).is_some_and(|c| c > 0.0)
    }

    pub fn is_bearish(&self, periods: usize) -> bool {
        self.close_price_change(periods).is_some_and(|c| c < 0.0)
    }

    pub fn is_accum_dist_bullish(&self) -> bool {
        self.diff_of(AccumulationDistributionLine).is_some_and(|d| d > 0.0)
    }

    pub fn is_accum_dist_bearish(&self) -> bool {
        self.diff_of(AccumulationDistributionLine).is_some_and(|d| d < 0.0)
    }

    pub fn is_obv_bullish(&self) -> bool {
        self.diff_of(OnBalanceVolume).is_some_and(|d| d > 0.0)
    }

    pub fn is_obv_bearish(&self) -> bool {
        self.diff_of(OnBalanceVolume).is_some_and(|d| d < 0.0)
    }

    pub fn is_in_bb_range(&self, period: usize, sd: f64) -> bool {
        self.band_holds(period, sd, |band, close| {
            close >= band.lower && close <= band.upper
        })
    }

    pub fn is_above_bb_up(&self, period: usize, sd: f64) -> bool {
        self.band_holds(period, sd, |band, close| close > band.upper)
    }

    pub fn is_below_bb_low(&self, period: usize, sd: f64) -> bool {
        self.band_holds(period, sd, |band, close| close < band.lower)
    }

    pub fn is_rsi_overbought(&self, period: usize, threshold: f64) -> bool {
        match self.get(RelativeStrengthIndex(period)) {
            Some(rsi) if rsi >= threshold => {
                self.log_hit("RSI_OVERBOUGHT", rsi);
                true
            }
            _ => false,
        }
    }

    pub fn is_rsi_oversold(&self, period: usize, threshold: f64) -> bool {
        match self.get(RelativeStrengthIndex(period)) {
            Some(rsi) if rsi <= threshold => {
                self.log_hit("RSI_OVERSOLD", rsi);
                true
            }
            _ => false,
        }
    }

    pub fn is_above_sma(&self, period: usize) -> bool {
        self.get(SimpleMovingAverage(period))
            .is_some_and(|sma| self.close() > sma)
    }

    pub fn is_below_sma(&self, period: usize) -> bool {
        self.get(SimpleMovingAverage(period))
            .is_some_and(|sma| self.close() < sma)
    }

    pub fn is_above_ema(&self, period: usize) -> bool {
        self.get(ExponentialMovingAverage(period))
            .is_some_and(|ema| self.close() > ema)
    }

    pub fn is_below_ema(&self, period: usize) -> bool {
        self.get(ExponentialMovingAverage(period))
            .is_some_and(|ema| self.close() < ema)
    }

    pub fn is_sma_bullish(&self, period: usize) -> bool {
        self.diff_of(SimpleMovingAverage(period))
            .is_some_and(|d| d > 0.0)
    }

    pub fn is_sma_bearish(&self, period: usize) -> bool {
        self.diff_of(SimpleMovingAverage(period))
            .is_some_and(|d| d < 0.0)
    }

    pub fn is_ema_bullish(&self, period: usize) -> bool {
        self.diff_of(ExponentialMovingAverage(period))
            .is_some_and(|d| d > 0.0)
    }

    pub fn is_ema_bearish(&self, period: usize) -> bool {
        self.diff_of(ExponentialMovingAverage(period))
            .is_some_and(|d| d < 0.0)
    }

    pub fn is_sma_osc_bullish(&self, fast: usize, slow: usize) -> bool {
        self.diff_of(SimpleMovingAverageOscillator { fast, slow })
            .is_some_and(|d| d > 0.0)
    }

    pub fn is_sma_osc_bearish(&self, fast: usize, slow: usize) -> bool {
        self.diff_of(SimpleMovingAverageOscillator { fast, slow })
            .is_some_and(|d| d < 0.0)
    }

    pub fn is_ema_osc_bullish(&self, fast: usize, slow: usize) -> bool {
        self.diff_of(ExponentialMovingAverageOscillator { fast, slow })
            .is_some_and(|d| d > 0.0)
    }

    pub fn is_ema_osc_bearish(&self, fast: usize, slow: usize) -> bool {
        self.diff_of(ExponentialMovingAverageOscillator { fast, slow })
            .is_some_and(|d| d < 0.0)
    }

    pub fn is_macd_osc_bullish(&self, fast: usize, slow: usize, signal: usize) -> bool {
        self.diff_of(MacdHistogram { fast, slow, signal })
            .is_some_and(|d| d > 0.0)
    }

    pub fn is_macd_osc_bearish(&self, fast: usize, slow: usize, signal: usize) -> bool {
        self.diff_of(MacdHistogram { fast, slow, signal })
            .is_some_and(|d| d < 0.0)
    }

    pub fn is_sma_bullish_cross(&self, fast: usize, slow: usize) -> bool {
        self.crosses(SimpleMovingAverageOscillator { fast, slow }, true)
    }

    pub fn is_sma_bearish_cross(&self, fast: usize, slow: usize) -> bool {
        self.crosses(SimpleMovingAverageOscillator { fast, slow }, false)
    }

    pub fn is_ema_bullish_cross(&self, fast: usize, slow: usize) -> bool {
        self.crosses(ExponentialMovingAverageOscillator { fast, slow }, true)
    }

    pub fn is_ema_bearish_cross(&self, fast: usize, slow: usize) -> bool {
        self.crosses(ExponentialMovingAverageOscillator { fast, slow }, false)
    }

    pub fn is_macd_bullish_cross(&self, fast: usize, slow: usize, signal: usize) -> bool {
        self.crosses(MacdHistogram { fast, slow, signal }, true)
    }

    pub fn is_macd_bearish_cross(&self, fast: usize, slow: usize, signal: usize) -> bool {
        self.crosses(MacdHistogram { fast, slow, signal }, false)
    }

    pub fn is_sto_overbought(&self, sto: Stochastics, threshold: f64) -> bool {
        match self.get(sto) {
            Some(v) if v.k >= threshold => {
                self.log_hit("STO_OVERBOUGHT", v.k);
                true
            }
            _ => false,
        }
    }

    pub fn is_sto_oversold(&self, sto: Stochastics, threshold: f64) -> bool {
        match self.get(sto) {
            Some(v) if v.k <= threshold => {
                self.log_hit("STO_OVERSOLD", v.k);
                true
            }
            _ => false,
        }
    }

    fn sto_osc_trend(&self, sto: Stochastics) -> Option<Trend> {
        self.instance(StochasticsOscillator(sto))
            .trend(self.index())
            .ok()
            .flatten()
    }

    pub fn is_sto_osc_bullish(&self, sto: Stochastics) -> bool {
        self.sto_osc_trend(sto) == Some(Trend::Bullish)
    }

    pub fn is_sto_osc_bearish(&self, sto: Stochastics) -> bool {
        self.sto_osc_trend(sto) == Some(Trend::Bearish)
    }

    pub fn is_sto_bullish_cross(&self, sto: Stochastics) -> bool {
        self.crosses(StochasticsOscillator(sto), true)
    }

    pub fn is_sto_bearish_cross(&self, sto: Stochastics) -> bool {
        self.crosses(StochasticsOscillator(sto), false)
    }

    pub fn is_bearish_abandoned_baby(&self, pattern: BearishAbandonedBaby) -> bool {
        self.pattern("BEARISH_ABANDONED_BABY", pattern)
    }

    pub fn is_bullish_short_day(&self, pattern: BullishShortDay) -> bool {
        self.pattern("BULLISH_SHORT_DAY", pattern)
    }

    pub fn is_downside_tasuki_gap(&self, pattern: DownsideTasukiGap) -> bool {
        self.pattern("DOWNSIDE_TASUKI_GAP", pattern)
    }

    pub fn is_breaking_highest_high(&self, period: usize) -> bool {
        self.breaking("BREAKING_HIGHEST_HIGH", self.diff_of(HighestHigh(period)), true)
    }

    pub fn is_breaking_highest_close(&self, period: usize) -> bool {
        self.breaking("BREAKING_HIGHEST_CLOSE", self.diff_of(HighestClose(period)), true)
    }

    pub fn is_breaking_lowest_low(&self, period: usize) -> bool {
        self.breaking("BREAKING_LOWEST_LOW", self.diff_of(LowestLow(period)), false)
    }

    pub fn is_breaking_lowest_close(&self, period: usize) -> bool {
        self.breaking("BREAKING_LOWEST_CLOSE", self.diff_of(LowestClose(period)), false)
    }

    pub fn is_breaking_historical_highest_high(&self) -> bool {
        self.breaking(
            "BREAKING_HISTORICAL_HIGHEST_HIGH",
            self.diff_of(HistoricalHighestHigh),
            true,
        )
    }

    pub fn is_breaking_historical_highest_close(&self) -> bool {
        self.breaking(
            "BREAKING_HISTORICAL_HIGHEST_CLOSE",
            self.diff_of(HistoricalHighestClose),
            true,
        )
    }

    pub fn is_breaking_historical_lowest_low(&self) -> bool {
        self.breaking(
            "BREAKING_HISTORICAL_LOWEST_LOW",
            self.diff_of(HistoricalLowestLow),
            false,
        )
    }

    pub fn is_breaking_historical_lowest_close(&self) -> bool {
        self.breaking(
            "BREAKING_HISTORICAL_LOWEST_CLOSE",
            self.diff_of(HistoricalLowestClose),
            false,
        )
    }

    fn breaking(&self, signal: &str, diff: Option<f64>, upward: bool) -> bool {
        let hit = match diff {
            Some(d) if upward => d > 0.0,
            Some(d) => d < 0.0,
            None => false,
        };
        if let (true, Some(d)) = (hit, diff) {
            self.log_hit(signal, d);
        }
        hit
    }
}
