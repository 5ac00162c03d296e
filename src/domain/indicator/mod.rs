//! Technical indicator formulas.
//!
//! Each formula is a small configuration struct implementing `Formula`; it
//! builds an `Analyzable` over a series and names itself with an
//! `IndicatorType`, which doubles as the cache key inside `AnalyzeContext`.
//! Composite formulas build their components and read them, never mutate them.

pub mod bollinger;
pub mod candlestick;
pub mod directional;
pub mod extrema;
pub mod macd;
pub mod moving_average;
pub mod price_change;
pub mod rsi;
pub mod stochastics;
pub mod volume;

use std::fmt;

use crate::domain::analyzable::{Analyzable, Tick, Trend};
use crate::domain::candle::Series;

pub use bollinger::{BollingerBand, BollingerBands};
pub use candlestick::{BearishAbandonedBaby, BullishShortDay, DownsideTasukiGap};
pub use directional::{
    AverageDirectionalIndex, AverageTrueRange, MinusDirectionalIndicator,
    PlusDirectionalIndicator,
};
pub use extrema::{
    HighestClose, HighestHigh, HistoricalHighestClose, HistoricalHighestHigh,
    HistoricalLowestClose, HistoricalLowestLow, LowestClose, LowestLow,
};
pub use macd::{MacdHistogram, MacdValue, MovingAverageConvergenceDivergence};
pub use moving_average::{
    ExponentialMovingAverage, ExponentialMovingAverageOscillator, SimpleMovingAverage,
    SimpleMovingAverageOscillator,
};
pub use price_change::{ClosePriceChange, ClosePricePercentageChange};
pub use rsi::RelativeStrengthIndex;
pub use stochastics::{
    Stochastics, StochasticsOscillator, StochasticsOscillatorTrend, StochasticsValue,
};
pub use volume::{AccumulationDistributionLine, AccumulationDistributionTrend, OnBalanceVolume};

pub trait Formula {
    type Input: 'static;
    type Output: Clone + 'static;

    fn indicator_type(&self) -> IndicatorType;

    fn build(&self, series: &Series) -> Analyzable<Self::Input, Self::Output>;
}

/// Rendered indicator output, used where the concrete formula type is erased.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        lower: f64,
        middle: f64,
        upper: f64,
    },
    Stochastics {
        k: f64,
        d: f64,
        j: f64,
    },
    Trend(Trend),
    Flag(bool),
}

impl fmt::Display for IndicatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorValue::Simple(v) => write!(f, "{v:.4}"),
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => write!(f, "{line:.4},{signal:.4},{histogram:.4}"),
            IndicatorValue::Bollinger {
                lower,
                middle,
                upper,
            } => write!(f, "{lower:.4},{middle:.4},{upper:.4}"),
            IndicatorValue::Stochastics { k, d, j } => write!(f, "{k:.4},{d:.4},{j:.4}"),
            IndicatorValue::Trend(Trend::Bullish) => write!(f, "bullish"),
            IndicatorValue::Trend(Trend::Bearish) => write!(f, "bearish"),
            IndicatorValue::Trend(Trend::NonTrended) => write!(f, "non-trended"),
            IndicatorValue::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

/// Formula identity plus parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    SmaOscillator { fast: usize, slow: usize },
    EmaOscillator { fast: usize, slow: usize },
    HighestHigh(usize),
    LowestLow(usize),
    HighestClose(usize),
    LowestClose(usize),
    HistoricalHighestHigh,
    HistoricalLowestLow,
    HistoricalHighestClose,
    HistoricalLowestClose,
    Obv,
    AccumDist,
    ClosePriceChange(usize),
    ClosePricePercentageChange,
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdHistogram {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Atr(usize),
    PlusDi(usize),
    MinusDi(usize),
    Adx(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
    Stochastics(Stochastics),
    StochasticsOscillator(Stochastics),
    StochasticsTrend(Stochastics),
    AccumDistTrend,
    BearishAbandonedBaby {
        up_trend: usize,
        long_period: usize,
    },
    BullishShortDay {
        period: usize,
    },
    DownsideTasukiGap {
        down_trend: usize,
    },
}

impl IndicatorType {
    /// Build the formula this type names and render every tick.
    pub fn evaluate(&self, series: &Series) -> Vec<Tick<IndicatorValue>> {
        match *self {
            IndicatorType::Sma(p) => render(SimpleMovingAverage(p), series, IndicatorValue::Simple),
            IndicatorType::Ema(p) => {
                render(ExponentialMovingAverage(p), series, IndicatorValue::Simple)
            }
            IndicatorType::SmaOscillator { fast, slow } => render(
                SimpleMovingAverageOscillator { fast, slow },
                series,
                IndicatorValue::Simple,
            ),
            IndicatorType::EmaOscillator { fast, slow } => render(
                ExponentialMovingAverageOscillator { fast, slow },
                series,
                IndicatorValue::Simple,
            ),
            IndicatorType::HighestHigh(p) => render(HighestHigh(p), series, IndicatorValue::Simple),
            IndicatorType::LowestLow(p) => render(LowestLow(p), series, IndicatorValue::Simple),
            IndicatorType::HighestClose(p) => {
                render(HighestClose(p), series, IndicatorValue::Simple)
            }
            IndicatorType::LowestClose(p) => render(LowestClose(p), series, IndicatorValue::Simple),
            IndicatorType::HistoricalHighestHigh => {
                render(HistoricalHighestHigh, series, IndicatorValue::Simple)
            }
            IndicatorType::HistoricalLowestLow => {
                render(HistoricalLowestLow, series, IndicatorValue::Simple)
            }
            IndicatorType::HistoricalHighestClose => {
                render(HistoricalHighestClose, series, IndicatorValue::Simple)
            }
            IndicatorType::HistoricalLowestClose => {
                render(HistoricalLowestClose, series, IndicatorValue::Simple)
            }
            IndicatorType::Obv => render(OnBalanceVolume, series, IndicatorValue::Simple),
            IndicatorType::AccumDist => {
                render(AccumulationDistributionLine, series, IndicatorValue::Simple)
            }
            IndicatorType::ClosePriceChange(n) => {
                render(ClosePriceChange(n), series, IndicatorValue::Simple)
            }
            IndicatorType::ClosePricePercentageChange => {
                render(ClosePricePercentageChange, series, IndicatorValue::Simple)
            }
            IndicatorType::Rsi(p) => render(RelativeStrengthIndex(p), series, IndicatorValue::Simple),
            IndicatorType::Macd { fast, slow, signal } => render(
                MovingAverageConvergenceDivergence { fast, slow, signal },
                series,
                |m| IndicatorValue::Macd {
                    line: m.line,
                    signal: m.signal,
                    histogram: m.histogram,
                },
            ),
            IndicatorType::MacdHistogram { fast, slow, signal } => render(
                MacdHistogram { fast, slow, signal },
                series,
                IndicatorValue::Simple,
            ),
            IndicatorType::Atr(p) => render(AverageTrueRange(p), series, IndicatorValue::Simple),
            IndicatorType::PlusDi(p) => {
                render(PlusDirectionalIndicator(p), series, IndicatorValue::Simple)
            }
            IndicatorType::MinusDi(p) => {
                render(MinusDirectionalIndicator(p), series, IndicatorValue::Simple)
            }
            IndicatorType::Adx(p) => render(AverageDirectionalIndex(p), series, IndicatorValue::Simple),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => render(
                BollingerBands {
                    period,
                    stddev_mult_x100,
                },
                series,
                |b| IndicatorValue::Bollinger {
                    lower: b.lower,
                    middle: b.middle,
                    upper: b.upper,
                },
            ),
            IndicatorType::Stochastics(sto) => {
                render(sto, series, |v| IndicatorValue::Stochastics {
                    k: v.k,
                    d: v.d,
                    j: v.j,
                })
            }
            IndicatorType::StochasticsOscillator(sto) => {
                render(StochasticsOscillator(sto), series, IndicatorValue::Simple)
            }
            IndicatorType::StochasticsTrend(sto) => {
                render(StochasticsOscillatorTrend(sto), series, IndicatorValue::Trend)
            }
            IndicatorType::AccumDistTrend => {
                render(AccumulationDistributionTrend, series, IndicatorValue::Trend)
            }
            IndicatorType::BearishAbandonedBaby {
                up_trend,
                long_period,
            } => render(
                BearishAbandonedBaby {
                    up_trend,
                    long_period,
                },
                series,
                IndicatorValue::Flag,
            ),
            IndicatorType::BullishShortDay { period } => {
                render(BullishShortDay { period }, series, IndicatorValue::Flag)
            }
            IndicatorType::DownsideTasukiGap { down_trend } => {
                render(DownsideTasukiGap { down_trend }, series, IndicatorValue::Flag)
            }
        }
    }
}

fn render<F: Formula>(
    formula: F,
    series: &Series,
    into: impl Fn(F::Output) -> IndicatorValue,
) -> Vec<Tick<IndicatorValue>> {
    formula
        .build(series)
        .ticks()
        .into_iter()
        .map(|tick| Tick {
            timestamp: tick.timestamp,
            value: tick.value.map(&into),
        })
        .collect()
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::SmaOscillator { fast, slow } => write!(f, "SMA_OSC({},{})", fast, slow),
            IndicatorType::EmaOscillator { fast, slow } => write!(f, "EMA_OSC({},{})", fast, slow),
            IndicatorType::HighestHigh(period) => write!(f, "HIGHEST_HIGH({})", period),
            IndicatorType::LowestLow(period) => write!(f, "LOWEST_LOW({})", period),
            IndicatorType::HighestClose(period) => write!(f, "HIGHEST_CLOSE({})", period),
            IndicatorType::LowestClose(period) => write!(f, "LOWEST_CLOSE({})", period),
            IndicatorType::HistoricalHighestHigh => write!(f, "HISTORICAL_HIGHEST_HIGH"),
            IndicatorType::HistoricalLowestLow => write!(f, "HISTORICAL_LOWEST_LOW"),
            IndicatorType::HistoricalHighestClose => write!(f, "HISTORICAL_HIGHEST_CLOSE"),
            IndicatorType::HistoricalLowestClose => write!(f, "HISTORICAL_LOWEST_CLOSE"),
            IndicatorType::Obv => write!(f, "OBV"),
            IndicatorType::AccumDist => write!(f, "ADL"),
            IndicatorType::ClosePriceChange(n) => write!(f, "CLOSE_CHANGE({})", n),
            IndicatorType::ClosePricePercentageChange => write!(f, "CLOSE_CHANGE_PCT"),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::MacdHistogram { fast, slow, signal } => {
                write!(f, "MACD_HIST({},{},{})", fast, slow, signal)
            }
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::PlusDi(period) => write!(f, "PDI({})", period),
            IndicatorType::MinusDi(period) => write!(f, "MDI({})", period),
            IndicatorType::Adx(period) => write!(f, "ADX({})", period),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
            IndicatorType::Stochastics(sto) => {
                write!(f, "STO({},{},{})", sto.period, sto.k_sma, sto.d_sma)
            }
            IndicatorType::StochasticsOscillator(sto) => {
                write!(f, "STO_OSC({},{},{})", sto.period, sto.k_sma, sto.d_sma)
            }
            IndicatorType::StochasticsTrend(sto) => {
                write!(f, "STO_TREND({},{},{})", sto.period, sto.k_sma, sto.d_sma)
            }
            IndicatorType::AccumDistTrend => write!(f, "ADL_TREND"),
            IndicatorType::BearishAbandonedBaby {
                up_trend,
                long_period,
            } => write!(f, "BEARISH_ABANDONED_BABY({},{})", up_trend, long_period),
            IndicatorType::BullishShortDay { period } => write!(f, "BULLISH_SHORT_DAY({})", period),
            IndicatorType::DownsideTasukiGap { down_trend } => {
                write!(f, "DOWNSIDE_TASUKI_GAP({})", down_trend)
            }
        }
    }
}
