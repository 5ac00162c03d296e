//! Candlestick pattern detectors.
//!
//! Each detector is a boolean formula evaluated per index. It is undefined
//! where the pattern cannot be judged yet (too few candles), and false
//! otherwise when any leg of the pattern fails.
//!
//! Building blocks:
//! - long / short day: body at or above / at or below a percentile of the
//!   trailing `period` bodies (linear interpolation between ranks)
//! - doji: body no larger than `DOJI_THRESHOLD` of the candle's range
//! - up / down trend: strictly higher (lower) highs and lows across the
//!   trailing `period` candles

use crate::domain::analyzable::{Analyzable, Recurrence, trailing_window};
use crate::domain::candle::{Candle, Series};
use crate::domain::indicator::{Formula, IndicatorType};

pub const LONG_DAY_THRESHOLD: f64 = 0.75;
pub const SHORT_DAY_THRESHOLD: f64 = 0.25;
pub const DOJI_THRESHOLD: f64 = 0.1;

fn body(c: &Candle) -> f64 {
    (c.close - c.open).abs()
}

fn is_bullish(c: &Candle) -> bool {
    c.close > c.open
}

fn is_bearish(c: &Candle) -> bool {
    c.close < c.open
}

fn is_doji(c: &Candle) -> bool {
    body(c) <= DOJI_THRESHOLD * (c.high - c.low)
}

/// Percentile of the trailing bodies ending at `index`.
fn body_percentile(candles: &[Candle], index: usize, period: usize, threshold: f64) -> Option<f64> {
    let window = trailing_window(candles, index, period)?;
    let mut bodies: Vec<f64> = window.iter().map(body).collect();
    bodies.sort_by(f64::total_cmp);
    let rank = threshold * (bodies.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    Some(bodies[lower] + (rank - lower as f64) * (bodies[upper] - bodies[lower]))
}

fn is_long_day(candles: &[Candle], index: usize, period: usize) -> bool {
    body_percentile(candles, index, period, LONG_DAY_THRESHOLD)
        .is_some_and(|p| body(&candles[index]) >= p)
}

fn is_short_day(candles: &[Candle], index: usize, period: usize) -> Option<bool> {
    body_percentile(candles, index, period, SHORT_DAY_THRESHOLD)
        .map(|p| body(&candles[index]) <= p)
}

fn trends(candles: &[Candle], index: usize, period: usize, upward: bool) -> bool {
    let Some(window) = trailing_window(candles, index, period) else {
        return false;
    };
    window.windows(2).all(|pair| {
        let (prev, cur) = (&pair[0], &pair[1]);
        if upward {
            cur.high > prev.high && cur.low > prev.low
        } else {
            cur.high < prev.high && cur.low < prev.low
        }
    })
}

/// Bullish long day, gapped-up doji at the top of an up trend, then a bearish
/// long day gapping back down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BearishAbandonedBaby {
    pub up_trend: usize,
    pub long_period: usize,
}

impl Default for BearishAbandonedBaby {
    fn default() -> Self {
        BearishAbandonedBaby {
            up_trend: 3,
            long_period: 20,
        }
    }
}

impl Formula for BearishAbandonedBaby {
    type Input = Candle;
    type Output = bool;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::BearishAbandonedBaby {
            up_trend: self.up_trend,
            long_period: self.long_period,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<Candle, bool> {
        let (up_trend, long_period) = (self.up_trend, self.long_period);
        Analyzable::new(
            series,
            Candle::clone,
            Recurrence::by_index(move |candles: &[Candle], i| {
                if i < 2 {
                    return None;
                }
                let (first, baby, last) = (&candles[i - 2], &candles[i - 1], &candles[i]);
                let gapped = baby.low > first.high && baby.low > last.high;
                Some(
                    is_doji(baby)
                        && trends(candles, i - 1, up_trend, true)
                        && is_bullish(first)
                        && is_long_day(candles, i - 2, long_period)
                        && gapped
                        && is_bearish(last)
                        && is_long_day(candles, i, long_period),
                )
            }),
        )
    }
}

/// A bullish candle whose body is a short day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BullishShortDay {
    pub period: usize,
}

impl Default for BullishShortDay {
    fn default() -> Self {
        BullishShortDay { period: 20 }
    }
}

impl Formula for BullishShortDay {
    type Input = Candle;
    type Output = bool;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::BullishShortDay {
            period: self.period,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<Candle, bool> {
        let period = self.period;
        Analyzable::new(
            series,
            Candle::clone,
            Recurrence::by_index(move |candles: &[Candle], i| {
                let short = is_short_day(candles, i, period)?;
                Some(short && is_bullish(&candles[i]))
            }),
        )
    }
}

/// Two bearish candles gapping down in a down trend, then a bullish candle
/// closing inside the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownsideTasukiGap {
    pub down_trend: usize,
}

impl Default for DownsideTasukiGap {
    fn default() -> Self {
        DownsideTasukiGap { down_trend: 3 }
    }
}

impl Formula for DownsideTasukiGap {
    type Input = Candle;
    type Output = bool;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::DownsideTasukiGap {
            down_trend: self.down_trend,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<Candle, bool> {
        let down_trend = self.down_trend;
        Analyzable::new(
            series,
            Candle::clone,
            Recurrence::by_index(move |candles: &[Candle], i| {
                if i < 2 {
                    return None;
                }
                let (first, second, last) = (&candles[i - 2], &candles[i - 1], &candles[i]);
                let closes_in_gap = last.close < first.low && last.close > second.high;
                Some(
                    trends(candles, i - 1, down_trend, false)
                        && is_bearish(first)
                        && first.low > second.high
                        && is_bearish(second)
                        && is_bullish(last)
                        && closes_in_gap,
                )
            }),
        )
    }
}
