//! Stochastics over a trailing high/low range.
//!
//! - raw %K = (close - lowest low) / (highest high - lowest low) * 100
//! - %K = SMA(raw %K, k_sma)
//! - %D = SMA(%K, d_sma)
//! - %J = 3 * %K - 2 * %D
//!
//! Fast stochastics leave %K unsmoothed (`k_sma = 1`), slow stochastics use
//! `k_sma = 3`; full stochastics take both smoothing periods. Raw %K is
//! undefined when the window has no range.

use std::rc::Rc;

use crate::domain::analyzable::{Analyzable, Recurrence, Trend};
use crate::domain::candle::Series;
use crate::domain::indicator::{Formula, HighestHigh, IndicatorType, LowestLow};
use crate::domain::smoothing::mean_over;

pub const FAST_K_SMA: usize = 1;
pub const SLOW_K_SMA: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticsValue {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stochastics {
    pub period: usize,
    pub k_sma: usize,
    pub d_sma: usize,
}

impl Stochastics {
    pub fn fast(period: usize, d_sma: usize) -> Self {
        Stochastics {
            period,
            k_sma: FAST_K_SMA,
            d_sma,
        }
    }

    pub fn slow(period: usize, d_sma: usize) -> Self {
        Stochastics {
            period,
            k_sma: SLOW_K_SMA,
            d_sma,
        }
    }

    pub fn full(period: usize, k_sma: usize, d_sma: usize) -> Self {
        Stochastics {
            period,
            k_sma,
            d_sma,
        }
    }
}

impl Formula for Stochastics {
    type Input = ();
    type Output = StochasticsValue;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Stochastics(*self)
    }

    fn build(&self, series: &Series) -> Analyzable<(), StochasticsValue> {
        let highest = HighestHigh(self.period).build(series);
        let lowest = LowestLow(self.period).build(series);
        let raw = Analyzable::new(
            series,
            |c| c.close,
            Recurrence::by_index(move |closes: &[f64], i| {
                let high = highest.get(i)?;
                let low = lowest.get(i)?;
                let range = high - low;
                if range == 0.0 {
                    return None;
                }
                Some((closes[i] - low) / range * 100.0)
            }),
        );

        let k_sma = self.k_sma;
        let k = Rc::new(Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| mean_over(i, k_sma, |j| raw.get(j))),
        ));
        let d_sma = self.d_sma;
        let d_source = Rc::clone(&k);
        let d = Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| mean_over(i, d_sma, |j| d_source.get(j))),
        );

        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| {
                let k = k.get(i)?;
                let d = d.get(i)?;
                Some(StochasticsValue {
                    k,
                    d,
                    j: 3.0 * k - 2.0 * d,
                })
            }),
        )
    }
}

/// %K - %D.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StochasticsOscillator(pub Stochastics);

impl Formula for StochasticsOscillator {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::StochasticsOscillator(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        let sto = self.0.build(series);
        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| sto.get(i).map(|v| v.k - v.d)),
        )
    }
}

/// Direction of the oscillator against the previous candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StochasticsOscillatorTrend(pub Stochastics);

impl Formula for StochasticsOscillatorTrend {
    type Input = ();
    type Output = Trend;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::StochasticsTrend(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<(), Trend> {
        let osc = StochasticsOscillator(self.0).build(series);
        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| {
                let previous = osc.get(i.checked_sub(1)?)?;
                Trend::between(&osc.get(i)?, &previous)
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::series_from_rows;
    use approx::assert_relative_eq;

    // close position within a 0..10 range, so raw %K is close * 10
    fn ranged(closes: &[f64]) -> Series {
        let rows: Vec<(f64, f64, f64, f64, f64)> = closes
            .iter()
            .map(|&c| (c, 10.0, 0.0, c, 100.0))
            .collect();
        series_from_rows(&rows)
    }

    #[test]
    fn fast_k_is_raw_position_in_range() {
        let series = ranged(&[2.0, 4.0, 6.0, 8.0]);
        let sto = Stochastics::fast(1, 2).build(&series);
        // %D needs two %K values
        assert_eq!(sto.value_at(0).unwrap(), None);
        assert_eq!(
            sto.value_at(1).unwrap(),
            Some(StochasticsValue {
                k: 40.0,
                d: 30.0,
                j: 60.0
            })
        );
        let last = sto.value_at(3).unwrap().unwrap();
        assert_relative_eq!(last.k, 80.0);
        assert_relative_eq!(last.d, 70.0);
        assert_relative_eq!(last.j, 100.0);
    }

    #[test]
    fn slow_k_smooths_raw_k() {
        let series = ranged(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let sto = Stochastics::slow(1, 2).build(&series);
        // %K from index 2, %D from index 3
        assert_eq!(sto.value_at(2).unwrap(), None);
        let v = sto.value_at(3).unwrap().unwrap();
        assert_relative_eq!(v.k, 30.0);
        assert_relative_eq!(v.d, 25.0);
    }

    #[test]
    fn flat_range_is_undefined() {
        let series = series_from_rows(&[(5.0, 5.0, 5.0, 5.0, 1.0); 4]);
        let sto = Stochastics::fast(2, 1).build(&series);
        assert!(sto.ticks().iter().all(|t| !t.is_defined()));
    }

    #[test]
    fn oscillator_and_trend() {
        let series = ranged(&[2.0, 4.0, 6.0, 5.0, 5.0]);
        let sto = Stochastics::full(1, 1, 2);
        let osc = StochasticsOscillator(sto).build(&series);
        assert_eq!(osc.value_at(0).unwrap(), None);
        assert_relative_eq!(osc.value_at(1).unwrap().unwrap(), 10.0);
        assert_relative_eq!(osc.value_at(3).unwrap().unwrap(), -5.0);
        assert_relative_eq!(osc.value_at(4).unwrap().unwrap(), 0.0);

        let trend = StochasticsOscillatorTrend(sto).build(&series);
        assert_eq!(trend.value_at(1).unwrap(), None);
        assert_eq!(trend.value_at(2).unwrap(), Some(Trend::NonTrended));
        assert_eq!(trend.value_at(3).unwrap(), Some(Trend::Bearish));
        assert_eq!(trend.value_at(4).unwrap(), Some(Trend::Bullish));
    }

    #[test]
    fn formulas_report_their_type() {
        let sto = Stochastics::slow(14, 3);
        assert_eq!(sto.indicator_type(), IndicatorType::Stochastics(sto));
        assert_ne!(
            StochasticsOscillator(sto).indicator_type(),
            StochasticsOscillatorTrend(sto).indicator_type()
        );
    }
}
