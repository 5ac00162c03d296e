//! Simple and exponential moving averages and their fast-minus-slow
//! oscillators.
//!
//! EMA is seeded with the SMA of the first `period` closes (index
//! `period - 1`) and smoothed with `k = 2 / (period + 1)` afterwards.

use crate::domain::analyzable::{Analyzable, Recurrence, trailing_window};
use crate::domain::candle::Series;
use crate::domain::indicator::{Formula, IndicatorType};
use crate::domain::smoothing::{self, ema_weight, mean};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleMovingAverage(pub usize);

impl Formula for SimpleMovingAverage {
    type Input = f64;
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Sma(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<f64, f64> {
        Analyzable::new(series, |c| c.close, Recurrence::windowed(self.0, mean))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialMovingAverage(pub usize);

impl Formula for ExponentialMovingAverage {
    type Input = f64;
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Ema(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<f64, f64> {
        let period = self.0;
        smoothing::exponential(
            series,
            |c| c.close,
            period.saturating_sub(1),
            move |closes: &[f64], i| trailing_window(closes, i, period).and_then(mean),
            |closes: &[f64], i| Some(closes[i]),
            move |_| ema_weight(period),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleMovingAverageOscillator {
    pub fast: usize,
    pub slow: usize,
}

impl Formula for SimpleMovingAverageOscillator {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::SmaOscillator {
            fast: self.fast,
            slow: self.slow,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        oscillator(
            SimpleMovingAverage(self.fast).build(series),
            SimpleMovingAverage(self.slow).build(series),
            series,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialMovingAverageOscillator {
    pub fast: usize,
    pub slow: usize,
}

impl Formula for ExponentialMovingAverageOscillator {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::EmaOscillator {
            fast: self.fast,
            slow: self.slow,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        oscillator(
            ExponentialMovingAverage(self.fast).build(series),
            ExponentialMovingAverage(self.slow).build(series),
            series,
        )
    }
}

fn oscillator(
    fast: Analyzable<f64, f64>,
    slow: Analyzable<f64, f64>,
    series: &Series,
) -> Analyzable<(), f64> {
    Analyzable::new(
        series,
        |_| (),
        Recurrence::by_index(move |_: &[()], i| Some(fast.get(i)? - slow.get(i)?)),
    )
}
