//! MACD (Moving Average Convergence Divergence).
//!
//! - MACD Line = EMA(fast) - EMA(slow)
//! - Signal Line = MACD Line smoothed with `k = 2 / (signal + 1)`, seeded with
//!   the MACD line itself at index `max(fast, slow) - 1`
//! - Histogram = MACD Line - Signal Line

use std::rc::Rc;

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::Series;
use crate::domain::indicator::{ExponentialMovingAverageOscillator, Formula, IndicatorType};
use crate::domain::smoothing::{self, ema_weight};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverageConvergenceDivergence {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Formula for MovingAverageConvergenceDivergence {
    type Input = ();
    type Output = MacdValue;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Macd {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<(), MacdValue> {
        let line = Rc::new(
            ExponentialMovingAverageOscillator {
                fast: self.fast,
                slow: self.slow,
            }
            .build(series),
        );
        let signal_period = self.signal;
        let seed_line = Rc::clone(&line);
        let value_line = Rc::clone(&line);
        let signal = smoothing::exponential(
            series,
            |_| (),
            self.fast.max(self.slow).saturating_sub(1),
            move |_: &[()], i| seed_line.get(i),
            move |_: &[()], i| value_line.get(i),
            move |_| ema_weight(signal_period),
        );

        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| {
                let line = line.get(i)?;
                let signal = signal.get(i)?;
                Some(MacdValue {
                    line,
                    signal,
                    histogram: line - signal,
                })
            }),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdHistogram {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Formula for MacdHistogram {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::MacdHistogram {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        let macd = MovingAverageConvergenceDivergence {
            fast: self.fast,
            slow: self.slow,
            signal: self.signal,
        }
        .build(series);
        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| macd.get(i).map(|m| m.histogram)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::series_from_closes;
    use approx::assert_relative_eq;

    fn macd_2_3_2() -> MovingAverageConvergenceDivergence {
        MovingAverageConvergenceDivergence {
            fast: 2,
            slow: 3,
            signal: 2,
        }
    }

    #[test]
    fn macd_defined_from_slow_warmup() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let macd = macd_2_3_2().build(&series);
        assert_eq!(macd.value_at(1).unwrap(), None);
        let first = macd.value_at(2).unwrap().unwrap();
        assert_relative_eq!(first.line, 0.5);
        assert_relative_eq!(first.signal, 0.5);
        assert_relative_eq!(first.histogram, 0.0);
    }

    #[test]
    fn macd_signal_smooths_line() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        let macd = macd_2_3_2().build(&series);
        let last = macd.value_at(4).unwrap().unwrap();
        assert_relative_eq!(last.line, 4.0 / 3.0, epsilon = 1e-10);
        assert_relative_eq!(last.signal, 19.0 / 18.0, epsilon = 1e-10);
        assert_relative_eq!(last.histogram, 5.0 / 18.0, epsilon = 1e-10);
    }

    #[test]
    fn histogram_matches_macd() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0, 10.0]);
        let hist = MacdHistogram {
            fast: 2,
            slow: 3,
            signal: 2,
        }
        .build(&series);
        assert_eq!(hist.value_at(1).unwrap(), None);
        assert_relative_eq!(hist.value_at(4).unwrap().unwrap(), 5.0 / 18.0, epsilon = 1e-10);
        assert_relative_eq!(hist.diff(4).unwrap().unwrap(), 5.0 / 18.0, epsilon = 1e-10);
    }
}
