//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average gain/loss (index `period`): mean of the first `period`
//!   close-to-close changes
//! - Subsequent: `avg + (current - avg) / period`
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::Series;
use crate::domain::indicator::{Formula, IndicatorType};
use crate::domain::smoothing::{self, mean_over, wilder_weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeStrengthIndex(pub usize);

fn change(closes: &[f64], i: usize) -> Option<f64> {
    Some(closes[i] - closes[i.checked_sub(1)?])
}

fn gain(closes: &[f64], i: usize) -> Option<f64> {
    change(closes, i).map(|c| c.max(0.0))
}

fn loss(closes: &[f64], i: usize) -> Option<f64> {
    change(closes, i).map(|c| (-c).max(0.0))
}

fn wilder_average(
    series: &Series,
    period: usize,
    term: fn(&[f64], usize) -> Option<f64>,
) -> Analyzable<f64, f64> {
    smoothing::exponential(
        series,
        |c| c.close,
        period,
        move |closes: &[f64], i| mean_over(i, period, |j| term(closes, j)),
        move |closes: &[f64], i| term(closes, i),
        move |_| wilder_weight(period),
    )
}

impl Formula for RelativeStrengthIndex {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Rsi(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        let avg_gain = wilder_average(series, self.0, gain);
        let avg_loss = wilder_average(series, self.0, loss);
        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| {
                let g = avg_gain.get(i)?;
                let l = avg_loss.get(i)?;
                Some(if l == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + g / l)
                })
            }),
        )
    }
}
