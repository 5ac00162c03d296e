//! Exponential smoothing primitive shared by EMA, RSI, ATR, DI, ADX and the
//! MACD signal line.
//!
//! ```text
//! out[first] = seed(first)
//! out[i]     = out[i-1] + weight(i) * (value(i) - out[i-1])    for i > first
//! ```
//!
//! Undefined seed or value makes the output undefined from that point on.

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::{Candle, Series};

pub fn exponential<I: 'static>(
    series: &Series,
    project: impl Fn(&Candle) -> I,
    first_index: usize,
    seed: impl Fn(&[I], usize) -> Option<f64> + 'static,
    value: impl Fn(&[I], usize) -> Option<f64> + 'static,
    weight: impl Fn(usize) -> f64 + 'static,
) -> Analyzable<I, f64> {
    let recurrence = Recurrence::cumulative(
        first_index,
        seed,
        move |inputs: &[I], i, prev: Option<&f64>| {
            let prev = *prev?;
            let current = value(inputs, i)?;
            Some(prev + weight(i) * (current - prev))
        },
    );
    Analyzable::new(series, project, recurrence)
}

/// 2 / (period + 1)
pub fn ema_weight(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Wilder's 1 / period.
pub fn wilder_weight(period: usize) -> f64 {
    1.0 / period as f64
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Mean of `f(i)` over the `period` indices ending at `last`; None if any
/// term is undefined or the window does not fit.
pub fn mean_over(last: usize, period: usize, f: impl Fn(usize) -> Option<f64>) -> Option<f64> {
    if period == 0 || last + 1 < period {
        return None;
    }
    let mut sum = 0.0;
    for i in last + 1 - period..=last {
        sum += f(i)?;
    }
    Some(sum / period as f64)
}
