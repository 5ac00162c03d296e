//! Average True Range and the directional movement family (+DI, -DI, ADX).
//!
//! All four use Wilder's smoothing (`k = 1 / period`):
//! - ATR is seeded with the mean true range of the first `period` candles
//! - +DM/-DM are seeded at index `period` (the first `period` moves), and
//!   DI = smoothed DM / ATR * 100
//! - DX = |+DI - -DI| / (+DI + -DI) * 100, and ADX smooths DX from index
//!   `2 * period - 1`

use std::rc::Rc;

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::{Candle, Series};
use crate::domain::indicator::{Formula, IndicatorType};
use crate::domain::smoothing::{self, mean_over, wilder_weight};

fn true_range(candles: &[Candle], i: usize) -> Option<f64> {
    Some(match i.checked_sub(1) {
        Some(prev) => candles[i].true_range(candles[prev].close),
        None => candles[i].high - candles[i].low,
    })
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Plus,
    Minus,
}

fn directional_movement(candles: &[Candle], i: usize, direction: Direction) -> Option<f64> {
    let prev = &candles[i.checked_sub(1)?];
    let up = candles[i].high - prev.high;
    let down = prev.low - candles[i].low;
    Some(match direction {
        Direction::Plus if up > 0.0 && up > down => up,
        Direction::Minus if down > 0.0 && down > up => down,
        _ => 0.0,
    })
}

fn directional_indicator(series: &Series, period: usize, direction: Direction) -> Analyzable<(), f64> {
    let smoothed_dm = smoothing::exponential(
        series,
        Candle::clone,
        period,
        move |candles: &[Candle], i| {
            mean_over(i, period, |j| directional_movement(candles, j, direction))
        },
        move |candles: &[Candle], i| directional_movement(candles, i, direction),
        move |_| wilder_weight(period),
    );
    let atr = AverageTrueRange(period).build(series);
    Analyzable::new(
        series,
        |_| (),
        Recurrence::by_index(move |_: &[()], i| {
            let dm = smoothed_dm.get(i)?;
            let atr = atr.get(i)?;
            Some(if atr == 0.0 { 0.0 } else { dm / atr * 100.0 })
        }),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AverageTrueRange(pub usize);

impl Formula for AverageTrueRange {
    type Input = Candle;
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Atr(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<Candle, f64> {
        let period = self.0;
        smoothing::exponential(
            series,
            Candle::clone,
            period.saturating_sub(1),
            move |candles: &[Candle], i| mean_over(i, period, |j| true_range(candles, j)),
            true_range,
            move |_| wilder_weight(period),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlusDirectionalIndicator(pub usize);

impl Formula for PlusDirectionalIndicator {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::PlusDi(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        directional_indicator(series, self.0, Direction::Plus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinusDirectionalIndicator(pub usize);

impl Formula for MinusDirectionalIndicator {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::MinusDi(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        directional_indicator(series, self.0, Direction::Minus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AverageDirectionalIndex(pub usize);

impl Formula for AverageDirectionalIndex {
    type Input = ();
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Adx(self.0)
    }

    fn build(&self, series: &Series) -> Analyzable<(), f64> {
        let period = self.0;
        let pdi = PlusDirectionalIndicator(period).build(series);
        let mdi = MinusDirectionalIndicator(period).build(series);
        let dx = Rc::new(Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| {
                let plus = pdi.get(i)?;
                let minus = mdi.get(i)?;
                let sum = plus + minus;
                Some(if sum == 0.0 {
                    0.0
                } else {
                    (plus - minus).abs() / sum * 100.0
                })
            }),
        ));
        let seed_dx = Rc::clone(&dx);
        smoothing::exponential(
            series,
            |_| (),
            period.saturating_mul(2).saturating_sub(1),
            move |_: &[()], i| mean_over(i, period, |j| seed_dx.get(j)),
            move |_: &[()], i| dx.get(i),
            move |_| wilder_weight(period),
        )
    }
}
