//! Volume-weighted cumulative lines: On-Balance Volume and the
//! Accumulation/Distribution line.
//!
//! OBV is seeded with the first candle's volume; each later candle adds its
//! volume on an up close, subtracts it on a down close and carries the
//! previous value on an unchanged close.
//!
//! A/D adds each candle's money-flow volume:
//! `((close - low) - (high - close)) / (high - low) * volume`, zero when the
//! candle has no range. `AccumulationDistributionTrend` tags each candle with
//! the direction of the A/D line against the previous one.

use crate::domain::analyzable::{Analyzable, Recurrence, Trend};
use crate::domain::candle::{Candle, Series};
use crate::domain::indicator::{Formula, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnBalanceVolume;

impl Formula for OnBalanceVolume {
    type Input = (f64, f64);
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Obv
    }

    fn build(&self, series: &Series) -> Analyzable<(f64, f64), f64> {
        Analyzable::new(
            series,
            |c| (c.close, c.volume),
            Recurrence::cumulative(
                0,
                |bars: &[(f64, f64)], i| Some(bars[i].1),
                |bars: &[(f64, f64)], i, prev: Option<&f64>| {
                    let prev = *prev?;
                    let (close, volume) = bars[i];
                    let prev_close = bars[i - 1].0;
                    Some(if close > prev_close {
                        prev + volume
                    } else if close < prev_close {
                        prev - volume
                    } else {
                        prev
                    })
                },
            ),
        )
    }
}

fn money_flow_volume(c: &Candle) -> f64 {
    let range = c.high - c.low;
    if range == 0.0 {
        return 0.0;
    }
    ((c.close - c.low) - (c.high - c.close)) / range * c.volume
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationDistributionLine;

impl Formula for AccumulationDistributionLine {
    type Input = f64;
    type Output = f64;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::AccumDist
    }

    fn build(&self, series: &Series) -> Analyzable<f64, f64> {
        Analyzable::new(
            series,
            money_flow_volume,
            Recurrence::cumulative(
                0,
                |flows: &[f64], i| Some(flows[i]),
                |flows: &[f64], i, prev: Option<&f64>| prev.map(|p| p + flows[i]),
            ),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulationDistributionTrend;

impl Formula for AccumulationDistributionTrend {
    type Input = ();
    type Output = Trend;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::AccumDistTrend
    }

    fn build(&self, series: &Series) -> Analyzable<(), Trend> {
        let adl = AccumulationDistributionLine.build(series);
        Analyzable::new(
            series,
            |_| (),
            Recurrence::by_index(move |_: &[()], i| {
                let previous = adl.get(i.checked_sub(1)?)?;
                Trend::between(&adl.get(i)?, &previous)
            }),
        )
    }
}
