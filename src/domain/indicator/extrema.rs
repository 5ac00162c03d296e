//! Highest/lowest high and close, over a trailing window or since the first
//! candle.

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::{Candle, Series};
use crate::domain::indicator::{Formula, IndicatorType};

#[derive(Debug, Clone, Copy)]
enum Extreme {
    Max,
    Min,
}

impl Extreme {
    fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Extreme::Max => a.max(b),
            Extreme::Min => a.min(b),
        }
    }

    fn identity(self) -> f64 {
        match self {
            Extreme::Max => f64::NEG_INFINITY,
            Extreme::Min => f64::INFINITY,
        }
    }
}

fn windowed(
    series: &Series,
    project: fn(&Candle) -> f64,
    period: usize,
    extreme: Extreme,
) -> Analyzable<f64, f64> {
    Analyzable::new(
        series,
        project,
        Recurrence::windowed(period, move |window: &[f64]| {
            Some(
                window
                    .iter()
                    .fold(extreme.identity(), |acc, &v| extreme.pick(acc, v)),
            )
        }),
    )
}

fn historical(
    series: &Series,
    project: fn(&Candle) -> f64,
    extreme: Extreme,
) -> Analyzable<f64, f64> {
    Analyzable::new(
        series,
        project,
        Recurrence::cumulative(
            0,
            |values: &[f64], i| Some(values[i]),
            move |values: &[f64], i, prev: Option<&f64>| {
                prev.map(|&p| extreme.pick(p, values[i]))
            },
        ),
    )
}

fn high(c: &Candle) -> f64 {
    c.high
}

fn low(c: &Candle) -> f64 {
    c.low
}

fn close(c: &Candle) -> f64 {
    c.close
}

macro_rules! windowed_formula {
    ($name:ident, $variant:ident, $project:expr, $extreme:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub usize);

        impl Formula for $name {
            type Input = f64;
            type Output = f64;

            fn indicator_type(&self) -> IndicatorType {
                IndicatorType::$variant(self.0)
            }

            fn build(&self, series: &Series) -> Analyzable<f64, f64> {
                windowed(series, $project, self.0, $extreme)
            }
        }
    };
}

macro_rules! historical_formula {
    ($name:ident, $variant:ident, $project:expr, $extreme:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Formula for $name {
            type Input = f64;
            type Output = f64;

            fn indicator_type(&self) -> IndicatorType {
                IndicatorType::$variant
            }

            fn build(&self, series: &Series) -> Analyzable<f64, f64> {
                historical(series, $project, $extreme)
            }
        }
    };
}

windowed_formula!(HighestHigh, HighestHigh, high, Extreme::Max);
windowed_formula!(LowestLow, LowestLow, low, Extreme::Min);
windowed_formula!(HighestClose, HighestClose, close, Extreme::Max);
windowed_formula!(LowestClose, LowestClose, close, Extreme::Min);

historical_formula!(HistoricalHighestHigh, HistoricalHighestHigh, high, Extreme::Max);
historical_formula!(HistoricalLowestLow, HistoricalLowestLow, low, Extreme::Min);
historical_formula!(HistoricalHighestClose, HistoricalHighestClose, close, Extreme::Max);
historical_formula!(HistoricalLowestClose, HistoricalLowestClose, close, Extreme::Min);
