//! Bollinger Bands.
//!
//! - Middle: SMA of close over `period`
//! - Upper/Lower: Middle ± multiplier × population standard deviation
//!
//! The multiplier is carried as hundredths so the formula stays hashable.

use crate::domain::analyzable::{Analyzable, Recurrence};
use crate::domain::candle::Series;
use crate::domain::indicator::{Formula, IndicatorType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBand {
    pub lower: f64,
    pub middle: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BollingerBands {
    pub period: usize,
    pub stddev_mult_x100: u32,
}

impl Formula for BollingerBands {
    type Input = f64;
    type Output = BollingerBand;

    fn indicator_type(&self) -> IndicatorType {
        IndicatorType::Bollinger {
            period: self.period,
            stddev_mult_x100: self.stddev_mult_x100,
        }
    }

    fn build(&self, series: &Series) -> Analyzable<f64, BollingerBand> {
        let mult = self.stddev_mult_x100 as f64 / 100.0;
        Analyzable::new(
            series,
            |c| c.close,
            Recurrence::windowed(self.period, move |window: &[f64]| {
                let n = window.len() as f64;
                let middle = window.iter().sum::<f64>() / n;
                let variance = window
                    .iter()
                    .map(|x| {
                        let diff = x - middle;
                        diff * diff
                    })
                    .sum::<f64>()
                    / n;
                let stddev = variance.sqrt();
                Some(BollingerBand {
                    lower: middle - mult * stddev,
                    middle,
                    upper: middle + mult * stddev,
                })
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::series_from_closes;
    use approx::assert_relative_eq;

    #[test]
    fn population_stddev_bands() {
        // mean 5, population sd 2
        let series = series_from_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bands = BollingerBands {
            period: 8,
            stddev_mult_x100: 200,
        }
        .build(&series);
        assert_eq!(bands.value_at(6).unwrap(), None);
        let band = bands.value_at(7).unwrap().unwrap();
        assert_relative_eq!(band.middle, 5.0);
        assert_relative_eq!(band.upper, 9.0);
        assert_relative_eq!(band.lower, 1.0);
    }

    #[test]
    fn fractional_multiplier() {
        let series = series_from_closes(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let band = BollingerBands {
            period: 8,
            stddev_mult_x100: 150,
        }
        .build(&series)
        .value_at(7)
        .unwrap()
        .unwrap();
        assert_relative_eq!(band.upper, 8.0);
    }
}
